use crate::error::CommandError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveViewAction {
    Start,
    Stop,
}

impl FromStr for LiveViewAction {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            other => Err(CommandError::InvalidArgument {
                command: "liveview",
                value: other.to_string(),
            }),
        }
    }
}

/// Every request the API answers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ListSettings,
    SetFocusPoint(String),
    SetAperture(String),
    SetSpeed(String),
    SetIso(String),
    SetWhitebalance(String),
    Shot,
    LiveView(LiveViewAction),
    Burst(usize),
    Autofocus,
    Reinitialize,
    Status,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ListSettings => "list_settings",
            Self::SetFocusPoint(_) => "set_focus_point",
            Self::SetAperture(_) => "set_aperture",
            Self::SetSpeed(_) => "set_speed",
            Self::SetIso(_) => "set_iso",
            Self::SetWhitebalance(_) => "set_whitebalance",
            Self::Shot => "shot",
            Self::LiveView(_) => "liveview",
            Self::Burst(_) => "burst",
            Self::Autofocus => "autofocus",
            Self::Reinitialize => "reinitialize",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetFocusPoint(v)
            | Self::SetAperture(v)
            | Self::SetSpeed(v)
            | Self::SetIso(v)
            | Self::SetWhitebalance(v) => write!(f, "{} {}", self.name(), v),
            Self::LiveView(LiveViewAction::Start) => write!(f, "liveview start"),
            Self::LiveView(LiveViewAction::Stop) => write!(f, "liveview stop"),
            Self::Burst(n) => write!(f, "burst {}", n),
            _ => f.write_str(self.name()),
        }
    }
}

/// Parses `name [argument]`; the argument is the rest of the line
impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        if line.is_empty() {
            return Err(CommandError::Empty);
        }

        let (name, arg) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, Some(rest.trim()).filter(|a| !a.is_empty())),
            None => (line, None),
        };

        let required = |command: &'static str| {
            arg.map(str::to_string)
                .ok_or(CommandError::MissingArgument { command })
        };

        match name.to_ascii_lowercase().as_str() {
            "list_settings" => Ok(Self::ListSettings),
            "set_focus_point" => Ok(Self::SetFocusPoint(required("set_focus_point")?)),
            "set_aperture" => Ok(Self::SetAperture(required("set_aperture")?)),
            "set_speed" => Ok(Self::SetSpeed(required("set_speed")?)),
            "set_iso" => Ok(Self::SetIso(required("set_iso")?)),
            "set_whitebalance" => Ok(Self::SetWhitebalance(required("set_whitebalance")?)),
            "shot" => Ok(Self::Shot),
            "liveview" => Ok(Self::LiveView(required("liveview")?.parse()?)),
            "burst" => {
                let value = required("burst")?;
                value
                    .parse()
                    .map(Self::Burst)
                    .map_err(|_| CommandError::InvalidArgument {
                        command: "burst",
                        value,
                    })
            }
            "autofocus" => Ok(Self::Autofocus),
            "reinitialize" => Ok(Self::Reinitialize),
            "status" => Ok(Self::Status),
            other => Err(CommandError::Unknown {
                name: other.to_string(),
            }),
        }
    }
}
