use crate::driver::{Widget, WidgetType, WidgetValue};
use crate::error::SettingsError;

fn invalid(widget: &dyn Widget, value: &str, reason: impl Into<String>) -> SettingsError {
    SettingsError::InvalidValue {
        name: widget.name().to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_toggle(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Interpret a textual value according to the widget's native type
pub fn parse_value(widget: &dyn Widget, value: &str) -> Result<WidgetValue, SettingsError> {
    match widget.widget_type() {
        WidgetType::Text => Ok(WidgetValue::Text(value.to_string())),
        WidgetType::Radio | WidgetType::Menu => {
            if widget.choices().iter().any(|c| c == value) {
                Ok(WidgetValue::Text(value.to_string()))
            } else {
                Err(invalid(widget, value, "not one of the reported choices"))
            }
        }
        WidgetType::Toggle => parse_toggle(value)
            .map(WidgetValue::Toggle)
            .ok_or_else(|| invalid(widget, value, "expected 1/0, true/false or on/off")),
        WidgetType::Range => {
            let number: f32 = value
                .trim()
                .parse()
                .map_err(|_| invalid(widget, value, "expected a number"))?;
            let (min, max, _) = widget.range_bounds()?;
            if !number.is_finite() || number < min || number > max {
                return Err(invalid(
                    widget,
                    value,
                    format!("outside range {}..{}", min, max),
                ));
            }
            Ok(WidgetValue::Range(number))
        }
        other => Err(invalid(
            widget,
            value,
            format!("{:?} widgets take no value", other),
        )),
    }
}

/// Next value of a widget when nudged one step forward
pub fn step_value(widget: &dyn Widget) -> Result<WidgetValue, SettingsError> {
    match widget.widget_type() {
        WidgetType::Range => {
            let current = widget.range_value()?;
            let (_, max, step) = widget.range_bounds()?;
            let step = if step > 0.0 { step } else { 1.0 };
            Ok(WidgetValue::Range((current + step).min(max)))
        }
        WidgetType::Toggle => Ok(WidgetValue::Toggle(true)),
        WidgetType::Text | WidgetType::Radio | WidgetType::Menu => {
            let current = widget.text_value()?;
            let number: i64 = current
                .trim()
                .parse()
                .map_err(|_| invalid(widget, &current, "current value is not an integer"))?;
            Ok(WidgetValue::Text((number + 1).to_string()))
        }
        other => Err(invalid(
            widget,
            "",
            format!("{:?} widgets cannot be stepped", other),
        )),
    }
}
