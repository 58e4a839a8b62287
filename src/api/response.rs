use crate::config::OutputFormat;
use crate::error::CamctlError;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write;

/// Single top-level key wrapping the envelope in both formats
const ENVELOPE_ROOT: &str = "cca_response";
const XML_ITEM: &str = "item";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseState {
    Success,
    Fail,
}

/// Uniform envelope returned by every API command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub state: ResponseState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Response {
    pub fn success() -> Self {
        Self {
            state: ResponseState::Success,
            data: None,
            message: None,
        }
    }

    /// Success carrying `data`, elided when it is null or an empty object
    pub fn with_data(data: Value) -> Self {
        let data = match data {
            Value::Null => None,
            Value::Object(ref map) if map.is_empty() => None,
            data => Some(data),
        };
        Self {
            data,
            ..Self::success()
        }
    }

    pub fn fail<S: Into<String>>(message: S) -> Self {
        Self {
            state: ResponseState::Fail,
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == ResponseState::Success
    }

    pub fn render(&self, format: OutputFormat) -> Result<String, CamctlError> {
        match format {
            OutputFormat::Json => Ok(self.to_json()?),
            OutputFormat::Xml => Ok(self.to_xml()),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&Envelope { cca_response: self })
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
        let state = match self.state {
            ResponseState::Success => "success",
            ResponseState::Fail => "fail",
        };

        let _ = write!(out, "<{}><state>{}</state>", ENVELOPE_ROOT, state);
        if let Some(data) = &self.data {
            write_element(&mut out, "data", data);
        }
        if let Some(message) = &self.message {
            let _ = write!(out, "<message>{}</message>", escape(message));
        }
        let _ = write!(out, "</{}>", ENVELOPE_ROOT);
        out
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    cca_response: &'a Response,
}

fn write_element(out: &mut String, name: &str, value: &Value) {
    let tag = element_name(name);
    let _ = write!(out, "<{}>", tag);
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            let _ = write!(out, "{}", b);
        }
        Value::Number(n) => {
            let _ = write!(out, "{}", n);
        }
        Value::String(s) => out.push_str(&escape(s)),
        Value::Array(items) => {
            for item in items {
                write_element(out, XML_ITEM, item);
            }
        }
        Value::Object(map) => {
            for (key, child) in map {
                write_element(out, key, child);
            }
        }
    }
    let _ = write!(out, "</{}>", tag);
}

/// Map an arbitrary key onto a legal XML element name
fn element_name(name: &str) -> String {
    let mut tag: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    match tag.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => tag.insert(0, '_'),
    }
    tag
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_without_data_omits_fields() {
        let response = Response::with_data(json!({}));
        assert_eq!(
            response.to_json().unwrap(),
            r#"{"cca_response":{"state":"success"}}"#
        );
        assert_eq!(
            response.to_xml(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><cca_response><state>success</state></cca_response>"
        );
    }

    #[test]
    fn test_empty_list_is_kept() {
        let response = Response::with_data(json!({ "frames": [] }));
        assert_eq!(
            response.to_json().unwrap(),
            r#"{"cca_response":{"state":"success","data":{"frames":[]}}}"#
        );
    }

    #[test]
    fn test_fail_carries_message_only() {
        let response = Response::fail("No camera found");
        assert_eq!(
            response.to_json().unwrap(),
            r#"{"cca_response":{"state":"fail","message":"No camera found"}}"#
        );
        assert!(response
            .to_xml()
            .ends_with("<state>fail</state><message>No camera found</message></cca_response>"));
    }

    #[test]
    fn test_both_formats_share_one_root() {
        let response = Response::with_data(json!({ "camera_found": true }));
        let json: Value = serde_json::from_str(&response.to_json().unwrap()).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert_eq!(json[ENVELOPE_ROOT]["data"]["camera_found"], true);

        let xml = response.to_xml();
        assert!(xml.contains("<cca_response><state>success</state><data>"));
        assert!(xml.ends_with("</data></cca_response>"));
    }

    #[test]
    fn test_xml_arrays_and_escaping() {
        let response = Response::with_data(json!({
            "choices": ["1/125", "<auto>"],
            "f-number": 5.6,
            "2nd": true,
        }));
        let xml = response.render(OutputFormat::Xml).unwrap();
        assert!(xml.contains("<choices><item>1/125</item><item>&lt;auto&gt;</item></choices>"));
        assert!(xml.contains("<f-number>5.6</f-number>"));
        assert!(xml.contains("<_2nd>true</_2nd>"));
    }
}
