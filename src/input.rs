//! Input kinds and value coercion
//!
//! Inputs hold what a browser input would hold: a raw string and a checked
//! flag. Values are formatted into that state when a field renders and coerced
//! back into JSON when the form is read.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Strings accepted as `true` by boolean inputs (compared case-insensitively)
pub const TRUTHY_VALUES: [&str; 5] = ["true", "1", "yes", "t", "y"];

/// Kind of a leaf input
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    String,
    Text,
    Number,
    Checkbox,
    Toggle,
    Boolean,
    Datetime,
    Select,
}

impl InputKind {
    /// Map a template type name to an input kind
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(InputKind::String),
            "text" => Some(InputKind::Text),
            "number" => Some(InputKind::Number),
            "checkbox" => Some(InputKind::Checkbox),
            "toggle" => Some(InputKind::Toggle),
            "boolean" => Some(InputKind::Boolean),
            "datetime" => Some(InputKind::Datetime),
            "select" | "list" | "dropdown" => Some(InputKind::Select),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            InputKind::String => "string",
            InputKind::Text => "text",
            InputKind::Number => "number",
            InputKind::Checkbox => "checkbox",
            InputKind::Toggle => "toggle",
            InputKind::Boolean => "boolean",
            InputKind::Datetime => "datetime",
            InputKind::Select => "select",
        }
    }

    /// Whether the input's value is its checked state rather than its text
    pub fn uses_checked(&self) -> bool {
        matches!(self, InputKind::Checkbox | InputKind::Toggle)
    }
}

/// One choice of a select input
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: Value,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<Value>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// Build an option from data: `{value, label}` objects or bare values
    pub fn from_value(value: &Value) -> Self {
        if let Some(obj) = value.as_object() {
            if let Some(inner) = obj.get("value") {
                let label = obj
                    .get("label")
                    .or_else(|| obj.get("name"))
                    .map(raw_text)
                    .unwrap_or_else(|| raw_text(inner));
                return Self {
                    value: inner.clone(),
                    label,
                };
            }
        }
        Self {
            value: value.clone(),
            label: raw_text(value),
        }
    }

    /// The string an input holds when this option is selected
    pub fn key(&self) -> String {
        raw_text(&self.value)
    }
}

/// Raw state of a leaf input
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputState {
    pub raw: String,
    pub checked: bool,
}

/// A user edit applied to a leaf input
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputValue {
    Text(String),
    Checked(bool),
}

impl From<&str> for InputValue {
    fn from(s: &str) -> Self {
        InputValue::Text(s.to_string())
    }
}

impl From<String> for InputValue {
    fn from(s: String) -> Self {
        InputValue::Text(s)
    }
}

impl From<bool> for InputValue {
    fn from(b: bool) -> Self {
        InputValue::Checked(b)
    }
}

impl InputState {
    pub fn apply(&mut self, value: InputValue) {
        match value {
            InputValue::Text(raw) => self.raw = raw,
            InputValue::Checked(checked) => self.checked = checked,
        }
    }
}

/// Text form of a JSON value as an input would display it
pub fn raw_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Case-insensitive match against [`TRUTHY_VALUES`]
pub fn is_truthy(raw: &str) -> bool {
    let lowered = raw.trim().to_lowercase();
    TRUTHY_VALUES.contains(&lowered.as_str())
}

/// Pre-populate an input from a value
pub fn format_value(kind: InputKind, value: &Value) -> InputState {
    if kind.uses_checked() {
        let checked = match value {
            Value::Bool(b) => *b,
            Value::String(s) => is_truthy(s),
            Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
            _ => false,
        };
        return InputState {
            raw: String::new(),
            checked,
        };
    }

    InputState {
        raw: raw_text(value),
        checked: false,
    }
}

/// Coerce an input's raw state back into a value
pub fn read_value(
    kind: InputKind,
    state: &InputState,
    options: &[SelectOption],
    format: Option<&str>,
    trim: bool,
) -> Value {
    match kind {
        InputKind::String | InputKind::Text => {
            if trim {
                Value::String(state.raw.trim().to_string())
            } else {
                Value::String(state.raw.clone())
            }
        }
        InputKind::Number => parse_number(&state.raw),
        InputKind::Datetime => parse_datetime(&state.raw, format)
            .map(Value::String)
            .unwrap_or(Value::Null),
        InputKind::Boolean => Value::Bool(is_truthy(&state.raw)),
        InputKind::Checkbox | InputKind::Toggle => Value::Bool(state.checked),
        InputKind::Select => options
            .iter()
            .find(|opt| opt.key() == state.raw)
            .map(|opt| opt.value.clone())
            .unwrap_or_else(|| Value::String(state.raw.clone())),
    }
}

// Integral results inside the exactly representable range stay integers.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn parse_number(raw: &str) -> Value {
    let Ok(parsed) = raw.trim().parse::<f64>() else {
        return Value::Null;
    };
    if parsed.is_finite() && parsed.fract() == 0.0 && parsed.abs() <= MAX_SAFE_INTEGER {
        return Value::from(parsed as i64);
    }
    Number::from_f64(parsed).map(Value::Number).unwrap_or(Value::Null)
}

/// Parse a date/time input into an RFC 3339 string
pub fn parse_datetime(raw: &str, format: Option<&str>) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(fmt) = format {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(utc_string(naive));
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(utc_string(naive));
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(utc_string)
}

fn utc_string(naive: NaiveDateTime) -> String {
    Utc.from_utc_datetime(&naive)
        .to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn read(kind: InputKind, raw: &str) -> Value {
        let state = InputState {
            raw: raw.to_string(),
            checked: false,
        };
        read_value(kind, &state, &[], None, false)
    }

    #[test]
    fn test_type_names() {
        assert_eq!(InputKind::from_type_name("dropdown"), Some(InputKind::Select));
        assert_eq!(InputKind::from_type_name("list"), Some(InputKind::Select));
        assert_eq!(InputKind::from_type_name("toggle"), Some(InputKind::Toggle));
        assert_eq!(InputKind::from_type_name("object"), None);
    }

    #[test]
    fn test_number_coercion() {
        assert_eq!(read(InputKind::Number, "42"), json!(42));
        assert_eq!(read(InputKind::Number, " 2.5 "), json!(2.5));
        assert_eq!(read(InputKind::Number, "-3"), json!(-3));
        assert_eq!(read(InputKind::Number, ""), Value::Null);
        assert_eq!(read(InputKind::Number, "abc"), Value::Null);
    }

    #[test]
    fn test_boolean_coercion() {
        for raw in ["true", "TRUE", "1", "Yes", "t", "y"] {
            assert_eq!(read(InputKind::Boolean, raw), json!(true), "{}", raw);
        }
        for raw in ["false", "0", "no", "", "maybe"] {
            assert_eq!(read(InputKind::Boolean, raw), json!(false), "{}", raw);
        }
    }

    #[test]
    fn test_string_trim_only_when_configured() {
        let state = InputState {
            raw: "  hi ".to_string(),
            checked: false,
        };
        assert_eq!(read_value(InputKind::String, &state, &[], None, false), json!("  hi "));
        assert_eq!(read_value(InputKind::String, &state, &[], None, true), json!("hi"));
    }

    #[test]
    fn test_datetime_coercion() {
        assert_eq!(
            read(InputKind::Datetime, "2024-03-01T10:30"),
            json!("2024-03-01T10:30:00Z")
        );
        assert_eq!(
            read(InputKind::Datetime, "2024-03-01T10:30:00+02:00"),
            json!("2024-03-01T10:30:00+02:00")
        );
        assert_eq!(read(InputKind::Datetime, "2024-03-01"), json!("2024-03-01T00:00:00Z"));
        assert_eq!(read(InputKind::Datetime, "not a date"), Value::Null);
    }

    #[test]
    fn test_checked_inputs() {
        let state = format_value(InputKind::Checkbox, &json!(true));
        assert!(state.checked);
        assert_eq!(read_value(InputKind::Checkbox, &state, &[], None, false), json!(true));
        assert!(format_value(InputKind::Toggle, &json!("yes")).checked);
        assert!(!format_value(InputKind::Toggle, &Value::Null).checked);
    }

    #[test]
    fn test_select_returns_option_value() {
        let options = vec![
            SelectOption::from_value(&json!({"value": 1, "label": "One"})),
            SelectOption::from_value(&json!("two")),
        ];
        let state = format_value(InputKind::Select, &json!(1));
        assert_eq!(read_value(InputKind::Select, &state, &options, None, false), json!(1));
        assert_eq!(options[0].label, "One");
        assert_eq!(options[1].label, "two");

        let other = InputState {
            raw: "three".to_string(),
            checked: false,
        };
        assert_eq!(read_value(InputKind::Select, &other, &options, None, false), json!("three"));
    }
}
