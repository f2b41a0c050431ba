use serde_json::Value;

/// The shapes a bypass payload is known to take
///
/// The bypass service answers with a bare string, an object carrying the URL
/// in `data`, an object carrying it in `url`, or something else entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// The payload is the URL itself
    Text(String),
    /// An object with the URL in its `data` field
    Data(String),
    /// An object with the URL in its `url` field
    Url(String),
    /// Any other shape
    Unrecognized,
}

impl Payload {
    /// Classifies a raw JSON value
    ///
    /// Precedence: bare string, then a string `data`, then a string `url`.
    /// Any string is taken as is, including an empty one.
    pub fn classify(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::Text(s.clone()),
            Value::Object(map) => {
                if let Some(data) = map.get("data").and_then(Value::as_str) {
                    Self::Data(data.to_string())
                } else if let Some(url) = map.get("url").and_then(Value::as_str) {
                    Self::Url(url.to_string())
                } else {
                    Self::Unrecognized
                }
            }
            _ => Self::Unrecognized,
        }
    }

    /// The URL carried by this payload, if any
    pub fn into_url(self) -> Option<String> {
        match self {
            Self::Text(url) | Self::Data(url) | Self::Url(url) => Some(url),
            Self::Unrecognized => None,
        }
    }
}

/// Normalizes a bypass payload into a URL
///
/// Both the immediate bypass response and a completed task's `result` go
/// through this one function.
///
/// # Examples
///
/// ```
/// use checkpoint_walker::url::normalize_payload;
/// use serde_json::json;
///
/// assert_eq!(normalize_payload(&json!("https://a")), Some("https://a".to_string()));
/// assert_eq!(normalize_payload(&json!({"data": "https://b"})), Some("https://b".to_string()));
/// assert_eq!(normalize_payload(&json!({"url": "https://c"})), Some("https://c".to_string()));
/// assert_eq!(normalize_payload(&json!({"other": 1})), None);
/// ```
pub fn normalize_payload(value: &Value) -> Option<String> {
    Payload::classify(value).into_url()
}
