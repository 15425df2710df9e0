// Standardized chat messages, as produced by the chat-format parsers
use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Speaker role of a message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
    System,
    /// Anything else a parser produced ("tool", "unknown", ...)
    Other(CustomRole),
}

/// Normalized name of a non-standard role.
///
/// Only built through `Role::from`, so it is always trimmed, lowercase, non-empty
/// and never one of the standard role names or their aliases.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomRole(String);

impl CustomRole {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Other(custom) => custom.as_str(),
        }
    }

    /// "User", "Assistant", ...
    pub fn title(&self) -> String {
        let s = self.as_str();
        let mut chars = s.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => "Unknown".to_string(),
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "user" | "human" => Role::User,
            "assistant" | "ai" | "bot" => Role::Assistant,
            "system" => Role::System,
            "" => Role::Other(CustomRole("unknown".to_string())),
            other => Role::Other(CustomRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Role::from(s.as_str()))
    }
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, deserialize_with = "lenient_timestamp", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

fn default_role() -> Role {
    Role::from("")
}

/// ISO 8601 timestamps; anything unparseable is dropped instead of failing the whole list
fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<FixedOffset>>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(s)) => match parse_timestamp(&s) {
            Some(ts) => Some(ts),
            None => {
                tracing::warn!(timestamp = %s, "Ignoring unparseable message timestamp");
                None
            }
        },
        _ => None,
    })
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s.trim()).ok()
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<FixedOffset>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Parse a standardized message list: a JSON array or `{"messages": [...]}`
pub fn parse_messages(json: &str) -> Result<Vec<Message>> {
    let value: Value = serde_json::from_str(json).context("Messages file is not valid JSON")?;
    let list = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => match map.remove("messages") {
            Some(list @ Value::Array(_)) => list,
            _ => bail!("Expected a JSON array of messages or an object with a `messages` array"),
        },
        _ => bail!("Expected a JSON array of messages or an object with a `messages` array"),
    };
    let messages: Vec<Message> =
        serde_json::from_value(list).context("Malformed message in messages list")?;
    Ok(messages)
}

/// Read a standardized message list from disk
pub fn load_messages(path: &Path) -> Result<Vec<Message>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read messages file: {}", path.display()))?;
    parse_messages(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_array() {
        let messages = parse_messages(
            r#"[
                {"role": "user", "content": "Hello", "timestamp": "2024-12-02T10:00:00Z"},
                {"role": "assistant", "content": "Hi there", "model": "x"}
            ]"#,
        )
        .unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert!(messages[0].timestamp.is_some());
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].metadata.get("model"), None);
    }

    #[test]
    fn test_parse_wrapped_object_and_metadata() {
        let messages = parse_messages(
            r#"{"messages": [{"role": "system", "content": "Be nice", "metadata": {"source": "md"}}]}"#,
        )
        .unwrap();

        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].metadata["source"], Value::String("md".to_string()));
    }

    #[test]
    fn test_unknown_role_and_bad_timestamp() {
        let messages =
            parse_messages(r#"[{"role": "tool", "content": "x", "timestamp": "yesterday"}]"#).unwrap();

        assert_eq!(messages[0].role, Role::from("tool"));
        assert_eq!(messages[0].role.title(), "Tool");
        assert!(messages[0].timestamp.is_none());
    }

    #[test]
    fn test_role_normalized_once() {
        for raw in ["Tool", " human ", "", "AI", "System", "function_call"] {
            let role = Role::from(raw);
            let json = serde_json::to_string(&role).unwrap();
            let back: Role = serde_json::from_str(&json).unwrap();
            assert_eq!(back, role, "role {:?} changed after serde", raw);
        }
        assert_eq!(Role::from("Tool").as_str(), "tool");
        assert_eq!(Role::from(" human "), Role::User);
        assert_eq!(Role::from("").as_str(), "unknown");
    }

    #[test]
    fn test_with_timestamp() {
        let ts = parse_timestamp("2024-12-02T10:00:00+09:00").unwrap();
        let message = Message::assistant("Hi").with_timestamp(ts);

        let json = serde_json::to_string(&message).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.timestamp, Some(ts));
        assert_eq!(back, message);
    }

    #[test]
    fn test_rejects_non_list() {
        assert!(parse_messages(r#"{"foo": 1}"#).is_err());
        assert!(parse_messages("not json").is_err());
    }
}
