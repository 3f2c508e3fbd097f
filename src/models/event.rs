use serde::{Deserialize, Serialize};

use super::UserId;

/// Transport reference to a message previously sent by the bot
pub type MessageRef = i64;

/// Event delivered by the chat transport
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// A slash command such as `/add`; `name` carries no leading slash
    Command {
        name: String,
        user_id: UserId,
        #[serde(default)]
        text: String,
    },
    /// Free text typed by the user
    Text { user_id: UserId, text: String },
    /// Tap on an inline button carrying a callback payload
    ButtonTap {
        user_id: UserId,
        payload: String,
        message_ref: MessageRef,
    },
}

impl InboundEvent {
    pub fn command(name: &str, user_id: &str) -> Self {
        Self::Command {
            name: name.trim_start_matches('/').to_string(),
            user_id: user_id.to_string(),
            text: String::new(),
        }
    }

    pub fn text(user_id: &str, text: &str) -> Self {
        Self::Text {
            user_id: user_id.to_string(),
            text: text.to_string(),
        }
    }

    pub fn button_tap(user_id: &str, payload: &str, message_ref: MessageRef) -> Self {
        Self::ButtonTap {
            user_id: user_id.to_string(),
            payload: payload.to_string(),
            message_ref,
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            Self::Command { user_id, .. }
            | Self::Text { user_id, .. }
            | Self::ButtonTap { user_id, .. } => user_id,
        }
    }
}

/// Where an outbound message goes: a new message in the user's chat,
/// or an in-place edit of an earlier bot message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageTarget {
    Chat(UserId),
    Edit(MessageRef),
}

/// Message emitted by the conversation engine for the transport to deliver
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboundMessage {
    pub target: MessageTarget,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyboard: Option<Keyboard>,
}

/// Keyboard attached to an outbound message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Keyboard {
    /// Persistent shortcut bar of commands
    CommandBar { rows: Vec<Vec<String>> },
    /// Buttons attached to one message
    Inline { rows: Vec<Vec<InlineButton>> },
}

impl Keyboard {
    /// The shortcut bar shown under every top-level reply
    pub fn command_bar() -> Self {
        Self::CommandBar {
            rows: vec![
                vec!["/add".to_string(), "/list".to_string(), "/recommend".to_string()],
                vec!["/help".to_string()],
            ],
        }
    }

    pub fn inline(rows: Vec<Vec<InlineButton>>) -> Self {
        Self::Inline { rows }
    }

    /// One button per row
    pub fn column(buttons: Vec<InlineButton>) -> Self {
        Self::Inline {
            rows: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }

    /// Every button across all rows, in display order
    pub fn buttons(&self) -> Vec<&InlineButton> {
        match self {
            Self::CommandBar { .. } => Vec::new(),
            Self::Inline { rows } => rows.iter().flatten().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    #[serde(flatten)]
    pub action: ButtonAction,
}

/// What a button does when tapped
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    /// Opaque payload routed back through the bot
    Callback(String),
    /// External link, opens outside the conversation
    Url(String),
}

impl InlineButton {
    pub fn callback(label: impl Into<String>, payload: impl ToString) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Callback(payload.to_string()),
        }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Url(url.into()),
        }
    }

    pub fn payload(&self) -> Option<&str> {
        match &self.action {
            ButtonAction::Callback(payload) => Some(payload),
            ButtonAction::Url(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_event_deserialization() {
        let json = r#"{"type": "button_tap", "user_id": "42", "payload": "by_film", "message_ref": 7}"#;
        let event: InboundEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, InboundEvent::button_tap("42", "by_film", 7));
        assert_eq!(event.user_id(), "42");
    }

    #[test]
    fn test_command_without_text() {
        let json = r#"{"type": "command", "name": "add", "user_id": "42"}"#;
        let event: InboundEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, InboundEvent::command("/add", "42"));
    }

    #[test]
    fn test_outbound_message_serialization() {
        let message = OutboundMessage {
            target: MessageTarget::Edit(7),
            text: "Pick one".to_string(),
            keyboard: Some(Keyboard::inline(vec![vec![
                InlineButton::callback("Dune", "0"),
                InlineButton::url("TMDB", "https://www.themoviedb.org/movie/1"),
            ]])),
        };

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["target"]["edit"], 7);
        assert_eq!(json["keyboard"]["kind"], "inline");
        assert_eq!(json["keyboard"]["rows"][0][0]["callback"], "0");
        assert_eq!(
            json["keyboard"]["rows"][0][1]["url"],
            "https://www.themoviedb.org/movie/1"
        );
    }

    #[test]
    fn test_message_without_keyboard_omits_field() {
        let message = OutboundMessage {
            target: MessageTarget::Chat("42".to_string()),
            text: "Hi".to_string(),
            keyboard: None,
        };
        let json = serde_json::to_value(&message).unwrap();
        assert!(json.get("keyboard").is_none());
        assert_eq!(json["target"]["chat"], "42");
    }
}
