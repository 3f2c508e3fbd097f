//! Conversation state machines.
//!
//! Each command-triggered flow is a tagged union whose variants carry exactly
//! the data valid in that state. Handlers consume the current state, write
//! their effects to an [`Outbox`] and return the next state, where `None`
//! means the conversation has ended.

use crate::models::{Keyboard, MessageRef, MessageTarget, OutboundMessage, UserId};

pub mod add;
pub mod list;
pub mod messages;
pub mod payload;
pub mod recommend;

pub use add::AddFlow;
pub use list::ListFlow;
pub use payload::{Payload, RecommendMode};
pub use recommend::RecommendFlow;

/// The live conversation of one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversation {
    Add(AddFlow),
    List(ListFlow),
    Recommend(RecommendFlow),
}

impl Conversation {
    pub fn kind(&self) -> &'static str {
        match self {
            Conversation::Add(_) => "add",
            Conversation::List(_) => "list",
            Conversation::Recommend(_) => "recommend",
        }
    }
}

/// Effects produced while handling one inbound event
#[derive(Debug)]
pub struct Outbox {
    user_id: UserId,
    messages: Vec<OutboundMessage>,
}

impl Outbox {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            messages: Vec::new(),
        }
    }

    /// Sends a new message to the user's chat
    pub fn reply(&mut self, text: impl Into<String>, keyboard: Option<Keyboard>) {
        self.messages.push(OutboundMessage {
            target: MessageTarget::Chat(self.user_id.clone()),
            text: text.into(),
            keyboard,
        });
    }

    /// Replaces the text and keyboard of an earlier bot message
    pub fn edit(&mut self, message_ref: MessageRef, text: impl Into<String>, keyboard: Option<Keyboard>) {
        self.messages.push(OutboundMessage {
            target: MessageTarget::Edit(message_ref),
            text: text.into(),
            keyboard,
        });
    }

    pub fn messages(&self) -> &[OutboundMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<OutboundMessage> {
        self.messages
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbox_targets() {
        let mut out = Outbox::new("42");
        out.reply("hello", Some(Keyboard::command_bar()));
        out.edit(9, "edited", None);

        let messages = out.into_messages();
        assert_eq!(messages[0].target, MessageTarget::Chat("42".to_string()));
        assert_eq!(messages[1].target, MessageTarget::Edit(9));
        assert!(messages[1].keyboard.is_none());
    }
}
