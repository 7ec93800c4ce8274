//! Provider-neutral transcript.
//!
//! One loop execution owns a `Vec<Turn>` built from persisted history plus
//! the new user message. Adapters translate turns into their wire shapes;
//! the loop only appends.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use paydesk_core::domain::chat::{ChatRole, HistoryMessage};

/// An operation the model asked to run. Arguments are untrusted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self { id: id.into(), name: name.into(), arguments }
    }
}

/// Outcome of one request, keyed back to the call that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub call_id: String,
    pub name: String,
    pub result: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Turn {
    User(String),
    /// A model reply. `raw` holds the provider's own encoding of the reply
    /// when it must be replayed verbatim on the next round.
    Model {
        text: String,
        tool_calls: Vec<ToolCallRequest>,
        raw: Option<Value>,
    },
    /// Every result of one dispatch round, in request order.
    ToolResults(Vec<ToolResponse>),
}

impl Turn {
    pub fn model_text(text: impl Into<String>) -> Self {
        Self::Model { text: text.into(), tool_calls: Vec::new(), raw: None }
    }
}

/// Seeds a transcript from prior history and the new message.
pub fn initial_transcript(history: &[HistoryMessage], message: &str) -> Vec<Turn> {
    let mut transcript: Vec<Turn> = history
        .iter()
        .map(|entry| match entry.role {
            ChatRole::User => Turn::User(entry.content.clone()),
            ChatRole::Assistant => Turn::model_text(entry.content.clone()),
        })
        .collect();
    transcript.push(Turn::User(message.to_string()));
    transcript
}

#[cfg(test)]
mod tests {
    use paydesk_core::domain::chat::HistoryMessage;

    use super::{initial_transcript, Turn};

    #[test]
    fn history_precedes_the_new_message() {
        let history = vec![
            HistoryMessage::user("list my customers"),
            HistoryMessage::assistant("You have no customers yet."),
        ];

        let transcript = initial_transcript(&history, "create one for taro@example.com");

        assert_eq!(
            transcript,
            vec![
                Turn::User("list my customers".to_string()),
                Turn::model_text("You have no customers yet."),
                Turn::User("create one for taro@example.com".to_string()),
            ]
        );
    }

    #[test]
    fn empty_history_yields_a_single_user_turn() {
        assert_eq!(initial_transcript(&[], "hello"), vec![Turn::User("hello".to_string())]);
    }
}
