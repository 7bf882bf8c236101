use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatLog {
    pub room_id: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub message_id: String,
    pub user_id: String,
    pub user_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub message_type: ChatMessageType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatMessageType {
    Public,
    System,
}

impl ChatLog {
    pub fn new(room_id: String) -> Self {
        ChatLog {
            room_id,
            messages: Vec::new(),
        }
    }

    /// Append-only; arrival order is the order of the log.
    pub fn add_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn add_system_message(&mut self, content: String) {
        self.add_message(ChatMessage::new(
            "system".to_string(),
            "System".to_string(),
            content,
            ChatMessageType::System,
        ));
    }

    /// Last `n` messages in chronological order, as handed to new joiners.
    pub fn recent(&self, n: usize) -> Vec<ChatMessage> {
        let start = self.messages.len().saturating_sub(n);
        self.messages[start..].to_vec()
    }
}

impl ChatMessage {
    pub fn new(
        user_id: String,
        user_name: String,
        content: String,
        message_type: ChatMessageType,
    ) -> Self {
        ChatMessage {
            message_id: uuid::Uuid::new_v4().to_string(),
            user_id,
            user_name,
            content,
            timestamp: Utc::now(),
            message_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_keeps_chronological_order() {
        let mut log = ChatLog::new("r1".to_string());
        for i in 0..10 {
            log.add_message(ChatMessage::new(
                "u1".into(),
                "Ann".into(),
                format!("msg {i}"),
                ChatMessageType::Public,
            ));
        }
        let tail = log.recent(3);
        assert_eq!(tail.len(), 3);
        assert_eq!(tail[0].content, "msg 7");
        assert_eq!(tail[2].content, "msg 9");
    }

    #[test]
    fn recent_handles_short_logs() {
        let mut log = ChatLog::new("r1".to_string());
        log.add_system_message("game started".into());
        assert_eq!(log.recent(50).len(), 1);
    }
}
