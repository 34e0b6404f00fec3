use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode, Recipient};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),
}

/// Delivers one formatted message to the configured destination.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

pub struct TelegramNotifier {
    bot: Bot,
    recipient: Recipient,
}

impl TelegramNotifier {
    pub fn new(token: &str, chat_id: &str) -> Self {
        Self {
            bot: Bot::new(token),
            recipient: parse_recipient(chat_id),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        self.bot
            .send_message(self.recipient.clone(), text)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }
}

/// Numeric ids address chats directly, anything else is a public
/// channel username.
pub fn parse_recipient(chat_id: &str) -> Recipient {
    let trimmed = chat_id.trim();
    match trimmed.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) if trimmed.starts_with('@') => Recipient::ChannelUsername(trimmed.to_string()),
        Err(_) => Recipient::ChannelUsername(format!("@{trimmed}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_chat_ids_are_chat_ids() {
        assert_eq!(parse_recipient("123456"), Recipient::Id(ChatId(123456)));
        assert_eq!(
            parse_recipient(" -1001234567890 "),
            Recipient::Id(ChatId(-1001234567890))
        );
    }

    #[test]
    fn names_become_channel_usernames() {
        assert_eq!(
            parse_recipient("@ops_alerts"),
            Recipient::ChannelUsername("@ops_alerts".to_string())
        );
        assert_eq!(
            parse_recipient("ops_alerts"),
            Recipient::ChannelUsername("@ops_alerts".to_string())
        );
    }
}
