use serde::{Deserialize, Deserializer, Serialize};

use super::message::{ChatId, OutboundRequest, ParseMode, TextMessage};

/// 文本消息的命令种类，缺省即为文本消息
pub const MESSAGE_KIND: &str = "message";

fn default_kind() -> String {
    MESSAGE_KIND.to_string()
}

/// 空字符串等同于未设置
fn parse_mode_or_none<'de, D>(deserializer: D) -> Result<Option<ParseMode>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|mode| !mode.trim().is_empty()).map(ParseMode::from))
}

/// 队列中的出站命令
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramCommand {
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(alias = "chat_id")]
    pub chat_id: ChatId,
    #[serde(default)]
    pub content: String,
    #[serde(
        alias = "parse_mode",
        default,
        deserialize_with = "parse_mode_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub parse_mode: Option<ParseMode>,
    #[serde(alias = "disable_preview", default, skip_serializing_if = "Option::is_none")]
    pub disable_preview: Option<bool>,
}

impl TelegramCommand {
    pub fn decode(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

impl From<TelegramCommand> for OutboundRequest {
    fn from(command: TelegramCommand) -> Self {
        // 未知种类不报错，交给分发器忽略
        if command.kind != MESSAGE_KIND {
            return OutboundRequest::Unsupported {
                kind: command.kind,
                chat_id: command.chat_id,
            };
        }

        OutboundRequest::Message(TextMessage {
            chat_id: command.chat_id,
            content: command.content,
            parse_mode: command.parse_mode,
            disable_preview: command.disable_preview,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_message_without_type() {
        let command =
            TelegramCommand::decode(br#"{"chatId": -1001234, "content": "hello"}"#).unwrap();

        assert_eq!(
            OutboundRequest::from(command),
            OutboundRequest::Message(TextMessage::new(-1001234, "hello"))
        );
    }

    #[test]
    fn decodes_formatting_options() {
        let command = TelegramCommand::decode(
            br#"{"type": "message", "chat_id": 7, "content": "*hi*", "parseMode": "MarkdownV2", "disable_preview": true}"#,
        )
        .unwrap();

        let OutboundRequest::Message(message) = OutboundRequest::from(command) else {
            panic!("expected a text message");
        };
        assert_eq!(message.chat_id, ChatId(7));
        assert_eq!(message.parse_mode, Some(ParseMode::MarkdownV2));
        assert_eq!(message.disable_preview, Some(true));
    }

    #[test]
    fn unknown_type_becomes_unsupported() {
        let command =
            TelegramCommand::decode(br#"{"type": "photo", "chatId": 9, "photo": "x.png"}"#)
                .unwrap();

        assert_eq!(
            OutboundRequest::from(command),
            OutboundRequest::Unsupported {
                kind: "photo".into(),
                chat_id: ChatId(9),
            }
        );
    }

    #[test]
    fn parse_mode_spellings_are_not_case_sensitive() {
        let command =
            TelegramCommand::decode(br#"{"chatId": 1, "content": "x", "parseMode": "Markdownv2"}"#)
                .unwrap();

        assert_eq!(command.parse_mode, Some(ParseMode::MarkdownV2));
    }

    #[test]
    fn missing_chat_id_is_rejected() {
        assert!(TelegramCommand::decode(br#"{"content": "orphan"}"#).is_err());
        assert!(TelegramCommand::decode(b"not json").is_err());
    }
}
