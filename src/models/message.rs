use std::fmt;

use serde::{Deserialize, Serialize};

/// Telegram 会话 ID，也是限流的键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        ChatId(id)
    }
}

/// 消息渲染模式
///
/// 常用取值之外的写法原样转发，由 Telegram 决定是否接受。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParseMode {
    Markdown,
    MarkdownV2,
    Html,
    Other(String),
}

impl From<String> for ParseMode {
    fn from(raw: String) -> Self {
        if raw.eq_ignore_ascii_case("markdown") {
            ParseMode::Markdown
        } else if raw.eq_ignore_ascii_case("markdownv2") {
            ParseMode::MarkdownV2
        } else if raw.eq_ignore_ascii_case("html") {
            ParseMode::Html
        } else {
            ParseMode::Other(raw)
        }
    }
}

impl From<ParseMode> for String {
    fn from(mode: ParseMode) -> Self {
        match mode {
            ParseMode::Markdown => "Markdown".to_string(),
            ParseMode::MarkdownV2 => "MarkdownV2".to_string(),
            ParseMode::Html => "HTML".to_string(),
            ParseMode::Other(raw) => raw,
        }
    }
}

/// 文本消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMessage {
    pub chat_id: ChatId,
    pub content: String,
    pub parse_mode: Option<ParseMode>,
    pub disable_preview: Option<bool>,
}

impl TextMessage {
    pub fn new(chat_id: impl Into<ChatId>, content: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            content: content.into(),
            parse_mode: None,
            disable_preview: None,
        }
    }
}

/// 待发送的请求，目前只处理文本消息，其余种类直接忽略
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundRequest {
    Message(TextMessage),
    Unsupported { kind: String, chat_id: ChatId },
}

impl From<TextMessage> for OutboundRequest {
    fn from(message: TextMessage) -> Self {
        OutboundRequest::Message(message)
    }
}
