pub mod command;
pub mod message;

pub use command::TelegramCommand;
pub use message::{ChatId, OutboundRequest, ParseMode, TextMessage};
