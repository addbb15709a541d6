use async_trait::async_trait;

use crate::error::TransportError;
use crate::models::TextMessage;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod telegram;

#[cfg(any(test, feature = "test-util"))]
pub use mock::RecordingTransport;
pub use telegram::TelegramClient;

/// 消息发送通道，分发器只在准入后调用一次，不在这一层重试
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, message: &TextMessage) -> Result<(), TransportError>;
}
