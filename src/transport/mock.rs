//! 测试用的发送通道，记录每次投递

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::Transport;
use crate::error::TransportError;
use crate::models::{ChatId, TextMessage};

/// 记录所有投递的发送通道，可切换为总是失败
#[derive(Clone, Default)]
pub struct RecordingTransport {
    delivered: Arc<Mutex<Vec<TextMessage>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 之后的投递全部返回错误
    pub fn fail_deliveries(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn delivered(&self) -> Vec<TextMessage> {
        self.delivered.lock().await.clone()
    }

    pub async fn delivered_to(&self, chat_id: ChatId) -> usize {
        self.delivered
            .lock()
            .await
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .count()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn deliver(&self, message: &TextMessage) -> Result<(), TransportError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Api {
                status: 500,
                description: "mock transport failure".into(),
            });
        }
        self.delivered.lock().await.push(message.clone());
        Ok(())
    }
}
