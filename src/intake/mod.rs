// 队列消费
// 从 Redis 列表读取 JSON 命令，解码后交给分发器

use std::sync::Arc;
use std::time::Duration;

use redis::{AsyncCommands, Client as RedisClient};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::models::{OutboundRequest, TelegramCommand};

/// BLPOP 阻塞时长（秒），保证能及时观察到关闭信号
const POLL_TIMEOUT_SECS: f64 = 1.0;

/// 连接出错后的重连间隔
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// 解码一条队列消息，格式错误的消息直接丢弃
pub fn decode_command(body: &[u8]) -> Option<OutboundRequest> {
    match TelegramCommand::decode(body) {
        Ok(command) => Some(command.into()),
        Err(e) => {
            tracing::error!(
                "Json unmarshal error: {}, body: {}",
                e,
                String::from_utf8_lossy(body)
            );
            None
        }
    }
}

/// 出站命令的队列消费者
pub struct IntakeAdapter {
    redis: Arc<RedisClient>,
    queue: String,
}

impl IntakeAdapter {
    pub fn new(redis: Arc<RedisClient>, queue: impl Into<String>) -> Self {
        Self {
            redis,
            queue: queue.into(),
        }
    }

    /// 持续消费直到 `token` 取消或分发器关闭输入
    pub async fn run(self, requests: mpsc::Sender<OutboundRequest>, token: CancellationToken) {
        tracing::info!("consuming commands from queue {}", self.queue);

        while !token.is_cancelled() {
            let mut conn = match self.redis.get_multiplexed_async_connection().await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::error!("connect to command queue error: {}", e);
                    if !Self::pause(&token).await {
                        break;
                    }
                    continue;
                }
            };

            loop {
                let popped = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    popped = conn.blpop::<_, Option<(String, Vec<u8>)>>(&self.queue, POLL_TIMEOUT_SECS) => popped,
                };

                let body = match popped {
                    Ok(Some((_, body))) => body,
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::error!("consume command error: {}", e);
                        break;
                    }
                };

                let Some(request) = decode_command(&body) else {
                    continue;
                };
                let sent = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    sent = requests.send(request) => sent,
                };
                if sent.is_err() {
                    tracing::info!("dispatcher closed, stop consuming");
                    return;
                }
            }

            if token.is_cancelled() || !Self::pause(&token).await {
                break;
            }
        }

        tracing::info!("command queue consumer stopped");
    }

    /// 等待重连，关闭时返回 false
    async fn pause(token: &CancellationToken) -> bool {
        tokio::select! {
            _ = token.cancelled() => false,
            _ = tokio::time::sleep(RECONNECT_DELAY) => true,
        }
    }
}
