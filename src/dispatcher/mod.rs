// 限流分发
// 每个请求一个任务，按会话统计窗口内的投递数决定立即发送、等待重试或放弃

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::cache::CounterStore;
use crate::config::RateLimitPolicy;
use crate::models::{ChatId, OutboundRequest, TextMessage};
use crate::transport::Transport;

mod stats;

pub use stats::{DispatchStats, StatsSnapshot};

/// 单个请求的最终结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 已发送
    Delivered,
    /// 重试次数用尽，丢弃
    Abandoned { retries: u32 },
    /// 发送通道返回错误
    Failed,
    /// 关闭时仍在等待
    Cancelled,
    /// 不支持的请求种类
    Ignored,
}

enum Admission {
    Granted(u64),
    Denied,
    Cancelled,
}

/// 限流分发器
///
/// 准入是乐观的：查询计数和写入记录之间不加锁，同一会话的并发请求
/// 可能同时看到低于上限的计数，超出部分不会多于并发请求数。
pub struct Dispatcher {
    store: Arc<dyn CounterStore>,
    transport: Arc<dyn Transport>,
    policy: RateLimitPolicy,
    stats: Arc<DispatchStats>,
    in_flight_limit: Option<Arc<Semaphore>>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn CounterStore>,
        transport: Arc<dyn Transport>,
        policy: RateLimitPolicy,
    ) -> Self {
        Self {
            store,
            transport,
            policy,
            stats: Arc::new(DispatchStats::new()),
            in_flight_limit: None,
        }
    }

    /// 共享外部的计数器，供健康检查接口读取
    pub fn with_stats(mut self, stats: Arc<DispatchStats>) -> Self {
        self.stats = stats;
        self
    }

    /// 限制同时处理的请求数，`None` 表示不限制
    pub fn with_max_in_flight(mut self, limit: Option<usize>) -> Self {
        self.in_flight_limit = limit.map(|n| Arc::new(Semaphore::new(n)));
        self
    }

    pub fn stats(&self) -> Arc<DispatchStats> {
        self.stats.clone()
    }

    /// 消费请求流，为每个请求启动独立任务
    ///
    /// `token` 取消或请求流关闭后停止接收，等待已启动的任务结束后返回。
    pub async fn serve(
        self: Arc<Self>,
        mut requests: mpsc::Receiver<OutboundRequest>,
        token: CancellationToken,
    ) {
        tracing::info!("dispatcher started");
        let tracker = TaskTracker::new();

        loop {
            let request = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                request = requests.recv() => match request {
                    Some(request) => request,
                    None => {
                        tracing::info!("request stream closed");
                        break;
                    }
                },
            };

            // 开启并发上限时在这里阻塞，形成对上游的背压
            let permit = match &self.in_flight_limit {
                Some(semaphore) => tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    permit = semaphore.clone().acquire_owned() => match permit {
                        Ok(permit) => Some(permit),
                        Err(_) => break,
                    },
                },
                None => None,
            };

            let dispatcher = self.clone();
            let task_token = token.clone();
            self.stats.task_started();
            tracker.spawn(async move {
                let outcome = dispatcher.dispatch(request, &task_token).await;
                dispatcher.stats.task_finished(&outcome);
                drop(permit);
            });
        }

        tracker.close();
        tracing::info!("waiting for {} in-flight requests", tracker.len());
        tracker.wait().await;
        tracing::info!("dispatcher stopped");
    }

    /// 处理单个请求，所有结果都在本地终结，不向上传播
    pub async fn dispatch(
        &self,
        request: OutboundRequest,
        token: &CancellationToken,
    ) -> DispatchOutcome {
        match request {
            OutboundRequest::Message(message) => self.send_message(&message, token).await,
            OutboundRequest::Unsupported { kind, chat_id } => {
                tracing::debug!("ignore unsupported request `{}` for chat {}", kind, chat_id);
                DispatchOutcome::Ignored
            }
        }
    }

    async fn send_message(
        &self,
        message: &TextMessage,
        token: &CancellationToken,
    ) -> DispatchOutcome {
        let chat_id = message.chat_id;

        match self.admit(chat_id, token).await {
            Admission::Granted(count) => return self.deliver(message, count).await,
            Admission::Cancelled => return DispatchOutcome::Cancelled,
            Admission::Denied => {}
        }

        let mut retries = 0;
        while retries < self.policy.max_retries {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!("shutdown while waiting to send to chat {}", chat_id);
                    return DispatchOutcome::Cancelled;
                }
                _ = tokio::time::sleep(self.policy.retry_interval) => {}
            }

            match self.admit(chat_id, token).await {
                Admission::Granted(count) => return self.deliver(message, count).await,
                Admission::Cancelled => return DispatchOutcome::Cancelled,
                Admission::Denied => retries += 1,
            }
        }

        tracing::warn!(
            "chat {} still over {} messages per {}s after {} retries, message dropped",
            chat_id,
            self.policy.limit_per_window,
            self.policy.window.as_secs(),
            retries
        );
        DispatchOutcome::Abandoned { retries }
    }

    /// 查询失败等同于未准入，不能因为存储故障绕过限流
    async fn admit(&self, chat_id: ChatId, token: &CancellationToken) -> Admission {
        let count = tokio::select! {
            biased;
            _ = token.cancelled() => return Admission::Cancelled,
            count = self.store.count_in_window(chat_id) => count,
        };

        match count {
            Ok(count) if count < self.policy.limit_per_window => Admission::Granted(count),
            Ok(count) => {
                tracing::debug!("chat {} has {} messages in window, waiting", chat_id, count);
                Admission::Denied
            }
            Err(e) => {
                tracing::warn!("count deliveries for chat {} error: {}", chat_id, e);
                Admission::Denied
            }
        }
    }

    async fn deliver(&self, message: &TextMessage, count: u64) -> DispatchOutcome {
        let chat_id = message.chat_id;
        tracing::info!("sent {} messages to chat {}", count, chat_id);

        if let Err(e) = self.transport.deliver(message).await {
            tracing::error!("Telegram send message to chat {} error: {}", chat_id, e);
            return DispatchOutcome::Failed;
        }

        // 消息已经发出，记录失败只影响之后的计数
        if let Err(e) = self.store.record_delivery(chat_id).await {
            tracing::warn!("record delivery for chat {} error: {}", chat_id, e);
        }
        DispatchOutcome::Delivered
    }
}
