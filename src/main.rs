use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tg_relay::{
    AppState, RelayError,
    cache::{CounterStore, MemoryCounterStore, RedisCounterStore},
    config::{Config, CounterBackend},
    dispatcher::{DispatchStats, Dispatcher},
    intake::IntakeAdapter,
    routes,
    transport::TelegramClient,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 队列到分发器之间的缓冲
const REQUEST_BUFFER: usize = 1024;

#[tokio::main]
async fn main() -> Result<(), RelayError> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
    tracing::info!("logger initialized");

    // 加载配置
    let config = Config::from_env()?;
    let token = CancellationToken::new();

    // 设置 Redis 客户端
    let redis_client = redis::Client::open(config.redis_url.clone())?;
    let redis_arc = Arc::new(redis_client);

    // 设置计数存储
    let store: Arc<dyn CounterStore> = match config.counter_backend {
        CounterBackend::Redis => Arc::new(
            RedisCounterStore::new(&redis_arc, config.rate_limit_window(), config.store_timeout())
                .await
                .inspect_err(|e| tracing::error!("connect counter store error: {}", e))?,
        ),
        CounterBackend::Memory => {
            let store = Arc::new(MemoryCounterStore::new(config.rate_limit_window()));
            store
                .clone()
                .spawn_purger(config.expiry_check_interval(), token.child_token());
            store
        }
    };
    store.ensure_index().await?;
    tracing::info!("counter store initialized ({:?})", config.counter_backend);

    // 设置 Telegram 客户端
    let telegram = TelegramClient::new(&config.telegram_api_url, &config.telegram_bot_token)?;
    let bot = telegram
        .get_me()
        .await
        .inspect_err(|e| tracing::error!("New Telegram bot error: {}", e))?;
    tracing::info!(
        "Telegram bot API initialized as {}",
        bot.username.as_deref().unwrap_or("<unnamed>")
    );

    // 设置分发器
    let stats = Arc::new(DispatchStats::new());
    let dispatcher = Arc::new(
        Dispatcher::new(store, Arc::new(telegram), config.rate_limit_policy())
            .with_stats(stats.clone())
            .with_max_in_flight(config.max_in_flight),
    );
    let (tx, rx) = mpsc::channel(REQUEST_BUFFER);

    let intake = IntakeAdapter::new(redis_arc.clone(), config.intake_queue.clone());
    let intake_handle = tokio::spawn(intake.run(tx, token.clone()));
    let dispatch_handle = tokio::spawn(dispatcher.serve(rx, token.clone()));

    // 健康检查接口
    let state = AppState {
        config: config.clone(),
        stats,
    };
    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Health endpoint listening on {}", addr);
    let server_token = token.clone();
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, routes::router(state))
            .with_graceful_shutdown(async move { server_token.cancelled().await })
            .await
    });

    tracing::info!("Telegram relay started");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("shutdown signal received"),
        _ = token.cancelled() => {}
    }
    token.cancel();

    if let Err(e) = intake_handle.await {
        tracing::error!("intake task error: {}", e);
    }
    if let Err(e) = dispatch_handle.await {
        tracing::error!("dispatcher task error: {}", e);
    }
    match server_handle.await {
        Ok(Err(e)) => tracing::error!("health server error: {}", e),
        Err(e) => tracing::error!("health server task error: {}", e),
        Ok(Ok(())) => {}
    }

    tracing::info!("Telegram relay stopped");
    Ok(())
}
