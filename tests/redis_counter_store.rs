//! 需要真实 Redis，未设置 REDIS_URL 时跳过

use std::env;
use std::time::Duration;

use redis::AsyncCommands;
use tg_relay::cache::keys::{DELIVERY_INDEX_KEY, EXPIRE_INDEX_NAME};
use tg_relay::cache::{CounterStore, ExpiryIndex, RedisCounterStore};
use tg_relay::models::ChatId;

fn redis_url() -> Option<String> {
    env::var("REDIS_URL").ok()
}

fn unique_chat() -> ChatId {
    // 取 48 位随机数，避免和真实会话冲突
    ChatId(-((uuid::Uuid::new_v4().as_u128() >> 80) as i64) - 1)
}

async fn store(url: &str, window: Duration) -> RedisCounterStore {
    let client = redis::Client::open(url).unwrap();
    RedisCounterStore::new(&client, window, Duration::from_secs(2))
        .await
        .unwrap()
}

#[tokio::test]
async fn records_are_counted_per_chat() {
    let Some(url) = redis_url() else {
        eprintln!("REDIS_URL not set, skipping");
        return;
    };
    let store = store(&url, Duration::from_secs(60)).await;
    let (a, b) = (unique_chat(), unique_chat());

    assert_eq!(store.count_in_window(a).await.unwrap(), 0);
    store.record_delivery(a).await.unwrap();
    store.record_delivery(a).await.unwrap();

    assert_eq!(store.count_in_window(a).await.unwrap(), 2);
    assert_eq!(store.count_in_window(b).await.unwrap(), 0);
}

#[tokio::test]
async fn records_older_than_window_are_not_counted() {
    let Some(url) = redis_url() else {
        eprintln!("REDIS_URL not set, skipping");
        return;
    };
    let store = store(&url, Duration::from_secs(1)).await;
    let chat = unique_chat();

    store.record_delivery(chat).await.unwrap();
    assert_eq!(store.count_in_window(chat).await.unwrap(), 1);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(store.count_in_window(chat).await.unwrap(), 0);
}

async fn stored_index(client: &redis::Client) -> Option<ExpiryIndex> {
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    let raw: Option<String> = conn.hget(DELIVERY_INDEX_KEY, EXPIRE_INDEX_NAME).await.unwrap();
    raw.map(|raw| serde_json::from_str(&raw).unwrap())
}

// 索引是全局的，创建和保留两种情况放在同一个测试里顺序执行
#[tokio::test]
async fn ensure_index_creates_once_and_keeps_existing() {
    let Some(url) = redis_url() else {
        eprintln!("REDIS_URL not set, skipping");
        return;
    };
    let client = redis::Client::open(url.as_str()).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    let previous: Option<String> = conn.hget(DELIVERY_INDEX_KEY, EXPIRE_INDEX_NAME).await.unwrap();

    let _: () = conn.hdel(DELIVERY_INDEX_KEY, EXPIRE_INDEX_NAME).await.unwrap();
    let store = store(&url, Duration::from_secs(60)).await;
    store.ensure_index().await.unwrap();
    store.ensure_index().await.unwrap();
    assert_eq!(
        stored_index(&client).await,
        Some(ExpiryIndex::on_created_at(60))
    );

    // 已有索引的过期时间不同，也保持原样
    let seeded = serde_json::to_string(&ExpiryIndex::on_created_at(7)).unwrap();
    let _: () = conn.hset(DELIVERY_INDEX_KEY, EXPIRE_INDEX_NAME, seeded).await.unwrap();
    store.ensure_index().await.unwrap();
    assert_eq!(
        stored_index(&client).await,
        Some(ExpiryIndex::on_created_at(7))
    );

    match previous {
        Some(raw) => {
            let _: () = conn.hset(DELIVERY_INDEX_KEY, EXPIRE_INDEX_NAME, raw).await.unwrap();
        }
        None => {
            let _: () = conn.hdel(DELIVERY_INDEX_KEY, EXPIRE_INDEX_NAME).await.unwrap();
        }
    }
}
