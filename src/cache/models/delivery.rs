use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ChatId;

/// 投递记录，只保存会话 ID 和创建时间，不保存消息内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRecord {
    pub id: String,
    pub chat_id: ChatId,
    pub created_at: DateTime<Utc>,
}

impl DeliveryRecord {
    pub fn new(chat_id: ChatId) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            chat_id,
            created_at: Utc::now(),
        }
    }

    pub fn score(&self) -> i64 {
        self.created_at.timestamp_millis()
    }
}

/// 过期索引描述
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ExpiryIndex {
    pub key: String,
    pub expire_after_secs: u64,
}

impl ExpiryIndex {
    pub fn on_created_at(expire_after_secs: u64) -> Self {
        Self {
            key: "createdAt".to_string(),
            expire_after_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_records_get_distinct_ids() {
        let a = DeliveryRecord::new(ChatId(1));
        let b = DeliveryRecord::new(ChatId(1));

        assert_ne!(a.id, b.id);
        assert_eq!(a.score(), a.created_at.timestamp_millis());
    }

    #[test]
    fn index_descriptor_serializes_like_stored_form() {
        let index = ExpiryIndex::on_created_at(120);
        let json = serde_json::to_string(&index).unwrap();

        assert_eq!(json, r#"{"key":"createdAt","expire_after_secs":120}"#);
    }
}
