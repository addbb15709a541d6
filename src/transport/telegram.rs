use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::Transport;
use crate::error::TransportError;
use crate::models::{ChatId, ParseMode, TextMessage};

/// sendMessage 请求体
#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: ChatId,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a ParseMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    disable_web_page_preview: Option<bool>,
}

/// Bot API 通用响应
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    description: Option<String>,
    result: Option<T>,
}

/// getMe 返回的机器人信息
#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: i64,
    pub username: Option<String>,
}

/// Telegram Bot API 客户端
#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(api_url: &str, token: &str) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        })
    }

    /// 校验 token，启动时调用，失败视为致命错误
    pub async fn get_me(&self) -> Result<BotUser, TransportError> {
        let response = self
            .http
            .get(format!("{}/getMe", self.base_url))
            .send()
            .await?;
        let user: Option<BotUser> = Self::read_response(response).await?;

        user.ok_or_else(|| TransportError::Api {
            status: 200,
            description: "getMe returned no bot user".into(),
        })
    }

    async fn read_response<T>(response: reqwest::Response) -> Result<Option<T>, TransportError>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        let body: ApiResponse<T> = match response.json().await {
            Ok(body) => body,
            Err(e) if !status.is_success() => {
                return Err(TransportError::Api {
                    status: status.as_u16(),
                    description: e.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if !status.is_success() || !body.ok {
            return Err(TransportError::Api {
                status: status.as_u16(),
                description: body
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        Ok(body.result)
    }
}

#[async_trait]
impl Transport for TelegramClient {
    async fn deliver(&self, message: &TextMessage) -> Result<(), TransportError> {
        let request = SendMessageRequest {
            chat_id: message.chat_id,
            text: &message.content,
            parse_mode: message.parse_mode.as_ref(),
            disable_web_page_preview: message.disable_preview,
        };

        let response = self
            .http
            .post(format!("{}/sendMessage", self.base_url))
            .json(&request)
            .send()
            .await?;
        Self::read_response::<serde_json::Value>(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "42:secret";

    #[tokio::test]
    async fn deliver_posts_send_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{}/sendMessage", TOKEN)))
            .and(body_json(json!({
                "chat_id": -100,
                "text": "<b>hi</b>",
                "parse_mode": "HTML",
                "disable_web_page_preview": true
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": true, "result": {"message_id": 1}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = TelegramClient::new(&server.uri(), TOKEN).unwrap();
        let mut message = TextMessage::new(-100, "<b>hi</b>");
        message.parse_mode = Some(ParseMode::Html);
        message.disable_preview = Some(true);

        client.deliver(&message).await.unwrap();
    }

    #[tokio::test]
    async fn deliver_omits_unset_options() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!({"chat_id": 5, "text": "plain"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = TelegramClient::new(&server.uri(), TOKEN).unwrap();
        client
            .deliver(&TextMessage::new(5, "plain"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn api_rejection_carries_description() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "ok": false,
                "error_code": 429,
                "description": "Too Many Requests: retry after 5"
            })))
            .mount(&server)
            .await;

        let client = TelegramClient::new(&server.uri(), TOKEN).unwrap();
        let err = client
            .deliver(&TextMessage::new(5, "x"))
            .await
            .unwrap_err();

        match err {
            TransportError::Api {
                status,
                description,
            } => {
                assert_eq!(status, 429);
                assert!(description.starts_with("Too Many Requests"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn get_me_returns_bot_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/bot{}/getMe", TOKEN)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"id": 42, "is_bot": true, "username": "relay_bot"}
            })))
            .mount(&server)
            .await;

        let client = TelegramClient::new(&server.uri(), TOKEN).unwrap();
        let user = client.get_me().await.unwrap();

        assert_eq!(user.id, 42);
        assert_eq!(user.username.as_deref(), Some("relay_bot"));
    }

    #[tokio::test]
    async fn get_me_with_bad_token_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "ok": false,
                "description": "Unauthorized"
            })))
            .mount(&server)
            .await;

        let client = TelegramClient::new(&server.uri(), TOKEN).unwrap();
        assert!(matches!(
            client.get_me().await,
            Err(TransportError::Api { status: 401, .. })
        ));
    }
}
