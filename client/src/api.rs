use log::{debug, warn};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::{
    AuthResponse, EditTextRequest, HistoryAudio, LoginRequest, PaymentHistoryItem,
    RegisterRequest, RemakeAudioRequest, RetranslateRequest, UpdateApiKeyRequest,
    UsageHistoryItem, User,
};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("not authorized, please log in again")]
    Unauthorized,

    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },
}

/// Authenticated client for the job server's HTTP API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub async fn register(&self, body: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.send(self.request(Method::POST, "/api/register").json(body))
            .await
    }

    pub async fn login(&self, body: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.send(self.request(Method::POST, "/api/login").json(body))
            .await
    }

    pub async fn profile(&self) -> Result<User, ApiError> {
        self.send(self.request(Method::GET, "/api/profile")).await
    }

    pub async fn update_api_key(&self, api_key: &str) -> Result<(), ApiError> {
        let body = UpdateApiKeyRequest {
            api_key: api_key.to_string(),
        };
        self.send_empty(self.request(Method::POST, "/api/update-api-key").json(&body))
            .await
    }

    pub async fn history(&self) -> Result<Vec<UsageHistoryItem>, ApiError> {
        self.send(self.request(Method::GET, "/api/history")).await
    }

    pub async fn history_audio(&self, history_id: &str) -> Result<HistoryAudio, ApiError> {
        let path = format!("/api/history/{}/audio", history_id);
        self.send(self.request(Method::GET, &path)).await
    }

    pub async fn payments(&self) -> Result<Vec<PaymentHistoryItem>, ApiError> {
        self.send(self.request(Method::GET, "/api/payments")).await
    }

    pub async fn edit_text(&self, body: &EditTextRequest) -> Result<UsageHistoryItem, ApiError> {
        self.post("/api/edit-text", body).await
    }

    pub async fn retranslate(
        &self,
        body: &RetranslateRequest,
    ) -> Result<UsageHistoryItem, ApiError> {
        self.post("/api/retranslate", body).await
    }

    pub async fn remake_audio(&self, body: &RemakeAudioRequest) -> Result<HistoryAudio, ApiError> {
        self.post("/api/remake-audio", body).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    /// Every request carries the bearer token when one is set.
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = check(builder.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        check(builder.send().await?).await?;
        Ok(())
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        warn!("Server rejected the stored credential");
        return Err(ApiError::Unauthorized);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        message: error_message(status, &body),
    })
}

/// Pulls `error` or `message` out of a JSON error body.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["error", "message"]
                .iter()
                .find_map(|key| value.get(key).and_then(|v| v.as_str()).map(str::to_string))
        })
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty() && trimmed.len() <= 200).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        })
}
