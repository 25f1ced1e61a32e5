use anyhow::Result;
use log::{info, warn};
use shared::{
    AuthResponse, Entitlement, HistoryAudio, LoginRequest, PaymentHistoryItem, RegisterRequest,
    UsageHistoryItem, User,
};

use crate::api::{ApiClient, ApiError};
use crate::credentials::CredentialStore;

/// Signed-in user context shared by every command.
///
/// Created once at start-up from the stored credential. Removing the
/// credential (logout, or the server rejecting it) tears the whole state
/// down: the token, the cached profile and the cached history all go.
pub struct AppState {
    api: ApiClient,
    credentials: CredentialStore,
    user: Option<User>,
    history: Option<Vec<UsageHistoryItem>>,
    openai_api_key: Option<String>,
}

impl AppState {
    pub fn new(mut api: ApiClient, credentials: CredentialStore) -> Result<Self> {
        let token = credentials.load()?;
        if token.is_some() {
            info!("Using stored credential");
        }
        api.set_token(token);

        Ok(Self {
            api,
            credentials,
            user: None,
            history: None,
            openai_api_key: None,
        })
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn token(&self) -> Option<&str> {
        self.api.token()
    }

    pub fn set_openai_api_key(&mut self, key: Option<String>) {
        self.openai_api_key = key.filter(|k| !k.trim().is_empty());
    }

    pub fn openai_api_key(&self) -> Option<&str> {
        self.openai_api_key.as_deref()
    }

    /// Submission rights of the current user, if signed in with a loaded profile.
    pub fn entitlement(&self) -> Option<Entitlement> {
        let token = self.token()?;
        let user = self.user.as_ref()?;
        Some(Entitlement {
            token: token.to_string(),
            has_stored_api_key: user.is_api_key_available,
        })
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<&User> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self.api.login(&body).await?;
        self.sign_in(response)
    }

    pub async fn register(&mut self, name: &str, email: &str, password: &str) -> Result<&User> {
        let body = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self.api.register(&body).await?;
        self.sign_in(response)
    }

    fn sign_in(&mut self, response: AuthResponse) -> Result<&User> {
        self.credentials.store(&response.token)?;
        self.api.set_token(Some(response.token));
        self.history = None;
        info!("Signed in as {}", response.user.email);
        Ok(self.user.insert(response.user))
    }

    pub fn logout(&mut self) -> Result<()> {
        self.teardown()
    }

    /// Drops the credential and everything cached on its behalf.
    pub fn teardown(&mut self) -> Result<()> {
        self.api.set_token(None);
        self.user = None;
        self.history = None;
        self.credentials.clear()
    }

    /// Fetches the profile when a credential is present.
    pub async fn refresh_profile(&mut self) -> Result<Option<&User>> {
        if self.token().is_none() {
            return Ok(None);
        }
        let result = self.api.profile().await;
        let user = self.absorb(result)?;
        Ok(Some(self.user.insert(user)))
    }

    pub async fn history(&mut self) -> Result<&[UsageHistoryItem]> {
        if self.history.is_none() {
            let result = self.api.history().await;
            self.history = Some(self.absorb(result)?);
        }
        Ok(self.history.as_deref().unwrap_or_default())
    }

    /// Forgets cached profile and history after something changed server-side.
    pub fn invalidate(&mut self) {
        self.user = None;
        self.history = None;
    }

    pub async fn payments(&mut self) -> Result<Vec<PaymentHistoryItem>> {
        let result = self.api.payments().await;
        self.absorb(result)
    }

    pub async fn history_audio(&mut self, history_id: &str) -> Result<HistoryAudio> {
        let result = self.api.history_audio(history_id).await;
        self.absorb(result)
    }

    pub async fn update_api_key(&mut self, api_key: &str) -> Result<()> {
        let result = self.api.update_api_key(api_key).await;
        self.absorb(result)?;
        self.user = None;
        Ok(())
    }

    /// Tears the state down when the server rejects the credential.
    pub fn absorb<T>(&mut self, result: Result<T, ApiError>) -> Result<T> {
        match result {
            Err(ApiError::Unauthorized) => {
                warn!("Credential rejected, signing out");
                self.teardown()?;
                Err(ApiError::Unauthorized.into())
            }
            other => Ok(other?),
        }
    }
}
