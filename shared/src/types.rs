use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subscription: String,
    #[serde(rename = "usageLimit", default)]
    pub usage_limit: u64,
    #[serde(default)]
    pub daily_usage: u64,
    #[serde(default)]
    pub total_usage: u64,
    #[serde(default)]
    pub is_api_key_available: bool,
    #[serde(rename = "apiKey", default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl User {
    pub fn remaining_today(&self) -> u64 {
        self.usage_limit.saturating_sub(self.daily_usage)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageHistoryItem {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub source_type: String,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub source_text: String,
    #[serde(default)]
    pub result_text: String,
    #[serde(default)]
    pub target_language: Option<String>,
    #[serde(default)]
    pub initial_language: Option<String>,
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_audio_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audio_data: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentHistoryItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub amount: f64,
    pub currency: String,
    pub status: String,
    pub payment_method: String,
    pub subscription_plan: String,
    pub transaction_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryAudio {
    pub initial_audio_data: Option<String>,
    pub target_audio_data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApiKeyRequest {
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditTextRequest {
    pub history_id: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetranslateRequest {
    pub history_id: String,
    pub target_lang: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemakeAudioRequest {
    pub history_id: String,
    pub selected_voice: String,
}

/// Which side of a translation an audio track belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioTrack {
    Original,
    Translated,
}

impl AudioTrack {
    /// `original_audio_<lang>.mp3` / `translated_audio_<lang>.mp3`, with the
    /// language lower-cased and whitespace runs collapsed into `_`.
    pub fn file_name(self, language: &str) -> String {
        let prefix = match self {
            AudioTrack::Original => "original",
            AudioTrack::Translated => "translated",
        };
        let language = language
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_lowercase();
        format!("{prefix}_audio_{language}.mp3")
    }
}
