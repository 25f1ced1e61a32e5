use serde::Serialize;
use thiserror::Error;

/// Reasons a submission is refused before any channel is opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("Please provide both YouTube URL and target language.")]
    MissingInput,

    #[error("Please log in to continue.")]
    NotLoggedIn,

    #[error("Please provide your OpenAI API key.")]
    MissingApiKey,
}

/// Raw user input for one translation job.
#[derive(Debug, Clone, Default)]
pub struct JobInputs {
    pub video_url: String,
    pub target_language: String,
    pub api_key: Option<String>,
    pub keep_original_audio: bool,
    pub generate_target_audio: bool,
    pub voice: String,
}

/// What the caller knows about the signed-in user when submitting.
#[derive(Debug, Clone)]
pub struct Entitlement {
    pub token: String,
    pub has_stored_api_key: bool,
}

/// A validated job, sent exactly once per channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub resource_locator: String,
    pub target_language: String,
    pub credential_token: Option<String>,
    pub api_key: Option<String>,
    pub preserve_original_audio: bool,
    pub generate_target_audio: bool,
    pub voice: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JobPayload<'a> {
    video_url: &'a str,
    target_lang: &'a str,
    token: Option<&'a str>,
    openai_api_key: Option<&'a str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    should_keep_original_audio: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    should_generate_target_audio: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected_voice: Option<&'a str>,
}

impl JobRequest {
    /// Checks the local preconditions in the order the user sees them:
    /// inputs, then sign-in, then API key availability.
    pub fn prepare(
        inputs: JobInputs,
        entitlement: Option<&Entitlement>,
    ) -> Result<Self, SubmitError> {
        let video_url = inputs.video_url.trim();
        let target_language = inputs.target_language.trim();
        if video_url.is_empty() || target_language.is_empty() {
            return Err(SubmitError::MissingInput);
        }

        let entitlement = entitlement.ok_or(SubmitError::NotLoggedIn)?;

        let api_key = inputs.api_key.filter(|key| !key.trim().is_empty());
        if !entitlement.has_stored_api_key && api_key.is_none() {
            return Err(SubmitError::MissingApiKey);
        }

        Ok(Self {
            resource_locator: video_url.to_string(),
            target_language: target_language.to_string(),
            credential_token: Some(entitlement.token.clone()),
            api_key,
            preserve_original_audio: inputs.keep_original_audio,
            generate_target_audio: inputs.generate_target_audio,
            voice: inputs.voice,
        })
    }

    /// JSON text frame sent once the channel is open.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let selected_voice = (self.generate_target_audio && !self.voice.is_empty())
            .then_some(self.voice.as_str());

        serde_json::to_string(&JobPayload {
            video_url: &self.resource_locator,
            target_lang: &self.target_language,
            token: self.credential_token.as_deref(),
            openai_api_key: self.api_key.as_deref(),
            should_keep_original_audio: self.preserve_original_audio,
            should_generate_target_audio: self.generate_target_audio,
            selected_voice,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn inputs() -> JobInputs {
        JobInputs {
            video_url: "https://youtube.com/watch?v=abc".to_string(),
            target_language: "Spanish".to_string(),
            ..Default::default()
        }
    }

    fn signed_in(has_stored_api_key: bool) -> Entitlement {
        Entitlement {
            token: "tok".to_string(),
            has_stored_api_key,
        }
    }

    #[test]
    fn missing_url_or_language_is_checked_first() {
        let mut no_lang = inputs();
        no_lang.target_language = "  ".to_string();
        assert_eq!(
            JobRequest::prepare(no_lang, None),
            Err(SubmitError::MissingInput)
        );

        let mut no_url = inputs();
        no_url.video_url.clear();
        assert_eq!(
            JobRequest::prepare(no_url, Some(&signed_in(true))),
            Err(SubmitError::MissingInput)
        );
    }

    #[test]
    fn requires_sign_in() {
        assert_eq!(
            JobRequest::prepare(inputs(), None),
            Err(SubmitError::NotLoggedIn)
        );
    }

    #[test]
    fn requires_some_api_key() {
        assert_eq!(
            JobRequest::prepare(inputs(), Some(&signed_in(false))),
            Err(SubmitError::MissingApiKey)
        );

        let mut with_key = inputs();
        with_key.api_key = Some("sk-test".to_string());
        let request = JobRequest::prepare(with_key, Some(&signed_in(false))).unwrap();
        assert_eq!(request.api_key.as_deref(), Some("sk-test"));

        assert!(JobRequest::prepare(inputs(), Some(&signed_in(true))).is_ok());
    }

    #[test]
    fn encodes_wire_field_names() {
        let request = JobRequest::prepare(inputs(), Some(&signed_in(true))).unwrap();
        let value: Value = serde_json::from_str(&request.encode().unwrap()).unwrap();

        assert_eq!(
            value,
            json!({
                "videoUrl": "https://youtube.com/watch?v=abc",
                "targetLang": "Spanish",
                "token": "tok",
                "openaiApiKey": null,
            })
        );
    }

    #[test]
    fn encodes_audio_options_when_requested() {
        let mut with_audio = inputs();
        with_audio.keep_original_audio = true;
        with_audio.generate_target_audio = true;
        with_audio.voice = "nova".to_string();

        let request = JobRequest::prepare(with_audio, Some(&signed_in(true))).unwrap();
        let value: Value = serde_json::from_str(&request.encode().unwrap()).unwrap();

        assert_eq!(value["shouldKeepOriginalAudio"], json!(true));
        assert_eq!(value["shouldGenerateTargetAudio"], json!(true));
        assert_eq!(value["selectedVoice"], json!("nova"));
    }

    #[test]
    fn voice_is_dropped_without_target_audio() {
        let mut voice_only = inputs();
        voice_only.voice = "nova".to_string();

        let request = JobRequest::prepare(voice_only, Some(&signed_in(true))).unwrap();
        let value: Value = serde_json::from_str(&request.encode().unwrap()).unwrap();
        assert!(value.get("selectedVoice").is_none());
    }
}
