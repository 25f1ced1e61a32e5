use log::{debug, warn};
use uuid::Uuid;

use crate::protocol::ProgressEvent;
use crate::stage::Stage;

pub const CONNECTION_ERROR: &str = "WebSocket connection error";
pub const AUTO_DETECTED: &str = "Auto-detected";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStage {
    Idle,
    Starting,
    Downloading,
    Transcribing,
    Translating,
    Complete,
    Failed,
}

impl SessionStage {
    pub fn is_processing(self) -> bool {
        matches!(
            self,
            SessionStage::Starting
                | SessionStage::Downloading
                | SessionStage::Transcribing
                | SessionStage::Translating
        )
    }

    pub fn is_finished(self) -> bool {
        matches!(self, SessionStage::Complete | SessionStage::Failed)
    }
}

/// Corrective action the user should be routed to after a server error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    Upgrade,
    Login,
}

/// Client-side view of one job submission.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub id: Option<Uuid>,
    pub stage: SessionStage,
    pub label: String,
    pub overall_percent: u8,
    pub transcript: String,
    pub translation: String,
    pub detected_language: String,
    pub error_message: Option<String>,
    pub original_audio: Option<String>,
    pub translated_audio: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            id: None,
            stage: SessionStage::Idle,
            label: String::new(),
            overall_percent: 0,
            transcript: String::new(),
            translation: String::new(),
            detected_language: String::new(),
            error_message: None,
            original_audio: None,
            translated_audio: None,
        }
    }

    /// Starts a fresh session, discarding whatever the previous one produced.
    pub fn begin(&mut self, id: Uuid) {
        *self = Self::new();
        self.id = Some(id);
        self.stage = SessionStage::Starting;
        self.label = "Initializing...".to_string();
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Folds one server event into the state. Returns the prompt to show,
    /// if the event asks for one.
    pub fn apply(&mut self, event: ProgressEvent) -> Option<Prompt> {
        if self.stage == SessionStage::Idle {
            debug!("Ignoring {} with no active session", event.kind());
            return None;
        }

        match event {
            ProgressEvent::Started { message } => {
                debug!("Job started: {}", message);
                self.stage = SessionStage::Starting;
                self.label = "Starting...".to_string();
                self.overall_percent = 0;
            }
            ProgressEvent::DownloadProgress { percent } => {
                self.stage = SessionStage::Downloading;
                self.label = "Downloading".to_string();
                self.overall_percent = Stage::Download.overall_percent(percent);
            }
            ProgressEvent::TranscriptionProgress {
                percent,
                partial_transcript,
            } => {
                self.stage = SessionStage::Transcribing;
                self.label = "Transcribing".to_string();
                self.overall_percent = Stage::Transcription.overall_percent(percent);
                if let Some(text) = partial_transcript {
                    self.transcript = text;
                }
            }
            ProgressEvent::TranslationProgress {
                percent,
                partial_translation,
            } => {
                self.stage = SessionStage::Translating;
                self.label = "Translating".to_string();
                self.overall_percent = Stage::Translation.overall_percent(percent);
                if let Some(text) = partial_translation {
                    self.translation = text;
                }
            }
            ProgressEvent::Complete {
                transcript,
                translation,
                detected_language,
                original_audio,
                translated_audio,
            } => {
                self.stage = SessionStage::Complete;
                self.label = "Complete".to_string();
                self.overall_percent = 100;
                self.transcript = transcript;
                self.translation = translation;
                self.detected_language =
                    detected_language.unwrap_or_else(|| AUTO_DETECTED.to_string());
                self.original_audio = original_audio;
                self.translated_audio = translated_audio;
            }
            ProgressEvent::Error {
                message,
                requires_upgrade,
                requires_auth,
            } => {
                warn!("Job failed: {}", message);
                self.fail(message);

                // Upgrade wins when both flags are set.
                if requires_upgrade {
                    return Some(Prompt::Upgrade);
                }
                if requires_auth {
                    return Some(Prompt::Login);
                }
            }
        }

        None
    }

    /// Channel-level failure; the transport gives no further detail.
    pub fn connection_failed(&mut self) {
        if self.stage == SessionStage::Idle {
            return;
        }
        self.fail(CONNECTION_ERROR.to_string());
    }

    fn fail(&mut self, message: String) {
        self.stage = SessionStage::Failed;
        self.label.clear();
        self.overall_percent = 0;
        self.error_message = Some(message);
    }

    pub fn is_processing(&self) -> bool {
        self.stage.is_processing()
    }

    pub fn is_finished(&self) -> bool {
        self.stage.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> SessionState {
        let mut state = SessionState::new();
        state.begin(Uuid::new_v4());
        state
    }

    fn error(message: &str, requires_upgrade: bool, requires_auth: bool) -> ProgressEvent {
        ProgressEvent::Error {
            message: message.to_string(),
            requires_upgrade,
            requires_auth,
        }
    }

    #[test]
    fn begin_resets_previous_results() {
        let mut state = started();
        state.apply(ProgressEvent::Complete {
            transcript: "old".to_string(),
            translation: "viejo".to_string(),
            detected_language: Some("English".to_string()),
            original_audio: None,
            translated_audio: Some("AAAA".to_string()),
        });

        let id = Uuid::new_v4();
        state.begin(id);

        assert_eq!(state.id, Some(id));
        assert_eq!(state.stage, SessionStage::Starting);
        assert_eq!(state.overall_percent, 0);
        assert!(state.transcript.is_empty());
        assert!(state.translation.is_empty());
        assert!(state.detected_language.is_empty());
        assert!(state.translated_audio.is_none());
        assert!(state.error_message.is_none());
    }

    #[test]
    fn begin_after_failure_clears_error() {
        let mut state = started();
        state.apply(error("boom", false, false));
        state.begin(Uuid::new_v4());

        assert_eq!(state.stage, SessionStage::Starting);
        assert!(state.error_message.is_none());
    }

    #[test]
    fn full_job_scenario() {
        let mut state = started();
        let events = [
            ProgressEvent::Started {
                message: "Processing started".to_string(),
            },
            ProgressEvent::DownloadProgress { percent: 50.0 },
            ProgressEvent::TranscriptionProgress {
                percent: 100.0,
                partial_transcript: Some("hello".to_string()),
            },
            ProgressEvent::TranslationProgress {
                percent: 100.0,
                partial_translation: Some("hola".to_string()),
            },
            ProgressEvent::Complete {
                transcript: "hello world".to_string(),
                translation: "hola mundo".to_string(),
                detected_language: Some("English".to_string()),
                original_audio: None,
                translated_audio: None,
            },
        ];

        for event in events {
            assert_eq!(state.apply(event), None);
        }

        assert_eq!(state.stage, SessionStage::Complete);
        assert_eq!(state.overall_percent, 100);
        assert_eq!(state.transcript, "hello world");
        assert_eq!(state.translation, "hola mundo");
        assert_eq!(state.detected_language, "English");
    }

    #[test]
    fn download_progress_alone() {
        let mut state = started();
        state.apply(ProgressEvent::DownloadProgress { percent: 50.0 });

        assert_eq!(state.stage, SessionStage::Downloading);
        assert_eq!(state.overall_percent, 10);
    }

    #[test]
    fn partial_text_is_kept_when_update_has_none() {
        let mut state = started();
        state.apply(ProgressEvent::TranscriptionProgress {
            percent: 40.0,
            partial_transcript: Some("hel".to_string()),
        });
        state.apply(ProgressEvent::TranscriptionProgress {
            percent: 60.0,
            partial_transcript: None,
        });

        assert_eq!(state.transcript, "hel");
        assert_eq!(state.overall_percent, 38);
    }

    #[test]
    fn complete_overrides_partial_percent() {
        let mut state = started();
        state.apply(ProgressEvent::TranslationProgress {
            percent: 30.0,
            partial_translation: None,
        });
        state.apply(ProgressEvent::Complete {
            transcript: String::new(),
            translation: String::new(),
            detected_language: None,
            original_audio: None,
            translated_audio: None,
        });

        assert_eq!(state.stage, SessionStage::Complete);
        assert_eq!(state.overall_percent, 100);
        assert_eq!(state.detected_language, AUTO_DETECTED);
    }

    #[test]
    fn upgrade_error_scenario() {
        let mut state = started();
        state.apply(ProgressEvent::TranslationProgress {
            percent: 80.0,
            partial_translation: None,
        });

        let prompt = state.apply(error("Daily limit exceeded", true, false));

        assert_eq!(prompt, Some(Prompt::Upgrade));
        assert_eq!(state.stage, SessionStage::Failed);
        assert_eq!(state.overall_percent, 0);
        assert_eq!(state.error_message.as_deref(), Some("Daily limit exceeded"));
    }

    #[test]
    fn auth_error_prompts_login() {
        let mut state = started();
        assert_eq!(
            state.apply(error("Session expired", false, true)),
            Some(Prompt::Login)
        );
        assert_eq!(state.apply(error("plain", false, false)), None);
    }

    #[test]
    fn upgrade_takes_precedence_over_auth() {
        let mut state = started();
        assert_eq!(state.apply(error("both", true, true)), Some(Prompt::Upgrade));
    }

    #[test]
    fn error_never_leaves_a_progress_stage() {
        for event in [
            ProgressEvent::DownloadProgress { percent: 90.0 },
            ProgressEvent::TranscriptionProgress {
                percent: 90.0,
                partial_transcript: None,
            },
            ProgressEvent::TranslationProgress {
                percent: 90.0,
                partial_translation: None,
            },
        ] {
            let mut state = started();
            state.apply(event);
            state.apply(error("boom", false, false));
            assert_eq!(state.stage, SessionStage::Failed);
            assert_eq!(state.overall_percent, 0);
            assert!(!state.is_processing());
        }
    }

    #[test]
    fn connection_failure_uses_generic_message() {
        let mut state = started();
        state.apply(ProgressEvent::DownloadProgress { percent: 20.0 });
        state.connection_failed();

        assert_eq!(state.stage, SessionStage::Failed);
        assert_eq!(state.overall_percent, 0);
        assert_eq!(state.error_message.as_deref(), Some(CONNECTION_ERROR));
    }

    #[test]
    fn idle_state_ignores_events() {
        let mut state = SessionState::new();
        state.apply(ProgressEvent::DownloadProgress { percent: 50.0 });
        state.connection_failed();

        assert_eq!(state.stage, SessionStage::Idle);
        assert_eq!(state.overall_percent, 0);
        assert!(state.error_message.is_none());
    }
}
