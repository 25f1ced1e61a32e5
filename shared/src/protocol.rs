use serde::Deserialize;

pub const PROCESSING_STARTED: &str = "PROCESSING_STARTED";
pub const DOWNLOAD_PROGRESS: &str = "DOWNLOAD_PROGRESS";
pub const TRANSCRIPTION_PROGRESS: &str = "TRANSCRIPTION_PROGRESS";
pub const TRANSLATION_PROGRESS: &str = "TRANSLATION_PROGRESS";
pub const PROCESSING_COMPLETE: &str = "PROCESSING_COMPLETE";
pub const ERROR: &str = "ERROR";

const UNKNOWN_ERROR: &str = "Unknown error";

/// Progress messages streamed back by the job server.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Started {
        message: String,
    },
    DownloadProgress {
        percent: f64,
    },
    TranscriptionProgress {
        percent: f64,
        partial_transcript: Option<String>,
    },
    TranslationProgress {
        percent: f64,
        partial_translation: Option<String>,
    },
    Complete {
        transcript: String,
        translation: String,
        detected_language: Option<String>,
        original_audio: Option<String>,
        translated_audio: Option<String>,
    },
    Error {
        message: String,
        requires_upgrade: bool,
        requires_auth: bool,
    },
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: EnvelopeData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeData {
    message: Option<String>,
    progress: Option<f64>,
    transcription: Option<String>,
    current_translation: Option<String>,
    translation: Option<String>,
    initial_language: Option<String>,
    initial_audio_data: Option<String>,
    target_audio_data: Option<String>,
    error: Option<String>,
    requires_upgrade: Option<bool>,
    requires_auth: Option<bool>,
}

impl ProgressEvent {
    /// Parses one inbound text frame. Frames with an unrecognised `type`
    /// decode to `Ok(None)`.
    pub fn decode(text: &str) -> Result<Option<Self>, serde_json::Error> {
        let envelope: Envelope = serde_json::from_str(text)?;
        Ok(Self::from_envelope(envelope))
    }

    fn from_envelope(envelope: Envelope) -> Option<Self> {
        let data = envelope.data;
        let percent = data.progress.unwrap_or(0.0);

        let event = match envelope.kind.as_str() {
            PROCESSING_STARTED => ProgressEvent::Started {
                message: data.message.unwrap_or_default(),
            },
            DOWNLOAD_PROGRESS => ProgressEvent::DownloadProgress { percent },
            TRANSCRIPTION_PROGRESS => ProgressEvent::TranscriptionProgress {
                percent,
                partial_transcript: non_empty(data.transcription),
            },
            TRANSLATION_PROGRESS => ProgressEvent::TranslationProgress {
                percent,
                partial_translation: non_empty(data.current_translation),
            },
            PROCESSING_COMPLETE => ProgressEvent::Complete {
                transcript: data.transcription.unwrap_or_default(),
                translation: data.translation.unwrap_or_default(),
                detected_language: non_empty(data.initial_language),
                original_audio: non_empty(data.initial_audio_data),
                translated_audio: non_empty(data.target_audio_data),
            },
            ERROR => ProgressEvent::Error {
                message: data
                    .error
                    .or(data.message)
                    .unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
                requires_upgrade: data.requires_upgrade.unwrap_or(false),
                requires_auth: data.requires_auth.unwrap_or(false),
            },
            _ => return None,
        };

        Some(event)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProgressEvent::Started { .. } => PROCESSING_STARTED,
            ProgressEvent::DownloadProgress { .. } => DOWNLOAD_PROGRESS,
            ProgressEvent::TranscriptionProgress { .. } => TRANSCRIPTION_PROGRESS,
            ProgressEvent::TranslationProgress { .. } => TRANSLATION_PROGRESS,
            ProgressEvent::Complete { .. } => PROCESSING_COMPLETE,
            ProgressEvent::Error { .. } => ERROR,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
