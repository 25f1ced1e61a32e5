use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::info;
use shared::{AudioTrack, HistoryAudio, SessionState};
use std::fs;
use std::path::{Path, PathBuf};

/// Decodes a base64 MP3 payload and writes it under `dir`.
pub fn save_track(dir: &Path, track: AudioTrack, language: &str, data: &str) -> Result<PathBuf> {
    let bytes = BASE64
        .decode(data.trim())
        .with_context(|| format!("{:?} audio is not valid base64", track))?;

    fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    let path = dir.join(track.file_name(language));
    fs::write(&path, &bytes).with_context(|| format!("Failed to write {:?}", path))?;

    info!("Saved {} bytes of {:?} audio to {:?}", bytes.len(), track, path);
    Ok(path)
}

/// Saves whatever tracks a finished session carried.
pub fn save_session_audio(
    dir: &Path,
    state: &SessionState,
    target_language: &str,
) -> Result<Vec<PathBuf>> {
    let mut saved = Vec::new();
    if let Some(data) = &state.original_audio {
        saved.push(save_track(dir, AudioTrack::Original, target_language, data)?);
    }
    if let Some(data) = &state.translated_audio {
        saved.push(save_track(dir, AudioTrack::Translated, target_language, data)?);
    }
    Ok(saved)
}

pub fn save_history_audio(dir: &Path, audio: &HistoryAudio, language: &str) -> Result<Vec<PathBuf>> {
    let mut saved = Vec::new();
    if let Some(data) = audio.initial_audio_data.as_deref().filter(|d| !d.is_empty()) {
        saved.push(save_track(dir, AudioTrack::Original, language, data)?);
    }
    if let Some(data) = audio.target_audio_data.as_deref().filter(|d| !d.is_empty()) {
        saved.push(save_track(dir, AudioTrack::Translated, language, data)?);
    }
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_decoded_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let encoded = BASE64.encode(b"ID3fake-mp3");

        let path = save_track(dir.path(), AudioTrack::Translated, "Spanish", &encoded).unwrap();

        assert_eq!(path.file_name().unwrap(), "translated_audio_spanish.mp3");
        assert_eq!(fs::read(path).unwrap(), b"ID3fake-mp3");
    }

    #[test]
    fn rejects_invalid_base64() {
        let dir = tempfile::tempdir().unwrap();
        assert!(save_track(dir.path(), AudioTrack::Original, "English", "***").is_err());
    }

    #[test]
    fn skips_missing_history_tracks() {
        let dir = tempfile::tempdir().unwrap();
        let audio = HistoryAudio {
            initial_audio_data: Some(BASE64.encode(b"orig")),
            target_audio_data: None,
        };

        let saved = save_history_audio(dir.path(), &audio, "French").unwrap();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].ends_with("original_audio_french.mp3"));
    }
}
