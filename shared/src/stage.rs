//! Maps a stage-local percentage onto the overall job percentage.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Download,
    Transcription,
    Translation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageWeight {
    pub base: u8,
    pub weight: u8,
}

/// Fixed product configuration. Transcription ends at 50 and translation
/// starts at 50, so the table is not a strict partition of 0..=100.
pub const STAGE_WEIGHTS: [(Stage, StageWeight); 3] = [
    (Stage::Download, StageWeight { base: 0, weight: 20 }),
    (Stage::Transcription, StageWeight { base: 20, weight: 30 }),
    (Stage::Translation, StageWeight { base: 50, weight: 50 }),
];

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Download => "download",
            Stage::Transcription => "transcription",
            Stage::Translation => "translation",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        STAGE_WEIGHTS
            .iter()
            .map(|(stage, _)| *stage)
            .find(|stage| stage.name() == name)
    }

    pub fn weight(self) -> StageWeight {
        STAGE_WEIGHTS
            .iter()
            .find(|(stage, _)| *stage == self)
            .map(|(_, weight)| *weight)
            .unwrap_or(StageWeight { base: 0, weight: 0 })
    }

    /// `round(base + percent * weight / 100)`, with `percent` clamped to 0..=100.
    pub fn overall_percent(self, percent: f64) -> u8 {
        let StageWeight { base, weight } = self.weight();
        let percent = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 100.0)
        };
        (f64::from(base) + percent * f64::from(weight) / 100.0).round() as u8
    }
}

/// Name-keyed lookup; unknown stage names map to 0.
pub fn aggregate(stage: &str, percent: f64) -> u8 {
    Stage::from_name(stage)
        .map(|stage| stage.overall_percent(percent))
        .unwrap_or(0)
}
