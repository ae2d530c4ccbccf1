use anyhow::{Context, Result, anyhow};
use log::warn;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;

// @module: Timed speech segments and their translations

/// Trimmed texts of this many characters or fewer are treated as noise
pub const MIN_SEGMENT_CHARS: usize = 2;

// @struct: One transcribed span of speech
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    // @field: Start time in seconds
    pub start: f64,

    // @field: End time in seconds, always > start
    pub end: f64,

    // @field: Trimmed, non-empty source text
    pub source_text: String,
}

impl Segment {
    // @creates: Validated segment
    // @validates: Finite time range, end > start, non-empty text
    pub fn new(start: f64, end: f64, text: impl AsRef<str>) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(anyhow!("Non-finite segment bounds: {} -> {}", start, end));
        }
        if end <= start {
            return Err(anyhow!(
                "Invalid time range: end time {} <= start time {}",
                end, start
            ));
        }

        let trimmed = text.as_ref().trim();
        if trimmed.is_empty() {
            return Err(anyhow!("Empty segment text at {:.2}s", start));
        }

        Ok(Segment {
            start,
            end,
            source_text: trimmed.to_string(),
        })
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether the text carries enough characters to be worth translating
    pub fn is_noise(&self) -> bool {
        self.source_text.trim().chars().count() <= MIN_SEGMENT_CHARS
    }

    /// Build segments from raw transcription spans, dropping invalid ones
    pub fn collect_valid<I>(raw: I) -> Vec<Segment>
    where
        I: IntoIterator<Item = (f64, f64, String)>,
    {
        raw.into_iter()
            .filter_map(|(start, end, text)| match Segment::new(start, end, &text) {
                Ok(segment) => Some(segment),
                Err(e) => {
                    warn!("Skipping invalid transcription segment: {}", e);
                    None
                }
            })
            .collect()
    }
}

// @struct: Segment carrying its target-language text
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedSegment {
    pub start: f64,
    pub end: f64,
    pub target_text: String,
}

impl TranslatedSegment {
    /// Attach a translation, inheriting the source timing
    pub fn from_segment(segment: &Segment, target_text: impl Into<String>) -> Self {
        TranslatedSegment {
            start: segment.start,
            end: segment.end,
            target_text: target_text.into(),
        }
    }

    /// Format a time in seconds as an SRT timestamp (HH:MM:SS,mmm)
    pub fn format_timestamp(seconds: f64) -> String {
        let ms = (seconds.max(0.0) * 1000.0).round() as u64;
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let secs = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
    }
}

impl fmt::Display for TranslatedSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "{} --> {}",
            Self::format_timestamp(self.start),
            Self::format_timestamp(self.end)
        )?;
        writeln!(f, "{}", self.target_text)
    }
}

/// Write translated segments as an SRT sidecar file
pub fn write_srt<P: AsRef<Path>>(segments: &[TranslatedSegment], path: P) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut file = File::create(path)
        .with_context(|| format!("Failed to create subtitle file: {}", path.display()))?;

    for (i, segment) in segments.iter().enumerate() {
        writeln!(file, "{}", i + 1)?;
        writeln!(file, "{}", segment)?;
    }

    Ok(())
}
