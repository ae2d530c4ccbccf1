use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;

/// Everything a run needs to know, loaded from `conf.json`
///
/// Every section falls back to its defaults when missing from the file.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Spoken language of submitted videos (ISO)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Subtitle language (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Admission limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Speech-to-text settings
    #[serde(default)]
    pub transcription: TranscriptionConfig,

    /// Machine translation settings
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Subtitle band appearance
    #[serde(default)]
    pub overlay: OverlayConfig,

    /// Re-encode parameters
    #[serde(default)]
    pub encoder: EncoderConfig,

    /// Source video acquisition settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Delivery settings
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Directory for per-job workspaces (system temp dir when unset)
    #[serde(default)]
    pub work_dir: Option<PathBuf>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Admission ceilings and process-wide job accounting
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LimitsConfig {
    // @field: Largest accepted upload in bytes
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    // @field: Longest accepted video in seconds
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,

    // @field: Jobs allowed to run at the same time
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            max_duration_secs: default_max_duration_secs(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
        }
    }
}

/// Speech-to-text backend type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionProvider {
    // @provider: Groq hosted Whisper
    #[default]
    Groq,
    // @provider: OpenAI Whisper API
    OpenAI,
}

impl TranscriptionProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Groq => "Groq",
            Self::OpenAI => "OpenAI",
        }
    }

    // @returns: Environment variable holding the API key
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::Groq => "GROQ_API_KEY",
            Self::OpenAI => "OPENAI_API_KEY",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::OpenAI => "https://api.openai.com/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Groq => "whisper-large-v3",
            Self::OpenAI => "whisper-1",
        }
    }
}

impl std::fmt::Display for TranscriptionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Groq => write!(f, "groq"),
            Self::OpenAI => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for TranscriptionProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "openai" => Ok(Self::OpenAI),
            _ => Err(anyhow!("Invalid transcription provider: {}", s)),
        }
    }
}

/// Speech-to-text configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranscriptionConfig {
    #[serde(default)]
    pub provider: TranscriptionProvider,

    /// Model name, provider default when empty
    #[serde(default = "String::new")]
    pub model: String,

    /// API key, read from the provider's environment variable when empty
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Service URL, provider default when empty
    #[serde(default = "String::new")]
    pub endpoint: String,

    #[serde(default = "default_transcription_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            provider: TranscriptionProvider::default(),
            model: String::new(),
            api_key: String::new(),
            endpoint: String::new(),
            timeout_secs: default_transcription_timeout_secs(),
        }
    }
}

impl TranscriptionConfig {
    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if self.model.is_empty() {
            self.provider.default_model().to_string()
        } else {
            self.model.clone()
        }
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if self.endpoint.is_empty() {
            self.provider.default_endpoint().to_string()
        } else {
            self.endpoint.clone()
        }
    }
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Google web translation endpoint
    #[default]
    Google,
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    #[serde(default)]
    pub provider: TranslationProvider,

    #[serde(default = "default_google_endpoint")]
    pub endpoint: String,

    /// Per-segment request timeout
    #[serde(default = "default_translation_timeout_secs")]
    pub timeout_secs: u64,

    /// Segments translated in flight at once
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            endpoint: default_google_endpoint(),
            timeout_secs: default_translation_timeout_secs(),
            concurrent_requests: default_concurrent_requests(),
        }
    }
}

/// Appearance of the subtitle band
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OverlayConfig {
    #[serde(default = "default_band_height")]
    pub band_height: u32,

    /// Gap between the band and the bottom edge of the frame
    #[serde(default = "default_bottom_offset")]
    pub bottom_offset: u32,

    /// Band width as a fraction of the frame width
    #[serde(default = "default_band_width_ratio")]
    pub band_width_ratio: f32,

    #[serde(default = "default_font_size")]
    pub font_size: f32,

    /// Floor for shrink-to-fit
    #[serde(default = "default_min_font_size")]
    pub min_font_size: f32,

    /// Backdrop margin around the text
    #[serde(default = "default_padding")]
    pub padding: u32,

    #[serde(default = "default_backdrop_alpha")]
    pub backdrop_alpha: u8,

    /// Ordered font fallback list
    #[serde(default = "default_font_paths")]
    pub font_paths: Vec<PathBuf>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            band_height: default_band_height(),
            bottom_offset: default_bottom_offset(),
            band_width_ratio: default_band_width_ratio(),
            font_size: default_font_size(),
            min_font_size: default_min_font_size(),
            padding: default_padding(),
            backdrop_alpha: default_backdrop_alpha(),
            font_paths: default_font_paths(),
        }
    }
}

/// Re-encode parameters
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EncoderConfig {
    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    /// "copy" keeps the source audio bit-for-bit
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    #[serde(default = "default_preset")]
    pub preset: String,

    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Encoder thread budget
    #[serde(default = "default_threads")]
    pub threads: u32,

    /// Upper bound for any single ffmpeg invocation
    #[serde(default = "default_encoder_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            video_codec: default_video_codec(),
            audio_codec: default_audio_codec(),
            preset: default_preset(),
            crf: default_crf(),
            threads: default_threads(),
            timeout_secs: default_encoder_timeout_secs(),
        }
    }
}

/// Source video acquisition settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SourceConfig {
    /// Upper bound for copying or downloading the submitted video
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

/// Delivery settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DeliveryConfig {
    #[serde(default = "default_delivery_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_delivery_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_language() -> String {
    "he".to_string()
}

fn default_max_file_bytes() -> u64 {
    50 * 1024 * 1024
}

fn default_max_duration_secs() -> u64 {
    600 // 10 minutes
}

fn default_max_concurrent_jobs() -> usize {
    2
}

fn default_transcription_timeout_secs() -> u64 {
    300
}

fn default_translation_timeout_secs() -> u64 {
    30
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_google_endpoint() -> String {
    "https://translate.googleapis.com/translate_a/single".to_string()
}

fn default_band_height() -> u32 {
    120
}

fn default_bottom_offset() -> u32 {
    40
}

fn default_band_width_ratio() -> f32 {
    0.9
}

fn default_font_size() -> f32 {
    36.0
}

fn default_min_font_size() -> f32 {
    18.0
}

fn default_padding() -> u32 {
    15
}

fn default_backdrop_alpha() -> u8 {
    220
}

fn default_font_paths() -> Vec<PathBuf> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
        "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_audio_codec() -> String {
    "copy".to_string()
}

fn default_preset() -> String {
    "ultrafast".to_string()
}

fn default_crf() -> u8 {
    23
}

fn default_threads() -> u32 {
    2
}

fn default_encoder_timeout_secs() -> u64 {
    1800
}

fn default_fetch_timeout_secs() -> u64 {
    120
}

fn default_delivery_timeout_secs() -> u64 {
    60
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::validate_language_code(&self.source_language)?;
        crate::language_utils::validate_language_code(&self.target_language)?;

        if self.limits.max_file_bytes == 0 || self.limits.max_duration_secs == 0 {
            return Err(anyhow!("Admission limits must be greater than zero"));
        }
        if self.limits.max_concurrent_jobs == 0 {
            return Err(anyhow!("max_concurrent_jobs must be at least 1"));
        }
        if !(0.1..=1.0).contains(&self.overlay.band_width_ratio) {
            return Err(anyhow!(
                "band_width_ratio must be between 0.1 and 1.0, got {}",
                self.overlay.band_width_ratio
            ));
        }
        if self.overlay.band_height == 0 {
            return Err(anyhow!("band_height must be greater than zero"));
        }
        if self.overlay.min_font_size <= 0.0 || self.overlay.min_font_size > self.overlay.font_size {
            return Err(anyhow!("min_font_size must be positive and not exceed font_size"));
        }
        if self.translation.concurrent_requests == 0 {
            return Err(anyhow!("concurrent_requests must be at least 1"));
        }
        if self.encoder.threads == 0 {
            return Err(anyhow!("encoder threads must be at least 1"));
        }
        if self.transcription.api_key.is_empty() {
            return Err(anyhow!(
                "Transcription API key is required for {} (set it in the config or {})",
                self.transcription.provider.display_name(),
                self.transcription.provider.api_key_env()
            ));
        }

        Ok(())
    }

    /// Fill secrets left empty in the file from the environment
    pub fn apply_env_overrides(&mut self) {
        if self.transcription.api_key.is_empty() {
            if let Ok(key) = std::env::var(self.transcription.provider.api_key_env()) {
                self.transcription.api_key = key;
            }
        }
    }

    /// Root directory for job workspaces
    pub fn work_root(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            limits: LimitsConfig::default(),
            transcription: TranscriptionConfig::default(),
            translation: TranslationConfig::default(),
            overlay: OverlayConfig::default(),
            encoder: EncoderConfig::default(),
            source: SourceConfig::default(),
            delivery: DeliveryConfig::default(),
            work_dir: None,
            log_level: LogLevel::default(),
        }
    }
}
