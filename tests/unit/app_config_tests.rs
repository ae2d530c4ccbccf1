/*!
 * Tests for application configuration functionality
 */

use subburn::app_config::{Config, LogLevel, TranscriptionProvider};

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_language, "en");
    assert_eq!(config.target_language, "he");
    assert_eq!(config.limits.max_file_bytes, 50 * 1024 * 1024);
    assert_eq!(config.limits.max_duration_secs, 600);
    assert_eq!(config.transcription.provider, TranscriptionProvider::Groq);
    assert_eq!(config.transcription.timeout_secs, 300);
    assert_eq!(config.translation.timeout_secs, 30);
    assert_eq!(config.translation.concurrent_requests, 4);

    assert_eq!(config.overlay.band_height, 120);
    assert_eq!(config.overlay.bottom_offset, 40);
    assert!((config.overlay.band_width_ratio - 0.9).abs() < f32::EPSILON);
    assert_eq!(config.overlay.font_size, 36.0);
    assert_eq!(config.overlay.backdrop_alpha, 220);

    assert_eq!(config.encoder.video_codec, "libx264");
    assert_eq!(config.encoder.audio_codec, "copy");
    assert_eq!(config.encoder.preset, "ultrafast");
    assert_eq!(config.encoder.crf, 23);
    assert_eq!(config.encoder.threads, 2);
    assert_eq!(config.source.fetch_timeout_secs, 120);
    assert_eq!(config.delivery.timeout_secs, 60);

    assert_eq!(config.log_level, LogLevel::Info);
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();

    // No API key yet
    assert!(config.validate().is_err());
    config.transcription.api_key = "key".to_string();
    assert!(config.validate().is_ok());

    config.source_language = "xyz".to_string();
    assert!(config.validate().is_err());
    config.source_language = "en".to_string();

    config.target_language = "".to_string();
    assert!(config.validate().is_err());
    config.target_language = "he".to_string();

    config.overlay.band_width_ratio = 1.5;
    assert!(config.validate().is_err());
    config.overlay.band_width_ratio = 0.9;

    config.overlay.min_font_size = 48.0;
    assert!(config.validate().is_err());
    config.overlay.min_font_size = 18.0;

    config.limits.max_concurrent_jobs = 0;
    assert!(config.validate().is_err());
    config.limits.max_concurrent_jobs = 1;

    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_json_withOnlyLanguages_shouldFillDefaults() {
    let json = r#"{ "source_language": "fr", "target_language": "ar" }"#;
    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.source_language, "fr");
    assert_eq!(config.target_language, "ar");
    assert_eq!(config.overlay.band_height, 120);
    assert_eq!(config.encoder.timeout_secs, 1800);
    assert!(config.work_dir.is_none());
}

#[test]
fn test_config_serialization_withDefaults_shouldRoundTrip() {
    let config = Config::default();
    let json = serde_json::to_string_pretty(&config).unwrap();
    let restored: Config = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.limits.max_file_bytes, config.limits.max_file_bytes);
    assert_eq!(restored.encoder.video_codec, config.encoder.video_codec);
    assert_eq!(restored.overlay.font_paths, config.overlay.font_paths);
}

#[test]
fn test_provider_defaults_withOpenAI_shouldUseWhisperModel() {
    let mut config = Config::default();
    config.transcription.provider = TranscriptionProvider::OpenAI;

    assert_eq!(config.transcription.get_model(), "whisper-1");
    assert!(config.transcription.get_endpoint().contains("openai.com"));
}

#[test]
fn test_work_root_withExplicitDir_shouldUseIt() {
    let mut config = Config::default();
    assert_eq!(config.work_root(), std::env::temp_dir());

    config.work_dir = Some("/var/tmp/subburn".into());
    assert_eq!(config.work_root(), std::path::PathBuf::from("/var/tmp/subburn"));
}
