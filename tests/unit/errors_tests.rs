/*!
 * Tests for job error classification and user-facing messages
 */

use subburn::errors::{AdmissionError, JobError, JobErrorKind};

#[test]
fn test_user_message_withAdmissionLimits_shouldStateLimit() {
    let too_large = JobError::from(AdmissionError::TooLarge {
        size_bytes: 51 * 1024 * 1024,
        limit_bytes: 50 * 1024 * 1024,
    });
    assert_eq!(too_large.user_message(), "❌ The video is too large! Maximum 50MB");

    let too_long = JobError::from(AdmissionError::TooLong {
        duration_secs: 601.0,
        limit_secs: 600,
    });
    assert_eq!(too_long.user_message(), "❌ The video is too long! Maximum 10 minutes");
}

#[test]
fn test_user_message_withProviderReasons_shouldPassReasonThrough() {
    let error = JobError::Transcription("No speech detected in the video".to_string());
    assert_eq!(error.user_message(), "❌ No speech detected in the video");

    let error = JobError::Translation("No text to translate".to_string());
    assert_eq!(error.user_message(), "❌ No text to translate");
}

#[test]
fn test_kind_withEveryVariant_shouldClassify() {
    let cases = vec![
        (JobError::Extraction("x".into()), JobErrorKind::Extraction),
        (JobError::Transcription("x".into()), JobErrorKind::Transcription),
        (JobError::Translation("x".into()), JobErrorKind::Translation),
        (JobError::Encode("x".into()), JobErrorKind::Encode),
        (JobError::Delivery("x".into()), JobErrorKind::Delivery),
        (JobError::Cancelled, JobErrorKind::Cancelled),
        (JobError::Unexpected("x".into()), JobErrorKind::Unexpected),
    ];

    for (error, kind) in cases {
        assert_eq!(error.kind(), kind, "wrong kind for {}", error);
        assert!(!error.user_message().is_empty());
    }
}

#[test]
fn test_user_message_withInternalDetails_shouldNotLeakThem() {
    let error = JobError::Encode("ffmpeg failed: Invalid data found when processing input".into());
    assert!(!error.user_message().contains("ffmpeg"));
}
