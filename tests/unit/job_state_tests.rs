/*!
 * Tests for the job state machine
 */

use subburn::artifacts::{ArtifactKind, ArtifactRegistry};
use subburn::pipeline::{Job, JobStage};

use crate::common;

const SUCCESS_PATH: [JobStage; 8] = [
    JobStage::Received,
    JobStage::Admitted,
    JobStage::AudioExtracted,
    JobStage::Transcribed,
    JobStage::Translated,
    JobStage::Overlaid,
    JobStage::Encoded,
    JobStage::Delivered,
];

#[test]
fn test_advance_alongSuccessPath_shouldRecordEveryStage() {
    let mut job = Job::new("abc");

    for stage in &SUCCESS_PATH[1..] {
        job.advance(*stage).unwrap();
    }
    job.clean();

    let mut expected = SUCCESS_PATH.to_vec();
    expected.push(JobStage::Cleaned);
    assert_eq!(job.history(), expected.as_slice());
    assert!(job.stage().is_terminal());
}

#[test]
fn test_advance_withSkippedStage_shouldReject() {
    let mut job = Job::new("abc");

    assert!(job.advance(JobStage::Transcribed).is_err());
    assert_eq!(job.stage(), JobStage::Received);
    assert!(job.advance(JobStage::Cleaned).is_err());
}

#[test]
fn test_can_transition_to_withFailed_shouldOnlyAllowWorkingStages() {
    for stage in &SUCCESS_PATH[..7] {
        assert!(stage.can_transition_to(JobStage::Failed), "{} -> Failed", stage);
    }
    assert!(!JobStage::Delivered.can_transition_to(JobStage::Failed));
    assert!(!JobStage::Failed.can_transition_to(JobStage::Failed));
    assert!(!JobStage::Cleaned.can_transition_to(JobStage::Failed));
    assert!(JobStage::Failed.can_transition_to(JobStage::Cleaned));
    assert_eq!(JobStage::Cleaned.next(), None);
}

#[test]
fn test_clean_afterMidwayFailure_shouldPassThroughFailed() {
    let parent = common::create_temp_dir().unwrap();
    let mut job = Job::new("def");
    job.advance(JobStage::Admitted).unwrap();
    let registry = ArtifactRegistry::create(parent.path(), job.id()).unwrap();
    let audio = job.attach_artifacts(registry).register(ArtifactKind::ExtractedAudio);
    std::fs::write(&audio, b"audio").unwrap();

    let report = job.clean();

    assert!(report.is_clean());
    assert!(!audio.exists());
    assert_eq!(
        job.history(),
        &[JobStage::Received, JobStage::Admitted, JobStage::Failed, JobStage::Cleaned]
    );
}

#[test]
fn test_clean_withoutWorkspace_shouldStillFinish() {
    let mut job = Job::new("ghi");
    job.fail();

    let report = job.clean();

    assert!(report.released.is_empty());
    assert_eq!(job.stage(), JobStage::Cleaned);
    assert_eq!(job.history(), &[JobStage::Received, JobStage::Failed, JobStage::Cleaned]);
}

#[test]
fn test_status_text_withEveryStage_shouldBeNonEmpty() {
    for stage in SUCCESS_PATH.iter().chain([JobStage::Failed, JobStage::Cleaned].iter()) {
        assert!(!stage.status_text().is_empty());
    }
}
