/*!
 * Tests for file and folder utilities
 */

use std::fs;
use std::path::PathBuf;

use subburn::file_utils::FileManager;

use crate::common;

#[test]
fn test_generate_output_path_withOutputDir_shouldTagTargetLanguage() {
    let path = FileManager::generate_output_path("/videos/trip.mp4", "/out", "ar", "srt");
    assert_eq!(path, PathBuf::from("/out/trip.subburn.ar.srt"));
}

#[test]
fn test_is_video_file_withVariousFiles_shouldMatchExtensions() {
    let temp_dir = common::create_temp_dir().unwrap();
    let video = common::create_sized_file(temp_dir.path(), "clip.MOV", 10).unwrap();
    let text = common::create_sized_file(temp_dir.path(), "notes.txt", 10).unwrap();
    let output = common::create_sized_file(temp_dir.path(), "clip.subburn.he.mp4", 10).unwrap();

    assert!(FileManager::is_video_file(&video));
    assert!(!FileManager::is_video_file(&text));
    assert!(!FileManager::is_video_file(&output));
    assert!(!FileManager::is_video_file(temp_dir.path().join("missing.mp4")));
}

#[test]
fn test_find_videos_withNestedFolders_shouldReturnSortedVideos() {
    let temp_dir = common::create_temp_dir().unwrap();
    let nested = temp_dir.path().join("day2");
    fs::create_dir(&nested).unwrap();
    common::create_sized_file(temp_dir.path(), "b.mp4", 1).unwrap();
    common::create_sized_file(temp_dir.path(), "a.webm", 1).unwrap();
    common::create_sized_file(&nested, "c.mkv", 1).unwrap();
    common::create_sized_file(temp_dir.path(), "a.subburn.he.mp4", 1).unwrap();
    common::create_sized_file(temp_dir.path(), "readme.md", 1).unwrap();

    let videos = FileManager::find_videos(temp_dir.path()).unwrap();

    let names: Vec<String> = videos
        .iter()
        .map(|p| p.strip_prefix(temp_dir.path()).unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.webm", "b.mp4", "day2/c.mkv"]);
}

#[test]
fn test_append_to_log_file_withTwoWrites_shouldKeepBoth() {
    let temp_dir = common::create_temp_dir().unwrap();
    let log = temp_dir.path().join("logs").join("subburn.log");

    FileManager::append_to_log_file(&log, "first").unwrap();
    FileManager::append_to_log_file(&log, "second").unwrap();

    let content = fs::read_to_string(&log).unwrap();
    assert_eq!(content.lines().count(), 2);
    assert!(content.lines().next().unwrap().ends_with("] first"));
    assert!(content.contains("] second"));
}
