//! Batch converter
//!
//! Normalizes every eligible audio file found directly inside an input folder
//! into an MP3 of the same stem in the output folder, one file at a time.

use crate::encode::{Normalizer, DEFAULT_ENCODE_RETRIES};
use crate::folders::ensure_folder;
use crate::results::{ConversionJob, ConversionStatus, ConversionSummary};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use walkdir::WalkDir;

/// Source extensions picked up by the converter (case-insensitive matching).
pub const SOURCE_EXTENSIONS: &[&str] = &[".m4a", ".webm", ".mp4", ".opus"];

/// Extension of every converted file.
pub const OUTPUT_EXTENSION: &str = "mp3";

/// Checks if a file has a source extension (case-insensitive).
pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext_lower = format!(".{}", ext.to_lowercase());
            SOURCE_EXTENSIONS.contains(&ext_lower.as_str())
        })
        .unwrap_or(false)
}

/// Eligible files directly inside `folder`, sorted by file name.
///
/// Subdirectories are not descended into. Unreadable entries are skipped.
pub fn find_source_files(folder: &Path) -> Vec<PathBuf> {
    WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && is_source_file(path))
        .collect()
}

/// Convert every eligible file in `input_folder`
///
/// Never fails: a missing input folder or a failed file is recorded in the
/// returned summary. Existing outputs with the same name are overwritten.
pub fn convert_folder(normalizer: &Normalizer, input_folder: &Path, output_folder: &Path) -> ConversionSummary {
    let mut summary = ConversionSummary::new(
        input_folder.display().to_string(),
        output_folder.display().to_string(),
    );

    if !input_folder.is_dir() {
        let message = format!("input folder does not exist: {}", input_folder.display());
        error!("{}", message);
        summary.errors.push(message);
        return summary;
    }

    ensure_folder(output_folder);

    let files = find_source_files(input_folder);
    summary.files_found = files.len();
    info!(
        files = files.len(),
        input = %input_folder.display(),
        output = %output_folder.display(),
        "starting conversion batch"
    );

    for input in files {
        let input_name = file_name_of(&input);
        let output_name = output_name_for(&input);
        let output = output_folder.join(&output_name);

        let status = if normalizer.convert_one(&input, &output, DEFAULT_ENCODE_RETRIES) {
            summary.converted_count += 1;
            ConversionStatus::Ok
        } else {
            warn!(input = %input_name, "conversion failed");
            summary.errors.push(format!("conversion failed: {}", input_name));
            ConversionStatus::Failed
        };

        summary.jobs.push(ConversionJob {
            input: input_name,
            output: output_name,
            status,
        });
    }

    info!(
        converted = summary.converted_count,
        failed = summary.files_found - summary.converted_count,
        "conversion batch finished"
    );
    summary
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `song.m4a` -> `song.mp3`
fn output_name_for(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}.{}", stem, OUTPUT_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::testing::{failure, missing, ScriptedEncoder};
    use proptest::prelude::*;
    use std::fs;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn normalizer(encoder: &Arc<ScriptedEncoder>) -> Normalizer {
        Normalizer::new(encoder.clone()).with_backoff(Duration::ZERO)
    }

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"data").unwrap();
    }

    #[test]
    fn test_source_extensions_defined() {
        assert_eq!(SOURCE_EXTENSIONS, &[".m4a", ".webm", ".mp4", ".opus"]);
    }

    #[test]
    fn test_is_source_file() {
        assert!(is_source_file(Path::new("/in/song.m4a")));
        assert!(is_source_file(Path::new("/in/SONG.WEBM")));
        assert!(is_source_file(Path::new("clip.Mp4")));
        assert!(is_source_file(Path::new("voice.opus")));
        assert!(!is_source_file(Path::new("song.mp3")));
        assert!(!is_source_file(Path::new("notes.txt")));
        assert!(!is_source_file(Path::new("m4a")));
    }

    #[test]
    fn test_output_name_keeps_stem() {
        assert_eq!(output_name_for(Path::new("/in/song.m4a")), "song.mp3");
        assert_eq!(output_name_for(Path::new("A - B.v2.webm")), "A - B.v2.mp3");
    }

    #[test]
    fn test_converts_only_eligible_files() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        touch(input.path(), "song.m4a");
        touch(input.path(), "notes.txt");
        let encoder = Arc::new(ScriptedEncoder::new(vec![]));

        let summary = convert_folder(&normalizer(&encoder), input.path(), output.path());

        assert_eq!(summary.files_found, 1);
        assert_eq!(summary.converted_count, 1);
        assert!(summary.errors.is_empty());
        assert_eq!(
            summary.jobs,
            vec![ConversionJob {
                input: "song.m4a".to_string(),
                output: "song.mp3".to_string(),
                status: ConversionStatus::Ok,
            }]
        );

        let requests = encoder.requests.lock().unwrap();
        assert_eq!(requests[0].input_path, input.path().join("song.m4a"));
        assert_eq!(requests[0].output_path, output.path().join("song.mp3"));
    }

    #[test]
    fn test_missing_input_folder() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("does-not-exist");
        let encoder = Arc::new(ScriptedEncoder::new(vec![]));

        let summary = convert_folder(&normalizer(&encoder), &input, &dir.path().join("out"));

        assert_eq!(summary.files_found, 0);
        assert_eq!(summary.converted_count, 0);
        assert!(summary.jobs.is_empty());
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("input folder does not exist"));
        assert_eq!(encoder.calls(), 0);
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_creates_output_folder() {
        let input = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let output = root.path().join("nested").join("out");
        touch(input.path(), "a.opus");
        let encoder = Arc::new(ScriptedEncoder::new(vec![]));

        convert_folder(&normalizer(&encoder), input.path(), &output);

        assert!(output.is_dir());
    }

    #[test]
    fn test_files_processed_in_name_order() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        for name in ["c.webm", "a.m4a", "b.OPUS", "ignored.flac"] {
            touch(input.path(), name);
        }
        let encoder = Arc::new(ScriptedEncoder::new(vec![]));

        let summary = convert_folder(&normalizer(&encoder), input.path(), output.path());

        let inputs: Vec<&str> = summary.jobs.iter().map(|j| j.input.as_str()).collect();
        assert_eq!(inputs, vec!["a.m4a", "b.OPUS", "c.webm"]);
        assert_eq!(summary.jobs[1].output, "b.mp3");
    }

    #[test]
    fn test_subdirectories_are_not_scanned() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let sub = input.path().join("album.m4a");
        fs::create_dir(&sub).unwrap();
        touch(&sub, "inner.m4a");
        touch(input.path(), "top.mp4");
        let encoder = Arc::new(ScriptedEncoder::new(vec![]));

        let summary = convert_folder(&normalizer(&encoder), input.path(), output.path());

        assert_eq!(summary.files_found, 1);
        assert_eq!(summary.jobs[0].input, "top.mp4");
    }

    #[test]
    fn test_failed_file_is_reported_and_batch_continues() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        touch(input.path(), "a.m4a");
        touch(input.path(), "b.m4a");
        // a.m4a exhausts its three attempts, b.m4a succeeds
        let encoder = Arc::new(ScriptedEncoder::new(vec![failure(), failure(), failure()]));

        let summary = convert_folder(&normalizer(&encoder), input.path(), output.path());

        assert_eq!(encoder.calls(), 4);
        assert_eq!(summary.files_found, 2);
        assert_eq!(summary.converted_count, 1);
        assert_eq!(summary.errors, vec!["conversion failed: a.m4a".to_string()]);
        assert_eq!(summary.jobs[0].status, ConversionStatus::Failed);
        assert_eq!(summary.jobs[1].status, ConversionStatus::Ok);
    }

    #[test]
    fn test_missing_encoder_fails_each_file_once() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        touch(input.path(), "a.m4a");
        touch(input.path(), "b.webm");
        let encoder = Arc::new(ScriptedEncoder::new(vec![missing(), missing()]));

        let summary = convert_folder(&normalizer(&encoder), input.path(), output.path());

        assert_eq!(encoder.calls(), 2);
        assert_eq!(summary.converted_count, 0);
        assert_eq!(summary.errors.len(), 2);
    }

    #[test]
    fn test_rerun_produces_same_jobs() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        touch(input.path(), "x.m4a");
        touch(input.path(), "y.webm");
        let encoder = Arc::new(ScriptedEncoder::new(vec![]));
        let normalizer = normalizer(&encoder);

        let first = convert_folder(&normalizer, input.path(), output.path());
        let second = convert_folder(&normalizer, input.path(), output.path());

        assert_eq!(first, second);
    }

    // *For any* set of file names in the input folder, the converter SHALL
    // create exactly one job per eligible name, in sorted order, and its
    // counters SHALL agree with the job statuses.
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_jobs_match_eligible_files(
            stems in proptest::collection::btree_set("[a-z0-9]{1,8}", 0..8),
            exts in proptest::collection::vec(
                prop_oneof![
                    Just("m4a"), Just("WEBM"), Just("mp4"), Just("opus"),
                    Just("mp3"), Just("txt"), Just("flac"),
                ],
                8,
            ),
        ) {
            let input = TempDir::new().unwrap();
            let output = TempDir::new().unwrap();
            let names: Vec<String> = stems
                .iter()
                .zip(exts.iter())
                .map(|(stem, ext)| format!("{}.{}", stem, ext))
                .collect();
            for name in &names {
                touch(input.path(), name);
            }

            let encoder = Arc::new(ScriptedEncoder::new(vec![]));
            let summary = convert_folder(&normalizer(&encoder), input.path(), output.path());

            let mut expected: Vec<&String> =
                names.iter().filter(|n| is_source_file(Path::new(n))).collect();
            expected.sort();
            let inputs: Vec<&String> = summary.jobs.iter().map(|j| &j.input).collect();

            prop_assert_eq!(inputs, expected);
            prop_assert_eq!(summary.files_found, summary.jobs.len());
            prop_assert_eq!(
                summary.converted_count,
                summary.jobs.iter().filter(|j| j.status == ConversionStatus::Ok).count()
            );
            for job in &summary.jobs {
                prop_assert!(job.output.ends_with(".mp3"));
            }
        }
    }
}
