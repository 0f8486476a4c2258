//! yt-dlp backed extractor
//!
//! Runs yt-dlp once per identifier, asking for the best audio stream of a
//! single item, and reads the info record it prints as JSON.

use super::{ExtractError, ExtractedMedia, Extractor, MediaInfo};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Format selector: best audio-only stream, falling back to the best muxed one.
pub const AUDIO_FORMAT: &str = "bestaudio/best";

/// Output template, relative to the destination folder.
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Raw yt-dlp JSON structures for parsing.
mod ytdlp_json {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct Info {
        pub title: Option<String>,
        pub track: Option<String>,
        pub artist: Option<String>,
        pub uploader: Option<String>,
        pub channel: Option<String>,
        #[serde(rename = "_filename")]
        pub prepared_filename: Option<String>,
        pub filename: Option<String>,
    }
}

/// Extractor that shells out to yt-dlp.
#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    binary: PathBuf,
}

impl YtDlpExtractor {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for YtDlpExtractor {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

/// Build a yt-dlp command that downloads one identifier
///
/// Creates a Command configured with:
/// - Best audio format, no playlist expansion
/// - Output path templated by the item's title inside `destination`
/// - Quiet output with the info record dumped as JSON after downloading
///
/// The identifier is passed after `--` so it is never read as an option.
pub fn build_ytdlp_command(binary: &Path, identifier: &str, destination: &Path) -> Command {
    let mut cmd = Command::new(binary);

    cmd.arg("--format").arg(AUDIO_FORMAT);
    cmd.arg("--no-playlist");
    cmd.arg("--output").arg(destination.join(OUTPUT_TEMPLATE));
    cmd.args(["--quiet", "--no-warnings", "--no-progress"]);

    // Print the info JSON but still download
    cmd.args(["--dump-json", "--no-simulate"]);

    cmd.arg("--").arg(identifier);

    cmd
}

/// Parse the info record yt-dlp printed on stdout.
///
/// Uses the last JSON line, since yt-dlp may print other text before it.
pub fn parse_info_json(stdout: &str) -> Result<ExtractedMedia, ExtractError> {
    let line = stdout
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with('{'))
        .last()
        .ok_or(ExtractError::Unavailable)?;

    let info: ytdlp_json::Info =
        serde_json::from_str(line).map_err(|e| ExtractError::Parse(e.to_string()))?;

    let path = info
        .prepared_filename
        .or(info.filename)
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ExtractError::Parse("info record has no file name".to_string()))?;

    Ok(ExtractedMedia {
        path: PathBuf::from(path),
        info: MediaInfo {
            title: info.title,
            track: info.track,
            artist: info.artist,
            uploader: info.uploader,
            channel: info.channel,
        },
    })
}

/// Pick the most useful line of yt-dlp's stderr for an error message.
fn error_message(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    lines
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| lines.last())
        .map(|l| l.to_string())
        .unwrap_or_else(|| "no error output".to_string())
}

impl Extractor for YtDlpExtractor {
    fn extract(&self, identifier: &str, destination: &Path) -> Result<ExtractedMedia, ExtractError> {
        let mut cmd = build_ytdlp_command(&self.binary, identifier, destination);

        let output = cmd.output().map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => ExtractError::ToolMissing {
                binary: self.binary.display().to_string(),
                source: e,
            },
            _ => ExtractError::Io(e),
        })?;

        if !output.status.success() {
            return Err(ExtractError::Failed {
                code: output.status.code(),
                message: error_message(&String::from_utf8_lossy(&output.stderr)),
            });
        }

        parse_info_json(&String::from_utf8_lossy(&output.stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::ffi::OsStr;

    fn get_command_args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .filter_map(|arg| arg.to_str().map(String::from))
            .collect()
    }

    fn has_flag_with_value(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|pair| pair[0] == flag && pair[1] == value)
    }

    fn has_flag(args: &[String], flag: &str) -> bool {
        args.iter().any(|arg| arg == flag)
    }

    // *For any* identifier and destination, the command SHALL request best audio
    // without playlist expansion, template the output inside the destination and
    // end with the identifier after `--`.
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_ytdlp_command_completeness(
            identifier in "-?[a-zA-Z0-9:/?=._-]{1,60}",
            destination in "/[a-zA-Z0-9_/.-]{1,40}",
        ) {
            let cmd = build_ytdlp_command(Path::new("yt-dlp"), &identifier, Path::new(&destination));
            let args = get_command_args(&cmd);

            prop_assert_eq!(cmd.get_program(), OsStr::new("yt-dlp"));
            prop_assert!(has_flag_with_value(&args, "--format", "bestaudio/best"));
            prop_assert!(has_flag(&args, "--no-playlist"));
            prop_assert!(has_flag(&args, "--dump-json"));
            prop_assert!(has_flag(&args, "--no-simulate"));

            let template = Path::new(&destination).join(OUTPUT_TEMPLATE);
            prop_assert!(has_flag_with_value(&args, "--output", template.to_str().unwrap()));

            let n = args.len();
            prop_assert_eq!(&args[n - 2], "--");
            prop_assert_eq!(&args[n - 1], &identifier);
        }
    }

    #[test]
    fn test_parse_info_json_full_record() {
        let stdout = r#"{"id": "abc", "title": "Daft Punk - One More Time (Official Video)", "track": "One More Time", "artist": "Daft Punk", "uploader": "Daft Punk", "channel": "Daft Punk", "ext": "webm", "_filename": "/music/Daft Punk - One More Time (Official Video).webm", "filename": "/music/other.webm"}"#;

        let media = parse_info_json(stdout).expect("parses");

        assert_eq!(
            media.path,
            PathBuf::from("/music/Daft Punk - One More Time (Official Video).webm")
        );
        assert_eq!(media.info.track.as_deref(), Some("One More Time"));
        assert_eq!(media.info.resolved_artist(), "Daft Punk");
    }

    #[test]
    fn test_parse_info_json_minimal_record() {
        let stdout = "some banner\n{\"title\": \"Intro\", \"filename\": \"/music/Intro.m4a\", \"artist\": null}\n";

        let media = parse_info_json(stdout).expect("parses");

        assert_eq!(media.path, PathBuf::from("/music/Intro.m4a"));
        assert_eq!(media.info.resolved_title(), "Intro");
        assert_eq!(media.info.resolved_artist(), "");
    }

    #[test]
    fn test_parse_info_json_without_record_is_unavailable() {
        assert!(matches!(parse_info_json(""), Err(ExtractError::Unavailable)));
        assert!(matches!(parse_info_json("null\n"), Err(ExtractError::Unavailable)));
    }

    #[test]
    fn test_parse_info_json_rejects_bad_records() {
        assert!(matches!(parse_info_json("{not json"), Err(ExtractError::Parse(_))));
        assert!(matches!(
            parse_info_json(r#"{"title": "No file"}"#),
            Err(ExtractError::Parse(_))
        ));
    }

    #[test]
    fn test_error_message_prefers_error_lines() {
        let stderr = "WARNING: something\nERROR: [youtube] abc: Video unavailable\n  \n";
        assert_eq!(error_message(stderr), "ERROR: [youtube] abc: Video unavailable");
        assert_eq!(error_message("plain failure\n"), "plain failure");
        assert_eq!(error_message(""), "no error output");
    }

    #[test]
    fn test_missing_binary_is_reported_as_tool_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let extractor = YtDlpExtractor::new(dir.path().join("no-such-yt-dlp"));

        let err = extractor
            .extract("https://example.com/watch?v=abc", dir.path())
            .unwrap_err();

        assert!(matches!(err, ExtractError::ToolMissing { .. }), "got {:?}", err);
    }
}
