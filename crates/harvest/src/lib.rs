//! Harvest
//!
//! Downloads audio for a list of media identifiers on a bounded worker pool,
//! then batch-normalizes a folder of downloads into tagged MP3 files.

pub mod convert;
pub mod encode;
pub mod extract;
pub mod folders;
pub mod naming;
pub mod pipeline;
pub mod results;
pub mod scheduler;
pub mod startup;

pub use harvest_config as config;
pub use harvest_config::Config;
pub use convert::{convert_folder, find_source_files, is_source_file, SOURCE_EXTENSIONS};
pub use encode::{
    build_ffmpeg_command, EncodeError, EncodeRequest, Encoder, FfmpegEncoder, Normalizer,
    DEFAULT_ENCODE_RETRIES,
};
pub use extract::{
    build_ytdlp_command, fetch_one, parse_info_json, ExtractError, ExtractedMedia, Extractor,
    MediaInfo, YtDlpExtractor,
};
pub use folders::ensure_folder;
pub use naming::{display_name, sanitize_filename, split_artist_title};
pub use pipeline::{Pipeline, PipelineError};
pub use results::{
    AcquisitionBatch, AcquisitionOutcome, AcquisitionResult, AcquisitionSummary, ConversionJob,
    ConversionStatus, ConversionSummary,
};
pub use scheduler::{backoff_delay, parse_identifiers, AcquisitionPlan, AcquisitionScheduler};
pub use startup::{
    check_encoder_available, check_extractor_available, parse_ffmpeg_version,
    parse_ytdlp_version, run_startup_checks, Stage, StartupError,
};
