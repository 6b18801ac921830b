use std::path::PathBuf;

/// Why a single input source was skipped.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid zip archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("unsupported encoding {0:?}")]
    UnknownEncoding(String),

    #[error("invalid {encoding} byte sequence")]
    Decode { encoding: &'static str },

    #[error("XML parse error: {0}")]
    Parse(#[from] roxmltree::Error),

    #[error("failed to serialize via points: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Conditions that end a run without writing any output.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("no input XML files found (check the file names, patterns and directory)")]
    NoInputFiles,

    #[error("no processable input: {parsed} source(s) parsed without placemarks, {skipped} skipped")]
    NoProcessableInput { parsed: usize, skipped: usize },
}
