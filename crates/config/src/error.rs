use std::path::PathBuf;

/// Errors produced while loading a config file.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("unsupported config format: .{0}")]
    UnsupportedFormat(String),

    /// The file parsed but describes an unusable configuration.
    #[error("invalid config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}
