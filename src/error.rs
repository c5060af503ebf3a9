use std::path::PathBuf;

/// Errors that can occur in splicevis.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    Parameter(String),

    #[error("I/O error: {source} ({path})")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("GTF parsing error: {0}")]
    Gtf(String),

    #[error("ambiguous annotation: {0}")]
    AmbiguousAnnotation(String),

    #[error("contig '{contig}' not found in {path} (tried with and without 'chr' prefix)")]
    ContigNotFound { contig: String, path: PathBuf },

    #[error("BAM error: {0}")]
    Bam(String),

    #[error("render error: {0}")]
    Render(String),
}

impl Error {
    /// Convenience for wrapping an `io::Error` with a path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: path.into(),
        }
    }

    /// True for errors that abort the current sample but not the whole run.
    pub fn is_sample_fatal(&self) -> bool {
        matches!(self, Self::ContigNotFound { .. } | Self::Bam(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            source: err,
            path: PathBuf::from("<unknown>"),
        }
    }
}
