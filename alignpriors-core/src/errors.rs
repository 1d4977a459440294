//! Error types for the priors pipeline.
//!
//! Every fatal condition carries the 1-based line number of the offending
//! input so that a failure can be reproduced from the message alone. Soft
//! conditions (out-of-vocabulary drops during index resolution) are return
//! values, not errors.

pub type Result<T, E = PriorsError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum PriorsError {
    /// Mismatched corpus lengths, missing `|||` separator, over-long
    /// sentences and similar shape problems.
    #[error("line {line}: {msg}")]
    InputShape { line: usize, msg: String },

    /// Alignment link index outside the paired sentence.
    #[error("alignment out of bounds in line {line}: ({i}, {j})")]
    Bounds { line: usize, i: u32, j: u32 },

    /// Unrecognized record tag, wrong field count, malformed link token or
    /// non-numeric value.
    #[error("line {line}: invalid record: {content}")]
    Format { line: usize, content: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    PathPersist(#[from] tempfile::PersistError),
}

impl PriorsError {
    pub(crate) fn input_shape<S>(line: usize, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InputShape {
            line,
            msg: msg.into(),
        }
    }

    pub(crate) fn format<S>(line: usize, content: S) -> Self
    where
        S: Into<String>,
    {
        Self::Format {
            line,
            content: content.into(),
        }
    }
}
