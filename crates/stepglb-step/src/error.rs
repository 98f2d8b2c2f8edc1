//! Failures while reading a STEP document.

use thiserror::Error;

/// Why a STEP document could not be read.
#[derive(Error, Debug)]
pub enum StepError {
    /// The file could not be read from disk.
    #[error("cannot read STEP file: {0}")]
    Io(#[from] std::io::Error),

    /// Bytes that do not form a Part 21 token.
    #[error("bad token at {line}:{col}: {message}")]
    Lexer {
        /// 1-based line.
        line: usize,
        /// 1-based column.
        col: usize,
        /// What was wrong.
        message: String,
    },

    /// Tokens that do not form a Part 21 exchange structure.
    #[error("malformed STEP{}: {message}", entity_id.map(|id| format!(" in #{id}")).unwrap_or_default())]
    Parser {
        /// Instance being parsed or decoded, when known.
        entity_id: Option<u64>,
        /// What was wrong.
        message: String,
    },

    /// A `#id` reference with no matching instance.
    #[error("reference to undefined instance #{0}")]
    MissingEntity(u64),

    /// Geometry the reader cannot use, such as a zero direction.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Topology the reader cannot use, such as a face without bounds.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// A reference points at an instance of the wrong entity type.
    #[error("expected {expected}, found {actual}")]
    TypeMismatch {
        /// Entity type the reader needed.
        expected: String,
        /// Entity type actually present.
        actual: String,
    },

    /// The document holds no solid or surface model to convert.
    #[error("no solid or surface model in STEP data")]
    NoSolids,
}

impl StepError {
    pub(crate) fn lexer(line: usize, col: usize, message: impl Into<String>) -> Self {
        Self::Lexer {
            line,
            col,
            message: message.into(),
        }
    }

    pub(crate) fn parser(entity_id: Option<u64>, message: impl Into<String>) -> Self {
        Self::Parser {
            entity_id,
            message: message.into(),
        }
    }

    pub(crate) fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
