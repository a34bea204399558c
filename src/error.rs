//! Errors raised while turning .bvh text into a [`Bvh`](crate::types::Bvh).
//!
//! Every token-level error carries the index of the token where it was
//! detected, so a broken capture file can be inspected with the token stream
//! at hand.

use thiserror::Error;

/// What `found` reads when the token stream ran out.
pub const END_OF_INPUT: &str = "end of input";

/// Errors that can occur while parsing a .bvh document.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// `HIERARCHY` or `MOTION` missing or out of position.
    #[error("malformed header at token {position}: expected `{expected}`, found `{found}`")]
    MalformedHeader {
        expected: &'static str,
        found: String,
        position: usize,
    },

    /// A structural token of a joint or End Site block is missing or misplaced.
    #[error("malformed block at token {position}: expected `{expected}`, found `{found}`")]
    MalformedBlock {
        expected: &'static str,
        found: String,
        position: usize,
    },

    /// A token inside an open block is none of `JOINT`, `End` or `}`.
    #[error("unexpected token `{token}` at token {position}: expected `JOINT`, `End` or `}}`")]
    UnexpectedToken { token: String, position: usize },

    #[error("malformed motion header at token {position}: expected `{expected}`, found `{found}`")]
    MalformedMotionHeader {
        expected: &'static str,
        found: String,
        position: usize,
    },

    /// The motion data ended before every declared frame was filled.
    #[error("motion data truncated at token {position}: frame {frame} ended early at joint `{joint}`")]
    TruncatedData {
        frame: usize,
        joint: String,
        position: usize,
    },

    /// Tokens are left over after every declared frame was decoded.
    #[error("{remaining} unexpected trailing token(s) starting at token {position}")]
    TrailingData { remaining: usize, position: usize },

    #[error("invalid {expected} `{token}` at token {position}")]
    NumericFormat {
        expected: &'static str,
        token: String,
        position: usize,
    },
}

impl ParseError {
    /// Index of the token the error was detected at, if it is a token-level error.
    pub fn position(&self) -> Option<usize> {
        match self {
            ParseError::Io(_) => None,
            ParseError::MalformedHeader { position, .. }
            | ParseError::MalformedBlock { position, .. }
            | ParseError::UnexpectedToken { position, .. }
            | ParseError::MalformedMotionHeader { position, .. }
            | ParseError::TruncatedData { position, .. }
            | ParseError::TrailingData { position, .. }
            | ParseError::NumericFormat { position, .. } => Some(*position),
        }
    }
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;
