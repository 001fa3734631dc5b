//! Callback token codec
//!
//! Inline buttons carry a short text payload: a prefix followed by positional
//! arguments, joined by `|`. [`route::Route`] gives the payloads a typed shape.

pub mod route;

#[cfg(test)]
mod proptests;

pub use route::{ActivityField, MonthChoice, PollField, Route, VoteIntent, WorkplanAction};

use thiserror::Error;

/// Separator between prefix and arguments
pub const SEPARATOR: char = '|';

/// Platform limit on callback payload size
pub const MAX_TOKEN_BYTES: usize = 64;

/// Decoded callback payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackToken {
    pub prefix: String,
    pub args: Vec<String>,
}

impl CallbackToken {
    /// Positional argument, if present
    #[allow(dead_code)] // Used by tests
    pub fn arg(&self, idx: usize) -> Option<&str> {
        self.args.get(idx).map(String::as_str)
    }

    /// Reject tokens carrying fewer than `n` arguments
    pub fn expect_args(&self, n: usize) -> Result<&[String], CallbackError> {
        if self.args.len() < n {
            return Err(CallbackError::MissingArgs {
                prefix: self.prefix.clone(),
                expected: n,
                found: self.args.len(),
            });
        }
        Ok(&self.args)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallbackError {
    #[error("Unknown callback prefix: {0}")]
    UnknownPrefix(String),
    #[error("Callback {prefix} expects {expected} args, got {found}")]
    MissingArgs {
        prefix: String,
        expected: usize,
        found: usize,
    },
    #[error("Invalid callback argument {value:?} for {prefix}")]
    InvalidArg { prefix: String, value: String },
}

/// Join prefix and args. No escaping: callers keep `|` out of both.
pub fn encode<S: AsRef<str>>(prefix: &str, args: &[S]) -> String {
    let mut token = String::from(prefix);
    for arg in args {
        token.push(SEPARATOR);
        token.push_str(arg.as_ref());
    }
    token
}

/// Split a payload into prefix and args. Never fails.
pub fn decode(token: &str) -> CallbackToken {
    let mut parts = token.split(SEPARATOR);
    let prefix = parts.next().unwrap_or_default().to_string();
    CallbackToken {
        prefix,
        args: parts.map(String::from).collect(),
    }
}
