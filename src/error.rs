// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Error types shared by every resolver.
//!
//! A single [`Error`] enum covers the whole crate. Each variant belongs to
//! exactly one [`ErrorKind`], which is what callers usually branch on:
//!
//! | Kind | Raised when |
//! |------|-------------|
//! | [`ErrorKind::Configuration`] | coordinates are missing or out of range |
//! | [`ErrorKind::Evaluation`] | a source descriptor cannot produce a value |
//! | [`ErrorKind::NoValidWeekday`] | the weekday filter excludes every day |
//! | [`ErrorKind::UnknownOperator`] | a comparison operator is not recognised |
//! | [`ErrorKind::Format`] | date text or an output pattern is unusable |
//!
//! The time family reports ordinary failures through
//! [`ResolvedTime::error`](crate::ResolvedTime) instead of returning `Err`, so
//! the same type travels both ways.

use thiserror::Error;

/// Result type alias for resolver operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Taxonomy class of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Evaluation,
    NoValidWeekday,
    UnknownOperator,
    Format,
}

/// Invalid or missing observer coordinates.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinateError {
    #[error("longitude is missing or outside -180..=180 (got {0})")]
    LongitudeMissing(f64),

    #[error("latitude is missing or outside -90..=90 (got {0})")]
    LatitudeMissing(f64),

    /// Both components are exactly zero, which is how "unset" is encoded.
    #[error("coordinates are not configured")]
    CoordinatesMissing,
}

/// Errors produced while resolving descriptors, comparing values or
/// computing positions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid position configuration: {0}")]
    Configuration(#[from] CoordinateError),

    /// The descriptor kind is empty or not one this resolver handles.
    #[error("wrong type \"{kind}\"=\"{value}\"")]
    WrongType { kind: String, value: String },

    #[error("property {kind}.{value} could not be evaluated")]
    NotEvaluable { kind: String, value: String },

    #[error("the value of {kind}.{value} is not a valid number")]
    NotANumber { kind: String, value: String },

    #[error("lookup of {kind}.{value} failed: {message}")]
    Lookup {
        kind: String,
        value: String,
        message: String,
    },

    #[error("No valid time for {event} found")]
    NoValidTime { event: String },

    #[error("Can not get time for {kind}={value}")]
    Unresolvable { kind: String, value: String },

    /// The ephemeris returned a non-finite quantity.
    #[error("{0} could not be calculated")]
    NotCalculable(&'static str),

    /// An offset or day shift left the range of representable instants.
    #[error("shifted time is out of range")]
    OutOfRange,

    #[error("No valid Days given")]
    NoValidDays,

    #[error("No valid day of week found")]
    NoValidWeekday,

    #[error("unknown compare operator \"{0}\"")]
    UnknownOperator(String),

    #[error("could not interpret \"{text}\" as a date")]
    Format { text: String },

    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Taxonomy class of this error; wrapped errors report their cause's class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::WrongType { .. }
            | Error::NotEvaluable { .. }
            | Error::NotANumber { .. }
            | Error::Lookup { .. }
            | Error::NoValidTime { .. }
            | Error::Unresolvable { .. }
            | Error::NotCalculable(_)
            | Error::OutOfRange => ErrorKind::Evaluation,
            Error::NoValidDays | Error::NoValidWeekday => ErrorKind::NoValidWeekday,
            Error::UnknownOperator(_) => ErrorKind::UnknownOperator,
            Error::Format { .. } => ErrorKind::Format,
            Error::WithContext { source, .. } => source.kind(),
        }
    }

    /// Wrap this error with additional context, keeping it as the source.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error of a [`Error::WithContext`] chain.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::WithContext { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub(crate) fn not_evaluable(kind: impl ToString, value: impl Into<String>) -> Self {
        Error::NotEvaluable {
            kind: kind.to_string(),
            value: value.into(),
        }
    }
}
