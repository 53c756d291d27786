#![deny(missing_docs)]

//! Error taxonomy for the Strata access layer.
//!
//! Every fallible operation in the workspace returns a [`StrataResult`]. The
//! variants of [`StrataError`] mirror the failure classes callers are expected
//! to distinguish: schema, capacity, lifecycle and open-mode violations are
//! all actionable by the caller, while [`StrataError::Engine`] carries a
//! failure surfaced verbatim from the underlying storage engine.

use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};

pub use ext::ResultExt;

mod ext;

/// A string wrapper for error messages, avoiding allocation for static text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrString(Cow<'static, str>);

impl<T> From<T> for ErrString
where
    T: Into<Cow<'static, str>>,
{
    fn from(msg: T) -> Self {
        Self(msg.into())
    }
}

impl Display for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl AsRef<str> for ErrString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The errors raised by the Strata access layer.
#[derive(thiserror::Error, Debug)]
pub enum StrataError {
    /// A requested type, dimension count, or categorical requirement does not
    /// match the on-disk schema.
    #[error("schema violation: {0}")]
    SchemaViolation(ErrString),
    /// An enumeration extension would exceed its index type's representable
    /// range.
    #[error("capacity violation: {0}")]
    CapacityViolation(ErrString),
    /// A shape or domain change is illegal in the array's current state.
    #[error("lifecycle violation: {0}")]
    LifecycleViolation(ErrString),
    /// An operation was invoked on a handle opened in the wrong mode.
    #[error("mode violation: {0}")]
    ModeViolation(ErrString),
    /// An invalid argument was supplied.
    #[error("invalid argument: {0}")]
    InvalidArgument(ErrString),
    /// An internal invariant was broken. These indicate a bug in Strata.
    #[error("internal error: {0}")]
    Internal(ErrString),
    /// The underlying storage engine call failed.
    #[error("engine failure: {0}")]
    Engine(ErrString),
    /// A wrapper that adds context to an inner error.
    #[error("{0}: {1}")]
    Context(ErrString, Box<StrataError>),
}

impl StrataError {
    /// Wrap `self` with an additional context message.
    pub fn with_context<T: Into<ErrString>>(self, msg: T) -> Self {
        Self::Context(msg.into(), Box::new(self))
    }
}

/// A specialized [`Result`] for Strata operations.
pub type StrataResult<T> = Result<T, StrataError>;

/// Construct a [`StrataError`], optionally prefixed with a variant name.
///
/// `strata_err!("bad {}", x)` produces an `InvalidArgument`;
/// `strata_err!(CapacityViolation: "bad {}", x)` selects the variant.
#[macro_export]
macro_rules! strata_err {
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::StrataError::$variant(format!($fmt $(, $arg)*).into())
    };
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::strata_err!(InvalidArgument: $fmt $(, $arg)*)
    };
}

/// Return early with a [`StrataError`], built as by [`strata_err!`].
#[macro_export]
macro_rules! strata_bail {
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {
        return Err($crate::strata_err!($variant: $fmt $(, $arg)*))
    };
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        return Err($crate::strata_err!($fmt $(, $arg)*))
    };
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use crate::{StrataError, StrataResult};

    fn fails() -> StrataResult<()> {
        strata_bail!(CapacityViolation: "{} slots free, {} needed", 2, 3)
    }

    #[test]
    fn bail_selects_variant() {
        let err = fails().unwrap_err();
        assert!(matches!(err, StrataError::CapacityViolation(_)));
        assert_eq!(
            err.to_string(),
            "capacity violation: 2 slots free, 3 needed"
        );
    }

    #[test]
    fn default_variant_is_invalid_argument() {
        let err = strata_err!("ndim {} != {}", 2, 3);
        assert!(matches!(err, StrataError::InvalidArgument(_)));
    }

    #[test]
    fn context_wraps() {
        let err = strata_err!(Engine: "disk on fire").with_context("opening array 'a'");
        assert_eq!(
            err.to_string(),
            "opening array 'a': engine failure: disk on fire"
        );
    }
}
