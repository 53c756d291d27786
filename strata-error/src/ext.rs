use crate::{ErrString, StrataResult};

/// Extension trait for [`StrataResult`].
pub trait ResultExt<T>: private::Sealed {
    /// Wrap the error, if any, with an additional context message.
    fn with_context<F, M>(self, msg: F) -> StrataResult<T>
    where
        F: FnOnce() -> M,
        M: Into<ErrString>;
}

mod private {
    use crate::StrataResult;

    pub trait Sealed {}

    impl<T> Sealed for StrataResult<T> {}
}

impl<T> ResultExt<T> for StrataResult<T> {
    fn with_context<F, M>(self, msg: F) -> StrataResult<T>
    where
        F: FnOnce() -> M,
        M: Into<ErrString>,
    {
        self.map_err(|e| e.with_context(msg()))
    }
}
