use std::panic::Location;

pub type AppResult<T, E = AppReport> = core::result::Result<T, E>;

pub struct AppReport {
    inner: eyre::Report,
}

impl AppReport {
    pub fn inner(&self) -> &eyre::Report {
        &self.inner
    }

    pub fn into_inner(self) -> eyre::Report {
        self.inner
    }

    /// The failed device call at the root of this report, if there is one.
    pub fn operation_failed(&self) -> Option<&OperationFailed> {
        self.inner.downcast_ref::<OperationFailed>()
    }

    pub fn wrap_err<D>(self, context: D) -> Self
    where
        D: std::fmt::Display + Send + Sync + 'static,
    {
        Self {
            inner: self.inner.wrap_err(context),
        }
    }
}

impl From<eyre::Report> for AppReport {
    fn from(report: eyre::Report) -> Self {
        Self { inner: report }
    }
}

impl From<OperationFailed> for AppReport {
    fn from(error: OperationFailed) -> Self {
        Self {
            inner: eyre::Report::new(error),
        }
    }
}

impl std::fmt::Display for AppReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.inner, f)
    }
}

impl std::fmt::Debug for AppReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.inner, f)
    }
}

/// A graphics or windowing call that returned a failure status.
///
/// Every device failure in this crate ends up as one of these and is
/// propagated until the process exits; nothing retries.
pub struct OperationFailed {
    operation: &'static str,
    location: &'static Location<'static>,
    code: i32,
    message: String,
}

impl OperationFailed {
    #[track_caller]
    pub fn new(operation: &'static str, code: i32, message: impl Into<String>) -> Self {
        Self {
            operation,
            location: Location::caller(),
            code,
            message: message.into(),
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::error::Error for OperationFailed {}

impl std::fmt::Display for OperationFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} failed in {}; line {}; error: {} (0x{:08X})",
            self.operation,
            self.location.file(),
            self.location.line(),
            self.message,
            self.code as u32
        )
    }
}

impl std::fmt::Debug for OperationFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

#[cfg(windows)]
impl From<windows::core::Error> for AppReport {
    #[track_caller]
    fn from(error: windows::core::Error) -> Self {
        OperationFailed::new("windows api call", error.code().0, error.message()).into()
    }
}

/// Attaches the name of the failing call to a `windows::core::Result`.
#[cfg(windows)]
pub trait CheckOperation<T> {
    fn op(self, operation: &'static str) -> AppResult<T>;
}

#[cfg(windows)]
impl<T> CheckOperation<T> for windows::core::Result<T> {
    #[track_caller]
    fn op(self, operation: &'static str) -> AppResult<T> {
        match self {
            Ok(value) => Ok(value),
            Err(error) => {
                Err(OperationFailed::new(operation, error.code().0, error.message()).into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fails() -> AppResult<()> {
        Err(OperationFailed::new("ResizeBuffers", 0x887A0001u32 as i32, "invalid call").into())
    }

    #[test]
    fn operation_failed_names_the_call_and_location() {
        let report = fails().unwrap_err();
        let failure = report.operation_failed().expect("root cause is preserved");
        assert_eq!(failure.operation(), "ResizeBuffers");
        assert!(failure.location().file().ends_with("error.rs"));

        let text = failure.to_string();
        assert!(text.starts_with("ResizeBuffers failed in "));
        assert!(text.contains("; line "));
        assert!(text.contains("error: invalid call (0x887A0001)"));
    }

    #[test]
    fn context_keeps_the_root_cause() {
        let report = fails().unwrap_err().wrap_err("while resizing");
        assert_eq!(report.to_string(), "while resizing");
        assert!(report.operation_failed().is_some());
    }
}
