use std::{borrow::Cow, fmt, panic::Location};

/// Error message that remembers where it was raised.
///
/// Build one with [`DiagnosticMessage::new`] or the [`diag!`] macro; both
/// capture the caller location so the rendered error points at the code that
/// gave up rather than at the conversion glue.
#[derive(Clone, Debug)]
pub struct DiagnosticMessage {
    message: Cow<'static, str>,
    location: &'static Location<'static>,
}

impl DiagnosticMessage {
    #[track_caller]
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
            location: Location::caller(),
        }
    }

    pub fn message(&self) -> &str {
        self.message.as_ref()
    }

    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

impl fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (at {}:{})",
            self.message,
            self.location.file(),
            self.location.line()
        )
    }
}

/// `format!`-style constructor for [`DiagnosticMessage`].
#[macro_export]
macro_rules! diag {
    ($msg:literal $(,)?) => {
        $crate::error::diagnostics::DiagnosticMessage::new($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::diagnostics::DiagnosticMessage::new(format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_the_call_site() {
        let msg = DiagnosticMessage::new("stream missing");
        assert_eq!(msg.message(), "stream missing");
        assert!(msg.location().file().ends_with("diagnostics.rs"));
        assert!(msg.to_string().starts_with("stream missing (at "));
    }

    #[test]
    fn macro_formats_arguments() {
        let msg = diag!("pipeline `{}` not found", "orders");
        assert_eq!(msg.message(), "pipeline `orders` not found");
    }
}
