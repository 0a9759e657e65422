#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FailureKind {
    AuthRequired,
    RateLimited(String),
    Generic,
}

/// A failure shown next to the widget that caused it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InlineError {
    pub kind: FailureKind,
    pub message: String,
}

impl InlineError {
    pub fn new(kind: FailureKind, fallback: impl Into<String>) -> Self {
        let message = match &kind {
            FailureKind::AuthRequired => "Please log in to continue.".to_string(),
            FailureKind::RateLimited(message) => message.clone(),
            FailureKind::Generic => fallback.into(),
        };
        Self { kind, message }
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Generic,
            message: message.into(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self.kind, FailureKind::RateLimited(_))
    }
}

/// Per-widget error state. Rate-limit notices survive new submissions and
/// are only cleared by a success.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ErrorSlot {
    current: Option<InlineError>,
}

impl ErrorSlot {
    pub fn get(&self) -> Option<&InlineError> {
        self.current.as_ref()
    }

    pub fn on_submit(&mut self) {
        if !self.current.as_ref().is_some_and(InlineError::is_rate_limited) {
            self.current = None;
        }
    }

    pub fn on_success(&mut self) {
        self.current = None;
    }

    pub fn on_failure(&mut self, error: InlineError) {
        self.current = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_message_persists_until_success() {
        let mut slot = ErrorSlot::default();
        slot.on_failure(InlineError::new(
            FailureKind::RateLimited("Try again in 30s".to_string()),
            "ignored",
        ));
        slot.on_submit();
        assert_eq!(slot.get().map(|e| e.message.as_str()), Some("Try again in 30s"));

        slot.on_success();
        assert_eq!(slot.get(), None);
    }

    #[test]
    fn generic_errors_clear_on_next_submit() {
        let mut slot = ErrorSlot::default();
        slot.on_failure(InlineError::generic("Failed to load"));
        slot.on_submit();
        assert_eq!(slot.get(), None);
    }

    #[test]
    fn auth_required_uses_login_prompt() {
        let error = InlineError::new(FailureKind::AuthRequired, "unused");
        assert_eq!(error.message, "Please log in to continue.");
    }
}
