/// Result of a collaborator step that has a local degradation path.
///
/// `Fallback` carries the reason the parsed value is unavailable; the call
/// site decides how to degrade.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Parsed(T),
    Fallback(String),
}

impl<T> Outcome<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Outcome::Fallback(_))
    }

    /// Resolves the outcome, computing the degraded value from the reason.
    pub fn unwrap_or_else_reason(self, f: impl FnOnce(&str) -> T) -> T {
        match self {
            Outcome::Parsed(value) => value,
            Outcome::Fallback(reason) => f(&reason),
        }
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for Outcome<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Parsed(value),
            Err(e) => Outcome::Fallback(e.to_string()),
        }
    }
}
