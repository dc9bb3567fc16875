//! Correlation for submission cycles

use uuid::Uuid;

/// Random identifier tying together the log lines of one submit-and-confirm cycle
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Span for one submit-and-confirm cycle
///
/// `signature` starts empty and is recorded once the network assigns an id.
pub fn cycle_span(correlation_id: &CorrelationId, commitment: &str) -> tracing::Span {
    tracing::info_span!(
        "submit_cycle",
        correlation_id = %correlation_id,
        commitment = commitment,
        signature = tracing::field::Empty,
    )
}
