// ABOUTME: Error type surfaced by engine clients.
// ABOUTME: Classifies engine failures into not-found, conflict, transport, and engine errors.

/// Errors from engine API calls.
///
/// Variants are chosen so callers can tell a missing resource from a state
/// conflict or an unreachable daemon without parsing messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("engine error: {0}")]
    Engine(String),
}

impl EngineError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, EngineError::Conflict(_))
    }
}
