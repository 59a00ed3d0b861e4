use std::fmt;

/// Errors surfaced by the generation pipeline and the live runtime.
///
/// Categories rather than bespoke types per module: callers match on the
/// variant to decide whether to re-prompt (config), give up (stage), or
/// simply stop (cancelled).
#[derive(Debug)]
pub enum WorldError {
    /// Unparseable or out-of-range configuration input, with the field name.
    Config { field: String, message: String },
    /// The caller's cancellation token was tripped.
    Cancelled,
    /// A generation stage failed; the pipeline aborted at that stage.
    Stage { stage: &'static str, message: String },
    /// A detectable contract breach (invalid transition, overflow, bad input).
    /// State is never mutated when this is returned.
    Invariant(String),
    /// Persistence failure, propagated as-is.
    Persistence(String),
    /// Pub/sub failure, propagated as-is.
    Messaging(String),
}

impl fmt::Display for WorldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldError::Config { field, message } => {
                write!(f, "Invalid configuration '{}': {}", field, message)
            }
            WorldError::Cancelled => write!(f, "Generation cancelled"),
            WorldError::Stage { stage, message } => {
                write!(f, "Stage '{}' failed: {}", stage, message)
            }
            WorldError::Invariant(msg) => write!(f, "Invariant violation: {}", msg),
            WorldError::Persistence(msg) => write!(f, "Persistence error: {}", msg),
            WorldError::Messaging(msg) => write!(f, "Messaging error: {}", msg),
        }
    }
}

impl std::error::Error for WorldError {}

impl WorldError {
    pub fn config(field: &str, message: impl Into<String>) -> Self {
        WorldError::Config {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn stage(stage: &'static str, message: impl Into<String>) -> Self {
        WorldError::Stage {
            stage,
            message: message.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        WorldError::Invariant(message.into())
    }
}
