use thiserror::Error;

use crate::shared::InstrumentRole;

/// Anything that stops the audio graph from being built or connected.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{stage}: invalid parameter: {reason}")]
    InvalidParameter { stage: &'static str, reason: String },

    #[error("{stage} did not become ready within {waited_ms} ms")]
    Timeout { stage: &'static str, waited_ms: u128 },

    #[error("{stage} is not ready and can't be connected yet")]
    NotReady { stage: &'static str },

    #[error("{stage} worker failed: {reason}")]
    Worker { stage: &'static str, reason: String },

    #[error("building the {role:?} voice failed: {source}")]
    Instrument {
        role: InstrumentRole,
        #[source]
        source: Box<BuildError>,
    },
}

impl BuildError {
    pub fn for_role(self, role: InstrumentRole) -> Self {
        BuildError::Instrument {
            role,
            source: Box::new(self),
        }
    }
}
