//! Terminal disposition outcomes reported back to the sender.

use std::fmt;

use fe2o3_amqp_types::{
    definitions::{self, ErrorCondition, Fields},
    messaging::{Accepted, Modified, Outcome, Rejected, Released},
};

/// The terminal settlement communicated to the peer for one delivery.
///
/// An outcome is constructed per settlement call, handed to the engine, and
/// discarded; nothing is retained.
#[derive(Debug, Clone)]
pub enum DispositionOutcome {
    /// The delivery was processed successfully
    Accepted,

    /// The delivery was not and will not be processed; the sender may
    /// redeliver it elsewhere
    Released,

    /// The delivery is invalid and the sender should not retry it as-is
    Rejected {
        /// Error condition communicated to the peer
        condition: ErrorCondition,
        /// Optional human-readable detail
        description: Option<String>,
    },

    /// The delivery was not processed but was modified in transit
    Modified {
        /// The delivery attempt counted as a failure
        delivery_failed: bool,
        /// The message must not be redelivered to this receiver
        undeliverable_here: bool,
        /// Peer-defined metadata attached to the outcome
        annotations: Option<Fields>,
    },
}

impl DispositionOutcome {
    /// The outcome's kind, without its payload. Carried in error reports.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Accepted => OutcomeKind::Accepted,
            Self::Released => OutcomeKind::Released,
            Self::Rejected { .. } => OutcomeKind::Rejected,
            Self::Modified { .. } => OutcomeKind::Modified,
        }
    }

    /// Render the outcome as the wire-level composite.
    ///
    /// Engines that speak the real AMQP types can hand this straight to
    /// their disposition frame.
    pub fn to_outcome(&self) -> Outcome {
        match self {
            Self::Accepted => Outcome::Accepted(Accepted {}),
            Self::Released => Outcome::Released(Released {}),
            Self::Rejected {
                condition,
                description,
            } => Outcome::Rejected(Rejected {
                error: Some(definitions::Error::new(
                    condition.clone(),
                    description.clone(),
                    None,
                )),
            }),
            Self::Modified {
                delivery_failed,
                undeliverable_here,
                annotations,
            } => Outcome::Modified(Modified {
                delivery_failed: Some(*delivery_failed),
                undeliverable_here: Some(*undeliverable_here),
                message_annotations: annotations.clone(),
            }),
        }
    }
}

/// Discriminant of [`DispositionOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    /// An accepted outcome
    Accepted,
    /// A released outcome
    Released,
    /// A rejected outcome
    Rejected,
    /// A modified outcome
    Modified,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Accepted => "accepted",
            Self::Released => "released",
            Self::Rejected => "rejected",
            Self::Modified => "modified",
        };
        write!(f, "{name}")
    }
}
