//! Error types for receiver link operations.

use fe2o3_amqp_types::definitions::DeliveryNumber;

use crate::endpoint::EngineRejected;

use super::disposition::OutcomeKind;

/// Error of the lifecycle operations `create`, `open` and `close`.
#[derive(Debug, thiserror::Error)]
pub enum LinkStateError {
    /// The operation requires a live receiver resource and none is held,
    /// either because the receiver was never created or because it has been
    /// destroyed
    #[error("no receiver resource is held while attempting {operation}")]
    ResourceNotHeld {
        /// The operation that was attempted
        operation: &'static str,
    },

    /// The engine could not allocate the receiver resource
    #[error("allocating the receiver resource failed")]
    ResourceAllocation(#[source] EngineRejected),

    /// The engine could not report the link name of the freshly bound
    /// resource; the resource has already been released again
    #[error("the link name could not be retrieved")]
    LinkNameUnavailable(#[source] EngineRejected),

    /// The engine rejected the requested lifecycle action
    #[error("the engine rejected {operation}")]
    Rejected {
        /// The operation that was rejected
        operation: &'static str,
        /// Failure signal from the engine
        #[source]
        source: EngineRejected,
    },
}

/// Error querying the most recently received delivery number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryNumberError {
    /// No live receiver resource is held
    #[error("no receiver resource is held")]
    ResourceNotHeld,

    /// The engine has nothing to report, i.e. no delivery has been received
    /// on this link yet
    #[error("no delivery has been received on this link")]
    NothingReceived,
}

/// Failure to settle a delivery.
///
/// Always annotated with the delivery number the settlement addressed and
/// the outcome kind that was being sent.
#[derive(Debug, thiserror::Error)]
#[error("settling delivery {delivery_number} as {outcome} failed")]
pub struct DispositionError {
    /// The delivery number the settlement addressed
    pub delivery_number: DeliveryNumber,

    /// The outcome kind that was being sent
    pub outcome: OutcomeKind,

    /// What went wrong
    #[source]
    pub kind: DispositionErrorKind,
}

/// The ways a settlement call can fail.
#[derive(Debug, thiserror::Error)]
pub enum DispositionErrorKind {
    /// No live receiver resource is held
    #[error("no receiver resource is held")]
    ResourceNotHeld,

    /// The engine failed to construct the disposition value
    #[error("constructing the disposition value failed")]
    Construct(#[source] EngineRejected),

    /// The engine rejected the disposition frame, e.g. the link is not
    /// open or the delivery number is unknown to the peer
    #[error("the engine rejected the disposition frame")]
    Rejected(#[source] EngineRejected),
}
