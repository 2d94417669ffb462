//! Receiver side of an AMQP 1.0 link.
//!
//! [`MessageReceiver`] is the entry point; the submodules carry its
//! lifecycle state, callback contract, settlement outcomes, and errors.

pub mod disposition;
pub mod error;
pub mod handler;
pub mod receiver;
pub mod state;

pub use disposition::{DispositionOutcome, OutcomeKind};
pub use error::{DeliveryNumberError, DispositionError, DispositionErrorKind, LinkStateError};
pub use handler::{MessageObserver, MessageSink, StateObserver};
pub use receiver::MessageReceiver;
pub use state::LinkState;

/// Per-link sequence identifier assigned to each transferred message, used
/// to address settlement.
pub use fe2o3_amqp_types::definitions::DeliveryNumber;
