#![deny(missing_docs, missing_debug_implementations)]

//! The receiving half of an AMQP 1.0 message-transfer link.
//!
//! This crate does **not** establish connections, sessions, or links, and it
//! does not encode frames. All of that is assumed to live in a protocol
//! engine that the caller already owns; the engine is reached through the
//! [`ReceiverEngine`] trait. What the crate provides on top of such an
//! engine is the receiver-side link abstraction:
//!
//! - a [`MessageReceiver`] that owns the engine's native receiver resource
//!   and drives it through create → open → close → destroy,
//! - delivery-number bookkeeping for correlating settlement calls with
//!   received messages,
//! - the four terminal settlement operations (accept, release, reject,
//!   modify) addressed by delivery number,
//! - a callback contract for engine-reported lifecycle transitions and
//!   arriving messages.
//!
//! # Example
//!
//! ```rust,ignore
//! let receiver = MessageReceiver::new(engine);
//! receiver.create(&link, Some(Box::new(observer)))?;
//! receiver.open(MessageSink::callback(|message| {
//!     // the clone handed over here is owned by the application
//! }))?;
//!
//! // settle the most recent delivery
//! let delivery_number = receiver.last_received_delivery_number()?;
//! receiver.accept(delivery_number)?;
//!
//! receiver.close()?;
//! receiver.destroy();
//! ```
//!
//! # Threading
//!
//! The engine invokes the state-change and message-arrival hooks
//! synchronously on its own processing loop; those hooks must not block.
//! Lifecycle and settlement calls may come from any thread and are
//! serialized onto the engine resource by an exclusive lock inside the
//! receiver, so a settlement call never races with the engine reading or
//! mutating the same resource through this wrapper.

pub mod endpoint;
pub mod link;

pub use endpoint::{EngineRejected, ReceiverEngine};
pub use link::{
    DeliveryNumber, DeliveryNumberError, DispositionError, DispositionErrorKind,
    DispositionOutcome, LinkState, LinkStateError, MessageObserver, MessageReceiver, MessageSink,
    OutcomeKind, StateObserver,
};
