//! Trait abstraction over the protocol engine that owns the native
//! receiver resource.
//!
//! The engine is an external collaborator: it runs its own processing loop,
//! owns the link/session/connection plumbing, and calls back into the hooks
//! registered here. Everything the receiver needs from it is captured by
//! [`ReceiverEngine`].

use std::fmt;

use fe2o3_amqp_types::definitions::DeliveryNumber;

use crate::link::{DispositionOutcome, LinkState};

/// Failure signal from the protocol engine.
///
/// Engine calls report only that the requested protocol action did not
/// succeed. An engine may enrich the signal with a description; nothing
/// further is guaranteed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineRejected {
    /// Optional engine-supplied detail.
    pub description: Option<String>,
}

impl EngineRejected {
    /// A rejection without further detail.
    pub fn new() -> Self {
        Self { description: None }
    }

    /// A rejection enriched with an engine-supplied description.
    pub fn with_description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
        }
    }
}

impl fmt::Display for EngineRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => {
                write!(f, "requested protocol action did not succeed: {description}")
            }
            None => write!(f, "requested protocol action did not succeed"),
        }
    }
}

impl std::error::Error for EngineRejected {}

/// Hook invoked by the engine on its processing loop whenever the receiver
/// transitions, carrying the `(previous, new)` state pair.
///
/// Exactly one such hook is registered per receiver resource, at creation
/// time, so engine-pushed transitions are deliverable before the link is
/// ever opened.
pub type StateHook = Box<dyn FnMut(LinkState, LinkState) + Send>;

/// Hook invoked by the engine on its processing loop once per arriving
/// message.
///
/// The handle passed in is transient: it is only valid for the duration of
/// the call, and the hook must clone it before handing anything to the
/// application. Exactly one such hook is registered per receiver resource,
/// when the link is opened.
pub type MessageHook<M> = Box<dyn FnMut(&M) + Send>;

/// Operations a protocol engine provides on a receiver resource.
///
/// Implementations are expected to be cheap handles onto the engine, with
/// whatever internal synchronization the engine needs; all methods take
/// `&self`. The [`MessageReceiver`](crate::MessageReceiver) additionally
/// serializes every call that touches a given resource behind one exclusive
/// lock, so an engine will never see two concurrent calls for the same
/// resource through this crate.
pub trait ReceiverEngine {
    /// Opaque handle to a link already attached at the session layer. Only
    /// read at creation time.
    type Link;

    /// Native receiver resource allocated by
    /// [`create_receiver`](Self::create_receiver).
    type Resource;

    /// Transient message handle. Cloning yields an independently owned copy
    /// that outlives the engine's original.
    type Message: Clone + Send + 'static;

    /// Opaque disposition value. Construction and release are paired per
    /// settlement call; release happens when the value is dropped.
    type Disposition;

    /// Allocate a receiver resource bound to `link`, registering the
    /// resource's one state-change hook.
    fn create_receiver(
        &self,
        link: &Self::Link,
        on_state: StateHook,
    ) -> Result<Self::Resource, EngineRejected>;

    /// The name the link was attached under, used to qualify disposition
    /// frames.
    fn link_name(&self, resource: &Self::Resource) -> Result<String, EngineRejected>;

    /// Start the link, registering the resource's one message-arrival hook.
    ///
    /// Opening an already-open resource is a protocol violation and must be
    /// rejected by the engine, not ignored.
    fn open(
        &self,
        resource: &Self::Resource,
        on_message: MessageHook<Self::Message>,
    ) -> Result<(), EngineRejected>;

    /// Stop the link. Once this returns `Ok`, the arrival hook fires no
    /// more.
    fn close(&self, resource: &Self::Resource) -> Result<(), EngineRejected>;

    /// Release the resource. Infallible by contract.
    fn destroy(&self, resource: Self::Resource);

    /// Delivery number of the most recently received message, or `None`
    /// when the engine has nothing to report yet.
    fn last_delivery_number(&self, resource: &Self::Resource) -> Option<DeliveryNumber>;

    /// Construct the engine's native disposition value for `outcome`.
    fn new_disposition(
        &self,
        outcome: &DispositionOutcome,
    ) -> Result<Self::Disposition, EngineRejected>;

    /// Hand a disposition frame for `delivery_number` on the link named
    /// `link_name` to the engine for transmission.
    ///
    /// Fire-and-forget: `Ok` means the frame was handed over, not that the
    /// peer processed it. Unknown or already-settled delivery numbers are
    /// rejected by the engine.
    fn send_disposition(
        &self,
        resource: &Self::Resource,
        link_name: &str,
        delivery_number: DeliveryNumber,
        disposition: &Self::Disposition,
    ) -> Result<(), EngineRejected>;
}
