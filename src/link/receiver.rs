//! Receiver link wrapper over a protocol engine resource.

use std::{
    fmt,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

use fe2o3_amqp_types::definitions::{ErrorCondition, Fields};
use parking_lot::Mutex;
use tracing::{debug, error, trace};

use crate::endpoint::{MessageHook, ReceiverEngine, StateHook};

use super::{
    disposition::DispositionOutcome,
    error::{DeliveryNumberError, DispositionError, DispositionErrorKind, LinkStateError},
    handler::{MessageSink, StateObserver},
    state::LinkState,
    DeliveryNumber,
};

/// A message receiver bound to an already-attached AMQP link.
///
/// The receiver owns at most one native resource of the engine `E` and
/// drives it through create → open → close → destroy. Engine-reported
/// lifecycle transitions and arriving messages are forwarded to the
/// owner's callbacks; deliveries are settled explicitly, by delivery
/// number, through [`accept`](Self::accept), [`release`](Self::release),
/// [`reject`](Self::reject) and [`modify`](Self::modify).
///
/// # Example
///
/// ```rust,ignore
/// let receiver = MessageReceiver::new(engine);
/// receiver.create(&link, None)?;
/// receiver.open(MessageSink::callback(|message| queue.push(message)))?;
///
/// // later, from any thread
/// receiver.accept(receiver.last_received_delivery_number()?)?;
/// ```
///
/// # Threading
///
/// All methods take `&self` and may be called from any thread. One
/// exclusive lock guards the engine resource, so lifecycle and settlement
/// calls are serialized against each other; `destroy` consequently waits
/// for any in-flight settlement before releasing the resource. The
/// engine-driven hooks never hold that lock while invoking the owner's
/// callbacks, so a callback may itself settle deliveries.
pub struct MessageReceiver<E: ReceiverEngine> {
    engine: E,

    // Exclusive access to the engine resource and the link name cached
    // alongside it. `None` before `create` and after `destroy`.
    live: Mutex<Option<LiveResource<E>>>,

    // Shared with the state hook handed to the engine.
    state: Arc<Mutex<LinkState>>,
}

struct LiveResource<E: ReceiverEngine> {
    resource: E::Resource,
    link_name: String,
}

impl<E: ReceiverEngine> MessageReceiver<E> {
    /// A receiver with no underlying resource yet. Call
    /// [`create`](Self::create) to bind one.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            live: Mutex::new(None),
            state: Arc::new(Mutex::new(LinkState::Uncreated)),
        }
    }

    /// Bind to an existing, externally-owned link and allocate the
    /// receiver resource, registering `observer` for engine-reported
    /// transitions.
    ///
    /// A previously held resource is destroyed first; re-creation
    /// replaces, never leaks. The observer is registered with the engine
    /// at creation time, so transitions pushed by the peer are deliverable
    /// even if the link is never opened.
    pub fn create(
        &self,
        link: &E::Link,
        observer: Option<Box<dyn StateObserver>>,
    ) -> Result<(), LinkStateError> {
        let mut live = self.live.lock();

        if let Some(previous) = live.take() {
            debug!(link_name = %previous.link_name, "replacing receiver resource");
            self.engine.destroy(previous.resource);
            *self.state.lock() = LinkState::Uncreated;
        }

        let hook = state_hook(Arc::clone(&self.state), observer);
        let resource = self
            .engine
            .create_receiver(link, hook)
            .map_err(LinkStateError::ResourceAllocation)?;

        let link_name = match self.engine.link_name(&resource) {
            Ok(name) => name,
            Err(source) => {
                // Settlement is qualified by the link name; a nameless
                // resource is unusable and must not be kept.
                self.engine.destroy(resource);
                return Err(LinkStateError::LinkNameUnavailable(source));
            }
        };

        *self.state.lock() = LinkState::Created;
        debug!(link_name = %link_name, "receiver created");
        *live = Some(LiveResource {
            resource,
            link_name,
        });
        Ok(())
    }

    /// Start receiving, delivering each arriving message to `sink` exactly
    /// once, in arrival order.
    ///
    /// The engine's transient message handle is cloned before it crosses
    /// to the sink; the clone is owned by the application. Receiving a
    /// message does not settle it.
    ///
    /// Opening twice without an intervening close is a protocol violation;
    /// the engine's rejection is passed through, never swallowed.
    pub fn open(&self, sink: MessageSink<E::Message>) -> Result<(), LinkStateError> {
        let live = self.live.lock();
        let live = live.as_ref().ok_or(LinkStateError::ResourceNotHeld {
            operation: "open",
        })?;

        self.engine
            .open(&live.resource, arrival_hook(sink))
            .map_err(|source| LinkStateError::Rejected {
                operation: "open",
                source,
            })
    }

    /// Stop receiving without releasing the resource. No message callbacks
    /// occur after this returns.
    pub fn close(&self) -> Result<(), LinkStateError> {
        let live = self.live.lock();
        let live = live.as_ref().ok_or(LinkStateError::ResourceNotHeld {
            operation: "close",
        })?;

        self.engine
            .close(&live.resource)
            .map_err(|source| LinkStateError::Rejected {
                operation: "close",
                source,
            })
    }

    /// Release the underlying resource.
    ///
    /// Never fails; a receiver holding no resource is left untouched.
    /// Calling it repeatedly is safe, and it also runs on drop. After a
    /// destroy, every operation except a new [`create`](Self::create)
    /// fails.
    pub fn destroy(&self) {
        let mut live = self.live.lock();
        if let Some(live) = live.take() {
            debug!(link_name = %live.link_name, "receiver destroyed");
            self.engine.destroy(live.resource);
            *self.state.lock() = LinkState::Destroyed;
        }
    }

    /// Current lifecycle state: set locally on create and destroy, updated
    /// from engine-reported transitions in between.
    pub fn state(&self) -> LinkState {
        *self.state.lock()
    }

    /// Name the link was attached under, cached at creation time. `None`
    /// while no resource is held.
    pub fn link_name(&self) -> Option<String> {
        self.live.lock().as_ref().map(|live| live.link_name.clone())
    }

    /// Delivery number of the most recently received message.
    ///
    /// This is queried from the engine, never cached, so it cannot go
    /// stale. An empty link (nothing received yet) is an error, not a
    /// default value.
    pub fn last_received_delivery_number(&self) -> Result<DeliveryNumber, DeliveryNumberError> {
        let live = self.live.lock();
        let live = live.as_ref().ok_or(DeliveryNumberError::ResourceNotHeld)?;

        self.engine
            .last_delivery_number(&live.resource)
            .ok_or(DeliveryNumberError::NothingReceived)
    }

    /// Settle `delivery_number` as accepted.
    pub fn accept(&self, delivery_number: DeliveryNumber) -> Result<(), DispositionError> {
        self.dispose(delivery_number, DispositionOutcome::Accepted)
    }

    /// Settle `delivery_number` as released back to the sender.
    pub fn release(&self, delivery_number: DeliveryNumber) -> Result<(), DispositionError> {
        self.dispose(delivery_number, DispositionOutcome::Released)
    }

    /// Settle `delivery_number` as rejected, carrying `condition` and an
    /// optional description to the peer.
    pub fn reject(
        &self,
        delivery_number: DeliveryNumber,
        condition: impl Into<ErrorCondition>,
        description: impl Into<Option<String>>,
    ) -> Result<(), DispositionError> {
        self.dispose(
            delivery_number,
            DispositionOutcome::Rejected {
                condition: condition.into(),
                description: description.into(),
            },
        )
    }

    /// Settle `delivery_number` as modified.
    pub fn modify(
        &self,
        delivery_number: DeliveryNumber,
        delivery_failed: bool,
        undeliverable_here: bool,
        annotations: impl Into<Option<Fields>>,
    ) -> Result<(), DispositionError> {
        self.dispose(
            delivery_number,
            DispositionOutcome::Modified {
                delivery_failed,
                undeliverable_here,
                annotations: annotations.into(),
            },
        )
    }

    /// Construct the disposition value, hand it to the engine qualified by
    /// the cached link name and `delivery_number`, and drop it afterwards
    /// whether or not the send succeeded.
    ///
    /// Fire-and-forget: `Ok` means the frame was handed to the engine for
    /// transmission, not that the peer processed it. Nothing is retried.
    fn dispose(
        &self,
        delivery_number: DeliveryNumber,
        outcome: DispositionOutcome,
    ) -> Result<(), DispositionError> {
        let outcome_kind = outcome.kind();
        let annotate = |kind| DispositionError {
            delivery_number,
            outcome: outcome_kind,
            kind,
        };

        let live = self.live.lock();
        let live = live
            .as_ref()
            .ok_or_else(|| annotate(DispositionErrorKind::ResourceNotHeld))?;

        let disposition = self
            .engine
            .new_disposition(&outcome)
            .map_err(|source| annotate(DispositionErrorKind::Construct(source)))?;

        // The constructed value lives to the end of this scope and no
        // further, on the success and failure paths alike.
        self.engine
            .send_disposition(
                &live.resource,
                &live.link_name,
                delivery_number,
                &disposition,
            )
            .map_err(|source| annotate(DispositionErrorKind::Rejected(source)))
    }
}

impl<E: ReceiverEngine> Drop for MessageReceiver<E> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<E: ReceiverEngine> fmt::Debug for MessageReceiver<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageReceiver")
            .field("state", &self.state())
            .field("link_name", &self.live.lock().as_ref().map(|l| &*l.link_name))
            .finish_non_exhaustive()
    }
}

/// The state-change hook handed to the engine at creation time.
///
/// Updates the cached state, then forwards the `(previous, new)` pair to
/// the observer. A panicking observer is contained here; it must never
/// unwind into the engine's processing loop.
fn state_hook(
    state: Arc<Mutex<LinkState>>,
    mut observer: Option<Box<dyn StateObserver>>,
) -> StateHook {
    Box::new(move |previous, new| {
        *state.lock() = new;
        debug!(?previous, ?new, "receiver state changed");

        if let Some(observer) = observer.as_mut() {
            let notified =
                catch_unwind(AssertUnwindSafe(|| observer.on_state_changed(previous, new)));
            if notified.is_err() {
                error!(?previous, ?new, "state observer panicked, notification dropped");
            }
        }
    })
}

/// The message-arrival hook handed to the engine at open time.
///
/// Clones the transient handle before it is invalidated, then delivers the
/// owned clone to the sink exactly once. A panicking sink is contained
/// here for the same reason as above.
fn arrival_hook<M>(mut sink: MessageSink<M>) -> MessageHook<M>
where
    M: Clone + Send + 'static,
{
    Box::new(move |message| {
        let owned = message.clone();
        trace!("delivering message clone to the application");

        let delivered = catch_unwind(AssertUnwindSafe(|| sink.deliver(owned)));
        if delivered.is_err() {
            error!("message sink panicked, delivery dropped");
        }
    })
}
