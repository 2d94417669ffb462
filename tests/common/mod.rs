#![allow(dead_code)]

//! Scripted in-process protocol engine shared by the integration suites.
//!
//! The engine records every frame handed to it, counts disposition
//! construct/drop pairs, rejects unknown or already-settled delivery
//! numbers, and invalidates its transient message handle as soon as the
//! arrival hook returns, the way a native engine reclaims its buffer.

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use amqp_receiver_link::{
    endpoint::{MessageHook, StateHook},
    DeliveryNumber, DispositionOutcome, EngineRejected, LinkState, ReceiverEngine,
};
use parking_lot::Mutex;

/// Link primitive handed to `create`; carries the name negotiated at
/// attach time.
#[derive(Debug, Clone)]
pub struct FakeLink {
    pub name: String,
}

impl FakeLink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Receiver resource handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeResource(pub u64);

/// Transient message handle. The engine wipes the original once the
/// arrival hook returns; a clone deep-copies the body into its own storage
/// and therefore survives the wipe.
#[derive(Debug)]
pub struct TestMessage {
    slot: Arc<Mutex<Option<String>>>,
}

impl TestMessage {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(body.into()))),
        }
    }

    pub fn body(&self) -> Option<String> {
        self.slot.lock().clone()
    }

    pub fn invalidate(&self) {
        *self.slot.lock() = None;
    }
}

impl Clone for TestMessage {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::new(Mutex::new(self.slot.lock().clone())),
        }
    }
}

/// Construct/drop accounting for disposition values.
#[derive(Debug, Default)]
pub struct DispositionCounters {
    pub constructed: AtomicU32,
    pub dropped: AtomicU32,
}

/// The engine's native disposition value; reports its release to the
/// shared counters on drop.
#[derive(Debug)]
pub struct CountedDisposition {
    pub outcome: DispositionOutcome,
    counters: Arc<DispositionCounters>,
}

impl Drop for CountedDisposition {
    fn drop(&mut self) {
        self.counters.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

/// One disposition frame handed to the engine for transmission.
#[derive(Debug, Clone)]
pub struct SentFrame {
    pub link_name: String,
    pub delivery_number: DeliveryNumber,
    pub outcome: DispositionOutcome,
}

#[derive(Debug, Default)]
struct Shared {
    next_resource_id: u64,
    link_name: String,
    open: bool,
    created: u32,
    destroyed: u32,
    last_delivery_number: Option<DeliveryNumber>,
    unsettled: Vec<DeliveryNumber>,
    frames: Vec<SentFrame>,

    fail_create: bool,
    omit_link_name: bool,
    fail_construct: bool,
    reject_sends: bool,
}

/// The scripted engine. Cheap to clone; all clones share state.
#[derive(Clone, Default)]
pub struct FakeEngine {
    shared: Arc<Mutex<Shared>>,
    state_hook: Arc<Mutex<Option<StateHook>>>,
    message_hook: Arc<Mutex<Option<MessageHook<TestMessage>>>>,
    counters: Arc<DispositionCounters>,
}

impl std::fmt::Debug for FakeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeEngine").finish_non_exhaustive()
    }
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    // -------- scripting --------

    pub fn fail_next_create(&self) {
        self.shared.lock().fail_create = true;
    }

    pub fn omit_link_name(&self) {
        self.shared.lock().omit_link_name = true;
    }

    pub fn fail_disposition_construction(&self) {
        self.shared.lock().fail_construct = true;
    }

    pub fn reject_sends(&self, reject: bool) {
        self.shared.lock().reject_sends = reject;
    }

    /// Engine-initiated transition, e.g. an error pushed by the peer.
    pub fn push_state(&self, previous: LinkState, new: LinkState) {
        let mut hook = self.state_hook.lock().take();
        if let Some(hook) = hook.as_mut() {
            hook(previous, new);
        }
        let mut slot = self.state_hook.lock();
        if slot.is_none() {
            *slot = hook;
        }
    }

    /// Deliver a message through the registered arrival hook, then wipe
    /// the transient handle. Returns the wiped original so tests can
    /// confirm the invalidation took effect.
    pub fn deliver(&self, delivery_number: DeliveryNumber, body: &str) -> TestMessage {
        {
            let mut shared = self.shared.lock();
            shared.last_delivery_number = Some(delivery_number);
            shared.unsettled.push(delivery_number);
        }

        let message = TestMessage::new(body);
        let mut hook = self.message_hook.lock().take();
        if let Some(hook) = hook.as_mut() {
            hook(&message);
        }
        let mut slot = self.message_hook.lock();
        if slot.is_none() {
            *slot = hook;
        }
        drop(slot);

        message.invalidate();
        message
    }

    // -------- inspection --------

    pub fn frames(&self) -> Vec<SentFrame> {
        self.shared.lock().frames.clone()
    }

    pub fn created_count(&self) -> u32 {
        self.shared.lock().created
    }

    pub fn destroyed_count(&self) -> u32 {
        self.shared.lock().destroyed
    }

    pub fn is_open(&self) -> bool {
        self.shared.lock().open
    }

    pub fn constructed_dispositions(&self) -> u32 {
        self.counters.constructed.load(Ordering::SeqCst)
    }

    pub fn dropped_dispositions(&self) -> u32 {
        self.counters.dropped.load(Ordering::SeqCst)
    }
}

impl ReceiverEngine for FakeEngine {
    type Link = FakeLink;
    type Resource = FakeResource;
    type Message = TestMessage;
    type Disposition = CountedDisposition;

    fn create_receiver(
        &self,
        link: &Self::Link,
        on_state: StateHook,
    ) -> Result<Self::Resource, EngineRejected> {
        let id = {
            let mut shared = self.shared.lock();
            if shared.fail_create {
                shared.fail_create = false;
                return Err(EngineRejected::with_description("allocation refused"));
            }
            shared.created += 1;
            shared.link_name = link.name.clone();
            shared.open = false;
            shared.next_resource_id += 1;
            shared.next_resource_id
        };
        *self.state_hook.lock() = Some(on_state);
        Ok(FakeResource(id))
    }

    fn link_name(&self, _resource: &Self::Resource) -> Result<String, EngineRejected> {
        let shared = self.shared.lock();
        if shared.omit_link_name {
            return Err(EngineRejected::new());
        }
        Ok(shared.link_name.clone())
    }

    fn open(
        &self,
        _resource: &Self::Resource,
        on_message: MessageHook<Self::Message>,
    ) -> Result<(), EngineRejected> {
        {
            let mut shared = self.shared.lock();
            if shared.open {
                return Err(EngineRejected::with_description("link already open"));
            }
            shared.open = true;
        }
        *self.message_hook.lock() = Some(on_message);
        self.push_state(LinkState::Created, LinkState::Opened);
        Ok(())
    }

    fn close(&self, _resource: &Self::Resource) -> Result<(), EngineRejected> {
        {
            let mut shared = self.shared.lock();
            if !shared.open {
                return Err(EngineRejected::with_description("link is not open"));
            }
            shared.open = false;
        }
        // No arrival callbacks once close has returned.
        *self.message_hook.lock() = None;
        self.push_state(LinkState::Opened, LinkState::Closed);
        Ok(())
    }

    fn destroy(&self, _resource: Self::Resource) {
        let mut shared = self.shared.lock();
        shared.destroyed += 1;
        shared.open = false;
        drop(shared);
        *self.state_hook.lock() = None;
        *self.message_hook.lock() = None;
    }

    fn last_delivery_number(&self, _resource: &Self::Resource) -> Option<DeliveryNumber> {
        self.shared.lock().last_delivery_number
    }

    fn new_disposition(
        &self,
        outcome: &DispositionOutcome,
    ) -> Result<Self::Disposition, EngineRejected> {
        if self.shared.lock().fail_construct {
            return Err(EngineRejected::with_description("out of memory"));
        }
        self.counters.constructed.fetch_add(1, Ordering::SeqCst);
        Ok(CountedDisposition {
            outcome: outcome.clone(),
            counters: Arc::clone(&self.counters),
        })
    }

    fn send_disposition(
        &self,
        _resource: &Self::Resource,
        link_name: &str,
        delivery_number: DeliveryNumber,
        disposition: &Self::Disposition,
    ) -> Result<(), EngineRejected> {
        let mut shared = self.shared.lock();
        if !shared.open {
            return Err(EngineRejected::with_description("link is not open"));
        }
        if shared.reject_sends {
            return Err(EngineRejected::with_description("transport failure"));
        }
        match shared.unsettled.iter().position(|dn| *dn == delivery_number) {
            Some(index) => {
                // A delivery settles once; a second disposition for the
                // same number is a caller error.
                shared.unsettled.remove(index);
            }
            None => {
                return Err(EngineRejected::with_description("unknown delivery number"));
            }
        }
        shared.frames.push(SentFrame {
            link_name: link_name.to_owned(),
            delivery_number,
            outcome: disposition.outcome.clone(),
        });
        Ok(())
    }
}
