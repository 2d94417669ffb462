//! Owner-facing callback contract.
//!
//! The owner of a receiver exposes up to two capabilities: observing
//! lifecycle transitions and consuming arriving messages. Both are resolved
//! once, at registration time: the state observer when the receiver is
//! created, the message sink when the link is opened.

use std::fmt;

use super::state::LinkState;

/// Observer of engine-reported lifecycle transitions.
///
/// Invoked on the engine's processing loop; implementations must not block
/// on long-running work, since no protocol processing proceeds for the
/// connection while the callback runs.
pub trait StateObserver: Send {
    /// Called once per transition with the `(previous, new)` state pair,
    /// in the order the engine reports them.
    fn on_state_changed(&mut self, previous: LinkState, new: LinkState);
}

impl<F> StateObserver for F
where
    F: FnMut(LinkState, LinkState) + Send,
{
    fn on_state_changed(&mut self, previous: LinkState, new: LinkState) {
        (self)(previous, new)
    }
}

/// Observer of arriving messages.
///
/// Invoked on the engine's processing loop, once per arrival, in arrival
/// order; implementations must not block. The message handed over is an
/// independently owned clone; receiving it does not settle the delivery.
pub trait MessageObserver<M>: Send {
    /// Called once per arriving message.
    fn on_message(&mut self, message: M);
}

/// Destination for arriving messages, fixed when the link is opened.
pub enum MessageSink<M> {
    /// Deliver through a [`MessageObserver`] implementation
    Observer(Box<dyn MessageObserver<M>>),

    /// Deliver to a plain callable
    Callback(Box<dyn FnMut(M) + Send>),
}

impl<M> MessageSink<M> {
    /// A sink delivering through a [`MessageObserver`].
    pub fn observer(observer: impl MessageObserver<M> + 'static) -> Self {
        Self::Observer(Box::new(observer))
    }

    /// A sink delivering to a plain callable.
    pub fn callback(callback: impl FnMut(M) + Send + 'static) -> Self {
        Self::Callback(Box::new(callback))
    }

    pub(crate) fn deliver(&mut self, message: M) {
        match self {
            Self::Observer(observer) => observer.on_message(message),
            Self::Callback(callback) => (callback)(message),
        }
    }
}

impl<M> fmt::Debug for MessageSink<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match self {
            Self::Observer(_) => "Observer",
            Self::Callback(_) => "Callback",
        };
        f.debug_tuple(variant).finish()
    }
}
