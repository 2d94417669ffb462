//! Receiver link lifecycle state

/// Lifecycle state of a receiver link.
///
/// There is no state negotiation on the wire for this; the enum tracks the
/// wrapper's view of the native resource, updated locally on create and
/// destroy and from engine-reported transitions in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No receiver resource has been created
    Uncreated,

    /// The receiver resource is allocated but the link is not receiving
    Created,

    /// The link is open and messages may arrive
    Opened,

    /// The link has stopped receiving
    Closed,

    /// The underlying resource has been released
    Destroyed,
}
