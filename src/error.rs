//! Errors.

use crate::component::ComponentId;
use thiserror::Error;

/// Errors raised by tree, window, and registry operations.
///
/// `E` is the error type of the collaborator involved in the failing call:
/// [`Backend::Error`](crate::backend::Backend) for tree operations,
/// [`Connection::Error`](crate::backend::Connection) for atom and property
/// operations. Everything except [`Error::Native`] is a precondition
/// violation raised synchronously at the offending call; nothing is retried
/// internally.
#[derive(Debug, Error)]
pub enum Error<E> {
    /// The component id does not name a live component.
    #[error("no such component: {0:?}")]
    NoSuchComponent(ComponentId),

    /// A child operation was invoked on a leaf component.
    #[error("component is not a container: {0:?}")]
    NotAContainer(ComponentId),

    /// A window operation was invoked on a component that is not top-level.
    #[error("component is not a top-level window: {0:?}")]
    NotAWindow(ComponentId),

    /// A top-level window was passed where a child component is required.
    #[error("a top-level window cannot be a child: {0:?}")]
    TopLevelChild(ComponentId),

    /// Adding the child would make a container its own descendant.
    #[error("component cycle: {0:?}")]
    Cycle(ComponentId),

    /// A title operation was invoked on a window with no title bar.
    #[error("window has no title bar: {0:?}")]
    Undecorated(ComponentId),

    /// Screen coordinates were requested for a component that is not showing.
    #[error("component is not showing on screen: {0:?}")]
    NotShowing(ComponentId),

    /// Peer bookkeeping was attempted for a component without a peer.
    #[error("peer does not exist: {0:?}")]
    NotDisplayable(ComponentId),

    /// The window has been disposed; only further `dispose` calls are legal.
    #[error("window is disposed: {0:?}")]
    Disposed(ComponentId),

    /// No graphics configuration has been bound to the component.
    #[error("no graphics configuration bound: {0:?}")]
    NoGraphicsConfiguration(ComponentId),

    /// A property operation was invoked on an atom with no platform id.
    #[error("atom is not interned")]
    UnresolvedAtom,

    /// A native call failed in the backend or connection.
    #[error("native call failed: {0}")]
    Native(E),
}
