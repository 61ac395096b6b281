//! Retained-mode windowing toolkit core.
//!
//! # Conceptual overview
//! An application builds a tree of components; perch maps that tree onto
//! native platform windows through a peer-delegation protocol, and mediates
//! the window system's property/atom mechanism through an interning registry.
//!
//! ## Components
//! A component is one visual node: geometry, visibility and enablement flags,
//! a layout-validity flag, and — while realized — the binding to its native
//! peer. There is no subclass chain; every node carries a capability tag
//! saying whether it is a leaf, a composite holding an ordered child
//! sequence, or a top-level window. Child insertion order is back-to-front
//! z-order: the last-added child is topmost for hit testing.
//!
//! ## Peers
//! Peers are late-bound native resources obtained from the injected
//! [`Backend`](backend::Backend) factory. Realizing a window walks down the
//! tree creating peers; unrealizing walks back up destroying them. Both walks
//! are idempotent, and a component's validity flag can only be true while its
//! peer exists.
//!
//! ## The tree lock
//! One process-wide lock guards all structural and geometric mutation of the
//! tree. [`Host`](host::Host) owns it; every mutation goes through the guard
//! it hands out, which is what makes the discipline structural rather than a
//! convention. The event pump shares the same lock when dispatching.
//!
//! ## Windows
//! Top-level windows add a realization state machine (unrealized → realizing
//! → visible ⇄ hidden → disposed), an optional owner window, and a kind the
//! window manager is told about during realization. The first show performs a
//! one-time pre-show layout pass; `dispose` is terminal and cascades to owned
//! windows.
//!
//! ## Atoms and properties
//! Top-level windows exchange typed properties with the window system, keyed
//! by interned atoms. The [`Display`](atom::Display) is a process-wide
//! two-way cache (id ↔ name) minting one canonical [`Atom`](atom::Atom) per
//! id and per name, resolving names lazily; every native round trip is
//! serialized by the display lock. Code holding the tree lock may take the
//! display lock, never the reverse.
//!
//! ## Events
//! A dedicated pump thread decodes native events onto a channel; the host
//! drains it, routes each event to the owning component through the native
//! handle map, and delivers it via `dispatch_event` — the fixed entry point
//! that filters by event mask and tolerates peers torn down mid-flight before
//! invoking the registered handler.

pub mod atom;
pub mod backend;
pub mod color;
pub mod events;
mod component;
mod error;
mod host;
mod rect;
mod tree;
mod window;

pub use crate::atom::{Atom, Display, XA_CARDINAL};
pub use crate::component::{
    BoundsOp, ComponentId, GraphicsConfig, NativeHandle, SizeOverrides,
};
pub use crate::error::Error;
pub use crate::host::Host;
pub use crate::rect::Rect;
pub use crate::tree::ComponentTree;
pub use crate::window::{Decoration, TopLevel, WindowConfig, WindowKind, WindowState};
