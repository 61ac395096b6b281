//! Traits for platform collaborators.
//!
//! The toolkit core never talks to the window system directly. Peers are
//! created and driven through a [`Backend`], and the atom/property wire
//! protocol goes through a [`Connection`]. Both are injected by the embedder;
//! a platform port implements them, tests implement them with mocks.

use crate::color::Color;
use crate::component::{BoundsOp, ComponentId, GraphicsConfig, NativeHandle};
use crate::rect::Rect;
use crate::window::WindowKind;
use cgmath::Vector2;
use core::fmt;

/// A peer factory plus the operations the tree invokes on realized peers.
///
/// Peer identity is 1:1 with the owning component for its realized lifetime;
/// the tree owns the `Peer` value and hands it back through
/// [`Backend::dispose_peer`] when the component unrealizes.
///
/// All of these calls are made while the tree lock is held.
pub trait Backend {
    /// An opaque reference to a realized native resource.
    type Peer;

    /// Error type.
    type Error: fmt::Debug + fmt::Display;

    /// Realizes a plain (non-top-level) component.
    fn create_component(
        &mut self,
        id: ComponentId,
        bounds: Rect,
    ) -> Result<(Self::Peer, NativeHandle), Self::Error>;

    /// Realizes an undecorated top-level window.
    fn create_window(
        &mut self,
        id: ComponentId,
        bounds: Rect,
        kind: WindowKind,
    ) -> Result<(Self::Peer, NativeHandle), Self::Error>;

    /// Realizes a decorated frame.
    fn create_frame(
        &mut self,
        id: ComponentId,
        bounds: Rect,
        title: &str,
        undecorated: bool,
    ) -> Result<(Self::Peer, NativeHandle), Self::Error>;

    /// Realizes a dialog.
    fn create_dialog(
        &mut self,
        id: ComponentId,
        bounds: Rect,
        title: &str,
    ) -> Result<(Self::Peer, NativeHandle), Self::Error>;

    /// Lays the peer out. Called from the validity protocol when a component
    /// transitions invalid → valid.
    fn layout(&mut self, peer: &mut Self::Peer) -> Result<(), Self::Error>;

    /// Updates the peer's background fill.
    fn set_background(&mut self, peer: &mut Self::Peer, color: Color) -> Result<(), Self::Error>;

    /// Rebinds the peer to a graphics configuration.
    fn update_graphics_data(
        &mut self,
        peer: &mut Self::Peer,
        config: GraphicsConfig,
    ) -> Result<(), Self::Error>;

    /// Applies new bounds, tagged with the kind of geometry change in flight.
    fn reshape(
        &mut self,
        peer: &mut Self::Peer,
        bounds: Rect,
        op: BoundsOp,
    ) -> Result<(), Self::Error>;

    /// Maps the peer onto the screen.
    fn show(&mut self, peer: &mut Self::Peer) -> Result<(), Self::Error>;

    /// Unmaps the peer, retaining it.
    fn hide(&mut self, peer: &mut Self::Peer) -> Result<(), Self::Error>;

    /// Updates the title of a frame or dialog peer.
    fn set_title(&mut self, peer: &mut Self::Peer, title: &str) -> Result<(), Self::Error>;

    /// Raises the peer in the stacking order.
    fn to_front(&mut self, peer: &mut Self::Peer) -> Result<(), Self::Error>;

    /// Destroys the peer and releases its native resources.
    fn dispose_peer(&mut self, peer: Self::Peer) -> Result<(), Self::Error>;
}

/// The atom/property wire protocol.
///
/// Every call is a synchronous native round trip; the [`Display`]
/// (crate::atom::Display) serializes them under the display lock, so
/// implementations never see concurrent calls.
pub trait Connection {
    /// Error type.
    type Error: fmt::Debug + fmt::Display;

    /// Interns a name into an atom id, creating it if needed.
    fn intern_atom(&mut self, name: &str) -> Result<u32, Self::Error>;

    /// Looks up the name of an existing atom id.
    fn atom_name(&mut self, id: u32) -> Result<String, Self::Error>;

    /// Replaces a property with an opaque byte string.
    fn set_property(
        &mut self,
        window: NativeHandle,
        property: u32,
        value: &[u8],
    ) -> Result<(), Self::Error>;

    /// Reads a property as an opaque byte string.
    fn get_property(
        &mut self,
        window: NativeHandle,
        property: u32,
    ) -> Result<Vec<u8>, Self::Error>;

    /// Replaces a property with a single 32-bit cardinal.
    fn set_card32_property(
        &mut self,
        window: NativeHandle,
        property: u32,
        value: u32,
    ) -> Result<(), Self::Error>;

    /// Reads a single 32-bit cardinal property.
    fn get_card32_property(
        &mut self,
        window: NativeHandle,
        property: u32,
    ) -> Result<u32, Self::Error>;

    /// Deletes a property.
    fn delete_property(&mut self, window: NativeHandle, property: u32)
        -> Result<(), Self::Error>;

    /// Replaces a property with an ordered list of atom ids.
    fn set_atom_list_property(
        &mut self,
        window: NativeHandle,
        property: u32,
        atoms: &[u32],
    ) -> Result<(), Self::Error>;

    /// Reads a property as an ordered list of atom ids.
    fn get_atom_list_property(
        &mut self,
        window: NativeHandle,
        property: u32,
    ) -> Result<Vec<u32>, Self::Error>;
}

/// A layout delegate for a composite component.
///
/// The toolkit only triggers layout through the validity protocol and asks
/// for preferred sizes; the algorithm itself lives behind this trait.
pub trait Layout: fmt::Debug + Send {
    /// Computes the preferred size over the current children, given their
    /// bounds in insertion order.
    fn preferred_size(&self, children: &[Rect]) -> Vector2<i32>;
}
