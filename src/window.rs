//! Top-level windows.
//!
//! A window is a composite component with extra state: a realization state
//! machine, an optional owner window, a kind the window manager is told
//! about, and a decoration (plain, frame, or dialog). The state machine is
//!
//! ```text
//! Unrealized → Realizing → Visible ⇄ Hidden → Disposed
//! ```
//!
//! with `Disposed` terminal from any state.

use crate::backend::{Backend, Connection};
use crate::component::{BoundsOp, Capability, Component, ComponentId, NativeHandle};
use crate::error::Error;
use crate::rect::Rect;
use crate::tree::ComponentTree;
use cgmath::Vector2;
use log::{debug, warn};

/// What the window manager is told this window is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    Normal,
    Utility,
    Popup,
}

impl WindowKind {
    /// The window type hint value, as an atom name.
    pub(crate) fn net_wm_type_name(self) -> &'static str {
        match self {
            WindowKind::Normal => "_NET_WM_WINDOW_TYPE_NORMAL",
            WindowKind::Utility => "_NET_WM_WINDOW_TYPE_UTILITY",
            WindowKind::Popup => "_NET_WM_WINDOW_TYPE_POPUP_MENU",
        }
    }
}

/// Realization states of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Unrealized,
    Realizing,
    Hidden,
    Visible,
    Disposed,
}

/// The decoration of a top-level window.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoration {
    /// A bare window with no title bar.
    Plain,
    /// A framed window with a title bar, unless `undecorated` asks the
    /// platform to omit it.
    Frame { title: String, undecorated: bool },
    /// A dialog, typically transient for its owner.
    Dialog { title: String },
}

/// Window-specific state carried by top-level components.
#[derive(Debug)]
pub struct TopLevel {
    pub(crate) kind: WindowKind,
    pub(crate) decoration: Decoration,
    pub(crate) owner: Option<ComponentId>,
    pub(crate) state: WindowState,
    pub(crate) before_first_show: bool,
    pub(crate) location_by_platform: bool,
    pub(crate) packed: bool,
}

impl TopLevel {
    pub(crate) fn is_disposed(&self) -> bool {
        self.state == WindowState::Disposed
    }

    pub(crate) fn begin_realizing(&mut self) {
        self.state = WindowState::Realizing;
    }

    pub(crate) fn finish_realizing(&mut self) {
        if self.state == WindowState::Realizing {
            self.state = WindowState::Hidden;
        }
    }

    pub(crate) fn mark_unrealized(&mut self) {
        if self.state != WindowState::Disposed {
            self.state = WindowState::Unrealized;
        }
    }

    /// Asks the factory matching the decoration for a peer.
    pub(crate) fn create_peer<B: Backend>(
        &self,
        backend: &mut B,
        id: ComponentId,
        bounds: Rect,
    ) -> Result<(B::Peer, NativeHandle), B::Error> {
        match &self.decoration {
            Decoration::Plain => backend.create_window(id, bounds, self.kind),
            Decoration::Frame { title, undecorated } => {
                backend.create_frame(id, bounds, title, *undecorated)
            }
            Decoration::Dialog { title } => backend.create_dialog(id, bounds, title),
        }
    }
}

/// Initial settings for a new window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    pub kind: WindowKind,
    pub decoration: Decoration,
    /// The owning window, if any. It must outlive this window's realization;
    /// disposing it disposes this window too.
    pub owner: Option<ComponentId>,
    pub bounds: Rect,
    /// Explicit graphics configuration; derived from the owner when absent.
    pub graphics: Option<crate::component::GraphicsConfig>,
}

impl Default for WindowConfig {
    fn default() -> WindowConfig {
        WindowConfig {
            kind: WindowKind::Normal,
            decoration: Decoration::Plain,
            owner: None,
            bounds: Rect::zero(),
            graphics: None,
        }
    }
}

impl<B: Backend, C: Connection> ComponentTree<B, C> {
    /// Creates an unrealized top-level window.
    pub fn create_window(&mut self, config: WindowConfig) -> Result<ComponentId, Error<B::Error>> {
        let mut graphics = config.graphics;
        if let Some(owner) = config.owner {
            let owner_node = self.node(owner)?;
            let owner_tl = owner_node.top_level().ok_or(Error::NotAWindow(owner))?;
            if owner_tl.is_disposed() {
                return Err(Error::Disposed(owner));
            }
            if graphics.is_none() {
                graphics = owner_node.graphics;
            }
        }

        let mut component = Component::new(Capability::TopLevel(TopLevel {
            kind: config.kind,
            decoration: config.decoration,
            owner: config.owner,
            state: WindowState::Unrealized,
            before_first_show: true,
            location_by_platform: true,
            packed: false,
        }));
        component.bounds = config.bounds;
        component.graphics = graphics;
        Ok(self.insert_window(component))
    }

    pub fn window_state(&self, id: ComponentId) -> Result<WindowState, Error<B::Error>> {
        Ok(self.top_level(id)?.state)
    }

    pub fn window_kind(&self, id: ComponentId) -> Result<WindowKind, Error<B::Error>> {
        Ok(self.top_level(id)?.kind)
    }

    pub fn owner_of(&self, id: ComponentId) -> Result<Option<ComponentId>, Error<B::Error>> {
        Ok(self.top_level(id)?.owner)
    }

    /// Whether the platform still gets to pick this window's position. False
    /// forever once an explicit location or bounds operation was applied.
    pub fn is_location_by_platform(&self, id: ComponentId) -> Result<bool, Error<B::Error>> {
        Ok(self.top_level(id)?.location_by_platform)
    }

    pub fn is_packed(&self, id: ComponentId) -> Result<bool, Error<B::Error>> {
        Ok(self.top_level(id)?.packed)
    }

    /// The title, or `None` for plain windows.
    pub fn title(&self, id: ComponentId) -> Result<Option<&str>, Error<B::Error>> {
        Ok(match &self.top_level(id)?.decoration {
            Decoration::Frame { title, .. } | Decoration::Dialog { title } => Some(title),
            Decoration::Plain => None,
        })
    }

    /// Updates the title and forwards it to a live peer.
    pub fn set_title(&mut self, id: ComponentId, title: &str) -> Result<(), Error<B::Error>> {
        self.ensure_not_disposed(id)?;
        let node = self.nodes.get_mut(&id).ok_or(Error::NoSuchComponent(id))?;
        let tl = node.top_level_mut().ok_or(Error::NotAWindow(id))?;
        match &mut tl.decoration {
            Decoration::Frame { title: current, .. } | Decoration::Dialog { title: current } => {
                *current = title.to_owned()
            }
            Decoration::Plain => return Err(Error::Undecorated(id)),
        }
        if let Some(realized) = node.peer.as_mut() {
            self.backend
                .set_title(&mut realized.peer, title)
                .map_err(Error::Native)?;
        }
        Ok(())
    }

    pub fn is_undecorated(&self, id: ComponentId) -> Result<bool, Error<B::Error>> {
        Ok(match self.top_level(id)?.decoration {
            Decoration::Plain => true,
            Decoration::Frame { undecorated, .. } => undecorated,
            Decoration::Dialog { .. } => false,
        })
    }

    /// Shows or hides the window, driving the state machine.
    ///
    /// The first show performs a one-time pre-show layout pass before the
    /// peer is shown; hiding retains the peer.
    pub(crate) fn set_window_visible(
        &mut self,
        id: ComponentId,
        visible: bool,
    ) -> Result<(), Error<B::Error>> {
        let node = self.node_mut(id)?;
        let tl = node.top_level_mut().ok_or(Error::NotAWindow(id))?;
        if tl.is_disposed() {
            return Err(Error::Disposed(id));
        }

        if visible {
            let first = tl.before_first_show;
            tl.before_first_show = false;

            self.add_notify(id)?;
            if first {
                self.validate(id)?;
            }

            let node = self.nodes.get_mut(&id).ok_or(Error::NoSuchComponent(id))?;
            node.visible = true;
            let realized = node.peer.as_mut().expect("window was just realized");
            self.backend
                .show(&mut realized.peer)
                .map_err(Error::Native)?;
            node.top_level_mut().expect("checked top-level above").state = WindowState::Visible;
            debug!("window {:?} shown", id);
        } else {
            let node = self.nodes.get_mut(&id).ok_or(Error::NoSuchComponent(id))?;
            node.visible = false;
            let result = match node.peer.as_mut() {
                Some(realized) => self.backend.hide(&mut realized.peer).map_err(Error::Native),
                None => Ok(()),
            };
            result?;
            let tl = node.top_level_mut().expect("checked top-level above");
            if tl.state == WindowState::Visible {
                tl.state = WindowState::Hidden;
            }
            debug!("window {:?} hidden", id);
        }
        Ok(())
    }

    /// Realizes the window if needed and sizes it to its preferred size.
    pub fn pack(&mut self, id: ComponentId) -> Result<(), Error<B::Error>> {
        if self.top_level(id)?.is_disposed() {
            return Err(Error::Disposed(id));
        }
        self.add_notify(id)?;
        let preferred = self.preferred_size(id)?;
        let node = self.node_mut(id)?;
        node.push_bounds_op(BoundsOp::SetClientSize);
        let bounds = node.bounds.with_size(preferred);
        self.reshape(id, bounds)?;
        self.validate(id)?;
        self.node_mut(id)?
            .top_level_mut()
            .expect("checked top-level above")
            .packed = true;
        Ok(())
    }

    /// Resizes the window's client area.
    pub fn set_client_size(
        &mut self,
        id: ComponentId,
        width: i32,
        height: i32,
    ) -> Result<(), Error<B::Error>> {
        let node = self.node_mut(id)?;
        if node.top_level().is_none() {
            return Err(Error::NotAWindow(id));
        }
        node.push_bounds_op(BoundsOp::SetClientSize);
        let bounds = node.bounds.with_size(Vector2::new(width, height));
        self.reshape(id, bounds)
    }

    /// Raises the window in the stacking order. No-op while unrealized.
    pub fn to_front(&mut self, id: ComponentId) -> Result<(), Error<B::Error>> {
        self.ensure_not_disposed(id)?;
        let node = self.nodes.get_mut(&id).ok_or(Error::NoSuchComponent(id))?;
        if node.top_level().is_none() {
            return Err(Error::NotAWindow(id));
        }
        if let Some(realized) = node.peer.as_mut() {
            self.backend
                .to_front(&mut realized.peer)
                .map_err(Error::Native)?;
        }
        Ok(())
    }

    /// Releases the peer and all owned native resources.
    ///
    /// Terminal and idempotent. Windows owned by this one are disposed first,
    /// so an owned window never observes a disposed owner. Any operation
    /// other than `dispose` fails on a disposed window.
    pub fn dispose(&mut self, id: ComponentId) -> Result<(), Error<B::Error>> {
        if self.top_level(id)?.is_disposed() {
            return Ok(());
        }

        let owned: Vec<ComponentId> = self
            .nodes
            .iter()
            .filter_map(|(other, node)| {
                node.top_level().and_then(|tl| {
                    if tl.owner == Some(id) && !tl.is_disposed() {
                        Some(*other)
                    } else {
                        None
                    }
                })
            })
            .collect();
        for window in owned {
            self.dispose(window)?;
        }

        self.set_window_visible(id, false)?;
        self.remove_notify(id)?;

        // event handlers for the whole subtree are released with the window
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            self.clear_event_handlers(next);
            stack.extend(self.node(next)?.children.iter().copied());
        }

        self.node_mut(id)?
            .top_level_mut()
            .expect("checked top-level above")
            .state = WindowState::Disposed;
        debug!("disposed window {:?}", id);
        Ok(())
    }

    /// Tells the window manager what kind of window this is, and which window
    /// owns it. Failures are logged and otherwise ignored; property
    /// negotiation must not block realization.
    pub(crate) fn negotiate_window_properties(&self, id: ComponentId, handle: NativeHandle) {
        let (kind, owner_handle) = match self.node(id).ok().and_then(|node| {
            node.top_level().map(|tl| {
                let owner_handle = tl
                    .owner
                    .and_then(|owner| self.nodes.get(&owner))
                    .and_then(|owner| owner.peer.as_ref())
                    .map(|realized| realized.handle);
                (tl.kind, owner_handle)
            })
        }) {
            Some(found) => found,
            None => return,
        };

        let result = (|| -> Result<(), Error<C::Error>> {
            let window_type = self.display.atom_by_name("_NET_WM_WINDOW_TYPE")?;
            let value = self.display.atom_by_name(kind.net_wm_type_name())?;
            self.display
                .set_atom_list_property(handle, &window_type, &[value])?;

            if let Some(owner_handle) = owner_handle {
                let transient_for = self.display.atom_by_name("WM_TRANSIENT_FOR")?;
                self.display
                    .set_card32_property(handle, &transient_for, owner_handle as u32)?;
            }
            Ok(())
        })();
        if let Err(err) = result {
            warn!("window property negotiation failed for {:?}: {}", id, err);
        }
    }

    fn top_level(&self, id: ComponentId) -> Result<&TopLevel, Error<B::Error>> {
        self.node(id)?.top_level().ok_or(Error::NotAWindow(id))
    }
}
