//! The component tree.
//!
//! All structural and geometric state lives here, in an arena keyed by
//! [`ComponentId`]: parent/child links, bounds, visibility, layout validity,
//! and the peer bindings created by the realize/unrealize walks. The
//! [`Host`](crate::host::Host) wraps the whole tree in one process-wide mutex
//! — the tree lock — so every method on [`ComponentTree`] already runs under
//! it; that is why mutation takes `&mut self` and there is no per-node
//! locking.

use crate::atom::Display;
use crate::backend::{Backend, Connection, Layout};
use crate::color::Color;
use crate::component::{
    BoundsOp, Capability, Component, ComponentId, GraphicsConfig, NativeHandle, Realized,
};
use crate::error::Error;
use crate::events::{Event, EventCategory, EventHandler, EventMask, RawEvent};
use crate::rect::Rect;
use cgmath::{Point2, Vector2};
use log::{debug, trace};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A tree of components.
pub struct ComponentTree<B: Backend, C: Connection> {
    pub(crate) backend: B,
    pub(crate) display: Arc<Display<C>>,
    pub(crate) nodes: HashMap<ComponentId, Component<B::Peer>>,
    /// Native window handle → owning component, consulted by the event pump.
    /// Entries are added on realization and removed on unrealization.
    handle_map: HashMap<NativeHandle, ComponentId>,
    event_handlers: EventHandlers,
}

impl<B: Backend, C: Connection> ComponentTree<B, C> {
    pub fn new(backend: B, display: Arc<Display<C>>) -> ComponentTree<B, C> {
        ComponentTree {
            backend,
            display,
            nodes: HashMap::new(),
            handle_map: HashMap::new(),
            event_handlers: EventHandlers::new(),
        }
    }

    fn insert(&mut self, component: Component<B::Peer>) -> ComponentId {
        let id = ComponentId::new();
        self.nodes.insert(id, component);
        id
    }

    /// Creates a leaf component.
    pub fn create_component(&mut self) -> ComponentId {
        self.insert(Component::new(Capability::Leaf))
    }

    /// Creates a composite component that can hold children.
    pub fn create_container(&mut self) -> ComponentId {
        self.insert(Component::new(Capability::Composite))
    }

    pub(crate) fn insert_window(&mut self, component: Component<B::Peer>) -> ComponentId {
        self.insert(component)
    }

    pub(crate) fn node(&self, id: ComponentId) -> Result<&Component<B::Peer>, Error<B::Error>> {
        self.nodes.get(&id).ok_or(Error::NoSuchComponent(id))
    }

    pub(crate) fn node_mut(
        &mut self,
        id: ComponentId,
    ) -> Result<&mut Component<B::Peer>, Error<B::Error>> {
        self.nodes.get_mut(&id).ok_or(Error::NoSuchComponent(id))
    }

    /// Fails with [`Error::Disposed`] for disposed top-level windows, the one
    /// state no operation other than `dispose` may act on.
    pub(crate) fn ensure_not_disposed(&self, id: ComponentId) -> Result<(), Error<B::Error>> {
        if let Some(tl) = self.node(id)?.top_level() {
            if tl.is_disposed() {
                return Err(Error::Disposed(id));
            }
        }
        Ok(())
    }

    // ---- hierarchy ----

    /// Appends `child` to `parent`'s child sequence.
    ///
    /// A component belongs to at most one container at a time; a child that is
    /// already parented is detached from its old parent first. If the parent is
    /// displayable the child is realized immediately.
    pub fn add_child(
        &mut self,
        parent: ComponentId,
        child: ComponentId,
    ) -> Result<(), Error<B::Error>> {
        self.ensure_not_disposed(parent)?;
        if !self.node(parent)?.capability.is_composite() {
            return Err(Error::NotAContainer(parent));
        }
        let child_node = self.node(child)?;
        if child_node.top_level().is_some() {
            return Err(Error::TopLevelChild(child));
        }
        // a container may not end up inside its own descendant
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return Err(Error::Cycle(child));
            }
            cursor = self.node(id)?.parent;
        }

        if let Some(old_parent) = self.node(child)?.parent {
            self.remove_child(old_parent, child)?;
        }

        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        self.invalidate(parent)?;

        if self.is_displayable(parent)? {
            self.add_notify(child)?;
        }
        Ok(())
    }

    /// Detaches `child` from `parent`. No-op if `child` is not a member.
    pub fn remove_child(
        &mut self,
        parent: ComponentId,
        child: ComponentId,
    ) -> Result<(), Error<B::Error>> {
        if self.node(child)?.parent != Some(parent) {
            return Ok(());
        }
        if self.is_displayable(child)? {
            self.remove_notify(child)?;
        }
        let parent_node = self.node_mut(parent)?;
        parent_node.children.retain(|c| *c != child);
        self.node_mut(child)?.parent = None;
        self.invalidate(parent)
    }

    /// The child sequence in insertion order (back-to-front).
    pub fn children(&self, id: ComponentId) -> Result<&[ComponentId], Error<B::Error>> {
        Ok(&self.node(id)?.children)
    }

    pub fn parent_of(&self, id: ComponentId) -> Result<Option<ComponentId>, Error<B::Error>> {
        Ok(self.node(id)?.parent)
    }

    // ---- geometry ----

    /// Moves the component, keeping its size.
    pub fn set_location(&mut self, id: ComponentId, x: i32, y: i32) -> Result<(), Error<B::Error>> {
        let node = self.node_mut(id)?;
        node.push_bounds_op(BoundsOp::SetLocation);
        let bounds = node.bounds.with_origin(Point2::new(x, y));
        self.set_bounds(id, bounds)
    }

    /// Resizes the component, keeping its location.
    pub fn set_size(&mut self, id: ComponentId, width: i32, height: i32) -> Result<(), Error<B::Error>> {
        let node = self.node_mut(id)?;
        node.push_bounds_op(BoundsOp::SetSize);
        let bounds = node.bounds.with_size(Vector2::new(width, height));
        self.set_bounds(id, bounds)
    }

    /// Applies a full bounds change.
    pub fn set_bounds(&mut self, id: ComponentId, bounds: Rect) -> Result<(), Error<B::Error>> {
        self.node_mut(id)?.push_bounds_op(BoundsOp::SetBounds);
        self.reshape(id, bounds)
    }

    /// Applies geometry with whatever bounds operation is pending, notifies
    /// the peer, and clears the operation back to default. Internal callers
    /// that have no explicit operation go through here directly.
    pub(crate) fn reshape(&mut self, id: ComponentId, bounds: Rect) -> Result<(), Error<B::Error>> {
        self.ensure_not_disposed(id)?;
        let node = self.nodes.get_mut(&id).ok_or(Error::NoSuchComponent(id))?;
        let op = node.bounds_op;
        if let Some(tl) = node.top_level_mut() {
            // an explicit placement request permanently overrides platform
            // auto-placement
            if op == BoundsOp::SetLocation || op == BoundsOp::SetBounds {
                tl.location_by_platform = false;
            }
        }

        let moved = node.bounds.origin != bounds.origin;
        let resized = node.bounds.size != bounds.size;
        node.bounds = bounds;
        if resized {
            node.valid = false;
        }

        let result = match node.peer.as_mut() {
            Some(realized) => self
                .backend
                .reshape(&mut realized.peer, bounds, op)
                .map_err(Error::Native),
            None => Ok(()),
        };
        // the pending operation is consumed even when the peer call fails
        node.push_bounds_op(BoundsOp::Reset);
        result?;

        if moved || resized {
            if let Some(parent) = self.node(id)?.parent {
                self.invalidate(parent)?;
            }
        }
        Ok(())
    }

    pub fn bounds(&self, id: ComponentId) -> Result<Rect, Error<B::Error>> {
        Ok(self.node(id)?.bounds)
    }

    /// Returns true if the point, in this component's coordinate space, falls
    /// within its size.
    pub fn contains(&self, id: ComponentId, point: Point2<i32>) -> Result<bool, Error<B::Error>> {
        let node = self.node(id)?;
        Ok(Rect::new(Point2::new(0, 0), node.bounds.size).contains(point))
    }

    /// Returns the topmost child whose bounds contain the point, scanning in
    /// reverse insertion order, or the component itself if no child matches
    /// and the point is within its own bounds.
    pub fn component_at(
        &self,
        id: ComponentId,
        point: Point2<i32>,
    ) -> Result<Option<ComponentId>, Error<B::Error>> {
        let node = self.node(id)?;
        for child in node.children.iter().rev() {
            let child_node = self.nodes.get(child).expect("child of a live node is live");
            if child_node.bounds.contains(point) {
                return Ok(Some(*child));
            }
        }
        if self.contains(id, point)? {
            return Ok(Some(id));
        }
        Ok(None)
    }

    /// Screen coordinates of the component's origin.
    ///
    /// Only meaningful for realized, visible components; anything else is an
    /// illegal state.
    pub fn location_on_screen(&self, id: ComponentId) -> Result<Point2<i32>, Error<B::Error>> {
        let node = self.node(id)?;
        if node.peer.is_none() || !self.is_showing(id)? {
            return Err(Error::NotShowing(id));
        }
        let mut point = node.bounds.origin;
        let mut cursor = node.parent;
        while let Some(parent) = cursor {
            let parent_node = self.nodes.get(&parent).expect("parent of a live node is live");
            point.x += parent_node.bounds.origin.x;
            point.y += parent_node.bounds.origin.y;
            cursor = parent_node.parent;
        }
        Ok(point)
    }

    // ---- validity ----

    /// Asks the peer to (re-)layout if the component was invalid, then marks
    /// it valid. No-op when already valid or peer-less.
    pub fn validate(&mut self, id: ComponentId) -> Result<(), Error<B::Error>> {
        let node = self.nodes.get_mut(&id).ok_or(Error::NoSuchComponent(id))?;
        if node.valid || node.peer.is_none() {
            return Ok(());
        }
        let realized = node.peer.as_mut().expect("checked above");
        self.backend
            .layout(&mut realized.peer)
            .map_err(Error::Native)?;
        node.valid = true;
        Ok(())
    }

    /// Marks the component invalid and propagates invalidation up the parent
    /// chain. Never walks into descendants.
    pub fn invalidate(&mut self, id: ComponentId) -> Result<(), Error<B::Error>> {
        let node = self.node_mut(id)?;
        node.valid = false;
        let parent = node.parent;
        match parent {
            Some(parent) => self.invalidate(parent),
            None => Ok(()),
        }
    }

    pub fn invalidate_if_valid(&mut self, id: ComponentId) -> Result<(), Error<B::Error>> {
        if self.is_valid(id)? {
            self.invalidate(id)?;
        }
        Ok(())
    }

    /// Invalidates then validates. Safe to call on a component that is not
    /// yet peer-bound.
    pub fn revalidate(&mut self, id: ComponentId) -> Result<(), Error<B::Error>> {
        self.invalidate(id)?;
        self.validate(id)
    }

    // ---- realization ----

    /// Realizes the component and, in insertion order, every descendant.
    /// Idempotent: a second call against a live peer is a no-op.
    pub fn add_notify(&mut self, id: ComponentId) -> Result<(), Error<B::Error>> {
        self.ensure_not_disposed(id)?;
        let node = self.nodes.get_mut(&id).ok_or(Error::NoSuchComponent(id))?;
        if node.peer.is_some() {
            return Ok(());
        }
        if let Some(tl) = node.top_level_mut() {
            tl.begin_realizing();
        }

        let bounds = node.bounds;
        let created = match &node.capability {
            Capability::Leaf | Capability::Composite => self.backend.create_component(id, bounds),
            Capability::TopLevel(tl) => tl.create_peer(&mut self.backend, id, bounds),
        };
        let (peer, handle) = created.map_err(Error::Native)?;
        node.peer = Some(Realized { peer, handle });
        self.handle_map.insert(handle, id);
        debug!("realized component {:?} as native {:#x}", id, handle);

        if node.top_level().is_some() {
            self.negotiate_window_properties(id, handle);
        }

        let children = self.node(id)?.children.clone();
        for child in children {
            self.add_notify(child)?;
        }

        if let Some(parent) = self.node(id)?.parent {
            self.increase_component_count(parent, id)?;
        }
        if let Some(tl) = self.node_mut(id)?.top_level_mut() {
            tl.finish_realizing();
        }
        Ok(())
    }

    /// Destroys the peer and, first, the peers of every descendant (in
    /// reverse insertion order). Idempotent; leaves the component
    /// non-displayable.
    pub fn remove_notify(&mut self, id: ComponentId) -> Result<(), Error<B::Error>> {
        let node = self.nodes.get_mut(&id).ok_or(Error::NoSuchComponent(id))?;
        if node.peer.is_none() {
            return Ok(());
        }
        let children = node.children.clone();
        for child in children.into_iter().rev() {
            self.remove_notify(child)?;
        }

        let node = self.nodes.get_mut(&id).expect("checked above");
        let realized = node.peer.take().expect("peer cannot vanish under the tree lock");
        node.valid = false;
        if let Some(tl) = node.top_level_mut() {
            tl.mark_unrealized();
        }
        let parent = node.parent;
        self.handle_map.remove(&realized.handle);
        self.backend
            .dispose_peer(realized.peer)
            .map_err(Error::Native)?;
        debug!("unrealized component {:?}", id);

        if let Some(parent) = parent {
            self.decrease_component_count(parent);
        }
        Ok(())
    }

    /// Bookkeeping hook invoked when a child becomes displayable. The count
    /// must only ever reflect realized descendants, so increasing it for a
    /// peer-less child is a programming error.
    pub fn increase_component_count(
        &mut self,
        parent: ComponentId,
        child: ComponentId,
    ) -> Result<(), Error<B::Error>> {
        if !self.is_displayable(child)? {
            return Err(Error::NotDisplayable(child));
        }
        self.node_mut(parent)?.displayable_children += 1;
        Ok(())
    }

    /// Bookkeeping hook invoked when a child ceases to be displayable.
    pub fn decrease_component_count(&mut self, parent: ComponentId) {
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.displayable_children = node.displayable_children.saturating_sub(1);
        }
    }

    pub fn displayable_children(&self, id: ComponentId) -> Result<usize, Error<B::Error>> {
        Ok(self.node(id)?.displayable_children)
    }

    // ---- flags and queries ----

    /// True only while a peer exists and no geometry or hierarchy change is
    /// pending.
    pub fn is_valid(&self, id: ComponentId) -> Result<bool, Error<B::Error>> {
        let node = self.node(id)?;
        Ok(node.valid && node.peer.is_some())
    }

    /// True while a peer is bound, regardless of visibility.
    pub fn is_displayable(&self, id: ComponentId) -> Result<bool, Error<B::Error>> {
        Ok(self.node(id)?.peer.is_some())
    }

    pub fn is_visible(&self, id: ComponentId) -> Result<bool, Error<B::Error>> {
        Ok(self.node(id)?.visible)
    }

    /// Visible, displayable, and every ancestor is also showing.
    pub fn is_showing(&self, id: ComponentId) -> Result<bool, Error<B::Error>> {
        let node = self.node(id)?;
        if !node.visible || node.peer.is_none() {
            return Ok(false);
        }
        match node.parent {
            Some(parent) => self.is_showing(parent),
            None => Ok(true),
        }
    }

    pub fn is_enabled(&self, id: ComponentId) -> Result<bool, Error<B::Error>> {
        Ok(self.node(id)?.enabled)
    }

    pub fn set_enabled(&mut self, id: ComponentId, enabled: bool) -> Result<(), Error<B::Error>> {
        self.node_mut(id)?.enabled = enabled;
        Ok(())
    }

    /// Shows or hides the component. Top-level windows go through the window
    /// state machine instead.
    pub fn set_visible(&mut self, id: ComponentId, visible: bool) -> Result<(), Error<B::Error>> {
        if self.node(id)?.top_level().is_some() {
            return self.set_window_visible(id, visible);
        }
        let node = self.nodes.get_mut(&id).ok_or(Error::NoSuchComponent(id))?;
        if node.visible == visible {
            return Ok(());
        }
        node.visible = visible;
        if let Some(realized) = node.peer.as_mut() {
            let result = if visible {
                self.backend.show(&mut realized.peer)
            } else {
                self.backend.hide(&mut realized.peer)
            };
            result.map_err(Error::Native)?;
        }
        Ok(())
    }

    // ---- appearance ----

    pub fn set_background(&mut self, id: ComponentId, color: Color) -> Result<(), Error<B::Error>> {
        let node = self.nodes.get_mut(&id).ok_or(Error::NoSuchComponent(id))?;
        node.background = Some(color);
        if let Some(realized) = node.peer.as_mut() {
            self.backend
                .set_background(&mut realized.peer, color)
                .map_err(Error::Native)?;
        }
        Ok(())
    }

    /// The component's background, inherited from the nearest ancestor that
    /// has one set.
    pub fn background(&self, id: ComponentId) -> Result<Option<Color>, Error<B::Error>> {
        let node = self.node(id)?;
        if let Some(color) = node.background {
            return Ok(Some(color));
        }
        match node.parent {
            Some(parent) => self.background(parent),
            None => Ok(None),
        }
    }

    /// Rebinds the graphics configuration, forwards it to a live peer, and
    /// propagates it to children. Returns whether anything changed.
    pub fn update_graphics_data(
        &mut self,
        id: ComponentId,
        config: GraphicsConfig,
    ) -> Result<bool, Error<B::Error>> {
        let node = self.nodes.get_mut(&id).ok_or(Error::NoSuchComponent(id))?;
        if node.graphics == Some(config) {
            return Ok(false);
        }
        node.graphics = Some(config);
        if let Some(realized) = node.peer.as_mut() {
            self.backend
                .update_graphics_data(&mut realized.peer, config)
                .map_err(Error::Native)?;
        }
        let children = self.node(id)?.children.clone();
        for child in children {
            self.update_graphics_data(child, config)?;
        }
        Ok(true)
    }

    /// The bound graphics configuration. Accessing it before one has been
    /// bound is an error.
    pub fn graphics_configuration(
        &self,
        id: ComponentId,
    ) -> Result<GraphicsConfig, Error<B::Error>> {
        self.node(id)?
            .graphics
            .ok_or(Error::NoGraphicsConfiguration(id))
    }

    // ---- sizes ----

    pub fn set_preferred_size(
        &mut self,
        id: ComponentId,
        size: Option<Vector2<i32>>,
    ) -> Result<(), Error<B::Error>> {
        self.node_mut(id)?.sizes.preferred = size;
        Ok(())
    }

    pub fn set_minimum_size(
        &mut self,
        id: ComponentId,
        size: Option<Vector2<i32>>,
    ) -> Result<(), Error<B::Error>> {
        self.node_mut(id)?.sizes.min = size;
        Ok(())
    }

    pub fn set_maximum_size(
        &mut self,
        id: ComponentId,
        size: Option<Vector2<i32>>,
    ) -> Result<(), Error<B::Error>> {
        self.node_mut(id)?.sizes.max = size;
        Ok(())
    }

    /// Installs the layout delegate consulted for preferred sizes.
    pub fn set_layout(
        &mut self,
        id: ComponentId,
        layout: Box<dyn Layout>,
    ) -> Result<(), Error<B::Error>> {
        if !self.node(id)?.capability.is_composite() {
            return Err(Error::NotAContainer(id));
        }
        self.node_mut(id)?.layout = Some(layout);
        Ok(())
    }

    /// The preferred size: an explicit override if set, otherwise the layout
    /// delegate's answer over the current children, otherwise the current
    /// size.
    pub fn preferred_size(&self, id: ComponentId) -> Result<Vector2<i32>, Error<B::Error>> {
        let node = self.node(id)?;
        if let Some(size) = node.sizes.preferred {
            return Ok(size);
        }
        if let Some(layout) = &node.layout {
            let child_bounds: Vec<Rect> = node
                .children
                .iter()
                .map(|child| self.nodes[child].bounds)
                .collect();
            return Ok(layout.preferred_size(&child_bounds));
        }
        Ok(node.bounds.size)
    }

    pub fn minimum_size(&self, id: ComponentId) -> Result<Vector2<i32>, Error<B::Error>> {
        let node = self.node(id)?;
        Ok(node.sizes.min.unwrap_or(node.bounds.size))
    }

    pub fn maximum_size(&self, id: ComponentId) -> Result<Vector2<i32>, Error<B::Error>> {
        let node = self.node(id)?;
        Ok(node
            .sizes
            .max
            .unwrap_or_else(|| Vector2::new(i32::max_value(), i32::max_value())))
    }

    // ---- events ----

    pub fn set_event_mask(&mut self, id: ComponentId, mask: EventMask) -> Result<(), Error<B::Error>> {
        self.node_mut(id)?.event_mask = mask;
        Ok(())
    }

    pub fn event_mask(&self, id: ComponentId) -> Result<EventMask, Error<B::Error>> {
        Ok(self.node(id)?.event_mask)
    }

    /// Registers the handler invoked by `dispatch_event` for one category.
    pub fn set_event_handler(
        &mut self,
        id: ComponentId,
        category: EventCategory,
        handler: EventHandler,
    ) -> Result<(), Error<B::Error>> {
        self.node(id)?;
        self.event_handlers.add(id, category, handler);
        Ok(())
    }

    pub fn remove_event_handler(&mut self, id: ComponentId, category: EventCategory) {
        self.event_handlers.remove(id, category);
    }

    pub(crate) fn clear_event_handlers(&mut self, id: ComponentId) {
        self.event_handlers.remove_component(id);
    }

    /// The single entry point for delivering an event.
    ///
    /// The fixed pre-dispatch steps happen here — mask filtering, enablement,
    /// and tolerance for a peer torn down while the event was in flight — and
    /// the registered handler is the overridable processing step.
    pub fn dispatch_event(&mut self, event: Event) {
        let node = match self.nodes.get(&event.component) {
            Some(node) => node,
            // already torn down
            None => return,
        };
        if node.peer.is_none() {
            return;
        }
        let category = event.kind.category();
        if !node.event_mask.contains(category.mask()) {
            return;
        }
        if !node.enabled
            && (category == EventCategory::Mouse || category == EventCategory::Key)
        {
            return;
        }
        let handler = self.event_handlers.get(event.component, category).cloned();
        if let Some(handler) = handler {
            handler.call(&event);
        }
    }

    /// Routes a decoded native event through the handle map.
    pub fn dispatch_raw(&mut self, raw: RawEvent) {
        match self.handle_map.get(&raw.window).copied() {
            Some(component) => self.dispatch_event(Event {
                component,
                kind: raw.kind,
            }),
            None => trace!("dropping event for unknown native {:#x}", raw.window),
        }
    }

    /// The component realized under a native handle, if any.
    pub fn component_for_handle(&self, handle: NativeHandle) -> Option<ComponentId> {
        self.handle_map.get(&handle).copied()
    }

    /// The native handle of a realized component.
    pub fn handle_of(&self, id: ComponentId) -> Result<NativeHandle, Error<B::Error>> {
        self.node(id)?
            .peer
            .as_ref()
            .map(|realized| realized.handle)
            .ok_or(Error::NotDisplayable(id))
    }
}

/// List of event handlers.
#[derive(Debug)]
struct EventHandlers {
    map: BTreeMap<(ComponentId, EventCategory), EventHandler>,
}

impl EventHandlers {
    fn new() -> EventHandlers {
        EventHandlers {
            map: BTreeMap::new(),
        }
    }

    fn add(&mut self, component: ComponentId, category: EventCategory, handler: EventHandler) {
        self.map.insert((component, category), handler);
    }

    fn remove(&mut self, component: ComponentId, category: EventCategory) {
        self.map.remove(&(component, category));
    }

    fn get(&self, component: ComponentId, category: EventCategory) -> Option<&EventHandler> {
        self.map.get(&(component, category))
    }

    fn remove_component(&mut self, component: ComponentId) {
        let keys_to_remove: Vec<_> = self
            .map
            .range((component, EventCategory::MIN)..=(component, EventCategory::MAX))
            .map(|(k, _)| *k)
            .collect();
        for key in keys_to_remove {
            self.map.remove(&key);
        }
    }
}
