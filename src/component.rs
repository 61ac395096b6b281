//! Component nodes.
//!
//! A component is one visual node in the tree: geometry, visibility and
//! enablement flags, layout validity, and (while realized) the binding to its
//! native peer. Rather than a subclass chain, every node carries a
//! [`Capability`] tag that says whether it is a leaf, a composite, or a
//! top-level window.

use crate::backend::Layout;
use crate::color::Color;
use crate::events::EventMask;
use crate::rect::Rect;
use crate::window::TopLevel;
use cgmath::Vector2;
use uuid::Uuid;

/// A unique identifier for a component.
///
/// (this is just a UUID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(u32, u16, u16, [u8; 8]);

impl ComponentId {
    pub(crate) fn new() -> ComponentId {
        let uuid = Uuid::new_v4();
        let (a, b, c, d) = uuid.as_fields();
        ComponentId(a, b, c, *d)
    }
}

/// A native window handle, as assigned by the platform on peer creation.
pub type NativeHandle = u64;

/// What kind of node a component is.
///
/// Top-level windows are also composites; their window-specific state lives
/// in the [`TopLevel`] payload.
#[derive(Debug)]
pub enum Capability {
    Leaf,
    Composite,
    TopLevel(TopLevel),
}

impl Capability {
    /// Whether the node may hold children.
    pub fn is_composite(&self) -> bool {
        match self {
            Capability::Leaf => false,
            Capability::Composite | Capability::TopLevel(_) => true,
        }
    }
}

/// The kind of geometry change in flight, consumed by the peer to decide how
/// to reshape the native window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsOp {
    Default,
    SetLocation,
    SetSize,
    SetClientSize,
    SetBounds,
    Reset,
}

/// A graphics configuration binding (screen/visual selector).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphicsConfig {
    pub screen: u32,
}

/// Explicit size overrides; each takes precedence over the policy-computed
/// default while set.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeOverrides {
    pub min: Option<Vector2<i32>>,
    pub preferred: Option<Vector2<i32>>,
    pub max: Option<Vector2<i32>>,
}

/// A live peer binding: the peer object plus the native handle the platform
/// assigned to it.
#[derive(Debug)]
pub(crate) struct Realized<P> {
    pub(crate) peer: P,
    pub(crate) handle: NativeHandle,
}

/// One node of the component tree.
#[derive(Debug)]
pub(crate) struct Component<P> {
    pub(crate) capability: Capability,
    pub(crate) parent: Option<ComponentId>,
    pub(crate) children: Vec<ComponentId>,
    pub(crate) bounds: Rect,
    pub(crate) visible: bool,
    pub(crate) enabled: bool,
    pub(crate) valid: bool,
    pub(crate) peer: Option<Realized<P>>,
    pub(crate) event_mask: EventMask,
    pub(crate) bounds_op: BoundsOp,
    pub(crate) background: Option<Color>,
    pub(crate) graphics: Option<GraphicsConfig>,
    pub(crate) sizes: SizeOverrides,
    pub(crate) layout: Option<Box<dyn Layout>>,
    /// Number of children (transitively realized subtrees count once per
    /// direct child) that currently hold a peer.
    pub(crate) displayable_children: usize,
}

impl<P> Component<P> {
    pub(crate) fn new(capability: Capability) -> Component<P> {
        Component {
            capability,
            parent: None,
            children: Vec::new(),
            bounds: Rect::zero(),
            visible: false,
            enabled: true,
            valid: false,
            peer: None,
            event_mask: EventMask::default(),
            bounds_op: BoundsOp::Default,
            background: None,
            graphics: None,
            sizes: SizeOverrides::default(),
            layout: None,
            displayable_children: 0,
        }
    }

    /// Records a pending bounds operation.
    ///
    /// Sticky: once a non-default operation is pending, later attempts to
    /// record another are ignored, so the first meaningful operation in a
    /// burst is the one the peer observes. `Reset` always clears back to
    /// `Default`.
    pub(crate) fn push_bounds_op(&mut self, op: BoundsOp) {
        if op == BoundsOp::Reset {
            self.bounds_op = BoundsOp::Default;
        } else if self.bounds_op == BoundsOp::Default {
            self.bounds_op = op;
        }
    }

    pub(crate) fn top_level(&self) -> Option<&TopLevel> {
        match &self.capability {
            Capability::TopLevel(tl) => Some(tl),
            _ => None,
        }
    }

    pub(crate) fn top_level_mut(&mut self) -> Option<&mut TopLevel> {
        match &mut self.capability {
            Capability::TopLevel(tl) => Some(tl),
            _ => None,
        }
    }
}
