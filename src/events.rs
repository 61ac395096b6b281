//! Events.
//!
//! Only dispatch routing is defined here: which categories exist, how a
//! component's event mask gates delivery, and the handler objects the tree
//! invokes. Richer event vocabularies are the embedder's business.

use crate::component::{ComponentId, NativeHandle};
use cgmath::{Point2, Vector2};
use core::fmt;
use core::ops;
use parking_lot::Mutex;
use std::sync::Arc;

/// List of event categories.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventCategory {
    Window = 0,
    Mouse = 1,
    Key = 2,
    Focus = 3,
}

impl EventCategory {
    // smallest and largest values in Ord
    pub(crate) const MIN: Self = EventCategory::Window;
    pub(crate) const MAX: Self = EventCategory::Focus;

    /// The mask bit selecting this category.
    pub fn mask(self) -> EventMask {
        EventMask(1 << self as u32)
    }
}

/// A bitset of event categories a component accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventMask(u32);

impl EventMask {
    pub const NONE: EventMask = EventMask(0);
    pub const WINDOW: EventMask = EventMask(1 << EventCategory::Window as u32);
    pub const MOUSE: EventMask = EventMask(1 << EventCategory::Mouse as u32);
    pub const KEY: EventMask = EventMask(1 << EventCategory::Key as u32);
    pub const FOCUS: EventMask = EventMask(1 << EventCategory::Focus as u32);

    /// All categories.
    pub fn all() -> EventMask {
        EventMask::WINDOW | EventMask::MOUSE | EventMask::KEY | EventMask::FOCUS
    }

    /// Returns true if every bit of `other` is set in this mask.
    pub fn contains(self, other: EventMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl ops::BitOr for EventMask {
    type Output = EventMask;
    fn bitor(self, rhs: EventMask) -> EventMask {
        EventMask(self.0 | rhs.0)
    }
}

impl Default for EventMask {
    fn default() -> EventMask {
        EventMask::all()
    }
}

/// Modifier key state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyModifiers {
    /// Whether any shift key is pressed.
    pub shift: bool,

    /// Whether any control key is pressed.
    pub control: bool,

    /// Whether any option key or alt key is pressed.
    pub option: bool,

    /// Whether any command key or meta key is pressed.
    pub command: bool,
}

/// Mouse buttons.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left = 0,
    Middle = 1,
    Right = 2,
}

/// Decoded event payloads, already translated from the wire by the platform
/// side of the pump.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventKind {
    WindowShown,
    WindowHidden,
    WindowMoved(Point2<i32>),
    WindowResized(Vector2<i32>),
    WindowCloseRequested,
    MouseDown(Point2<i32>, MouseButton),
    MouseUp(Point2<i32>, MouseButton),
    MouseMoved(Point2<i32>),
    KeyDown(u32, KeyModifiers),
    KeyUp(u32, KeyModifiers),
    FocusGained,
    FocusLost,
}

impl EventKind {
    /// The category this payload belongs to.
    pub fn category(&self) -> EventCategory {
        match self {
            EventKind::WindowShown
            | EventKind::WindowHidden
            | EventKind::WindowMoved(..)
            | EventKind::WindowResized(..)
            | EventKind::WindowCloseRequested => EventCategory::Window,
            EventKind::MouseDown(..) | EventKind::MouseUp(..) | EventKind::MouseMoved(..) => {
                EventCategory::Mouse
            }
            EventKind::KeyDown(..) | EventKind::KeyUp(..) => EventCategory::Key,
            EventKind::FocusGained | EventKind::FocusLost => EventCategory::Focus,
        }
    }
}

/// An event as decoded from the native protocol, still addressed by native
/// window handle. The pump routes these through the handle map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawEvent {
    pub window: NativeHandle,
    pub kind: EventKind,
}

/// An event addressed to a component, as seen by handlers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub component: ComponentId,
    pub kind: EventKind,
}

/// A shared, callable event handler.
pub struct EventHandler(Arc<Mutex<dyn FnMut(&Event) + Send>>);

impl Clone for EventHandler {
    fn clone(&self) -> Self {
        EventHandler(Arc::clone(&self.0))
    }
}

impl EventHandler {
    pub fn new<F: 'static + FnMut(&Event) + Send>(handler: F) -> Self {
        EventHandler(Arc::new(Mutex::new(handler)))
    }

    pub(crate) fn call(&self, event: &Event) {
        let mut handler = self.0.lock();
        (&mut *handler)(event)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "EventHandler(..)")
    }
}

#[test]
fn test_mask_gates_categories() {
    let mask = EventMask::MOUSE | EventMask::KEY;
    assert!(mask.contains(EventCategory::Mouse.mask()));
    assert!(mask.contains(EventCategory::Key.mask()));
    assert!(!mask.contains(EventCategory::Window.mask()));
    assert!(EventMask::all().contains(EventCategory::Focus.mask()));
    assert!(!EventMask::NONE.contains(EventCategory::Window.mask()));
}
