//! Connects the component tree to the platform.

use crate::atom::Display;
use crate::backend::{Backend, Connection};
use crate::events::RawEvent;
use crate::tree::ComponentTree;
use crossbeam::channel::TryRecvError;
use crossbeam::{channel, Receiver, Sender};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Owns the component tree, the tree lock around it, and the display.
///
/// The platform side decodes native events onto the channel whose sender
/// [`Host::new`] returns; a dedicated pump thread drains it with
/// [`Host::run`] while application threads mutate the tree through
/// [`Host::tree`]. The pump never holds the tree lock while blocked on the
/// channel, only while dispatching one event.
pub struct Host<B: Backend, C: Connection> {
    tree: Mutex<ComponentTree<B, C>>,
    display: Arc<Display<C>>,
    event_recv: Receiver<RawEvent>,
}

impl<B: Backend, C: Connection> Host<B, C> {
    /// Creates a new host around a backend and a display connection.
    ///
    /// The returned sender is handed to the platform event source; dropping
    /// it ends [`Host::run`].
    pub fn new(backend: B, conn: C) -> (Host<B, C>, Sender<RawEvent>) {
        let (event_sender, event_recv) = channel::unbounded();
        let display = Arc::new(Display::new(conn));

        (
            Host {
                tree: Mutex::new(ComponentTree::new(backend, Arc::clone(&display))),
                display,
                event_recv,
            },
            event_sender,
        )
    }

    /// Acquires the tree lock.
    ///
    /// Every structural or geometric mutation goes through the guard; the
    /// lock is process-wide, not per-subtree, so hierarchy edges spanning two
    /// nodes are always observed consistently. Code holding this lock may use
    /// [`Host::display`]; display-locked code never takes the tree lock.
    pub fn tree(&self) -> MutexGuard<ComponentTree<B, C>> {
        self.tree.lock()
    }

    /// The display, for atom and property operations.
    pub fn display(&self) -> &Display<C> {
        &self.display
    }

    /// Receives all queued events and dispatches them into the tree.
    pub fn poll(&self) {
        loop {
            match self.event_recv.try_recv() {
                Ok(event) => self.tree.lock().dispatch_raw(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    /// Decodes and dispatches events until the platform side disconnects.
    ///
    /// Run this on the dedicated event-pump thread.
    pub fn run(&self) {
        while let Ok(event) = self.event_recv.recv() {
            self.tree.lock().dispatch_raw(event);
        }
    }
}
