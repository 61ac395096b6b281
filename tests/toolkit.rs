//! Integration tests for the toolkit core.
//!
//! A recording backend and connection stand in for the platform; everything
//! else goes through the public `Host` API the way an application would.

use cgmath::{Point2, Vector2};
use parking_lot::Mutex;
use perch::backend::{Backend, Connection};
use perch::color::Color;
use perch::events::{EventCategory, EventHandler, EventKind, EventMask, MouseButton, RawEvent};
use perch::{
    BoundsOp, ComponentId, Decoration, Error, GraphicsConfig, Host, NativeHandle, Rect,
    WindowConfig, WindowKind, WindowState,
};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
struct BackendState {
    next_handle: NativeHandle,
    layouts: usize,
    shows: usize,
    hides: usize,
    reshapes: Vec<(Rect, BoundsOp)>,
    disposed: usize,
}

/// Counts peer operations; peers are just their native handles.
#[derive(Clone, Debug, Default)]
struct TestBackend {
    state: Arc<Mutex<BackendState>>,
}

impl TestBackend {
    fn create(&mut self) -> Result<(NativeHandle, NativeHandle), String> {
        let mut state = self.state.lock();
        state.next_handle += 1;
        Ok((state.next_handle, state.next_handle))
    }
}

impl Backend for TestBackend {
    type Peer = NativeHandle;
    type Error = String;

    fn create_component(
        &mut self,
        _id: ComponentId,
        _bounds: Rect,
    ) -> Result<(NativeHandle, NativeHandle), String> {
        self.create()
    }

    fn create_window(
        &mut self,
        _id: ComponentId,
        _bounds: Rect,
        _kind: WindowKind,
    ) -> Result<(NativeHandle, NativeHandle), String> {
        self.create()
    }

    fn create_frame(
        &mut self,
        _id: ComponentId,
        _bounds: Rect,
        _title: &str,
        _undecorated: bool,
    ) -> Result<(NativeHandle, NativeHandle), String> {
        self.create()
    }

    fn create_dialog(
        &mut self,
        _id: ComponentId,
        _bounds: Rect,
        _title: &str,
    ) -> Result<(NativeHandle, NativeHandle), String> {
        self.create()
    }

    fn layout(&mut self, _peer: &mut NativeHandle) -> Result<(), String> {
        self.state.lock().layouts += 1;
        Ok(())
    }

    fn set_background(&mut self, _peer: &mut NativeHandle, _color: Color) -> Result<(), String> {
        Ok(())
    }

    fn update_graphics_data(
        &mut self,
        _peer: &mut NativeHandle,
        _config: GraphicsConfig,
    ) -> Result<(), String> {
        Ok(())
    }

    fn reshape(
        &mut self,
        _peer: &mut NativeHandle,
        bounds: Rect,
        op: BoundsOp,
    ) -> Result<(), String> {
        self.state.lock().reshapes.push((bounds, op));
        Ok(())
    }

    fn show(&mut self, _peer: &mut NativeHandle) -> Result<(), String> {
        self.state.lock().shows += 1;
        Ok(())
    }

    fn hide(&mut self, _peer: &mut NativeHandle) -> Result<(), String> {
        self.state.lock().hides += 1;
        Ok(())
    }

    fn set_title(&mut self, _peer: &mut NativeHandle, _title: &str) -> Result<(), String> {
        Ok(())
    }

    fn to_front(&mut self, _peer: &mut NativeHandle) -> Result<(), String> {
        Ok(())
    }

    fn dispose_peer(&mut self, _peer: NativeHandle) -> Result<(), String> {
        self.state.lock().disposed += 1;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ConnState {
    atoms: Vec<String>,
    name_lookups: usize,
    byte_props: HashMap<(NativeHandle, u32), Vec<u8>>,
    card_props: HashMap<(NativeHandle, u32), u32>,
    list_props: HashMap<(NativeHandle, u32), Vec<u32>>,
}

/// An in-memory property store standing in for the wire protocol.
#[derive(Clone, Debug, Default)]
struct TestConnection {
    state: Arc<Mutex<ConnState>>,
}

impl Connection for TestConnection {
    type Error = String;

    fn intern_atom(&mut self, name: &str) -> Result<u32, String> {
        let mut state = self.state.lock();
        if let Some(pos) = state.atoms.iter().position(|n| n == name) {
            return Ok(pos as u32 + 1);
        }
        state.atoms.push(name.to_owned());
        Ok(state.atoms.len() as u32)
    }

    fn atom_name(&mut self, id: u32) -> Result<String, String> {
        let mut state = self.state.lock();
        state.name_lookups += 1;
        state
            .atoms
            .get(id as usize - 1)
            .cloned()
            .ok_or_else(|| format!("no atom {}", id))
    }

    fn set_property(
        &mut self,
        window: NativeHandle,
        property: u32,
        value: &[u8],
    ) -> Result<(), String> {
        self.state
            .lock()
            .byte_props
            .insert((window, property), value.to_vec());
        Ok(())
    }

    fn get_property(&mut self, window: NativeHandle, property: u32) -> Result<Vec<u8>, String> {
        self.state
            .lock()
            .byte_props
            .get(&(window, property))
            .cloned()
            .ok_or_else(|| "no such property".to_owned())
    }

    fn set_card32_property(
        &mut self,
        window: NativeHandle,
        property: u32,
        value: u32,
    ) -> Result<(), String> {
        self.state.lock().card_props.insert((window, property), value);
        Ok(())
    }

    fn get_card32_property(&mut self, window: NativeHandle, property: u32) -> Result<u32, String> {
        self.state
            .lock()
            .card_props
            .get(&(window, property))
            .copied()
            .ok_or_else(|| "no such property".to_owned())
    }

    fn delete_property(&mut self, window: NativeHandle, property: u32) -> Result<(), String> {
        self.state.lock().byte_props.remove(&(window, property));
        self.state.lock().card_props.remove(&(window, property));
        self.state.lock().list_props.remove(&(window, property));
        Ok(())
    }

    fn set_atom_list_property(
        &mut self,
        window: NativeHandle,
        property: u32,
        atoms: &[u32],
    ) -> Result<(), String> {
        self.state
            .lock()
            .list_props
            .insert((window, property), atoms.to_vec());
        Ok(())
    }

    fn get_atom_list_property(
        &mut self,
        window: NativeHandle,
        property: u32,
    ) -> Result<Vec<u32>, String> {
        self.state
            .lock()
            .list_props
            .get(&(window, property))
            .cloned()
            .ok_or_else(|| "no such property".to_owned())
    }
}

fn new_host() -> (
    Host<TestBackend, TestConnection>,
    crossbeam::Sender<RawEvent>,
    Arc<Mutex<BackendState>>,
    Arc<Mutex<ConnState>>,
) {
    let backend = TestBackend::default();
    let conn = TestConnection::default();
    let backend_state = Arc::clone(&backend.state);
    let conn_state = Arc::clone(&conn.state);
    let (host, sender) = Host::new(backend, conn);
    (host, sender, backend_state, conn_state)
}

fn frame(title: &str, bounds: Rect) -> WindowConfig {
    WindowConfig {
        decoration: Decoration::Frame {
            title: title.to_owned(),
            undecorated: false,
        },
        bounds,
        ..WindowConfig::default()
    }
}

// =============================================================================
// Window lifecycle
// =============================================================================

#[test]
fn test_window_lifecycle_full() {
    let (host, _sender, backend, _) = new_host();
    let bounds = Rect::new(Point2::new(0, 0), Vector2::new(640, 480));

    let win = {
        let mut tree = host.tree();
        let win = tree.create_window(frame("main", bounds)).unwrap();
        let panel = tree.create_container();
        let button = tree.create_component();
        tree.add_child(win, panel).unwrap();
        tree.add_child(panel, button).unwrap();
        assert_eq!(tree.window_state(win).unwrap(), WindowState::Unrealized);

        // first show: realize the whole subtree, one layout pass, then show
        tree.set_visible(win, true).unwrap();
        assert_eq!(tree.window_state(win).unwrap(), WindowState::Visible);
        assert!(tree.is_displayable(panel).unwrap());
        assert!(tree.is_displayable(button).unwrap());

        // showing requires the whole ancestor chain to be visible
        assert!(!tree.is_showing(button).unwrap());
        tree.set_visible(panel, true).unwrap();
        tree.set_visible(button, true).unwrap();
        assert!(tree.is_showing(button).unwrap());
        win
    };
    {
        let state = backend.lock();
        assert_eq!(state.layouts, 1);
        assert_eq!(state.shows, 1);
    }

    // second show runs no extra pre-show pass
    host.tree().set_visible(win, false).unwrap();
    host.tree().set_visible(win, true).unwrap();
    {
        let state = backend.lock();
        assert_eq!(state.layouts, 1);
        assert_eq!(state.shows, 2);
        assert_eq!(state.hides, 1);
    }

    // dispose tears down the subtree's peers and is idempotent
    host.tree().dispose(win).unwrap();
    host.tree().dispose(win).unwrap();
    assert_eq!(host.tree().window_state(win).unwrap(), WindowState::Disposed);
    assert_eq!(backend.lock().disposed, 3);
    match host.tree().set_visible(win, true) {
        Err(Error::Disposed(id)) => assert_eq!(id, win),
        other => panic!("expected Disposed, got {:?}", other),
    };
}

#[test]
fn test_explicit_placement_sticks_across_later_changes() {
    let (host, _sender, backend, _) = new_host();
    let bounds = Rect::new(Point2::new(0, 0), Vector2::new(200, 200));

    let mut tree = host.tree();
    let win = tree.create_window(frame("placed", bounds)).unwrap();
    tree.add_notify(win).unwrap();
    assert!(tree.is_location_by_platform(win).unwrap());

    tree.set_bounds(win, Rect::new(Point2::new(50, 60), Vector2::new(300, 200)))
        .unwrap();
    assert!(!tree.is_location_by_platform(win).unwrap());

    // the peer observed the operation that caused it
    let (_, op) = *backend.lock().reshapes.last().unwrap();
    assert_eq!(op, BoundsOp::SetBounds);

    // later size-only and client-size changes never restore platform placement
    tree.set_size(win, 400, 300).unwrap();
    tree.set_client_size(win, 500, 400).unwrap();
    assert!(!tree.is_location_by_platform(win).unwrap());
}

// =============================================================================
// Hit testing
// =============================================================================

#[test]
fn test_component_at_returns_topmost_child() {
    let (host, _sender, _, _) = new_host();
    let mut tree = host.tree();

    let container = tree.create_container();
    tree.set_bounds(
        container,
        Rect::new(Point2::new(0, 0), Vector2::new(300, 100)),
    )
    .unwrap();

    let a = tree.create_component();
    let b = tree.create_component();
    let c = tree.create_component();
    for &id in [a, b, c].iter() {
        tree.add_child(container, id).unwrap();
    }
    tree.set_bounds(a, Rect::new(Point2::new(0, 0), Vector2::new(100, 100)))
        .unwrap();
    tree.set_bounds(b, Rect::new(Point2::new(50, 0), Vector2::new(100, 100)))
        .unwrap();
    tree.set_bounds(c, Rect::new(Point2::new(100, 0), Vector2::new(100, 100)))
        .unwrap();

    // inside both b and c: the last-added wins
    assert_eq!(
        tree.component_at(container, Point2::new(120, 50)).unwrap(),
        Some(c)
    );
    // inside only the container
    assert_eq!(
        tree.component_at(container, Point2::new(250, 50)).unwrap(),
        Some(container)
    );
}

// =============================================================================
// Event pump
// =============================================================================

#[test]
fn test_events_route_through_handle_map() {
    let (host, sender, _, _) = new_host();

    let (win, handle) = {
        let mut tree = host.tree();
        let win = tree
            .create_window(frame(
                "events",
                Rect::new(Point2::new(0, 0), Vector2::new(100, 100)),
            ))
            .unwrap();
        tree.set_visible(win, true).unwrap();
        let handle = tree.handle_of(win).unwrap();
        (win, handle)
    };

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    host.tree()
        .set_event_handler(
            win,
            EventCategory::Mouse,
            EventHandler::new(move |event| sink.lock().push(event.kind)),
        )
        .unwrap();

    let down = EventKind::MouseDown(Point2::new(10, 10), MouseButton::Left);
    let up = EventKind::MouseUp(Point2::new(10, 10), MouseButton::Left);
    sender
        .send(RawEvent {
            window: handle,
            kind: down,
        })
        .unwrap();
    sender
        .send(RawEvent {
            window: handle,
            kind: up,
        })
        .unwrap();
    // an event for a handle nothing owns is dropped, not an error
    sender
        .send(RawEvent {
            window: 0xdead,
            kind: down,
        })
        .unwrap();
    host.poll();
    assert_eq!(*received.lock(), vec![down, up]);

    // masked-out categories are filtered at the dispatch entry point
    host.tree().set_event_mask(win, EventMask::KEY).unwrap();
    sender
        .send(RawEvent {
            window: handle,
            kind: down,
        })
        .unwrap();
    host.poll();
    assert_eq!(received.lock().len(), 2);

    // unrealizing removes the handle-map entry; in-flight events are dropped
    host.tree().set_event_mask(win, EventMask::all()).unwrap();
    host.tree().remove_notify(win).unwrap();
    sender
        .send(RawEvent {
            window: handle,
            kind: down,
        })
        .unwrap();
    host.poll();
    assert_eq!(received.lock().len(), 2);
}

#[test]
fn test_pump_thread_runs_concurrently_with_mutation() {
    let (host, sender, _, _) = new_host();
    let host = Arc::new(host);

    let (win, handle) = {
        let mut tree = host.tree();
        let win = tree
            .create_window(frame(
                "pump",
                Rect::new(Point2::new(0, 0), Vector2::new(100, 100)),
            ))
            .unwrap();
        tree.set_visible(win, true).unwrap();
        let handle = tree.handle_of(win).unwrap();
        (win, handle)
    };

    let hits = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&hits);
    host.tree()
        .set_event_handler(
            win,
            EventCategory::Key,
            EventHandler::new(move |_| *sink.lock() += 1),
        )
        .unwrap();

    let pump_host = Arc::clone(&host);
    let pump = std::thread::spawn(move || pump_host.run());

    for _ in 0..100 {
        sender
            .send(RawEvent {
                window: handle,
                kind: EventKind::KeyDown(42, Default::default()),
            })
            .unwrap();
        // application-thread mutation interleaves with dispatch
        host.tree().set_location(win, 1, 2).unwrap();
    }

    drop(sender);
    pump.join().unwrap();
    assert_eq!(*hits.lock(), 100);
}

// =============================================================================
// Atom registry and properties
// =============================================================================

#[test]
fn test_atom_by_name_is_resolved_and_canonical() {
    let (host, _sender, _, conn) = new_host();
    let display = host.display();

    let protocols = display.atom_by_name("WM_PROTOCOLS").unwrap();
    assert!(protocols.is_resolved());

    // the name came from us, so no round trip is needed to read it back
    assert_eq!(display.name_of(&protocols).unwrap(), "WM_PROTOCOLS");
    assert_eq!(conn.lock().name_lookups, 0);

    let again = display.atom_by_name("WM_PROTOCOLS").unwrap();
    assert!(Arc::ptr_eq(&protocols, &again));
    let by_id = display.atom_by_id(protocols.id());
    assert!(Arc::ptr_eq(&protocols, &by_id));
}

#[test]
fn test_string_and_card32_properties_round_trip() {
    let (host, _sender, _, _) = new_host();
    let display = host.display();
    let window: NativeHandle = 0x600d;

    let name_atom = display.atom_by_name("WM_NAME").unwrap();
    display.set_property(window, &name_atom, "hello").unwrap();
    assert_eq!(display.get_property(window, &name_atom).unwrap(), "hello");

    let desktop = display.atom_by_name("_NET_WM_DESKTOP").unwrap();
    display.set_card32_property(window, &desktop, 2).unwrap();
    assert_eq!(display.get_card32_property(window, &desktop).unwrap(), 2);

    display.delete_property(window, &name_atom).unwrap();
    assert!(display.get_property(window, &name_atom).is_err());
}

#[test]
fn test_atom_list_property_preserves_order() {
    let (host, _sender, _, _) = new_host();
    let display = host.display();
    let window: NativeHandle = 0x77;

    let protocols = display.atom_by_name("WM_PROTOCOLS").unwrap();
    let delete = display.atom_by_name("WM_DELETE_WINDOW").unwrap();
    let ping = display.atom_by_name("_NET_WM_PING").unwrap();

    display
        .set_atom_list_property(window, &protocols, &[delete.clone(), ping.clone()])
        .unwrap();
    let read_back = display.get_atom_list_property(window, &protocols).unwrap();
    assert_eq!(read_back.len(), 2);
    assert!(Arc::ptr_eq(&read_back[0], &delete));
    assert!(Arc::ptr_eq(&read_back[1], &ping));
}

#[test]
fn test_unresolved_atom_rejects_property_ops() {
    let (host, _sender, _, _) = new_host();
    let display = host.display();

    let local = display.local_atom("APP_PRIVATE_STATE");
    assert!(!local.is_resolved());
    match display.set_card32_property(1, &local, 9) {
        Err(Error::UnresolvedAtom) => {}
        other => panic!("expected UnresolvedAtom, got {:?}", other),
    }
}

#[test]
fn test_realized_window_advertises_its_kind() {
    let (host, _sender, _, conn) = new_host();

    let mut tree = host.tree();
    let win = tree
        .create_window(WindowConfig {
            kind: WindowKind::Popup,
            bounds: Rect::new(Point2::new(0, 0), Vector2::new(80, 120)),
            ..WindowConfig::default()
        })
        .unwrap();
    tree.add_notify(win).unwrap();
    let handle = tree.handle_of(win).unwrap();
    drop(tree);

    let display = host.display();
    let window_type = display.atom_by_name("_NET_WM_WINDOW_TYPE").unwrap();
    let popup = display.atom_by_name("_NET_WM_WINDOW_TYPE_POPUP_MENU").unwrap();

    let state = conn.lock();
    assert_eq!(
        state.list_props.get(&(handle, window_type.id())),
        Some(&vec![popup.id()])
    );
}
