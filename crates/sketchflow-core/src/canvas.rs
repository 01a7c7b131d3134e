//! Canvas state and pointer orchestration.
//!
//! [`Canvas`] ties the pieces together: pointer input is mapped through the
//! camera, turned into new snapshots by the geometry engine and committed to
//! the history, which broadcasts them when a session is bound. Everything runs
//! to completion per input event.

use crate::camera::Camera;
use crate::element::{Anchors, Element, ElementId, Shape, Snapshot, Style};
use crate::geometry::{self, LayerMove, ResizeMode, handle_at, locate_topmost, resize};
use crate::history::History;
use crate::interaction::{Cursor, Gesture, InteractionState, Modifiers, ToolKind};
use crate::sync::{SyncEvent, Transport};
use kurbo::{Point, Size, Vec2};

/// Offset applied to duplicated elements.
pub const DUPLICATE_OFFSET: f64 = 10.0;

/// Called with the current snapshot after every change.
pub type ChangeListener = Box<dyn FnMut(&Snapshot)>;

/// The whiteboard as seen by one client.
pub struct Canvas {
    history: History,
    camera: Camera,
    interaction: InteractionState,
    tool: ToolKind,
    /// Keep the drawing tool active after finishing a shape.
    lock_tool: bool,
    /// Style applied to new elements.
    style: Style,
    listeners: Vec<ChangeListener>,
    /// Messages left behind by a session that was already unbound.
    outbox: Vec<String>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(Snapshot::empty())
    }
}

impl Canvas {
    /// Create a canvas showing `initial`, e.g. a locally persisted snapshot.
    pub fn new(initial: Snapshot) -> Self {
        Self {
            history: History::new(initial),
            camera: Camera::new(),
            interaction: InteractionState::default(),
            tool: ToolKind::default(),
            lock_tool: false,
            style: Style::default(),
            listeners: Vec::new(),
            outbox: Vec::new(),
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> &Snapshot {
        self.history.current()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn lock_tool(&self) -> bool {
        self.lock_tool
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn selected(&self) -> Option<ElementId> {
        self.interaction.selected
    }

    pub fn selected_element(&self) -> Option<&Element> {
        self.interaction.selected.and_then(|id| self.snapshot().get(id))
    }

    pub fn cursor(&self) -> Cursor {
        self.interaction.cursor(self.tool)
    }

    pub fn is_live(&self) -> bool {
        self.history.is_live()
    }

    /// Register a change listener.
    pub fn subscribe(&mut self, listener: impl FnMut(&Snapshot) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Select a tool. Any tool other than selection clears the selection.
    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tool = tool;
        if tool != ToolKind::Select {
            self.interaction.selected = None;
            self.interaction.hovered_handle = None;
        }
    }

    pub fn set_lock_tool(&mut self, lock: bool) {
        self.lock_tool = lock;
    }

    pub fn set_style(&mut self, style: Style) {
        self.style = style;
    }

    /// Resize the drawing surface (screen pixels).
    pub fn set_viewport(&mut self, size: Size) {
        self.camera.set_viewport(size);
    }

    /// Wheel input in screen pixels: pans, or zooms while ctrl or meta is held.
    pub fn scroll(&mut self, delta: Vec2, modifiers: Modifiers) {
        if modifiers.ctrl || modifiers.meta {
            self.camera.zoom_by(delta.y * -0.01);
        } else {
            self.camera.pan(-delta / self.camera.scale);
        }
    }

    // --- Pointer input ---

    pub fn pointer_down(&mut self, screen: Point, modifiers: Modifiers) {
        let world = self.camera.screen_to_world(screen);
        let padding = self.camera.handle_padding();
        self.interaction.anchor = Some(screen);

        if self.tool == ToolKind::Select {
            let grip = self
                .selected_element()
                .and_then(|element| handle_at(element, world, padding).map(|h| (h, element.anchors())));
            if let Some((handle, original)) = grip {
                self.history.begin_gesture();
                self.interaction.gesture = Gesture::Resize {
                    handle,
                    mode: if modifiers.shift {
                        ResizeMode::Proportional
                    } else {
                        ResizeMode::Default
                    },
                    original,
                    origin: world,
                };
                return;
            }
        }

        match self.tool {
            ToolKind::Pan => {
                self.interaction.gesture = Gesture::Pan { grab: world };
            }
            ToolKind::Select => {
                let Some(hit) = locate_topmost(world, self.snapshot().elements()).cloned() else {
                    self.interaction.selected = None;
                    return;
                };
                let offset = world - hit.anchors().start();
                self.history.begin_gesture();
                if modifiers.alt {
                    let copy = geometry::duplicate(&hit, 0.0, 0.0);
                    self.interaction.selected = Some(copy.id());
                    let next = self.snapshot().with_inserted_after(hit.id(), copy);
                    self.commit(next, true);
                } else {
                    self.interaction.selected = Some(hit.id());
                }
                self.interaction.gesture = Gesture::Move { offset };
            }
            tool => {
                let Some(element_tool) = tool.element_tool() else {
                    return;
                };
                let element = Element::new(element_tool, world, world, self.style.clone());
                let id = element.id();
                self.history.begin_gesture();
                let next = self.snapshot().with_pushed(element);
                self.commit(next, true);
                self.interaction.gesture = Gesture::Draw { id };
            }
        }
    }

    pub fn pointer_move(&mut self, screen: Point) {
        let world = self.camera.screen_to_world(screen);
        let padding = self.camera.handle_padding();

        self.interaction.hovered = locate_topmost(world, self.snapshot().elements()).is_some();
        self.interaction.hovered_handle = self
            .selected_element()
            .and_then(|element| handle_at(element, world, padding));

        let frame = match self.interaction.gesture.clone() {
            Gesture::Idle => None,
            Gesture::Pan { grab } => {
                self.camera.pan(world - grab);
                None
            }
            Gesture::Draw { id } => self.snapshot().get(id).map(|element| match element.shape {
                Shape::Pen { .. } => element.with_point(world),
                _ => {
                    let start = element.anchors().start();
                    element.with_anchors(Anchors::from_points(start, world))
                }
            }),
            Gesture::Move { offset } => self.selected_element().map(|element| {
                let target = world - offset;
                let start = element.anchors().start();
                geometry::translate(element, target.x - start.x, target.y - start.y)
            }),
            Gesture::Resize {
                handle,
                mode,
                original,
                origin,
            } => self
                .selected_element()
                .map(|element| resize(handle, mode, world, padding, &original, origin).apply(element)),
        };

        if let Some(element) = frame {
            let next = self.snapshot().with_replaced(element);
            self.commit(next, true);
        }
    }

    pub fn pointer_up(&mut self, screen: Point) {
        let gesture = std::mem::take(&mut self.interaction.gesture);
        let anchor = self.interaction.anchor.take();

        match gesture {
            Gesture::Idle | Gesture::Pan { .. } => return,
            _ if anchor == Some(screen) => {
                self.history.rollback_to_previous();
                self.settle();
                return;
            }
            Gesture::Draw { id } => {
                if let Some(element) = self.snapshot().get(id).cloned() {
                    match &element.shape {
                        Shape::Pen { points } if points.len() < 2 => {
                            self.history.rollback_to_previous();
                            self.settle();
                            return;
                        }
                        Shape::Pen { .. } => {}
                        _ => {
                            let next = self.snapshot().with_replaced(geometry::normalize(&element));
                            self.commit(next, true);
                            if !self.lock_tool {
                                self.tool = ToolKind::Select;
                                self.interaction.selected = Some(id);
                            }
                        }
                    }
                }
            }
            Gesture::Resize { .. } => {
                if let Some(element) = self.selected_element() {
                    let next = self.snapshot().with_replaced(geometry::normalize(element));
                    self.commit(next, true);
                }
            }
            Gesture::Move { .. } => {}
        }

        self.history.end_gesture();
        self.settle();
    }

    // --- Editing commands ---

    /// Delete the selected element. Returns whether anything changed.
    pub fn delete_selected(&mut self) -> bool {
        let Some(id) = self.selected_element().map(Element::id) else {
            return false;
        };
        let next = self.snapshot().without(id);
        self.interaction.selected = None;
        self.commit(next, false);
        self.settle();
        true
    }

    /// Duplicate the selected element above itself and select the copy.
    pub fn duplicate_selected(&mut self) -> Option<ElementId> {
        let element = self.selected_element()?;
        let copy = geometry::duplicate(element, DUPLICATE_OFFSET, DUPLICATE_OFFSET);
        let copy_id = copy.id();
        let next = self.snapshot().with_inserted_after(element.id(), copy);
        self.interaction.selected = Some(copy_id);
        self.commit(next, false);
        self.settle();
        Some(copy_id)
    }

    /// Move the selected element by `(dx, dy)`, e.g. from arrow keys.
    pub fn nudge_selected(&mut self, dx: f64, dy: f64) -> bool {
        let Some(element) = self.selected_element() else {
            return false;
        };
        let next = self.snapshot().with_replaced(geometry::translate(element, dx, dy));
        self.commit(next, false);
        self.settle();
        true
    }

    /// Move the selected element to another layer.
    pub fn reorder_selected(&mut self, to: LayerMove) -> bool {
        let Some(id) = self.selected() else {
            return false;
        };
        if !self.snapshot().contains(id) {
            return false;
        }
        let next = geometry::reorder(id, to, self.snapshot());
        self.commit(next, false);
        self.settle();
        true
    }

    /// Replace the whole canvas, e.g. with an opened document. Undoable.
    pub fn replace(&mut self, snapshot: Snapshot) {
        self.commit(snapshot, false);
        self.settle();
    }

    pub fn undo(&mut self) -> bool {
        let moved = self.history.undo();
        if moved {
            self.settle();
        }
        moved
    }

    pub fn redo(&mut self) -> bool {
        let moved = self.history.redo();
        if moved {
            self.settle();
        }
        moved
    }

    // --- Sessions ---

    /// Start sharing the canvas in `room`.
    pub fn join_session(&mut self, room: impl Into<String>) {
        let farewell = self.history.join_session(room);
        self.outbox.extend(farewell);
    }

    /// Stop sharing. The local history restarts from the current snapshot.
    pub fn leave_session(&mut self) {
        let farewell = self.history.leave_session();
        self.outbox.extend(farewell);
    }

    /// Exchange messages with the transport: apply inbound events, then flush
    /// everything queued. Returns the events that were applied.
    pub fn pump(&mut self, transport: &mut impl Transport) -> Vec<SyncEvent> {
        let events = transport.poll_events();
        for event in &events {
            self.apply_event(event.clone());
        }

        let mut outgoing = std::mem::take(&mut self.outbox);
        outgoing.extend(self.history.take_outgoing());
        for message in outgoing {
            if let Err(e) = transport.send(&message) {
                log::warn!("Dropping outgoing message: {}", e);
            }
        }

        events
    }

    /// Apply one transport event.
    pub fn apply_event(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::SnapshotReceived { room, snapshot } => {
                if self.history.room() == Some(room.as_str()) {
                    self.history.commit_remote(snapshot);
                    self.settle();
                } else {
                    log::debug!("Ignoring snapshot for room {}", room);
                }
            }
            SyncEvent::Connected | SyncEvent::Reconnected { .. } => {
                if let Some(session) = self.history.session_mut() {
                    session.rejoin();
                }
            }
            SyncEvent::ReconnectFailed => {
                log::warn!("Connection lost for good, leaving live mode");
                self.history.detach_session();
            }
            SyncEvent::JoinedRoom { room, peer_count } => {
                log::info!("Joined room {} ({} peers)", room, peer_count);
            }
            SyncEvent::Reconnecting { attempt } => {
                log::info!("Reconnecting, attempt {}", attempt);
            }
            SyncEvent::Disconnected => log::info!("Disconnected"),
            SyncEvent::Error { message } => log::warn!("Server error: {}", message),
        }
    }

    fn commit(&mut self, snapshot: Snapshot, overwrite: bool) {
        self.history.commit(snapshot, overwrite);
        self.notify();
    }

    /// Drop a selection whose element is gone and tell listeners.
    fn settle(&mut self) {
        if let Some(id) = self.interaction.selected {
            if !self.snapshot().contains(id) {
                self.interaction.selected = None;
                self.interaction.hovered_handle = None;
            }
        }
        self.notify();
    }

    fn notify(&mut self) {
        let snapshot = self.history.current();
        for listener in &mut self.listeners {
            listener(snapshot);
        }
    }
}
