//! Snapshot history with undo/redo and live-session broadcasting.

use crate::collaboration::SyncClient;
use crate::element::Snapshot;

/// Maximum number of snapshots kept for undo.
pub const MAX_UNDO_HISTORY: usize = 100;

/// State captured when a gesture opens, used to roll it back.
#[derive(Debug)]
enum GestureBase {
    /// Position of the entry pushed for the gesture.
    Local { entry: usize },
    /// Snapshot installed before the gesture started.
    Live { base: Snapshot },
}

/// Ordered snapshots plus a cursor.
///
/// `entries[index]` is the current state. Without a session, commits grow the
/// stack and undo/redo move the cursor. While bound to a session every commit
/// collapses the stack to the committed snapshot and is broadcast to the room.
#[derive(Debug)]
pub struct History {
    entries: Vec<Snapshot>,
    index: usize,
    gesture: Option<GestureBase>,
    session: Option<SyncClient>,
}

impl History {
    pub fn new(initial: Snapshot) -> Self {
        Self {
            entries: vec![initial],
            index: 0,
            gesture: None,
            session: None,
        }
    }

    /// The current snapshot.
    pub fn current(&self) -> &Snapshot {
        &self.entries[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    /// Whether a live session is bound.
    pub fn is_live(&self) -> bool {
        self.session.is_some()
    }

    /// Room of the bound session.
    pub fn room(&self) -> Option<&str> {
        self.session.as_ref().map(SyncClient::room)
    }

    pub fn session(&self) -> Option<&SyncClient> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut SyncClient> {
        self.session.as_mut()
    }

    pub fn in_gesture(&self) -> bool {
        self.gesture.is_some()
    }

    /// Commit a locally produced snapshot.
    ///
    /// `overwrite` replaces the current entry instead of pushing a new one.
    pub fn commit(&mut self, snapshot: Snapshot, overwrite: bool) {
        if let Some(session) = self.session.as_mut() {
            session.publish(&snapshot);
            self.collapse(snapshot);
            return;
        }

        if overwrite {
            self.entries[self.index] = snapshot;
        } else {
            self.push(snapshot);
        }
    }

    /// Install a snapshot received from the room without re-broadcasting it.
    ///
    /// An open gesture loses its base, so a later rollback cannot reinstate
    /// the state the remote snapshot replaced.
    pub fn commit_remote(&mut self, snapshot: Snapshot) {
        self.gesture = None;
        self.collapse(snapshot);
    }

    /// Step back one entry. Returns whether the cursor moved.
    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.index -= 1;
        self.rebroadcast();
        true
    }

    /// Step forward one entry. Returns whether the cursor moved.
    pub fn redo(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.index += 1;
        self.rebroadcast();
        true
    }

    /// Open a gesture on top of the current snapshot.
    ///
    /// Frames of the gesture are committed with `overwrite = true`; the whole
    /// gesture then undoes as a single step. The capacity limit is applied
    /// when the gesture ends, so a rolled back gesture costs no undo step.
    pub fn begin_gesture(&mut self) {
        if self.session.is_some() {
            self.gesture = Some(GestureBase::Live {
                base: self.current().clone(),
            });
        } else {
            let current = self.current().clone();
            self.append(current);
            self.gesture = Some(GestureBase::Local { entry: self.index });
        }
    }

    /// Discard the open gesture, restoring the state before it began.
    pub fn rollback_to_previous(&mut self) {
        match self.gesture.take() {
            None => {}
            Some(GestureBase::Local { entry }) => {
                let entry = entry.clamp(1, self.entries.len());
                self.entries.truncate(entry);
                self.index = entry - 1;
            }
            Some(GestureBase::Live { base }) => {
                if *self.current() != base {
                    self.commit(base, true);
                }
            }
        }
    }

    /// Close the open gesture, keeping its last frame.
    pub fn end_gesture(&mut self) {
        self.gesture = None;
        self.evict();
    }

    /// Bind to `room`. Any previous binding is left first; its farewell
    /// messages are returned so they can still be sent.
    pub fn join_session(&mut self, room: impl Into<String>) -> Vec<String> {
        let room = room.into();
        if self.room() == Some(room.as_str()) {
            return Vec::new();
        }
        let farewell = self.leave_session();
        log::info!("Joining session {}", room);
        self.session = Some(SyncClient::new(room));
        farewell
    }

    /// Unbind from the session. Returns the messages still queued, ending
    /// with the leave message.
    pub fn leave_session(&mut self) -> Vec<String> {
        self.gesture = None;
        match self.session.take() {
            Some(session) => {
                log::info!("Leaving session {}", session.room());
                session.leave()
            }
            None => Vec::new(),
        }
    }

    /// Drop the session binding without a leave message.
    pub fn detach_session(&mut self) {
        if let Some(session) = self.session.take() {
            log::warn!("Detached from session {}", session.room());
        }
        self.gesture = None;
    }

    /// Drain messages queued by the bound session.
    pub fn take_outgoing(&mut self) -> Vec<String> {
        self.session.as_mut().map(SyncClient::take_outgoing).unwrap_or_default()
    }

    /// Append and enforce the capacity limit.
    fn push(&mut self, snapshot: Snapshot) {
        self.append(snapshot);
        self.evict();
    }

    /// Truncate the redo branch and append.
    fn append(&mut self, snapshot: Snapshot) {
        self.entries.truncate(self.index + 1);
        self.entries.push(snapshot);
        self.index = self.entries.len() - 1;
    }

    /// Drop the oldest entries beyond `MAX_UNDO_HISTORY`.
    fn evict(&mut self) {
        let excess = self.entries.len().saturating_sub(MAX_UNDO_HISTORY);
        if excess == 0 {
            return;
        }
        self.entries.drain(..excess);
        self.index = self.index.saturating_sub(excess);
        if let Some(GestureBase::Local { entry }) = &mut self.gesture {
            *entry = entry.saturating_sub(excess);
        }
    }

    fn collapse(&mut self, snapshot: Snapshot) {
        self.entries = vec![snapshot];
        self.index = 0;
    }

    fn rebroadcast(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.publish(&self.entries[self.index]);
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(Snapshot::empty())
    }
}
