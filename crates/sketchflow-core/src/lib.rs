//! SketchFlow Core Library
//!
//! Element model, geometry, history and sync client for the SketchFlow
//! collaborative whiteboard.

pub mod camera;
pub mod canvas;
pub mod collaboration;
pub mod document;
pub mod element;
pub mod geometry;
pub mod history;
pub mod interaction;
pub mod sync;

pub use camera::Camera;
pub use canvas::Canvas;
pub use collaboration::SyncClient;
pub use document::DocumentError;
pub use element::{Anchors, Element, ElementId, Shape, Snapshot, StrokeStyle, Style, Tool};
pub use geometry::{Handle, LayerMove, ResizeMode};
pub use history::{History, MAX_UNDO_HISTORY};
pub use interaction::{Cursor, Gesture, InteractionState, Modifiers, ToolKind};
pub use sync::{ClientMessage, ConnectionState, ServerMessage, SyncConfig, SyncError, SyncEvent, Transport};

#[cfg(not(target_arch = "wasm32"))]
pub use sync::NativeWebSocket;
