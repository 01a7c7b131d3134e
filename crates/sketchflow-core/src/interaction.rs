//! Pointer interaction state: the active tool, the gesture in progress and
//! the cursor it implies.

use crate::element::{Anchors, ElementId, Tool};
use crate::geometry::{Handle, ResizeMode};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Tools selectable on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    #[serde(rename = "selection")]
    Select,
    #[serde(rename = "hand")]
    Pan,
    #[default]
    Pen,
    Line,
    Arrow,
    Rectangle,
    Diamond,
    Circle,
}

impl ToolKind {
    /// The element tool this canvas tool draws with, if any.
    pub fn element_tool(self) -> Option<Tool> {
        match self {
            ToolKind::Select | ToolKind::Pan => None,
            ToolKind::Pen => Some(Tool::Pen),
            ToolKind::Line => Some(Tool::Line),
            ToolKind::Arrow => Some(Tool::Arrow),
            ToolKind::Rectangle => Some(Tool::Rectangle),
            ToolKind::Diamond => Some(Tool::Diamond),
            ToolKind::Circle => Some(Tool::Circle),
        }
    }
}

impl From<Tool> for ToolKind {
    fn from(tool: Tool) -> Self {
        match tool {
            Tool::Pen => ToolKind::Pen,
            Tool::Line => ToolKind::Line,
            Tool::Arrow => ToolKind::Arrow,
            Tool::Rectangle => ToolKind::Rectangle,
            Tool::Diamond => ToolKind::Diamond,
            Tool::Circle => ToolKind::Circle,
        }
    }
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// The gesture in progress between pointer-down and pointer-up.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    /// Drawing the topmost element.
    Draw { id: ElementId },
    /// Dragging the selected element; `offset` is the grab point relative to
    /// the element's first anchor.
    Move { offset: Vec2 },
    /// Dragging a resize handle of the selected element.
    Resize {
        handle: Handle,
        mode: ResizeMode,
        /// Anchors when the drag began.
        original: Anchors,
        /// Pointer position (world) when the drag began.
        origin: Point,
    },
    /// Panning the view; `grab` is the world point held under the pointer.
    Pan { grab: Point },
}

/// Cursor shape implied by the interaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Default,
    Move,
    Crosshair,
    Grab,
    Grabbing,
    ResizeNs,
    ResizeEw,
    ResizeNwse,
    ResizeNesw,
}

impl Cursor {
    /// Cursor shown over a resize handle.
    pub fn for_handle(handle: Handle) -> Self {
        match handle {
            Handle::Top | Handle::Bottom => Cursor::ResizeNs,
            Handle::Left | Handle::Right => Cursor::ResizeEw,
            Handle::TopLeft | Handle::BottomRight => Cursor::ResizeNwse,
            Handle::TopRight | Handle::BottomLeft => Cursor::ResizeNesw,
            Handle::Start | Handle::End => Cursor::Move,
        }
    }

    /// CSS cursor name.
    pub fn css(self) -> &'static str {
        match self {
            Cursor::Default => "default",
            Cursor::Move => "move",
            Cursor::Crosshair => "crosshair",
            Cursor::Grab => "grab",
            Cursor::Grabbing => "grabbing",
            Cursor::ResizeNs => "ns-resize",
            Cursor::ResizeEw => "ew-resize",
            Cursor::ResizeNwse => "nwse-resize",
            Cursor::ResizeNesw => "nesw-resize",
        }
    }
}

/// Per-client pointer state. Never part of a snapshot.
#[derive(Debug, Clone, Default)]
pub struct InteractionState {
    pub gesture: Gesture,
    /// Screen position of the last pointer-down, used to detect clicks.
    pub anchor: Option<Point>,
    /// Whether the pointer is over an element.
    pub hovered: bool,
    pub selected: Option<ElementId>,
    /// Resize handle of the selected element under the pointer.
    pub hovered_handle: Option<Handle>,
}

impl InteractionState {
    pub fn is_idle(&self) -> bool {
        self.gesture == Gesture::Idle
    }

    /// The cursor for the current state and `tool`.
    pub fn cursor(&self, tool: ToolKind) -> Cursor {
        match &self.gesture {
            Gesture::Pan { .. } => Cursor::Grabbing,
            Gesture::Resize { handle, .. } => Cursor::for_handle(*handle),
            Gesture::Draw { .. } => Cursor::Crosshair,
            Gesture::Move { .. } => Cursor::Move,
            Gesture::Idle => match tool {
                ToolKind::Pan => Cursor::Grab,
                ToolKind::Select => {
                    if let Some(handle) = self.hovered_handle {
                        Cursor::for_handle(handle)
                    } else if self.hovered {
                        Cursor::Move
                    } else {
                        Cursor::Default
                    }
                }
                _ => Cursor::Crosshair,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_kind_serde_names() {
        assert_eq!(serde_json::to_string(&ToolKind::Select).unwrap(), r#""selection""#);
        assert_eq!(serde_json::to_string(&ToolKind::Pan).unwrap(), r#""hand""#);
        assert_eq!(serde_json::to_string(&ToolKind::Diamond).unwrap(), r#""diamond""#);
        assert_eq!(ToolKind::default(), ToolKind::Pen);
    }

    #[test]
    fn test_element_tool_mapping() {
        for tool in Tool::ALL {
            assert_eq!(ToolKind::from(tool).element_tool(), Some(tool));
        }
        assert_eq!(ToolKind::Select.element_tool(), None);
        assert_eq!(ToolKind::Pan.element_tool(), None);
    }

    #[test]
    fn test_idle_cursor() {
        let mut state = InteractionState::default();
        assert_eq!(state.cursor(ToolKind::Rectangle), Cursor::Crosshair);
        assert_eq!(state.cursor(ToolKind::Pan), Cursor::Grab);
        assert_eq!(state.cursor(ToolKind::Select), Cursor::Default);

        state.hovered = true;
        assert_eq!(state.cursor(ToolKind::Select), Cursor::Move);

        state.hovered_handle = Some(Handle::TopRight);
        assert_eq!(state.cursor(ToolKind::Select), Cursor::ResizeNesw);
    }

    #[test]
    fn test_gesture_cursor() {
        let mut state = InteractionState::default();
        state.gesture = Gesture::Resize {
            handle: Handle::Bottom,
            mode: ResizeMode::Default,
            original: Anchors::default(),
            origin: Point::ZERO,
        };
        assert_eq!(state.cursor(ToolKind::Select), Cursor::ResizeNs);
        assert_eq!(Cursor::ResizeNs.css(), "ns-resize");

        state.gesture = Gesture::Pan { grab: Point::ZERO };
        assert_eq!(state.cursor(ToolKind::Pan), Cursor::Grabbing);
        assert!(!state.is_idle());
    }
}
