//! Element and snapshot definitions for the whiteboard.

use kurbo::{Point, Rect};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Unique identifier for elements.
pub type ElementId = Uuid;

/// Drawing tools that produce elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Pen,
    Line,
    Arrow,
    Rectangle,
    Diamond,
    Circle,
}

impl Tool {
    /// All drawing tools, in toolbar order.
    pub const ALL: [Tool; 6] = [
        Tool::Pen,
        Tool::Rectangle,
        Tool::Diamond,
        Tool::Circle,
        Tool::Arrow,
        Tool::Line,
    ];

    /// Whether the anchors of this tool describe an axis-aligned box.
    pub fn is_box(self) -> bool {
        matches!(self, Tool::Rectangle | Tool::Diamond | Tool::Circle)
    }

    /// Whether the anchors of this tool are directed endpoints.
    pub fn is_linear(self) -> bool {
        matches!(self, Tool::Line | Tool::Arrow)
    }
}

/// Stroke style for outlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl StrokeStyle {
    /// Cycle to the next stroke style.
    pub fn next(self) -> Self {
        match self {
            StrokeStyle::Solid => StrokeStyle::Dashed,
            StrokeStyle::Dashed => StrokeStyle::Dotted,
            StrokeStyle::Dotted => StrokeStyle::Solid,
        }
    }
}

/// Style properties for elements.
///
/// Everything except `stroke_width` is opaque to the geometry engine and only
/// carried along for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    /// Stroke width, also used as hit-testing tolerance.
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
    /// Stroke color (CSS color string).
    #[serde(default = "default_stroke_color")]
    pub stroke_color: String,
    #[serde(default)]
    pub stroke_style: StrokeStyle,
    /// Fill color (CSS color string, `transparent` for none).
    #[serde(default = "default_fill")]
    pub fill: String,
    /// Opacity in percent (0 = invisible, 100 = opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_stroke_width() -> f64 {
    3.0
}

fn default_stroke_color() -> String {
    "#000000".to_string()
}

fn default_fill() -> String {
    "transparent".to_string()
}

fn default_opacity() -> f64 {
    100.0
}

impl Default for Style {
    fn default() -> Self {
        Self {
            stroke_width: default_stroke_width(),
            stroke_color: default_stroke_color(),
            stroke_style: StrokeStyle::default(),
            fill: default_fill(),
            opacity: default_opacity(),
        }
    }
}

/// The four anchor coordinates of an element.
///
/// For box shapes they span the bounding box (in any order until normalized),
/// for lines and arrows they are the start and end point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Anchors {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Anchors {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn from_points(start: Point, end: Point) -> Self {
        Self::new(start.x, start.y, end.x, end.y)
    }

    pub fn start(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    pub fn end(&self) -> Point {
        Point::new(self.x2, self.y2)
    }

    /// Reorder so that `x1 <= x2` and `y1 <= y2`.
    pub fn normalized(&self) -> Self {
        Self {
            x1: self.x1.min(self.x2),
            y1: self.y1.min(self.y2),
            x2: self.x1.max(self.x2),
            y2: self.y1.max(self.y2),
        }
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            x1: self.x1 + dx,
            y1: self.y1 + dy,
            x2: self.x2 + dx,
            y2: self.y2 + dy,
        }
    }

    /// Normalized bounding rectangle.
    pub fn rect(&self) -> Rect {
        Rect::from_points(self.start(), self.end())
    }
}

/// Tool-specific geometry of an element.
///
/// Serialized with a `tool` tag so the JSON form stays flat:
/// `{"tool": "line", "x1": 0, "y1": 0, "x2": 10, "y2": 10}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "lowercase")]
pub enum Shape {
    /// Freehand stroke. Its anchors are derived from the first and last point.
    Pen { points: Vec<Point> },
    Line(Anchors),
    Arrow(Anchors),
    Rectangle(Anchors),
    Diamond(Anchors),
    Circle(Anchors),
}

impl Shape {
    pub fn tool(&self) -> Tool {
        match self {
            Shape::Pen { .. } => Tool::Pen,
            Shape::Line(_) => Tool::Line,
            Shape::Arrow(_) => Tool::Arrow,
            Shape::Rectangle(_) => Tool::Rectangle,
            Shape::Diamond(_) => Tool::Diamond,
            Shape::Circle(_) => Tool::Circle,
        }
    }

    /// Anchor coordinates. For pen strokes these are the first and last point.
    pub fn anchors(&self) -> Anchors {
        match self {
            Shape::Pen { points } => {
                let first = points.first().copied().unwrap_or(Point::ZERO);
                let last = points.last().copied().unwrap_or(first);
                Anchors::from_points(first, last)
            }
            Shape::Line(a)
            | Shape::Arrow(a)
            | Shape::Rectangle(a)
            | Shape::Diamond(a)
            | Shape::Circle(a) => *a,
        }
    }

    /// Replace the anchors. Pen strokes ignore this since their anchors are derived.
    pub fn with_anchors(&self, anchors: Anchors) -> Shape {
        match self {
            Shape::Pen { .. } => self.clone(),
            Shape::Line(_) => Shape::Line(anchors),
            Shape::Arrow(_) => Shape::Arrow(anchors),
            Shape::Rectangle(_) => Shape::Rectangle(anchors),
            Shape::Diamond(_) => Shape::Diamond(anchors),
            Shape::Circle(_) => Shape::Circle(anchors),
        }
    }

    pub fn points(&self) -> Option<&[Point]> {
        match self {
            Shape::Pen { points } => Some(points),
            _ => None,
        }
    }
}

/// A drawn element: identity, geometry and style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub(crate) id: ElementId,
    #[serde(flatten)]
    pub shape: Shape,
    #[serde(flatten)]
    pub style: Style,
}

impl Element {
    /// Create an element for `tool` spanning `start` to `end`.
    ///
    /// Pen elements start with a single point at `start`.
    pub fn new(tool: Tool, start: Point, end: Point, style: Style) -> Self {
        let anchors = Anchors::from_points(start, end);
        let shape = match tool {
            Tool::Pen => Shape::Pen {
                points: vec![start],
            },
            Tool::Line => Shape::Line(anchors),
            Tool::Arrow => Shape::Arrow(anchors),
            Tool::Rectangle => Shape::Rectangle(anchors),
            Tool::Diamond => Shape::Diamond(anchors),
            Tool::Circle => Shape::Circle(anchors),
        };
        Self {
            id: Uuid::new_v4(),
            shape,
            style,
        }
    }

    /// Create a pen stroke from recorded points.
    pub fn pen(points: Vec<Point>, style: Style) -> Self {
        Self {
            id: Uuid::new_v4(),
            shape: Shape::Pen { points },
            style,
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn tool(&self) -> Tool {
        self.shape.tool()
    }

    pub fn anchors(&self) -> Anchors {
        self.shape.anchors()
    }

    /// Copy of this element with new anchors (no-op for pen strokes).
    pub fn with_anchors(&self, anchors: Anchors) -> Self {
        Self {
            id: self.id,
            shape: self.shape.with_anchors(anchors),
            style: self.style.clone(),
        }
    }

    /// Copy of this element with a fresh identifier.
    pub(crate) fn with_new_id(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            shape: self.shape.clone(),
            style: self.style.clone(),
        }
    }

    /// Copy of a pen stroke with one more point. Other tools are returned unchanged.
    pub fn with_point(&self, point: Point) -> Self {
        let mut element = self.clone();
        if let Shape::Pen { points } = &mut element.shape {
            points.push(point);
        }
        element
    }
}

/// An ordered set of elements; order is paint order, later elements on top.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Snapshot {
    elements: Vec<Element>,
}

impl Snapshot {
    /// Build a snapshot, dropping elements that break snapshot invariants.
    ///
    /// Pen strokes without points and elements whose id already appeared are
    /// logged and discarded.
    pub fn new(elements: Vec<Element>) -> Self {
        let mut seen = HashSet::with_capacity(elements.len());
        let elements = elements
            .into_iter()
            .filter(|element| {
                if matches!(&element.shape, Shape::Pen { points } if points.is_empty()) {
                    log::warn!("Dropping pen element {} without points", element.id);
                    return false;
                }
                if !seen.insert(element.id) {
                    log::warn!("Dropping element with duplicate id {}", element.id);
                    return false;
                }
                true
            })
            .collect();
        Self { elements }
    }

    /// Build a snapshot from untrusted JSON values, dropping malformed entries.
    pub fn from_values(values: Vec<serde_json::Value>) -> Self {
        let elements = values
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<Element>(value) {
                Ok(element) => Some(element),
                Err(e) => {
                    log::warn!("Dropping malformed element: {}", e);
                    None
                }
            })
            .collect();
        Self::new(elements)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn position(&self, id: ElementId) -> Option<usize> {
        self.elements.iter().position(|e| e.id == id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.position(id).is_some()
    }

    pub fn into_elements(self) -> Vec<Element> {
        self.elements
    }

    /// New snapshot with `element` painted on top.
    pub fn with_pushed(&self, element: Element) -> Snapshot {
        let mut elements = self.elements.clone();
        elements.push(element);
        Snapshot::new(elements)
    }

    /// New snapshot with the element of the same id replaced.
    /// Returns an unchanged copy when the id is unknown.
    pub fn with_replaced(&self, element: Element) -> Snapshot {
        let elements = self
            .elements
            .iter()
            .map(|e| if e.id == element.id { element.clone() } else { e.clone() })
            .collect();
        Snapshot { elements }
    }

    /// New snapshot with `element` inserted directly above the element `after`.
    pub fn with_inserted_after(&self, after: ElementId, element: Element) -> Snapshot {
        let mut elements = self.elements.clone();
        let index = self.position(after).map_or(elements.len(), |i| i + 1);
        elements.insert(index, element);
        Snapshot::new(elements)
    }

    /// New snapshot without the element `id`.
    pub fn without(&self, id: ElementId) -> Snapshot {
        let elements = self.elements.iter().filter(|e| e.id != id).cloned().collect();
        Snapshot { elements }
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = Vec::<serde_json::Value>::deserialize(deserializer)?;
        Ok(Snapshot::from_values(values))
    }
}

impl FromIterator<Element> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Element>>(iter: I) -> Self {
        Snapshot::new(iter.into_iter().collect())
    }
}
