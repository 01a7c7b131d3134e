//! Pure geometry over elements: hit-testing, normalization, translation,
//! duplication and layer ordering.
//!
//! None of these functions mutate their input; edits produce new elements or
//! snapshots which the caller commits through the history.

mod resize;

pub use resize::{Handle, ResizeMode, ResizeUpdate, handle_at, handle_positions, resize};

use crate::element::{Element, ElementId, Shape, Snapshot};
use kurbo::Point;

/// Check whether `point` (world coordinates) hits `element`.
///
/// Diamonds are tested against their bounding box, not their outline.
pub fn locate(point: Point, element: &Element) -> bool {
    let stroke_width = element.style.stroke_width;
    match &element.shape {
        Shape::Pen { points } => {
            let tolerance = if stroke_width > 0.0 { stroke_width } else { 1.0 };
            hits_polyline(point, points, tolerance)
        }
        Shape::Line(a) | Shape::Arrow(a) => {
            let tolerance = (0.05 * stroke_width).max(1.0);
            near_segment(point, a.start(), a.end(), tolerance)
        }
        Shape::Circle(a) => {
            let width = a.x2 - a.x1 + stroke_width;
            let height = a.y2 - a.y1 + stroke_width;
            let left = a.x1 - stroke_width / 2.0;
            let top = a.y1 - stroke_width / 2.0;
            let rx = width.abs() / 2.0;
            let ry = height.abs() / 2.0;
            if rx <= 0.0 || ry <= 0.0 {
                return false;
            }
            let dx = left + width / 2.0 - point.x;
            let dy = top + height / 2.0 - point.y;
            (dx * dx) / (rx * rx) + (dy * dy) / (ry * ry) <= 1.0
        }
        Shape::Rectangle(a) | Shape::Diamond(a) => {
            let half = stroke_width / 2.0;
            let rect = a.rect().inflate(half, half);
            // inclusive on every edge
            point.x >= rect.x0 && point.x <= rect.x1 && point.y >= rect.y0 && point.y <= rect.y1
        }
    }
}

/// Topmost element (last in paint order) hit by `point`.
pub fn locate_topmost(point: Point, elements: &[Element]) -> Option<&Element> {
    elements.iter().rev().find(|element| locate(point, element))
}

/// Near-collinearity test: `p` lies on segment `a`-`b` when the detour through
/// `p` is shorter than `tolerance`.
fn near_segment(point: Point, a: Point, b: Point, tolerance: f64) -> bool {
    let offset = a.distance(b) - (a.distance(point) + b.distance(point));
    offset.abs() < tolerance
}

fn hits_polyline(point: Point, points: &[Point], tolerance: f64) -> bool {
    match points {
        [] => false,
        [only] => only.distance(point) < tolerance,
        _ => points
            .windows(2)
            .any(|w| near_segment(point, w[0], w[1], tolerance)),
    }
}

/// Order box anchors so that `x1 <= x2` and `y1 <= y2`.
///
/// Lines, arrows and pen strokes are returned unchanged since their anchor
/// order carries direction. Only call this once a gesture has finished.
pub fn normalize(element: &Element) -> Element {
    if element.tool().is_box() {
        element.with_anchors(element.anchors().normalized())
    } else {
        element.clone()
    }
}

/// Shift an element, including every pen point, by `(dx, dy)`.
pub fn translate(element: &Element, dx: f64, dy: f64) -> Element {
    let mut moved = element.clone();
    moved.shape = match &element.shape {
        Shape::Pen { points } => Shape::Pen {
            points: points.iter().map(|p| Point::new(p.x + dx, p.y + dy)).collect(),
        },
        shape => shape.with_anchors(shape.anchors().translated(dx, dy)),
    };
    moved
}

/// Translated copy of `element` with a fresh id. The source is left untouched.
pub fn duplicate(element: &Element, dx: f64, dy: f64) -> Element {
    translate(element, dx, dy).with_new_id()
}

/// Target of a layer reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerMove {
    /// One step up in paint order (code `1`).
    Forward,
    /// One step down in paint order (code `-1`).
    Backward,
    /// To index 0, painted first (code `0`).
    SendToBack,
    /// To the last index, painted last (code `2`).
    BringToFront,
}

impl LayerMove {
    /// Map the numeric direction codes used by the toolbar.
    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            1 => Some(LayerMove::Forward),
            -1 => Some(LayerMove::Backward),
            0 => Some(LayerMove::SendToBack),
            2 => Some(LayerMove::BringToFront),
            _ => None,
        }
    }
}

/// Move element `id` to a new layer. Unknown ids return the snapshot unchanged.
pub fn reorder(id: ElementId, to: LayerMove, snapshot: &Snapshot) -> Snapshot {
    let Some(index) = snapshot.position(id) else {
        return snapshot.clone();
    };
    let last = snapshot.len() - 1;
    let target = match to {
        LayerMove::Forward if index < last => index + 1,
        LayerMove::Backward if index > 0 => index - 1,
        LayerMove::SendToBack => 0,
        LayerMove::BringToFront => last,
        _ => index,
    };

    let mut elements = snapshot.elements().to_vec();
    let element = elements.remove(index);
    elements.insert(target, element);
    Snapshot::new(elements)
}
