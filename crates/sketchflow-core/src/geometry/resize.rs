//! Resize handles and the resize transform.

use crate::element::{Anchors, Element, Shape};
use kurbo::Point;

/// A resize handle on the selected element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    // Edge handles (box shapes)
    Top,
    Bottom,
    Left,
    Right,
    // Corner handles (box shapes)
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    // Endpoint handles (lines, arrows)
    Start,
    End,
}

impl Handle {
    pub const BOX: [Handle; 8] = [
        Handle::TopLeft,
        Handle::TopRight,
        Handle::BottomLeft,
        Handle::BottomRight,
        Handle::Top,
        Handle::Bottom,
        Handle::Left,
        Handle::Right,
    ];

    /// Two-letter code of the handle (`tt`, `br`, `l1`, ...).
    pub fn slug(self) -> &'static str {
        match self {
            Handle::Top => "tt",
            Handle::Bottom => "bb",
            Handle::Left => "ll",
            Handle::Right => "rr",
            Handle::TopLeft => "tl",
            Handle::TopRight => "tr",
            Handle::BottomLeft => "bl",
            Handle::BottomRight => "br",
            Handle::Start => "l1",
            Handle::End => "l2",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Handle> {
        let handle = match slug {
            "tt" => Handle::Top,
            "bb" => Handle::Bottom,
            "ll" => Handle::Left,
            "rr" => Handle::Right,
            "tl" => Handle::TopLeft,
            "tr" => Handle::TopRight,
            "bl" => Handle::BottomLeft,
            "br" => Handle::BottomRight,
            "l1" => Handle::Start,
            "l2" => Handle::End,
            _ => return None,
        };
        Some(handle)
    }

    pub fn is_endpoint(self) -> bool {
        matches!(self, Handle::Start | Handle::End)
    }
}

/// How the non-dragged geometry reacts to a resize drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeMode {
    /// The opposite edge stays put.
    #[default]
    Default,
    /// Shift held: the other axis follows in lockstep to keep proportions.
    Proportional,
}

/// Partial anchor update produced by [`resize`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResizeUpdate {
    pub x1: Option<f64>,
    pub y1: Option<f64>,
    pub x2: Option<f64>,
    pub y2: Option<f64>,
}

impl ResizeUpdate {
    pub fn is_empty(&self) -> bool {
        self.x1.is_none() && self.y1.is_none() && self.x2.is_none() && self.y2.is_none()
    }

    /// Merge the update into `anchors`.
    pub fn merge(&self, anchors: Anchors) -> Anchors {
        Anchors {
            x1: self.x1.unwrap_or(anchors.x1),
            y1: self.y1.unwrap_or(anchors.y1),
            x2: self.x2.unwrap_or(anchors.x2),
            y2: self.y2.unwrap_or(anchors.y2),
        }
    }

    /// Apply the update to an element. Pen strokes are not resizable.
    pub fn apply(&self, element: &Element) -> Element {
        match element.shape {
            Shape::Pen { .. } => element.clone(),
            _ => element.with_anchors(self.merge(element.anchors())),
        }
    }
}

/// Compute the anchors touched by dragging `handle` to `cursor`.
///
/// `original` holds the anchors at the start of the gesture and `drag_origin`
/// the pointer position where the gesture began. The dragged edge is biased by
/// `padding` so it stays under the handle, which sits `padding` outside the
/// box; the bias flips once the cursor crosses the anchored edge. The result is
/// not normalized, callers normalize when the gesture ends.
pub fn resize(
    handle: Handle,
    mode: ResizeMode,
    cursor: Point,
    padding: f64,
    original: &Anchors,
    drag_origin: Point,
) -> ResizeUpdate {
    let (x, y) = (cursor.x, cursor.y);
    let o = original;
    let bias = |crossed: bool| if crossed { padding } else { -padding };

    if handle.is_endpoint() {
        return match handle {
            Handle::Start => ResizeUpdate {
                x1: Some(x),
                y1: Some(y),
                ..Default::default()
            },
            _ => ResizeUpdate {
                x2: Some(x),
                y2: Some(y),
                ..Default::default()
            },
        };
    }

    let left = x + bias(x < o.x2);
    let right = x + bias(x < o.x1);
    let top = y + bias(y < o.y2);
    let bottom = y + bias(y < o.y1);

    match mode {
        ResizeMode::Default => match handle {
            Handle::Top => ResizeUpdate {
                y1: Some(top),
                ..Default::default()
            },
            Handle::Bottom => ResizeUpdate {
                y2: Some(bottom),
                ..Default::default()
            },
            Handle::Left => ResizeUpdate {
                x1: Some(left),
                ..Default::default()
            },
            Handle::Right => ResizeUpdate {
                x2: Some(right),
                ..Default::default()
            },
            Handle::TopLeft => ResizeUpdate {
                x1: Some(left),
                y1: Some(top),
                ..Default::default()
            },
            Handle::TopRight => ResizeUpdate {
                x2: Some(right),
                y1: Some(top),
                ..Default::default()
            },
            Handle::BottomLeft => ResizeUpdate {
                x1: Some(left),
                y2: Some(bottom),
                ..Default::default()
            },
            Handle::BottomRight => ResizeUpdate {
                x2: Some(right),
                y2: Some(bottom),
                ..Default::default()
            },
            Handle::Start | Handle::End => ResizeUpdate::default(),
        },
        ResizeMode::Proportional => match handle {
            Handle::Top => {
                let d = drag_origin.y - y;
                ResizeUpdate {
                    x1: Some(o.x1 - d),
                    y1: Some(top),
                    x2: Some(o.x2 + d),
                    y2: Some(o.y2 + d),
                }
            }
            Handle::Bottom => {
                let d = y - drag_origin.y;
                ResizeUpdate {
                    x1: Some(o.x1 - d),
                    y1: Some(o.y1 - d),
                    x2: Some(o.x2 + d),
                    y2: Some(bottom),
                }
            }
            Handle::Left => {
                let d = drag_origin.x - x;
                ResizeUpdate {
                    x1: Some(left),
                    y1: Some(o.y1 - d),
                    x2: Some(o.x2 + d),
                    y2: Some(o.y2 + d),
                }
            }
            Handle::Right => {
                let d = x - drag_origin.x;
                ResizeUpdate {
                    x1: Some(o.x1 - d),
                    y1: Some(o.y1 - d),
                    x2: Some(right),
                    y2: Some(o.y2 + d),
                }
            }
            Handle::TopLeft => {
                let (cx, cy) = keep_aspect(Point::new(o.x2, o.y2), Point::new(left, top), o);
                ResizeUpdate {
                    x1: Some(cx),
                    y1: Some(cy),
                    ..Default::default()
                }
            }
            Handle::TopRight => {
                let (cx, cy) = keep_aspect(Point::new(o.x1, o.y2), Point::new(right, top), o);
                ResizeUpdate {
                    x2: Some(cx),
                    y1: Some(cy),
                    ..Default::default()
                }
            }
            Handle::BottomLeft => {
                let (cx, cy) = keep_aspect(Point::new(o.x2, o.y1), Point::new(left, bottom), o);
                ResizeUpdate {
                    x1: Some(cx),
                    y2: Some(cy),
                    ..Default::default()
                }
            }
            Handle::BottomRight => {
                let (cx, cy) = keep_aspect(Point::new(o.x1, o.y1), Point::new(right, bottom), o);
                ResizeUpdate {
                    x2: Some(cx),
                    y2: Some(cy),
                    ..Default::default()
                }
            }
            Handle::Start | Handle::End => ResizeUpdate::default(),
        },
    }
}

/// Place the dragged corner so the box spanned from `anchor` keeps the aspect
/// ratio of `original`. Degenerate boxes fall back to the free corner.
fn keep_aspect(anchor: Point, free: Point, original: &Anchors) -> (f64, f64) {
    let width = (original.x2 - original.x1).abs();
    let height = (original.y2 - original.y1).abs();
    if width <= f64::EPSILON || height <= f64::EPSILON {
        return (free.x, free.y);
    }

    let dx = free.x - anchor.x;
    let dy = free.y - anchor.y;
    let scale = (dx.abs() / width).max(dy.abs() / height);
    let sign = |d: f64| if d < 0.0 { -1.0 } else { 1.0 };
    (
        anchor.x + sign(dx) * scale * width,
        anchor.y + sign(dy) * scale * height,
    )
}

/// Handle positions for a selected element, `padding` outside its box.
///
/// Pen strokes have no handles.
pub fn handle_positions(element: &Element, padding: f64) -> Vec<(Handle, Point)> {
    let anchors = element.anchors();
    match element.shape {
        Shape::Pen { .. } => Vec::new(),
        Shape::Line(_) | Shape::Arrow(_) => vec![
            (Handle::Start, anchors.start()),
            (Handle::End, anchors.end()),
        ],
        Shape::Rectangle(_) | Shape::Diamond(_) | Shape::Circle(_) => {
            let r = anchors.rect().inflate(padding, padding);
            let center = r.center();
            Handle::BOX
                .iter()
                .map(|&handle| {
                    let position = match handle {
                        Handle::TopLeft => Point::new(r.x0, r.y0),
                        Handle::TopRight => Point::new(r.x1, r.y0),
                        Handle::BottomLeft => Point::new(r.x0, r.y1),
                        Handle::BottomRight => Point::new(r.x1, r.y1),
                        Handle::Top => Point::new(center.x, r.y0),
                        Handle::Bottom => Point::new(center.x, r.y1),
                        Handle::Left => Point::new(r.x0, center.y),
                        Handle::Right => Point::new(r.x1, center.y),
                        Handle::Start | Handle::End => center,
                    };
                    (handle, position)
                })
                .collect()
        }
    }
}

/// The handle of `element` under `point`, if any.
///
/// Each handle is a square of half-size `padding`; corners win over edges.
pub fn handle_at(element: &Element, point: Point, padding: f64) -> Option<Handle> {
    handle_positions(element, padding)
        .into_iter()
        .find(|(_, position)| {
            (point.x - position.x).abs() <= padding && (point.y - position.y).abs() <= padding
        })
        .map(|(handle, _)| handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Style, Tool};

    const PADDING: f64 = 5.0;

    fn rect_anchors() -> Anchors {
        Anchors::new(0.0, 0.0, 100.0, 50.0)
    }

    #[test]
    fn test_bottom_right_default_anchors_top_left() {
        let update = resize(
            Handle::BottomRight,
            ResizeMode::Default,
            Point::new(160.0, 90.0),
            PADDING,
            &rect_anchors(),
            Point::new(105.0, 55.0),
        );
        assert_eq!(update.x1, None);
        assert_eq!(update.y1, None);
        assert!((update.x2.unwrap() - 160.0).abs() <= PADDING);
        assert!((update.y2.unwrap() - 90.0).abs() <= PADDING);

        let merged = update.merge(rect_anchors());
        assert_eq!((merged.x1, merged.y1), (0.0, 0.0));
        assert_eq!((merged.x2, merged.y2), (155.0, 85.0));
    }

    #[test]
    fn test_padding_flips_when_crossing_anchor() {
        let update = resize(
            Handle::BottomRight,
            ResizeMode::Default,
            Point::new(-40.0, -20.0),
            PADDING,
            &rect_anchors(),
            Point::new(105.0, 55.0),
        );
        assert_eq!(update.x2, Some(-35.0));
        assert_eq!(update.y2, Some(-15.0));
    }

    #[test]
    fn test_edge_handles_touch_one_coordinate() {
        let o = rect_anchors();
        let origin = Point::new(50.0, -5.0);
        let top = resize(Handle::Top, ResizeMode::Default, Point::new(70.0, -30.0), PADDING, &o, origin);
        assert_eq!(top, ResizeUpdate { y1: Some(-25.0), ..Default::default() });

        let left = resize(Handle::Left, ResizeMode::Default, Point::new(-20.0, 10.0), PADDING, &o, origin);
        assert_eq!(left, ResizeUpdate { x1: Some(-15.0), ..Default::default() });

        let right = resize(Handle::Right, ResizeMode::Default, Point::new(130.0, 10.0), PADDING, &o, origin);
        assert_eq!(right, ResizeUpdate { x2: Some(125.0), ..Default::default() });
    }

    #[test]
    fn test_top_proportional_grows_symmetrically() {
        let o = rect_anchors();
        let update = resize(
            Handle::Top,
            ResizeMode::Proportional,
            Point::new(50.0, -15.0),
            PADDING,
            &o,
            Point::new(50.0, -5.0),
        );
        assert_eq!(update.y1, Some(-10.0));
        assert_eq!(update.y2, Some(60.0));
        assert_eq!(update.x1, Some(-10.0));
        assert_eq!(update.x2, Some(110.0));
    }

    #[test]
    fn test_corner_proportional_keeps_aspect_ratio() {
        let o = rect_anchors();
        let update = resize(
            Handle::BottomRight,
            ResizeMode::Proportional,
            Point::new(305.0, 60.0),
            PADDING,
            &o,
            Point::new(105.0, 55.0),
        );
        let merged = update.merge(o);
        assert_eq!((merged.x1, merged.y1), (0.0, 0.0));
        let ratio = (merged.x2 - merged.x1) / (merged.y2 - merged.y1);
        assert!((ratio - 2.0).abs() < 1e-9);
        assert!((merged.x2 - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_endpoint_handles_follow_cursor_exactly() {
        let o = Anchors::new(0.0, 0.0, 10.0, 10.0);
        for mode in [ResizeMode::Default, ResizeMode::Proportional] {
            let start = resize(Handle::Start, mode, Point::new(-3.0, 4.0), PADDING, &o, Point::ZERO);
            assert_eq!(start.merge(o), Anchors::new(-3.0, 4.0, 10.0, 10.0));
            let end = resize(Handle::End, mode, Point::new(30.0, 40.0), PADDING, &o, Point::ZERO);
            assert_eq!(end.merge(o), Anchors::new(0.0, 0.0, 30.0, 40.0));
        }
    }

    #[test]
    fn test_apply_skips_pen() {
        let pen = Element::pen(vec![Point::ZERO, Point::new(5.0, 5.0)], Style::default());
        let update = ResizeUpdate {
            x2: Some(100.0),
            ..Default::default()
        };
        assert_eq!(update.apply(&pen), pen);
    }

    #[test]
    fn test_slug_roundtrip() {
        for handle in Handle::BOX.into_iter().chain([Handle::Start, Handle::End]) {
            assert_eq!(Handle::from_slug(handle.slug()), Some(handle));
        }
        assert_eq!(Handle::from_slug("xx"), None);
    }

    #[test]
    fn test_handle_at() {
        let rect = Element::new(Tool::Rectangle, Point::ZERO, Point::new(100.0, 50.0), Style::default());
        assert_eq!(handle_at(&rect, Point::new(105.0, 55.0), PADDING), Some(Handle::BottomRight));
        assert_eq!(handle_at(&rect, Point::new(-4.0, -6.0), PADDING), Some(Handle::TopLeft));
        assert_eq!(handle_at(&rect, Point::new(50.0, -5.0), PADDING), Some(Handle::Top));
        assert_eq!(handle_at(&rect, Point::new(50.0, 25.0), PADDING), None);

        let line = Element::new(Tool::Line, Point::new(10.0, 10.0), Point::new(90.0, 40.0), Style::default());
        assert_eq!(handle_at(&line, Point::new(11.0, 9.0), PADDING), Some(Handle::Start));
        assert_eq!(handle_at(&line, Point::new(90.0, 40.0), PADDING), Some(Handle::End));

        let pen = Element::pen(vec![Point::ZERO, Point::new(5.0, 5.0)], Style::default());
        assert!(handle_positions(&pen, PADDING).is_empty());
    }
}
