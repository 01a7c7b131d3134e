//! Document serialization hooks for saving and opening canvases.
//!
//! A document is the JSON array of a snapshot's elements, the same shape that
//! travels over the wire.

use crate::element::Snapshot;
use thiserror::Error;

/// File extension used for saved canvases.
pub const FILE_EXTENSION: &str = "sketchflow";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to encode document: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode document: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Encode a snapshot as a JSON document.
pub fn serialize(snapshot: &Snapshot) -> Result<Vec<u8>, DocumentError> {
    serde_json::to_vec(snapshot).map_err(DocumentError::Encode)
}

/// Decode a JSON document. Malformed elements are dropped; a document that is
/// not a JSON array is an error.
pub fn deserialize(bytes: &[u8]) -> Result<Snapshot, DocumentError> {
    serde_json::from_slice(bytes).map_err(DocumentError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Element, Style, Tool};
    use kurbo::Point;

    #[test]
    fn test_roundtrip_with_pen() {
        let pen = Element::pen(
            vec![Point::new(0.0, 0.0), Point::new(3.5, 4.25), Point::new(10.0, -2.0)],
            Style::default(),
        );
        let arrow = Element::new(Tool::Arrow, Point::new(50.0, 50.0), Point::new(0.0, 10.0), Style::default());
        let snapshot = Snapshot::new(vec![pen, arrow]);

        let bytes = serialize(&snapshot).unwrap();
        assert_eq!(deserialize(&bytes).unwrap(), snapshot);
    }

    #[test]
    fn test_malformed_elements_are_dropped() {
        let bytes = br#"[
            {"id":"0b6f0a59-3a2c-4f55-9d0c-2f1e8b9c7a10","tool":"circle","x1":0,"y1":0,"x2":4,"y2":4,"opacity":50},
            {"id":"not-a-uuid","tool":"circle","x1":0,"y1":0,"x2":4,"y2":4},
            42
        ]"#;
        let snapshot = deserialize(bytes).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.elements()[0].style.opacity, 50.0);
    }

    #[test]
    fn test_non_array_is_rejected() {
        assert!(matches!(deserialize(br#"{"elements":[]}"#), Err(DocumentError::Decode(_))));
        assert!(deserialize(b"").is_err());
    }
}
