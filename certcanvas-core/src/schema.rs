//! Canonical serialized snapshot of a design, shared by save records and the
//! export encoders.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::design::CanvasDesign;
use crate::element::{Element, ElementId, ElementKind, Transform};
use crate::error::CoreResult;

/// Document-friendly element description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementDocument {
    /// Element identifier.
    pub id: String,
    /// Element content.
    pub kind: ElementKind,
    /// Transform metadata.
    pub transform: Transform,
}

impl From<&Element> for ElementDocument {
    fn from(element: &Element) -> Self {
        Self {
            id: element.id.to_string(),
            kind: element.kind.clone(),
            transform: element.transform,
        }
    }
}

impl ElementDocument {
    /// Convert the document back to a runtime element.
    ///
    /// # Errors
    ///
    /// Returns an error if the element id is not a valid UUID.
    pub fn into_element(self) -> CoreResult<Element> {
        let id = ElementId::parse(&self.id)?;
        let mut element = Element::new(self.kind).with_transform(self.transform);
        element.id = id;
        Ok(element)
    }
}

/// Canonical design snapshot. Immutable by convention: snapshots are taken at
/// save time and never edited afterwards; exporters read them instead of the
/// live design.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignDocument {
    /// Owning session identifier.
    pub session_id: String,
    /// Canvas width in pixels.
    pub width: f32,
    /// Canvas height in pixels.
    pub height: f32,
    /// Canvas background color as hex.
    pub background: String,
    /// Design revision the snapshot was taken at.
    pub revision: u64,
    /// Elements in paint order (z-index ascending, insertion order within a
    /// z-level).
    pub elements: Vec<ElementDocument>,
}

impl DesignDocument {
    /// Build a snapshot from the live design.
    pub fn from_design(session_id: impl Into<String>, design: &CanvasDesign) -> Self {
        let mut elements: Vec<_> = design.elements().map(ElementDocument::from).collect();
        elements.sort_by_key(|doc| doc.transform.z_index);
        Self {
            session_id: session_id.into(),
            width: design.width,
            height: design.height,
            background: design.background.clone(),
            revision: design.revision(),
            elements,
        }
    }

    /// SHA-256 content digest of the canonical JSON form, hex-encoded.
    ///
    /// Verification records carry this digest so an exported artifact can be
    /// tied to the exact content that was verified.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the document cannot be encoded.
    pub fn digest(&self) -> CoreResult<String> {
        let bytes = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(hex::encode(hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ShapeKind;

    fn design_with_elements() -> CanvasDesign {
        let mut design = CanvasDesign::new(640.0, 480.0);
        design
            .add_element(
                Element::new(ElementKind::Text {
                    content: "Certificate of Merit".to_string(),
                    font_size: 32.0,
                    color: "#1a1a1a".to_string(),
                })
                .with_transform(Transform {
                    z_index: 2,
                    ..Transform::default()
                }),
            )
            .expect("add text");
        design
            .add_element(
                Element::new(ElementKind::Shape {
                    shape: ShapeKind::Rect,
                    fill: "#fdf6e3".to_string(),
                    stroke: "#b58900".to_string(),
                    stroke_width: 4.0,
                })
                .with_transform(Transform {
                    z_index: 0,
                    ..Transform::default()
                }),
            )
            .expect("add frame");
        design
    }

    #[test]
    fn snapshot_orders_elements_by_z_index() {
        let design = design_with_elements();
        let doc = DesignDocument::from_design("s1", &design);
        assert_eq!(doc.elements.len(), 2);
        assert!(doc.elements[0].transform.z_index <= doc.elements[1].transform.z_index);
    }

    #[test]
    fn digest_is_stable_for_identical_content() {
        let design = design_with_elements();
        let a = DesignDocument::from_design("s1", &design);
        let b = DesignDocument::from_design("s1", &design);
        assert_eq!(a.digest().expect("digest"), b.digest().expect("digest"));
    }

    #[test]
    fn digest_changes_when_content_changes() {
        let mut design = design_with_elements();
        let before = DesignDocument::from_design("s1", &design)
            .digest()
            .expect("digest");

        let id = design.elements().next().expect("element").id;
        design
            .update_element(id, |el| el.transform.x += 10.0)
            .expect("update");

        let after = DesignDocument::from_design("s1", &design)
            .digest()
            .expect("digest");
        assert_ne!(before, after);
    }

    #[test]
    fn element_document_round_trips() {
        let design = design_with_elements();
        let doc = DesignDocument::from_design("s1", &design);
        for elem_doc in doc.elements {
            let id = elem_doc.id.clone();
            let element = elem_doc.into_element().expect("into_element");
            assert_eq!(element.id.to_string(), id);
        }
    }
}
