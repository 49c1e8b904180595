//! The in-memory canvas design being edited.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::element::{Element, ElementId};
use crate::error::{CoreError, CoreResult};

/// Maximum number of elements per design.
pub const MAX_ELEMENTS: usize = 10_000;

/// Default canvas background color.
const DEFAULT_BACKGROUND: &str = "#ffffff";

/// A certificate design: an ordered sequence of drawable elements plus canvas
/// geometry.
///
/// Mutated only through the explicit element operations below; every mutation
/// sets the `dirty` flag and bumps the revision. `dirty` is cleared only by a
/// successful save (via [`CanvasDesign::mark_saved`], called by the store).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasDesign {
    /// All elements, indexed by ID.
    elements: HashMap<ElementId, Element>,
    /// Element IDs in insertion order.
    order: Vec<ElementId>,
    /// Canvas width in pixels.
    pub width: f32,
    /// Canvas height in pixels.
    pub height: f32,
    /// Canvas background color as hex.
    pub background: String,
    /// Whether the design has unsaved mutations.
    dirty: bool,
    /// Monotonically increasing edit counter.
    revision: u64,
}

impl CanvasDesign {
    /// Create a new empty design with the given canvas size.
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            elements: HashMap::new(),
            order: Vec::new(),
            width,
            height,
            background: DEFAULT_BACKGROUND.to_string(),
            dirty: false,
            revision: 0,
        }
    }

    /// Add an element to the design.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if the element geometry is malformed
    /// or the element cap is reached.
    pub fn add_element(&mut self, element: Element) -> CoreResult<ElementId> {
        element.validate()?;
        if self.elements.len() >= MAX_ELEMENTS {
            return Err(CoreError::Validation(format!(
                "too many elements (max {MAX_ELEMENTS})"
            )));
        }
        let id = element.id;
        self.order.push(id);
        self.elements.insert(id, element);
        self.touch();
        Ok(id)
    }

    /// Update an element in place via a closure. The update is applied to a
    /// copy and validated before being committed, so a rejected update leaves
    /// the element (and the dirty flag) untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ElementNotFound`] if the element does not exist,
    /// or [`CoreError::Validation`] if the updated geometry is malformed.
    pub fn update_element<F>(&mut self, id: ElementId, f: F) -> CoreResult<()>
    where
        F: FnOnce(&mut Element),
    {
        let element = self
            .elements
            .get(&id)
            .ok_or_else(|| CoreError::ElementNotFound(id.to_string()))?;

        let mut updated = element.clone();
        f(&mut updated);
        updated.id = id;
        updated.validate()?;

        self.elements.insert(id, updated);
        self.touch();
        Ok(())
    }

    /// Remove an element from the design.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ElementNotFound`] if the element does not exist.
    pub fn remove_element(&mut self, id: &ElementId) -> CoreResult<Element> {
        let removed = self
            .elements
            .remove(id)
            .ok_or_else(|| CoreError::ElementNotFound(id.to_string()))?;
        self.order.retain(|eid| eid != id);
        self.touch();
        Ok(removed)
    }

    /// Get an element by ID.
    #[must_use]
    pub fn get_element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    /// All elements in insertion order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.order.iter().filter_map(|id| self.elements.get(id))
    }

    /// Number of elements in the design.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Whether the design has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Whether the design has mutations not covered by a save.
    #[must_use]
    pub fn dirty(&self) -> bool {
        self.dirty
    }

    /// The current edit revision.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Clear the dirty flag after a successful save.
    pub(crate) fn mark_saved(&mut self) {
        self.dirty = false;
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.revision += 1;
    }
}

impl Default for CanvasDesign {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementKind, ShapeKind, Transform};

    fn text(content: &str) -> Element {
        Element::new(ElementKind::Text {
            content: content.to_string(),
            font_size: 16.0,
            color: "#000000".to_string(),
        })
    }

    #[test]
    fn add_and_remove_round_trip() {
        let mut design = CanvasDesign::new(800.0, 600.0);
        assert!(design.is_empty());
        assert!(!design.dirty());

        let id = design.add_element(text("Hello")).expect("add");
        assert_eq!(design.element_count(), 1);
        assert!(design.dirty());

        design.remove_element(&id).expect("remove");
        assert!(design.is_empty());
    }

    #[test]
    fn elements_keep_insertion_order() {
        let mut design = CanvasDesign::new(800.0, 600.0);
        let a = design.add_element(text("a")).expect("add");
        let b = design.add_element(text("b")).expect("add");
        let c = design.add_element(text("c")).expect("add");

        let order: Vec<_> = design.elements().map(|e| e.id).collect();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    fn invalid_geometry_is_rejected_and_leaves_design_clean() {
        let mut design = CanvasDesign::new(800.0, 600.0);
        let bad = text("x").with_transform(Transform {
            width: -5.0,
            ..Transform::default()
        });
        assert!(design.add_element(bad).is_err());
        assert!(design.is_empty());
        assert!(!design.dirty());
    }

    #[test]
    fn rejected_update_does_not_mark_dirty() {
        let mut design = CanvasDesign::new(800.0, 600.0);
        let id = design.add_element(text("x")).expect("add");
        design.mark_saved();

        let result = design.update_element(id, |el| el.transform.width = f32::NAN);
        assert!(result.is_err());
        assert!(!design.dirty(), "failed update must not dirty the design");

        let el = design.get_element(id).expect("element");
        assert!((el.transform.width - 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn every_mutation_bumps_revision_and_sets_dirty() {
        let mut design = CanvasDesign::new(800.0, 600.0);
        let r0 = design.revision();

        let id = design.add_element(text("x")).expect("add");
        assert_eq!(design.revision(), r0 + 1);

        design.mark_saved();
        assert!(!design.dirty());

        design
            .update_element(id, |el| el.transform.x = 42.0)
            .expect("update");
        assert!(design.dirty());
        assert_eq!(design.revision(), r0 + 2);
    }

    #[test]
    fn update_cannot_change_element_identity() {
        let mut design = CanvasDesign::new(800.0, 600.0);
        let id = design.add_element(text("x")).expect("add");

        design
            .update_element(id, |el| el.id = ElementId::new())
            .expect("update");

        assert!(design.get_element(id).is_some(), "id swap must be ignored");
    }

    #[test]
    fn shape_elements_validate_like_any_other() {
        let mut design = CanvasDesign::new(800.0, 600.0);
        let shape = Element::new(ElementKind::Shape {
            shape: ShapeKind::Ellipse,
            fill: "#ffd700".to_string(),
            stroke: "#333333".to_string(),
            stroke_width: 2.0,
        });
        assert!(design.add_element(shape).is_ok());
    }
}
