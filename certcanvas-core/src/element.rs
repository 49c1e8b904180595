//! Canvas elements - the building blocks of certificate designs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// Unique identifier for an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    /// Create a new unique element ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse an element ID from its string form.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if the string is not a valid UUID.
    pub fn parse(s: &str) -> CoreResult<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| CoreError::Validation(format!("invalid element id {s:?}: {e}")))
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Geometric shape variants available on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Axis-aligned rectangle.
    Rect,
    /// Ellipse inscribed in the element bounds.
    Ellipse,
    /// Straight line across the element bounds (top-left to bottom-right).
    Line,
}

/// Supported image reference formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG image.
    Png,
    /// JPEG image.
    Jpeg,
    /// SVG vector image.
    Svg,
}

/// The type of content an element contains.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ElementKind {
    /// A filled/stroked geometric shape.
    Shape {
        /// Shape variant.
        shape: ShapeKind,
        /// Fill color as hex (e.g. `#ffd700`).
        fill: String,
        /// Stroke color as hex.
        stroke: String,
        /// Stroke width in pixels.
        stroke_width: f32,
    },

    /// A text run.
    Text {
        /// Text content.
        content: String,
        /// Font size in pixels.
        font_size: f32,
        /// Text color as hex.
        color: String,
    },

    /// A referenced image (URI or data URI).
    Image {
        /// Image source URI or base64 data URI.
        src: String,
        /// Image format.
        format: ImageFormat,
    },
}

/// Transform for positioning and sizing elements.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Transform {
    /// X position (pixels from left).
    pub x: f32,
    /// Y position (pixels from top).
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
    /// Rotation in radians.
    pub rotation: f32,
    /// Z-index for paint order.
    pub z_index: i32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
            rotation: 0.0,
            z_index: 0,
        }
    }
}

impl Transform {
    /// Check that the geometry is well-formed: finite coordinates and
    /// non-negative size.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] naming the offending field.
    pub fn validate(&self) -> CoreResult<()> {
        for (name, value) in [
            ("x", self.x),
            ("y", self.y),
            ("width", self.width),
            ("height", self.height),
            ("rotation", self.rotation),
        ] {
            if !value.is_finite() {
                return Err(CoreError::Validation(format!(
                    "transform {name} must be finite, got {value}"
                )));
            }
        }
        if self.width < 0.0 || self.height < 0.0 {
            return Err(CoreError::Validation(format!(
                "transform size must be non-negative, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// A canvas element with content and transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    /// Unique identifier.
    pub id: ElementId,
    /// Element content type.
    pub kind: ElementKind,
    /// Position and size.
    pub transform: Transform,
}

impl Element {
    /// Create a new element with the given kind and a default transform.
    #[must_use]
    pub fn new(kind: ElementKind) -> Self {
        Self {
            id: ElementId::new(),
            kind,
            transform: Transform::default(),
        }
    }

    /// Set the transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Check that the element is well-formed: valid geometry plus finite,
    /// non-negative style sizes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] naming the offending field.
    pub fn validate(&self) -> CoreResult<()> {
        self.transform.validate()?;
        match &self.kind {
            ElementKind::Shape { stroke_width, .. } => {
                if !stroke_width.is_finite() || *stroke_width < 0.0 {
                    return Err(CoreError::Validation(format!(
                        "stroke width must be finite and non-negative, got {stroke_width}"
                    )));
                }
            }
            ElementKind::Text { font_size, .. } => {
                if !font_size.is_finite() || *font_size <= 0.0 {
                    return Err(CoreError::Validation(format!(
                        "font size must be finite and positive, got {font_size}"
                    )));
                }
            }
            ElementKind::Image { src, .. } => {
                if src.is_empty() {
                    return Err(CoreError::Validation("image src must not be empty".into()));
                }
            }
        }
        Ok(())
    }
}
