//! Design snapshot export to image/document formats.
//!
//! Renders a [`DesignDocument`] to PNG, JPEG, or PDF using an SVG
//! intermediate representation and the resvg/tiny-skia rasterization
//! pipeline. Every encoding carries the verification reference: rasters get a
//! visible footer line, PDFs additionally get a clickable link annotation
//! over the footer region.

use std::fmt::Write;

use certcanvas_core::{DesignDocument, ElementDocument, ElementKind, ShapeKind};
use image::ImageEncoder;

use crate::error::{RenderError, RenderResult};

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// PNG image.
    Png,
    /// JPEG image.
    Jpeg,
    /// PDF document with the rendered page and a clickable verification
    /// link.
    Pdf,
}

impl ExportFormat {
    /// MIME type of the encoded artifact.
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Pdf => "application/pdf",
        }
    }

    /// Conventional file extension.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Pdf => "pdf",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "pdf" => Ok(Self::Pdf),
            other => Err(RenderError::InvalidDocument(format!(
                "unknown export format {other:?} (expected png, jpeg, or pdf)"
            ))),
        }
    }
}

/// The verification reference stamped into every export.
#[derive(Debug, Clone)]
pub struct VerificationStamp {
    /// Absolute verification URL.
    pub url: String,
    /// Author name from the verification record.
    pub author: String,
    /// Authorization date, already formatted for display.
    pub authorized_on: String,
}

impl VerificationStamp {
    fn footer_line(&self) -> String {
        format!(
            "Verified: {} | {} | {}",
            self.url, self.author, self.authorized_on
        )
    }
}

/// A rendered export: encoded bytes plus their format.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    /// The target encoding.
    pub format: ExportFormat,
    /// Encoded output bytes.
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    /// MIME type of the encoded bytes.
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

/// Configuration for snapshot export.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Output width in pixels (default: the snapshot's canvas width).
    pub width: Option<u32>,
    /// Output height in pixels (default: the snapshot's canvas height).
    pub height: Option<u32>,
    /// DPI for the PDF page size (default: 96.0).
    pub dpi: f32,
    /// Background color as RGBA bytes, used behind transparent content.
    pub background: [u8; 4],
    /// JPEG quality 1-100 (default: 85).
    pub jpeg_quality: u8,
    /// Scale factor (e.g. 2.0 for retina).
    pub scale: f32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            dpi: 96.0,
            background: [255, 255, 255, 255],
            jpeg_quality: 85,
            scale: 1.0,
        }
    }
}

/// Height of the verification footer strip, in canvas pixels.
const FOOTER_HEIGHT: f32 = 18.0;

/// Exports a verified [`DesignDocument`] snapshot to image and document
/// formats.
pub struct CertificateExporter {
    config: ExportConfig,
}

impl CertificateExporter {
    /// Create a new exporter with the given configuration.
    #[must_use]
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    /// Create an exporter with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(ExportConfig::default())
    }

    /// Export a snapshot to the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be rendered or encoded.
    pub fn export(
        &self,
        document: &DesignDocument,
        stamp: &VerificationStamp,
        format: ExportFormat,
    ) -> RenderResult<ExportArtifact> {
        let bytes = match format {
            ExportFormat::Png => self.render_to_png(document, stamp)?,
            ExportFormat::Jpeg => self.render_to_jpeg(document, stamp)?,
            ExportFormat::Pdf => self.render_to_pdf(document, stamp)?,
        };
        tracing::debug!(
            format = format.extension(),
            size = bytes.len(),
            "snapshot encoded"
        );
        Ok(ExportArtifact { format, bytes })
    }

    /// Export the snapshot to PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or encoding fails.
    pub fn render_to_png(
        &self,
        document: &DesignDocument,
        stamp: &VerificationStamp,
    ) -> RenderResult<Vec<u8>> {
        let svg_string = self.render_to_svg(document, stamp);
        let pixmap = Self::rasterize_svg(&svg_string)?;

        pixmap
            .encode_png()
            .map_err(|e| RenderError::Export(format!("PNG encoding failed: {e}")))
    }

    /// Export the snapshot to JPEG bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or encoding fails.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn render_to_jpeg(
        &self,
        document: &DesignDocument,
        stamp: &VerificationStamp,
    ) -> RenderResult<Vec<u8>> {
        let svg_string = self.render_to_svg(document, stamp);
        let pixmap = Self::rasterize_svg(&svg_string)?;

        // JPEG has no alpha channel; composite over the background color.
        let (width, height) = (pixmap.width(), pixmap.height());
        let bg = &self.config.background;
        let mut rgb_data = Vec::with_capacity((width * height * 3) as usize);
        for pixel in pixmap.data().chunks_exact(4) {
            let alpha = f32::from(pixel[3]) / 255.0;
            let inv = 1.0 - alpha;
            rgb_data.push((f32::from(pixel[0]).mul_add(alpha, f32::from(bg[0]) * inv)) as u8);
            rgb_data.push((f32::from(pixel[1]).mul_add(alpha, f32::from(bg[1]) * inv)) as u8);
            rgb_data.push((f32::from(pixel[2]).mul_add(alpha, f32::from(bg[2]) * inv)) as u8);
        }

        let mut buf = std::io::Cursor::new(Vec::new());
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, self.config.jpeg_quality);
        encoder
            .write_image(&rgb_data, width, height, image::ColorType::Rgb8.into())
            .map_err(|e| RenderError::Export(format!("JPEG encoding failed: {e}")))?;

        Ok(buf.into_inner())
    }

    /// Render the snapshot to an SVG string with the verification footer.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn render_to_svg(&self, document: &DesignDocument, stamp: &VerificationStamp) -> String {
        let (out_w, out_h) = self.output_dimensions(document);
        let scale = self.config.scale;
        let view_w = out_w as f32 / scale;
        let view_h = out_h as f32 / scale;

        let mut svg = String::with_capacity(4096);
        let _ = write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{out_w}\" height=\"{out_h}\" viewBox=\"0 0 {view_w} {view_h}\">",
        );

        // Background
        let escaped_bg = escape_xml(&document.background);
        let _ = write!(
            svg,
            "<rect width=\"100%\" height=\"100%\" fill=\"{escaped_bg}\"/>",
        );

        // Elements arrive in paint order from the snapshot.
        for element in &document.elements {
            render_element_svg(&mut svg, element);
        }

        // Verification footer: visible stamp along the bottom edge.
        let footer = escape_xml(&stamp.footer_line());
        let footer_y = view_h - FOOTER_HEIGHT / 2.0;
        let _ = write!(
            svg,
            "<text x=\"8\" y=\"{footer_y}\" font-size=\"10\" fill=\"#555555\" font-family=\"sans-serif\">{footer}</text>",
        );

        svg.push_str("</svg>");
        svg
    }

    /// Export the snapshot to PDF bytes.
    ///
    /// The rendered page carries the raster (footer text included) and a
    /// clickable link annotation over the footer strip pointing at the
    /// verification URL.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or PDF generation fails.
    #[allow(clippy::cast_precision_loss)]
    pub fn render_to_pdf(
        &self,
        document: &DesignDocument,
        stamp: &VerificationStamp,
    ) -> RenderResult<Vec<u8>> {
        let png_data = self.render_to_png(document, stamp)?;
        let (out_w, out_h) = self.output_dimensions(document);

        // Convert pixel dimensions to mm: pixels / dpi * 25.4
        let page_width_mm = out_w as f32 / self.config.dpi * 25.4;
        let page_height_mm = out_h as f32 / self.config.dpi * 25.4;

        let (doc, page1, layer1) = printpdf::PdfDocument::new(
            "Certificate",
            printpdf::Mm(page_width_mm),
            printpdf::Mm(page_height_mm),
            "Artwork",
        );

        let current_layer = doc.get_page(page1).get_layer(layer1);

        // Decode PNG using printpdf's bundled image crate for compatibility
        let dynamic_image = printpdf::image_crate::load_from_memory(&png_data)
            .map_err(|e| RenderError::Export(format!("failed to decode PNG for PDF: {e}")))?;

        let pdf_image = printpdf::Image::from_dynamic_image(&dynamic_image);

        let scale_x = page_width_mm / out_w as f32;
        let scale_y = page_height_mm / out_h as f32;

        let transform = printpdf::ImageTransform {
            translate_x: Some(printpdf::Mm(0.0)),
            translate_y: Some(printpdf::Mm(0.0)),
            scale_x: Some(scale_x),
            scale_y: Some(scale_y),
            ..Default::default()
        };

        pdf_image.add_to_layer(current_layer.clone(), transform);

        // Clickable verification link over the footer strip.
        let footer_mm = FOOTER_HEIGHT * self.config.scale / self.config.dpi * 25.4;
        current_layer.add_link_annotation(printpdf::LinkAnnotation::new(
            printpdf::Rect::new(
                printpdf::Mm(0.0),
                printpdf::Mm(0.0),
                printpdf::Mm(page_width_mm),
                printpdf::Mm(footer_mm),
            ),
            None,
            None,
            printpdf::Actions::uri(stamp.url.clone()),
            None,
        ));

        doc.save_to_bytes()
            .map_err(|e| RenderError::Export(format!("PDF save failed: {e}")))
    }

    /// Get output dimensions (width, height) in pixels.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn output_dimensions(&self, document: &DesignDocument) -> (u32, u32) {
        let base_w = self
            .config
            .width
            .unwrap_or_else(|| document.width.max(1.0) as u32);
        let base_h = self
            .config
            .height
            .unwrap_or_else(|| document.height.max(1.0) as u32);

        #[allow(clippy::cast_precision_loss)]
        let out_w = (base_w as f32 * self.config.scale) as u32;
        #[allow(clippy::cast_precision_loss)]
        let out_h = (base_h as f32 * self.config.scale) as u32;
        (out_w.max(1), out_h.max(1))
    }

    /// Rasterize an SVG string to a tiny-skia Pixmap.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn rasterize_svg(svg_string: &str) -> RenderResult<tiny_skia::Pixmap> {
        let opt = usvg::Options::default();
        let tree = usvg::Tree::from_str(svg_string, &opt)
            .map_err(|e| RenderError::Export(format!("SVG parsing failed: {e}")))?;

        let px_w = tree.size().width() as u32;
        let px_h = tree.size().height() as u32;

        let mut pixmap = tiny_skia::Pixmap::new(px_w.max(1), px_h.max(1))
            .ok_or_else(|| RenderError::Export("failed to create pixmap".to_string()))?;

        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        Ok(pixmap)
    }
}

/// Render a single snapshot element to SVG.
fn render_element_svg(svg: &mut String, element: &ElementDocument) {
    let tf = &element.transform;
    let rotate = rotation_attr(tf.rotation, tf.x, tf.y, tf.width, tf.height);

    match &element.kind {
        ElementKind::Shape {
            shape,
            fill,
            stroke,
            stroke_width,
        } => {
            let fill = escape_xml(fill);
            let stroke = escape_xml(stroke);
            match shape {
                ShapeKind::Rect => {
                    let _ = write!(
                        svg,
                        "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"{stroke_width}\"{rotate}/>",
                        tf.x, tf.y, tf.width, tf.height,
                    );
                }
                ShapeKind::Ellipse => {
                    let cx = tf.x + tf.width / 2.0;
                    let cy = tf.y + tf.height / 2.0;
                    let rx = tf.width / 2.0;
                    let ry = tf.height / 2.0;
                    let _ = write!(
                        svg,
                        "<ellipse cx=\"{cx}\" cy=\"{cy}\" rx=\"{rx}\" ry=\"{ry}\" fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"{stroke_width}\"{rotate}/>",
                    );
                }
                ShapeKind::Line => {
                    let x2 = tf.x + tf.width;
                    let y2 = tf.y + tf.height;
                    let _ = write!(
                        svg,
                        "<line x1=\"{}\" y1=\"{}\" x2=\"{x2}\" y2=\"{y2}\" stroke=\"{stroke}\" stroke-width=\"{stroke_width}\"{rotate}/>",
                        tf.x, tf.y,
                    );
                }
            }
        }

        ElementKind::Text {
            content,
            font_size,
            color,
        } => {
            let escaped = escape_xml(content);
            let escaped_color = escape_xml(color);
            let text_y = tf.y + font_size;
            let _ = write!(
                svg,
                "<text x=\"{}\" y=\"{text_y}\" font-size=\"{font_size}\" fill=\"{escaped_color}\" font-family=\"sans-serif\"{rotate}>{escaped}</text>",
                tf.x,
            );
        }

        ElementKind::Image { src, .. } => {
            let escaped_src = escape_xml(src);
            let _ = write!(
                svg,
                "<image x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" href=\"{escaped_src}\"{rotate}/>",
                tf.x, tf.y, tf.width, tf.height,
            );
        }
    }
}

/// SVG `transform` attribute for a rotation about the element center, or
/// empty when there is no rotation.
fn rotation_attr(radians: f32, x: f32, y: f32, width: f32, height: f32) -> String {
    if radians.abs() < f32::EPSILON {
        return String::new();
    }
    let degrees = radians.to_degrees();
    let cx = x + width / 2.0;
    let cy = y + height / 2.0;
    format!(" transform=\"rotate({degrees} {cx} {cy})\"")
}

/// Escape special XML characters.
fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use certcanvas_core::{CanvasDesign, Element, Transform};

    fn stamp() -> VerificationStamp {
        VerificationStamp {
            url: "https://certs.example/verify/abc123".to_string(),
            author: "Jane Doe".to_string(),
            authorized_on: "2024-01-01".to_string(),
        }
    }

    fn snapshot() -> DesignDocument {
        let mut design = CanvasDesign::new(400.0, 300.0);
        design
            .add_element(
                Element::new(ElementKind::Shape {
                    shape: ShapeKind::Rect,
                    fill: "#fdf6e3".to_string(),
                    stroke: "#b58900".to_string(),
                    stroke_width: 2.0,
                })
                .with_transform(Transform {
                    x: 10.0,
                    y: 10.0,
                    width: 380.0,
                    height: 280.0,
                    rotation: 0.0,
                    z_index: 0,
                }),
            )
            .expect("add frame");
        design
            .add_element(
                Element::new(ElementKind::Text {
                    content: "Certificate of Merit".to_string(),
                    font_size: 24.0,
                    color: "#1a1a1a".to_string(),
                })
                .with_transform(Transform {
                    x: 40.0,
                    y: 60.0,
                    width: 320.0,
                    height: 40.0,
                    rotation: 0.0,
                    z_index: 1,
                }),
            )
            .expect("add title");
        DesignDocument::from_design("cert-1", &design)
    }

    #[test]
    fn svg_contains_elements_and_verification_footer() {
        let exporter = CertificateExporter::with_defaults();
        let svg = exporter.render_to_svg(&snapshot(), &stamp());
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("Certificate of Merit"));
        assert!(svg.contains("https://certs.example/verify/abc123"));
        assert!(svg.contains("Jane Doe"));
    }

    #[test]
    fn format_parsing_accepts_aliases() {
        assert_eq!("png".parse::<ExportFormat>().expect("png"), ExportFormat::Png);
        assert_eq!("PDF".parse::<ExportFormat>().expect("pdf"), ExportFormat::Pdf);
        assert_eq!("jpg".parse::<ExportFormat>().expect("jpg"), ExportFormat::Jpeg);
        assert!("gif".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn content_types_match_formats() {
        assert_eq!(ExportFormat::Png.content_type(), "image/png");
        assert_eq!(ExportFormat::Jpeg.content_type(), "image/jpeg");
        assert_eq!(ExportFormat::Pdf.content_type(), "application/pdf");
    }

    #[test]
    fn xml_special_characters_are_escaped() {
        let mut design = CanvasDesign::new(200.0, 100.0);
        design
            .add_element(Element::new(ElementKind::Text {
                content: "A < B & C > D".to_string(),
                font_size: 14.0,
                color: "#000000".to_string(),
            }))
            .expect("add");
        let doc = DesignDocument::from_design("s", &design);

        let exporter = CertificateExporter::with_defaults();
        let svg = exporter.render_to_svg(&doc, &stamp());
        assert!(svg.contains("A &lt; B &amp; C &gt; D"));
    }

    #[test]
    fn rotation_emits_a_transform_attribute() {
        let attr = rotation_attr(std::f32::consts::FRAC_PI_2, 0.0, 0.0, 100.0, 50.0);
        assert!(attr.contains("rotate(90"));
        assert!(rotation_attr(0.0, 0.0, 0.0, 100.0, 50.0).is_empty());
    }

    #[test]
    fn png_export_produces_valid_bytes() {
        let exporter = CertificateExporter::with_defaults();
        let png = exporter
            .render_to_png(&snapshot(), &stamp())
            .expect("png export");

        // PNG magic bytes: \x89PNG
        assert!(png.len() > 8);
        assert_eq!(&png[0..4], &[137, 80, 78, 71]);
    }

    #[test]
    fn jpeg_export_produces_valid_bytes() {
        let exporter = CertificateExporter::with_defaults();
        let jpeg = exporter
            .render_to_jpeg(&snapshot(), &stamp())
            .expect("jpeg export");

        // JPEG magic bytes: FFD8
        assert!(jpeg.len() > 2);
        assert_eq!(jpeg[0], 0xFF);
        assert_eq!(jpeg[1], 0xD8);
    }

    #[test]
    fn pdf_export_produces_valid_bytes() {
        let exporter = CertificateExporter::with_defaults();
        let pdf = exporter
            .render_to_pdf(&snapshot(), &stamp())
            .expect("pdf export");

        // PDF header: %PDF-
        assert!(pdf.len() > 5);
        assert_eq!(&pdf[0..5], b"%PDF-");
    }

    #[test]
    fn custom_dimensions_override_canvas_size() {
        let exporter = CertificateExporter::new(ExportConfig {
            width: Some(200),
            height: Some(150),
            ..Default::default()
        });
        let svg = exporter.render_to_svg(&snapshot(), &stamp());
        assert!(svg.contains("width=\"200\""));
        assert!(svg.contains("height=\"150\""));
    }

    #[test]
    fn scale_factor_grows_output_but_not_viewbox() {
        let exporter = CertificateExporter::new(ExportConfig {
            scale: 2.0,
            ..Default::default()
        });
        let svg = exporter.render_to_svg(&snapshot(), &stamp());
        assert!(svg.contains("width=\"800\""));
        assert!(svg.contains("height=\"600\""));
        assert!(svg.contains("viewBox=\"0 0 400 300\""));
    }
}
