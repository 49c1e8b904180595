//! Integration tests: encode the same verified snapshot through every format
//! and confirm the artifacts are deterministic and carry the verification
//! reference.

use std::str::FromStr;

use certcanvas_core::{
    CanvasDesign, DesignDocument, Element, ElementKind, ShapeKind, Transform,
};
use certcanvas_renderer::{CertificateExporter, ExportFormat, VerificationStamp};

fn verified_snapshot() -> DesignDocument {
    let mut design = CanvasDesign::new(640.0, 480.0);
    design
        .add_element(
            Element::new(ElementKind::Shape {
                shape: ShapeKind::Rect,
                fill: "#fdf6e3".to_string(),
                stroke: "#b58900".to_string(),
                stroke_width: 4.0,
            })
            .with_transform(Transform {
                x: 20.0,
                y: 20.0,
                width: 600.0,
                height: 440.0,
                rotation: 0.0,
                z_index: 0,
            }),
        )
        .expect("add frame");
    design
        .add_element(
            Element::new(ElementKind::Text {
                content: "Certificate of Completion".to_string(),
                font_size: 28.0,
                color: "#1a1a1a".to_string(),
            })
            .with_transform(Transform {
                x: 80.0,
                y: 90.0,
                width: 480.0,
                height: 40.0,
                rotation: 0.0,
                z_index: 1,
            }),
        )
        .expect("add title");
    DesignDocument::from_design("cert-export", &design)
}

fn stamp() -> VerificationStamp {
    VerificationStamp {
        url: "https://certs.example/verify/0f9a2b7c".to_string(),
        author: "Jane Doe".to_string(),
        authorized_on: "2024-01-01".to_string(),
    }
}

#[test]
fn every_format_encodes_with_its_magic_bytes() {
    let exporter = CertificateExporter::with_defaults();
    let doc = verified_snapshot();
    let stamp = stamp();

    let png = exporter
        .export(&doc, &stamp, ExportFormat::Png)
        .expect("png");
    assert_eq!(&png.bytes[0..4], &[137, 80, 78, 71]);
    assert_eq!(png.content_type(), "image/png");

    let jpeg = exporter
        .export(&doc, &stamp, ExportFormat::Jpeg)
        .expect("jpeg");
    assert_eq!(jpeg.bytes[0], 0xFF);
    assert_eq!(jpeg.bytes[1], 0xD8);

    let pdf = exporter
        .export(&doc, &stamp, ExportFormat::Pdf)
        .expect("pdf");
    assert_eq!(&pdf.bytes[0..5], b"%PDF-");
}

#[test]
fn repeated_export_of_one_snapshot_is_deterministic() {
    let exporter = CertificateExporter::with_defaults();
    let doc = verified_snapshot();
    let stamp = stamp();

    let first = exporter
        .export(&doc, &stamp, ExportFormat::Png)
        .expect("first");
    let second = exporter
        .export(&doc, &stamp, ExportFormat::Png)
        .expect("second");

    assert_eq!(first.bytes, second.bytes);
}

#[test]
fn pdf_embeds_the_verification_url() {
    let exporter = CertificateExporter::with_defaults();
    let pdf = exporter
        .export(&verified_snapshot(), &stamp(), ExportFormat::Pdf)
        .expect("pdf");

    // The link annotation stores the URI uncompressed in the document.
    let haystack = String::from_utf8_lossy(&pdf.bytes);
    assert!(haystack.contains("certs.example/verify/0f9a2b7c"));
}

#[test]
fn format_round_trips_from_query_strings() {
    for (input, expected) in [
        ("png", ExportFormat::Png),
        ("pdf", ExportFormat::Pdf),
        ("jpeg", ExportFormat::Jpeg),
    ] {
        assert_eq!(ExportFormat::from_str(input).expect("parse"), expected);
    }
}
