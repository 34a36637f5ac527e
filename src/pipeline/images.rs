//! Visual element reconstruction: pair figures/tables/charts with their
//! captions and composite the two into a single image.
//!
//! ## Caption pairing
//!
//! Captions in the source documents follow their visual element, so the scan
//! looks at the immediately *following* element only — never backward, never
//! further ahead. Looking one position ahead avoids accidental association
//! with a preceding, unrelated visual. The follower qualifies as a caption
//! when its category says so outright, or when it is a paragraph whose text
//! starts like one ("Figure 3:", "fig. 2.", "Table 1", "Chart 4" —
//! case-insensitive).
//!
//! ## Compositing
//!
//! Both payloads are decoded and stacked vertically on a white canvas sized
//! to the union width and summed height, each part centred horizontally.
//! Without a caption the decoded visual is emitted as-is (re-encoded PNG).
//!
//! A malformed or missing base64 payload is not specially handled: the
//! decode failure propagates as this paper's image-extraction error and the
//! caller's per-paper boundary catches it.

use crate::document::{DocElement, ElementCategory, ParsedDocument};
use crate::error::PaperError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Cursor;
use tracing::debug;

/// Caption-like paragraph openers: a figure/table/chart keyword, a number,
/// and an optional `:` or `.` separator.
static RE_CAPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(figure|fig\.|table|chart)\s*\d+[:.]?").unwrap());

/// A visual element merged with its paired caption, PNG-encoded.
#[derive(Debug, Clone)]
pub struct CompositeImage {
    /// PNG bytes ready for upload.
    pub png: Vec<u8>,
    /// Whether a caption was found and stacked under the visual.
    pub captioned: bool,
}

/// Reconstruct up to `max_images` composites from a parsed document.
///
/// Composites come out in document order; scanning stops as soon as the
/// quota is met. Any decode failure aborts extraction for this paper.
pub fn extract_images(
    doc: &ParsedDocument,
    id: &str,
    max_images: usize,
) -> Result<Vec<CompositeImage>, PaperError> {
    let mut images = Vec::new();

    for (i, element) in doc.elements.iter().enumerate() {
        if images.len() >= max_images {
            break;
        }
        if !element.category.is_visual() {
            continue;
        }

        let visual_b64 = element.base64_encoding.as_deref().ok_or_else(|| {
            PaperError::ImageExtraction {
                id: id.to_string(),
                detail: format!("{:?} element at index {i} has no base64 payload", element.category),
            }
        })?;

        let caption_b64 = match caption_for(&doc.elements, i) {
            Some(caption) => Some(caption.base64_encoding.as_deref().ok_or_else(|| {
                PaperError::ImageExtraction {
                    id: id.to_string(),
                    detail: format!("caption at index {} has no base64 payload", i + 1),
                }
            })?),
            None => None,
        };

        let png = compose(visual_b64, caption_b64).map_err(|detail| {
            PaperError::ImageExtraction {
                id: id.to_string(),
                detail,
            }
        })?;

        images.push(CompositeImage {
            png,
            captioned: caption_b64.is_some(),
        });
    }

    debug!("Reconstructed {} composite images for {id}", images.len());
    Ok(images)
}

/// The single-lookahead caption rule: only the element directly after the
/// visual is considered.
fn caption_for(elements: &[DocElement], visual_idx: usize) -> Option<&DocElement> {
    let next = elements.get(visual_idx + 1)?;
    match next.category {
        ElementCategory::Caption => Some(next),
        ElementCategory::Paragraph if RE_CAPTION.is_match(next.content.text.trim()) => Some(next),
        _ => None,
    }
}

/// Decode the visual (and caption, if any) and stack them on a white canvas.
fn compose(visual_b64: &str, caption_b64: Option<&str>) -> Result<Vec<u8>, String> {
    let visual = decode_image(visual_b64)?;

    let Some(caption_b64) = caption_b64 else {
        return encode_png(&DynamicImage::ImageRgb8(visual));
    };
    let caption = decode_image(caption_b64)?;

    let width = visual.width().max(caption.width());
    let height = visual.height() + caption.height();
    let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));

    let visual_x = (width - visual.width()) / 2;
    let caption_x = (width - caption.width()) / 2;
    image::imageops::replace(&mut canvas, &visual, i64::from(visual_x), 0);
    image::imageops::replace(
        &mut canvas,
        &caption,
        i64::from(caption_x),
        i64::from(visual.height()),
    );

    encode_png(&DynamicImage::ImageRgb8(canvas))
}

fn decode_image(b64: &str) -> Result<RgbImage, String> {
    let bytes = STANDARD
        .decode(b64)
        .map_err(|e| format!("base64 decode failed: {e}"))?;
    let img = image::load_from_memory(&bytes).map_err(|e| format!("image decode failed: {e}"))?;
    Ok(img.to_rgb8())
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, String> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| format!("PNG encode failed: {e}"))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentContent, ElementContent};

    fn png_b64(width: u32, height: u32) -> String {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([0, 0, 0])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        STANDARD.encode(&buf)
    }

    fn element(category: ElementCategory, b64: Option<String>, text: &str) -> DocElement {
        DocElement {
            category,
            base64_encoding: b64,
            content: ElementContent {
                text: text.to_string(),
                html: String::new(),
            },
        }
    }

    fn doc(elements: Vec<DocElement>) -> ParsedDocument {
        ParsedDocument {
            elements,
            content: DocumentContent::default(),
        }
    }

    fn dimensions(png: &[u8]) -> (u32, u32) {
        let img = image::load_from_memory(png).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn figure_followed_by_caption_composites_both() {
        let d = doc(vec![
            element(ElementCategory::Figure, Some(png_b64(10, 4)), ""),
            element(ElementCategory::Caption, Some(png_b64(6, 2)), "Figure 1"),
        ]);
        let images = extract_images(&d, "2401.00001", 3).unwrap();
        assert_eq!(images.len(), 1);
        assert!(images[0].captioned);
        // Union width, summed height.
        assert_eq!(dimensions(&images[0].png), (10, 6));
    }

    #[test]
    fn figure_followed_by_unrelated_paragraph_stays_single() {
        let d = doc(vec![
            element(ElementCategory::Figure, Some(png_b64(8, 8)), ""),
            element(
                ElementCategory::Paragraph,
                Some(png_b64(8, 2)),
                "We now describe the method.",
            ),
        ]);
        let images = extract_images(&d, "2401.00001", 3).unwrap();
        assert_eq!(images.len(), 1);
        assert!(!images[0].captioned);
        assert_eq!(dimensions(&images[0].png), (8, 8));
    }

    #[test]
    fn caption_like_paragraph_is_paired() {
        for text in ["Figure 2: results", "fig. 3. ablations", "TABLE 1: data", "Chart 4"] {
            let d = doc(vec![
                element(ElementCategory::Table, Some(png_b64(5, 5)), ""),
                element(ElementCategory::Paragraph, Some(png_b64(5, 3)), text),
            ]);
            let images = extract_images(&d, "2401.00001", 1).unwrap();
            assert!(images[0].captioned, "expected caption pairing for {text:?}");
        }
    }

    #[test]
    fn keyword_without_number_is_not_a_caption() {
        let d = doc(vec![
            element(ElementCategory::Figure, Some(png_b64(5, 5)), ""),
            element(
                ElementCategory::Paragraph,
                Some(png_b64(5, 3)),
                "Table lookups dominate the runtime.",
            ),
        ]);
        let images = extract_images(&d, "2401.00001", 1).unwrap();
        assert!(!images[0].captioned);
    }

    #[test]
    fn lookahead_never_scans_backward() {
        // A caption *before* the figure must not be attached.
        let d = doc(vec![
            element(ElementCategory::Caption, Some(png_b64(6, 2)), "Figure 0"),
            element(ElementCategory::Figure, Some(png_b64(10, 4)), ""),
        ]);
        let images = extract_images(&d, "2401.00001", 3).unwrap();
        assert_eq!(images.len(), 1);
        assert!(!images[0].captioned);
    }

    #[test]
    fn quota_caps_output_in_document_order() {
        let d = doc(vec![
            element(ElementCategory::Figure, Some(png_b64(3, 3)), ""),
            element(ElementCategory::Table, Some(png_b64(4, 4)), ""),
            element(ElementCategory::Chart, Some(png_b64(5, 5)), ""),
        ]);
        let images = extract_images(&d, "2401.00001", 2).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(dimensions(&images[0].png), (3, 3));
        assert_eq!(dimensions(&images[1].png), (4, 4));
    }

    #[test]
    fn figure_caption_paragraph_yields_exactly_one_composite() {
        // Requesting 3 from [figure, caption, paragraph] produces one
        // composite; the trailing paragraph is never treated as a visual.
        let d = doc(vec![
            element(ElementCategory::Figure, Some(png_b64(10, 4)), ""),
            element(ElementCategory::Caption, Some(png_b64(6, 2)), "Figure 1"),
            element(ElementCategory::Paragraph, None, "Body text."),
        ]);
        let images = extract_images(&d, "2401.00001", 3).unwrap();
        assert_eq!(images.len(), 1);
        assert!(images[0].captioned);
    }

    #[test]
    fn trailing_visual_without_follower_is_uncaptioned() {
        let d = doc(vec![element(
            ElementCategory::Chart,
            Some(png_b64(7, 7)),
            "",
        )]);
        let images = extract_images(&d, "2401.00001", 3).unwrap();
        assert_eq!(images.len(), 1);
        assert!(!images[0].captioned);
    }

    #[test]
    fn malformed_payload_aborts_extraction() {
        let d = doc(vec![element(
            ElementCategory::Figure,
            Some("not base64 at all!!".to_string()),
            "",
        )]);
        let err = extract_images(&d, "2401.00001", 3).unwrap_err();
        assert!(matches!(err, PaperError::ImageExtraction { .. }));
    }

    #[test]
    fn missing_visual_payload_aborts_extraction() {
        let d = doc(vec![element(ElementCategory::Table, None, "")]);
        let err = extract_images(&d, "2401.00001", 3).unwrap_err();
        assert!(matches!(err, PaperError::ImageExtraction { .. }));
    }

    #[test]
    fn wide_caption_sets_union_width_and_centres_visual() {
        let d = doc(vec![
            element(ElementCategory::Figure, Some(png_b64(4, 4)), ""),
            element(ElementCategory::Caption, Some(png_b64(12, 2)), "Figure 1"),
        ]);
        let images = extract_images(&d, "2401.00001", 1).unwrap();
        assert_eq!(dimensions(&images[0].png), (12, 6));

        // The visual is centred: columns left of it stay background white.
        let img = image::load_from_memory(&images[0].png).unwrap().to_rgb8();
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(img.get_pixel(5, 0).0, [0, 0, 0]);
    }
}
