//! PDF assembly: one frame image per A4 page, centred, with a footer.
//!
//! Deliberately plain layout — the PDF is a review artifact, not a print
//! product. Each page carries the frame image scaled to fit inside the
//! margins with aspect ratio preserved, a "Frame N" footer, and optionally
//! the frame's description as a caption line when the caller supplies one.
//!
//! Assembly is synchronous (printpdf has no async API), so the async entry
//! point runs it on the blocking pool.

use crate::error::StoryboardError;
use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::{BuiltinFont, Image, ImageTransform, Mm, PdfDocument};
use std::fs::File;
use std::io::{BufWriter, Cursor};
use std::path::{Path, PathBuf};
use tracing::debug;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
/// 0.5 inch margins.
const MARGIN_MM: f32 = 12.7;
/// Extra bottom clearance reserved for the caption line when present.
const CAPTION_BAND_MM: f32 = 10.0;
/// printpdf's implicit image resolution when no dpi is given.
const BASE_DPI: f32 = 300.0;

/// Assemble frame images into a storyboard PDF at `out_path`.
///
/// `captions[i]` (when supplied) is rendered on the same page as
/// `image_paths[i]`. Runs on the blocking pool.
pub async fn render_pdf(
    image_paths: Vec<PathBuf>,
    captions: Option<Vec<String>>,
    out_path: PathBuf,
) -> Result<PathBuf, StoryboardError> {
    tokio::task::spawn_blocking(move || render_pdf_blocking(&image_paths, captions.as_deref(), &out_path))
        .await
        .map_err(|e| StoryboardError::Internal(format!("render task panicked: {e}")))?
}

/// Synchronous PDF assembly. Exposed for tests; production code goes through
/// [`render_pdf`].
pub fn render_pdf_blocking(
    image_paths: &[PathBuf],
    captions: Option<&[String]>,
    out_path: &Path,
) -> Result<PathBuf, StoryboardError> {
    if image_paths.is_empty() {
        return Err(StoryboardError::PdfRenderFailed {
            detail: "no frame images to render".into(),
        });
    }

    let (doc, first_page, first_layer) = PdfDocument::new(
        "Storyboard",
        Mm(PAGE_WIDTH_MM.into()),
        Mm(PAGE_HEIGHT_MM.into()),
        "frame 1",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| StoryboardError::PdfRenderFailed {
            detail: format!("font: {e}"),
        })?;

    for (idx, image_path) in image_paths.iter().enumerate() {
        let layer = if idx == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(
                Mm(PAGE_WIDTH_MM.into()),
                Mm(PAGE_HEIGHT_MM.into()),
                format!("frame {}", idx + 1),
            );
            doc.get_page(page).get_layer(layer)
        };

        let bytes = std::fs::read(image_path).map_err(|e| StoryboardError::PdfRenderFailed {
            detail: format!("cannot read frame image '{}': {e}", image_path.display()),
        })?;
        let decoder = PngDecoder::new(Cursor::new(bytes.as_slice())).map_err(|e| {
            StoryboardError::PdfRenderFailed {
                detail: format!("'{}' is not a decodable PNG: {e}", image_path.display()),
            }
        })?;
        let image = Image::try_from(decoder).map_err(|e| StoryboardError::PdfRenderFailed {
            detail: format!("cannot embed '{}': {e}", image_path.display()),
        })?;

        let caption = captions.and_then(|c| c.get(idx)).map(String::as_str);

        // Natural size at BASE_DPI, then one uniform scale factor to fit the
        // content box.
        let px_width = image.image.width.0 as f32;
        let px_height = image.image.height.0 as f32;
        let natural_width_mm = px_width * 25.4 / BASE_DPI;
        let natural_height_mm = px_height * 25.4 / BASE_DPI;

        let caption_band = if caption.is_some() { CAPTION_BAND_MM } else { 0.0 };
        let max_width = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
        let max_height = PAGE_HEIGHT_MM - 2.0 * MARGIN_MM - caption_band;
        let scale = (max_width / natural_width_mm).min(max_height / natural_height_mm);

        let drawn_width = natural_width_mm * scale;
        let drawn_height = natural_height_mm * scale;
        let x = (PAGE_WIDTH_MM - drawn_width) / 2.0;
        let y = MARGIN_MM + caption_band + (max_height - drawn_height) / 2.0;

        image.add_to_layer(
            layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(x.into())),
                translate_y: Some(Mm(y.into())),
                scale_x: Some(scale.into()),
                scale_y: Some(scale.into()),
                dpi: Some(BASE_DPI.into()),
                ..Default::default()
            },
        );

        if let Some(caption) = caption {
            let caption = truncate_caption(caption, 140);
            layer.use_text(
                caption.clone(),
                9.0,
                Mm(centered_x(&caption, 9.0).into()),
                Mm((MARGIN_MM * 0.5 + 5.0).into()),
                &font,
            );
        }

        let footer = format!("Frame {}", idx + 1);
        layer.use_text(
            footer.clone(),
            10.0,
            Mm(centered_x(&footer, 10.0).into()),
            Mm((MARGIN_MM * 0.5).into()),
            &font,
        );
    }

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoryboardError::PdfRenderFailed {
            detail: format!("cannot create '{}': {e}", parent.display()),
        })?;
    }
    let file = File::create(out_path).map_err(|e| StoryboardError::PdfRenderFailed {
        detail: format!("cannot create '{}': {e}", out_path.display()),
    })?;
    doc.save(&mut BufWriter::new(file))
        .map_err(|e| StoryboardError::PdfRenderFailed {
            detail: format!("cannot save '{}': {e}", out_path.display()),
        })?;

    debug!(pages = image_paths.len(), path = %out_path.display(), "rendered storyboard PDF");
    Ok(out_path.to_path_buf())
}

/// Approximate x coordinate that centres `text` horizontally.
///
/// Helvetica has no metrics available here; an average glyph width of half
/// the font size is close enough for a one-line footer.
fn centered_x(text: &str, font_size_pt: f32) -> f32 {
    let text_width_mm = text.chars().count() as f32 * font_size_pt * 0.5 * 0.352_778;
    ((PAGE_WIDTH_MM - text_width_mm) / 2.0).max(MARGIN_MM)
}

/// Truncate a caption to `max_chars`, appending an ellipsis when cut.
fn truncate_caption(caption: &str, max_chars: usize) -> String {
    if caption.chars().count() <= max_chars {
        return caption.to_string();
    }
    let cut: String = caption.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{cut}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_an_error() {
        let err = render_pdf_blocking(&[], None, Path::new("/tmp/never.pdf")).unwrap_err();
        assert!(matches!(err, StoryboardError::PdfRenderFailed { .. }));
    }

    #[test]
    fn unreadable_image_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("frame_001.png");
        let out = dir.path().join("storyboard.pdf");
        let err = render_pdf_blocking(&[missing], None, &out).unwrap_err();
        assert!(matches!(err, StoryboardError::PdfRenderFailed { .. }));
        assert!(!out.exists());
    }

    #[test]
    fn short_caption_is_untouched() {
        assert_eq!(truncate_caption("a dog", 140), "a dog");
    }

    #[test]
    fn long_caption_is_cut_with_ellipsis() {
        let long = "x".repeat(200);
        let cut = truncate_caption(&long, 140);
        assert_eq!(cut.chars().count(), 140);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn centered_x_never_leaves_the_margin() {
        let very_long = "w".repeat(400);
        assert_eq!(centered_x(&very_long, 10.0), MARGIN_MM);
        assert!(centered_x("Frame 1", 10.0) > MARGIN_MM);
    }
}
