//! Image metadata extraction.
//!
//! Raster images are summarised from their header via the `image` crate; SVG
//! files are parsed as XML and summarised from the root element's `width` and
//! `height` attributes.

use anyhow::{Context, Result, bail};
use image::{ImageFormat, ImageReader};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::fmt;
use std::path::Path;

const UNKNOWN: &str = "Unknown";

/// SVG `width` and `height` attribute values, if present.
pub type Dimensions = (Option<String>, Option<String>);

/// Default for a missing SVG `width`/`height` attribute.
pub const SVG_UNKNOWN_DIMENSION: &str = "unknown";

/// Summary emitted in place of an image's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMetadata {
    pub file_name: String,
    pub format: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub size: Option<u64>,
}

impl ImageMetadata {
    /// Placeholder for an image whose metadata could not be read.
    pub fn unknown(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            format: None,
            width: None,
            height: None,
            size: None,
        }
    }
}

impl fmt::Display for ImageMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "- File Name: {}", self.file_name)?;
        writeln!(f, "- Format: {}", self.format.as_deref().unwrap_or(UNKNOWN))?;
        match (&self.width, &self.height) {
            (Some(w), Some(h)) => writeln!(f, "- Dimensions: {w}x{h}")?,
            _ => writeln!(f, "- Dimensions: {UNKNOWN}")?,
        }
        match self.size {
            Some(size) => writeln!(f, "- Size: {size} bytes"),
            None => writeln!(f, "- Size: {UNKNOWN} bytes"),
        }
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Png => "png".to_string(),
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::Bmp => "bmp".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        other => format!("{other:?}").to_lowercase(),
    }
}

/// Reads format, pixel dimensions and byte size of a raster image.
///
/// The format is sniffed from the file's content, falling back to the extension.
pub fn raster_metadata(path: &Path) -> Result<ImageMetadata> {
    let size = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat image: {}", path.display()))?
        .len();

    let reader = ImageReader::open(path)
        .with_context(|| format!("Failed to open image: {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("Failed to read image header: {}", path.display()))?;

    let format = reader
        .format()
        .with_context(|| format!("Unrecognised image format: {}", path.display()))?;

    let (width, height) = reader
        .into_dimensions()
        .with_context(|| format!("Failed to read image dimensions: {}", path.display()))?;

    Ok(ImageMetadata {
        file_name: file_name_of(path),
        format: Some(format_name(format)),
        width: Some(width.to_string()),
        height: Some(height.to_string()),
        size: Some(size),
    })
}

/// Reads an SVG file and summarises it.
pub fn svg_metadata(path: &Path) -> Result<ImageMetadata> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read SVG: {}", path.display()))?;

    let (width, height) =
        parse_svg_dimensions(&text).with_context(|| format!("Invalid SVG: {}", path.display()))?;

    Ok(ImageMetadata {
        file_name: file_name_of(path),
        format: Some("svg".to_string()),
        width: Some(width.unwrap_or_else(|| SVG_UNKNOWN_DIMENSION.to_string())),
        height: Some(height.unwrap_or_else(|| SVG_UNKNOWN_DIMENSION.to_string())),
        size: Some(text.len() as u64),
    })
}

/// Parses an SVG document, returning the root's `width` and `height`.
///
/// The whole document is read so that malformed markup anywhere (stray text
/// around the root, duplicate attributes, unknown entities) is rejected.
pub fn parse_svg_dimensions(text: &str) -> Result<Dimensions> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut dimensions = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let attrs = checked_attributes(&e)?;
                if depth == 0 {
                    dimensions = Some(root_dimensions(&e, attrs, dimensions.is_some())?);
                }
                depth += 1;
            }
            Event::Empty(e) => {
                let attrs = checked_attributes(&e)?;
                if depth == 0 {
                    dimensions = Some(root_dimensions(&e, attrs, dimensions.is_some())?);
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
            }
            Event::Text(e) => {
                let content = e.unescape()?;
                if depth == 0 && !content.trim().is_empty() {
                    bail!("text outside the root element");
                }
            }
            Event::CData(_) if depth == 0 => bail!("CDATA outside the root element"),
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        bail!("unexpected end of document: {depth} unclosed element(s)");
    }

    dimensions.context("document has no root element")
}

/// Unescapes every attribute of `element`, returning its `width` and `height`.
fn checked_attributes(element: &BytesStart<'_>) -> Result<Dimensions> {
    let mut width = None;
    let mut height = None;
    for attr in element.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?;
        match attr.key.as_ref() {
            b"width" => width = Some(value.into_owned()),
            b"height" => height = Some(value.into_owned()),
            _ => {}
        }
    }
    Ok((width, height))
}

fn root_dimensions(
    element: &BytesStart<'_>,
    attrs: Dimensions,
    seen_root: bool,
) -> Result<Dimensions> {
    if seen_root {
        bail!("document has more than one root element");
    }
    if element.local_name().as_ref() != b"svg" {
        bail!(
            "root element is <{}>, not <svg>",
            String::from_utf8_lossy(element.name().as_ref())
        );
    }
    Ok(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_display_known() {
        let meta = ImageMetadata {
            file_name: "b.png".into(),
            format: Some("png".into()),
            width: Some("10".into()),
            height: Some("20".into()),
            size: Some(123),
        };
        assert_eq!(
            meta.to_string(),
            "- File Name: b.png\n- Format: png\n- Dimensions: 10x20\n- Size: 123 bytes\n"
        );
    }

    #[test]
    fn test_display_unknown() {
        assert_eq!(
            ImageMetadata::unknown("x.jpg").to_string(),
            "- File Name: x.jpg\n- Format: Unknown\n- Dimensions: Unknown\n- Size: Unknown bytes\n"
        );
    }

    #[test]
    fn test_raster_metadata_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("b.png");
        ImageBuffer::from_pixel(10, 7, Rgb([255u8, 0, 0]))
            .save(&path)
            .unwrap();

        let meta = raster_metadata(&path).unwrap();
        assert_eq!(meta.file_name, "b.png");
        assert_eq!(meta.format.as_deref(), Some("png"));
        assert_eq!(meta.width.as_deref(), Some("10"));
        assert_eq!(meta.height.as_deref(), Some("7"));
        assert_eq!(meta.size, Some(fs::metadata(&path).unwrap().len()));
    }

    #[test]
    fn test_raster_format_comes_from_content() {
        let dir = tempdir().unwrap();
        let png = dir.path().join("real.png");
        ImageBuffer::from_pixel(3, 3, Rgb([0u8, 0, 0])).save(&png).unwrap();
        let disguised = dir.path().join("disguised.jpg");
        fs::copy(&png, &disguised).unwrap();

        let meta = raster_metadata(&disguised).unwrap();
        assert_eq!(meta.format.as_deref(), Some("png"));
    }

    #[test]
    fn test_raster_metadata_garbage_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fake.png");
        fs::write(&path, "definitely not an image").unwrap();
        assert!(raster_metadata(&path).is_err());
    }

    #[test]
    fn test_svg_dimensions() {
        let svg = r#"<?xml version="1.0"?>
<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24">
  <path d="M0 0h24v24H0z"/>
</svg>"#;
        let (w, h) = parse_svg_dimensions(svg).unwrap();
        assert_eq!(w.as_deref(), Some("24"));
        assert_eq!(h.as_deref(), Some("24"));
    }

    #[test]
    fn test_svg_missing_attributes_default_independently() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("icon.svg");
        fs::write(&path, r#"<svg width="100%"></svg>"#).unwrap();

        let meta = svg_metadata(&path).unwrap();
        assert_eq!(meta.width.as_deref(), Some("100%"));
        assert_eq!(meta.height.as_deref(), Some("unknown"));
        assert_eq!(meta.format.as_deref(), Some("svg"));
        assert_eq!(meta.size, Some(24));
    }

    #[test]
    fn test_svg_self_closing_root() {
        let (w, h) = parse_svg_dimensions(r#"<svg width="1" height="2"/>"#).unwrap();
        assert_eq!((w.as_deref(), h.as_deref()), (Some("1"), Some("2")));
    }

    #[test]
    fn test_svg_rejects_invalid_documents() {
        assert!(parse_svg_dimensions("this is not xml").is_err());
        assert!(parse_svg_dimensions(r#"<svg width="24"><g></svg>"#).is_err());
        assert!(parse_svg_dimensions(r#"<svg width="24">"#).is_err());
        assert!(parse_svg_dimensions(r#"<html></html>"#).is_err());
        assert!(parse_svg_dimensions(r#"<svg></svg><svg></svg>"#).is_err());
        assert!(parse_svg_dimensions(r#"<svg width="24" height="24"/> trailing junk"#).is_err());
        assert!(parse_svg_dimensions(r#"leading junk <svg width="24"/>"#).is_err());
        assert!(
            parse_svg_dimensions(r#"<svg width="24" height="24"><rect x="1" x="2"/></svg>"#)
                .is_err()
        );
        assert!(parse_svg_dimensions(r#"<svg width="24" height="24">&bogus;</svg>"#).is_err());
        assert!(parse_svg_dimensions(r#"<svg width="24" width="25"/>"#).is_err());
    }

    #[test]
    fn test_svg_accepts_entities_and_trailing_comments() {
        let svg = "<?xml version=\"1.0\"?>\n<svg width=\"1\" height=\"2\"><text>a &amp; b</text></svg>\n<!-- end -->\n";
        let (w, h) = parse_svg_dimensions(svg).unwrap();
        assert_eq!((w.as_deref(), h.as_deref()), (Some("1"), Some("2")));
    }
}
