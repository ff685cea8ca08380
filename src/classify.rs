use std::ffi::OsStr;
use std::path::{Component, Path};

/// How a file is rendered into the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Raw bytes, copied verbatim.
    Plain,
    /// Raster image summarised by format, dimensions and size.
    RasterImage,
    /// SVG summarised by its `width`/`height` attributes and size.
    VectorImage,
}

impl FileKind {
    pub fn of(path: &Path, include_image_metadata: bool) -> Self {
        if !include_image_metadata {
            return FileKind::Plain;
        }
        match path
            .extension()
            .and_then(OsStr::to_str)
            .unwrap_or("")
            .to_lowercase()
            .as_str()
        {
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "tiff" | "webp" => FileKind::RasterImage,
            "svg" => FileKind::VectorImage,
            _ => FileKind::Plain,
        }
    }
}

/// Path of `path` relative to `root`, joined with `/` on every platform.
///
/// Paths outside `root` are rendered as-is.
pub fn normalize_rel_path(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            Component::ParentDir => Some("..".into()),
            Component::RootDir | Component::Prefix(_) | Component::CurDir => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
