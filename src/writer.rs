use crate::classify::{FileKind, normalize_rel_path};
use crate::metadata::{ImageMetadata, file_name_of, raster_metadata, svg_metadata};
use anyhow::{Context, Result};
use log::{debug, error};
use memmap2::{Mmap, MmapOptions};
use std::fs::File as StdFile;
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

/// Appends one record per file to an async byte sink.
pub struct DigestWriter<W: AsyncWrite + Unpin> {
    writer: BufWriter<W>,
    include_image_metadata: bool,
    records: usize,
}

impl<W: AsyncWrite + Unpin> DigestWriter<W> {
    pub fn new(writer: W, include_image_metadata: bool) -> Self {
        Self {
            writer: BufWriter::new(writer),
            include_image_metadata,
            records: 0,
        }
    }

    /// Number of records emitted so far.
    pub fn records_written(&self) -> usize {
        self.records
    }

    /// Writes the record for `path`, labelled relative to `root`.
    ///
    /// Problems with the file itself are logged and never fail the digest;
    /// only a failing sink returns an error.
    pub async fn write_entry(&mut self, path: &Path, root: &Path) -> Result<()> {
        let rel_path = normalize_rel_path(path, root);

        match FileKind::of(path, self.include_image_metadata) {
            FileKind::RasterImage => {
                debug!("Reading image metadata: {rel_path}");
                let meta = raster_metadata(path).unwrap_or_else(|err| {
                    error!("Error reading image metadata for {rel_path}: {err:#}");
                    ImageMetadata::unknown(file_name_of(path))
                });
                self.write_metadata(&rel_path, &meta).await
            }
            FileKind::VectorImage => {
                debug!("Parsing SVG: {rel_path}");
                match svg_metadata(path) {
                    Ok(meta) => self.write_metadata(&rel_path, &meta).await,
                    Err(err) => {
                        error!("Error parsing SVG {rel_path}: {err:#}");
                        Ok(())
                    }
                }
            }
            FileKind::Plain => {
                debug!("Writing file: {rel_path}");
                match read_raw(path) {
                    Ok(content) => self.write_plain(&rel_path, content.as_deref()).await,
                    Err(err) => {
                        error!("Error reading {rel_path}: {err:#}");
                        Ok(())
                    }
                }
            }
        }
    }

    async fn write_header(&mut self, rel_path: &str) -> Result<()> {
        self.writer
            .write_all(format!("\n\n### {rel_path}\n\n").as_bytes())
            .await
            .with_context(|| format!("Failed to write heading for {rel_path}"))
    }

    async fn write_plain(&mut self, rel_path: &str, content: Option<&[u8]>) -> Result<()> {
        self.write_header(rel_path).await?;
        if let Some(bytes) = content {
            self.writer
                .write_all(bytes)
                .await
                .with_context(|| format!("Failed to write content of {rel_path}"))?;
        }
        self.records += 1;
        Ok(())
    }

    async fn write_metadata(&mut self, rel_path: &str, meta: &ImageMetadata) -> Result<()> {
        self.write_header(rel_path).await?;
        self.writer
            .write_all(meta.to_string().as_bytes())
            .await
            .with_context(|| format!("Failed to write metadata for {rel_path}"))?;
        self.records += 1;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await.context("Failed to flush output")
    }

    /// Flushes and returns the underlying sink.
    pub async fn into_inner(mut self) -> Result<W> {
        self.flush().await?;
        Ok(self.writer.into_inner())
    }
}

/// Maps the file's bytes; `None` for an empty file, which cannot be mapped.
fn read_raw(path: &Path) -> Result<Option<Mmap>> {
    let file =
        StdFile::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;

    let len = file
        .metadata()
        .with_context(|| format!("Failed to stat file: {}", path.display()))?
        .len();
    if len == 0 {
        return Ok(None);
    }

    // SAFETY: the map is dropped before the next entry is processed.
    let mmap = unsafe {
        MmapOptions::new()
            .map(&file)
            .with_context(|| format!("Failed to mmap file: {}", path.display()))?
    };
    Ok(Some(mmap))
}
