//! # treedigest Library
//!
//! This crate flattens a directory tree into one annotated digest:
//!
//! - Paths matched by the root's `.gitignore` (or another ignore file), by
//!   extra glob patterns, or by excluded extensions are skipped
//! - Every remaining file contributes one `### <path>` record holding its raw
//!   bytes, or a metadata summary for raster images and SVGs
//!
//! ## Usage
//!
//! ### To write a digest file:
//!
//! ```rust,no_run
//! use treedigest::{Config, OutputTarget, run_digest};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = Config::new(std::env::current_dir()?);
//!     config.output = OutputTarget::File(PathBuf::from("digest.md"));
//!     config.ignored_extensions.insert("lock".to_string());
//!
//!     run_digest(config).await
//! }
//! ```
//!
//! ### To build the digest in memory:
//!
//! ```rust,no_run
//! use treedigest::{Config, digest_to_bytes};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let digest = digest_to_bytes(&Config::new("src")).await?;
//!     println!("{} bytes", digest.len());
//!     Ok(())
//! }
//! ```

pub mod classify;
pub mod cli;
pub mod filewalker;
pub mod ignore_rules;
pub mod metadata;
pub mod writer;

pub use classify::FileKind;
pub use cli::{Config, OutputTarget};
pub use filewalker::collect_files;
pub use ignore_rules::{IgnoreRules, load_gitignore, read_ignore_file};
pub use metadata::ImageMetadata;
pub use writer::DigestWriter;

use anyhow::{Context, Result};
use log::info;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWrite;

/// Walks `root` and writes every surviving file into `sink`.
///
/// Returns the sink and the number of records written.
pub async fn digest_tree<W: AsyncWrite + Unpin>(
    root: &Path,
    rules: &IgnoreRules,
    include_image_metadata: bool,
    sink: W,
    skip: &[PathBuf],
) -> Result<(W, usize)> {
    let root = &root
        .canonicalize()
        .with_context(|| format!("Failed to resolve root: {}", root.display()))?;
    let entries = collect_files(root, rules, skip)?;
    let mut digest_writer = DigestWriter::new(sink, include_image_metadata);

    for entry in entries {
        digest_writer.write_entry(entry.path(), root).await?;
    }

    let records = digest_writer.records_written();
    Ok((digest_writer.into_inner().await?, records))
}

/// Resolved traversal root, compiled rules and the paths kept out of the digest.
struct Prepared {
    root: PathBuf,
    rules: IgnoreRules,
    skip: Vec<PathBuf>,
}

fn prepare(config: &Config) -> Result<Prepared> {
    let root = config
        .root
        .canonicalize()
        .with_context(|| format!("Failed to resolve root: {}", config.root.display()))?;

    let (ignore_path, mut patterns) = match &config.ignore_file {
        Some(path) => (path.clone(), read_ignore_file(path)),
        None => (root.join(ignore_rules::GITIGNORE_FILE), load_gitignore(&root)),
    };
    patterns.extend(config.extra_patterns.iter().cloned());

    let rules = IgnoreRules::new(&patterns, &config.ignored_extensions);
    if rules.is_empty() {
        info!("No ignore rules; every file under {} is digested", root.display());
    }
    info!(
        "Using {} ignore pattern(s) from {} and the command line",
        rules.pattern_count(),
        ignore_path.display()
    );

    Ok(Prepared {
        root,
        rules,
        skip: vec![ignore_path],
    })
}

/// Builds the digest in memory.
pub async fn digest_to_bytes(config: &Config) -> Result<Vec<u8>> {
    let Prepared { root, rules, skip } = prepare(config)?;
    let (bytes, records) = digest_tree(
        &root,
        &rules,
        config.include_image_metadata,
        Vec::new(),
        &skip,
    )
    .await?;
    info!("Digested {records} file(s) from {}", root.display());
    Ok(bytes)
}

/// Writes the digest to the configured output.
pub async fn run_digest(config: Config) -> Result<()> {
    let Prepared {
        root,
        rules,
        mut skip,
    } = prepare(&config)?;

    let records = match &config.output {
        OutputTarget::File(path) => {
            let file = File::create(path)
                .await
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            skip.push(path.clone());
            let (_, records) =
                digest_tree(&root, &rules, config.include_image_metadata, file, &skip).await?;
            info!("Wrote: {}", path.display());
            records
        }
        OutputTarget::Stdout => {
            let stdout = tokio::io::stdout();
            let (_, records) =
                digest_tree(&root, &rules, config.include_image_metadata, stdout, &skip).await?;
            records
        }
    };

    info!("Digested {records} file(s) from {}", root.display());
    Ok(())
}
