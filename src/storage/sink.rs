//! Output files for dumps
//!
//! A dump is written to `<collection>.json`, or to `<collection>.gz` when
//! compressed. Compression is a plain decorator around the file; the writer
//! only sees a [`ByteSink`].

use eyre::{Context, Result};
use flate2::write::GzEncoder;
use flate2::{Compression, GzBuilder};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// A writable destination that must be finished exactly once.
pub trait ByteSink: Write + Send {
    /// Flush everything and release the underlying resource.
    fn finish(self: Box<Self>) -> io::Result<()>;
}

impl ByteSink for File {
    fn finish(mut self: Box<Self>) -> io::Result<()> {
        self.flush()?;
        self.sync_all()
    }
}

impl<W: Write + Send> ByteSink for GzEncoder<W> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        // Writes the gzip trailer
        let mut inner = (*self).finish()?;
        inner.flush()
    }
}

/// Default output path for a collection.
pub fn output_path(collection: &str, compress: bool) -> PathBuf {
    match compress {
        true => PathBuf::from(format!("{}.gz", collection)),
        false => PathBuf::from(format!("{}.json", collection)),
    }
}

/// Create (or truncate) the output file, gzip-wrapped if requested.
pub fn open_sink(path: impl AsRef<Path>, compress: bool) -> Result<Box<dyn ByteSink>> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;

    if !compress {
        return Ok(Box::new(file));
    }

    // Name the decompressed file after the collection, not the archive
    let inner_name = path
        .with_extension("json")
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let encoder = GzBuilder::new()
        .filename(inner_name)
        .write(file, Compression::best());
    Ok(Box::new(encoder))
}
