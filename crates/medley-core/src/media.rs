//! Supported media formats, query descriptors and scoped query files

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// The two media kinds served by the retrieval engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => f.write_str("image"),
            MediaKind::Audio => f.write_str("audio"),
        }
    }
}

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaFormat {
    // Raster images
    Png,
    Jpeg,

    // Raw audio
    Wav,
    Mp3,
    M4a,

    // Symbolic notes
    Midi,
}

impl MediaFormat {
    /// Detect format from file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("png") => Ok(MediaFormat::Png),
            Some("jpg") | Some("jpeg") => Ok(MediaFormat::Jpeg),
            Some("wav") | Some("wave") => Ok(MediaFormat::Wav),
            Some("mp3") => Ok(MediaFormat::Mp3),
            Some("m4a") => Ok(MediaFormat::M4a),
            Some("mid") | Some("midi") => Ok(MediaFormat::Midi),
            _ => Err(Error::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Detect format and require it to belong to `kind`
    pub fn expect_kind(path: &Path, kind: MediaKind) -> Result<Self> {
        let format = Self::from_path(path)?;
        if format.kind() != kind {
            return Err(Error::WrongMediaKind {
                path: path.to_path_buf(),
                expected: kind,
            });
        }
        Ok(format)
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            MediaFormat::Png | MediaFormat::Jpeg => MediaKind::Image,
            MediaFormat::Wav | MediaFormat::Mp3 | MediaFormat::M4a | MediaFormat::Midi => {
                MediaKind::Audio
            }
        }
    }

    /// Canonical file extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            MediaFormat::Png => "png",
            MediaFormat::Jpeg => "jpg",
            MediaFormat::Wav => "wav",
            MediaFormat::Mp3 => "mp3",
            MediaFormat::M4a => "m4a",
            MediaFormat::Midi => "mid",
        }
    }

    /// Check if the format carries symbolic notes rather than a waveform
    pub fn is_symbolic(&self) -> bool {
        matches!(self, MediaFormat::Midi)
    }
}

/// An uploaded query: original file name plus its raw bytes
#[derive(Debug, Clone)]
pub struct QueryInput {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl QueryInput {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn format(&self) -> Result<MediaFormat> {
        MediaFormat::from_path(Path::new(&self.name))
    }
}

/// A query written to a temporary file for the duration of one call.
///
/// The file is removed when this value is dropped.
#[derive(Debug)]
pub struct ScopedQueryFile {
    file: NamedTempFile,
    format: MediaFormat,
}

impl ScopedQueryFile {
    /// Write `input` to a fresh temporary file carrying its extension
    pub fn materialise(input: &QueryInput) -> Result<Self> {
        let format = input.format()?;
        let suffix = format!(".{}", format.extension());
        let mut file = tempfile::Builder::new()
            .prefix("medley-query-")
            .suffix(&suffix)
            .tempfile()?;
        file.write_all(&input.bytes)?;
        file.flush()?;
        log::trace!(
            "Materialised query {} at {}",
            input.name,
            file.path().display()
        );
        Ok(Self { file, format })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn format(&self) -> MediaFormat {
        self.format
    }
}
