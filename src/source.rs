use std::ops::Deref;
use std::path::Path;

use memmap2::Mmap;
use tracing::debug;

use crate::config::Config;
use crate::error::Result;
use crate::validate::{open_unchecked, validate_path, ValidatedFile};

/// Where CSV data comes from.
#[derive(Clone, Copy, Debug)]
pub enum Source<'a> {
    /// A file on disk. It is validated (unless disabled in the `Config`)
    /// and memory mapped.
    Path(&'a Path),
    /// An in-memory buffer.
    Bytes(&'a [u8]),
}

impl<'a> From<&'a Path> for Source<'a> {
    fn from(path: &'a Path) -> Source<'a> {
        Source::Path(path)
    }
}

impl<'a> From<&'a [u8]> for Source<'a> {
    fn from(bytes: &'a [u8]) -> Source<'a> {
        Source::Bytes(bytes)
    }
}

/// The bytes of a source, held for the duration of a parse.
pub(crate) enum Data<'a> {
    Borrowed(&'a [u8]),
    Mapped(Mmap),
}

impl<'a> Deref for Data<'a> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match *self {
            Data::Borrowed(bytes) => bytes,
            Data::Mapped(ref map) => &map[..],
        }
    }
}

impl<'a> Data<'a> {
    /// Load the bytes of `source`, validating file paths per `config`.
    pub(crate) fn load(
        source: Source<'a>,
        config: &Config,
    ) -> Result<Data<'a>> {
        match source {
            Source::Bytes(bytes) => Ok(Data::Borrowed(bytes)),
            Source::Path(path) => Data::map(&open(path, config)?),
        }
    }

    fn map(vf: &ValidatedFile) -> Result<Data<'a>> {
        // Mapping an empty file fails on some platforms.
        if vf.is_empty() {
            return Ok(Data::Borrowed(&[]));
        }
        // SAFETY: the mapping is read-only and owned by the returned value.
        let map = unsafe { Mmap::map(vf.file())? };
        debug!(
            path = %vf.path().display(),
            len = map.len(),
            "mapped CSV file"
        );
        Ok(Data::Mapped(map))
    }
}

/// Open `path`, validating it first unless `config` says otherwise.
pub(crate) fn open(path: &Path, config: &Config) -> Result<ValidatedFile> {
    if config.validate_path {
        validate_path(path, config.max_file_size)
    } else {
        open_unchecked(path)
    }
}
