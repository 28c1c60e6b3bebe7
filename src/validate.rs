use std::fs::{self, File, Metadata};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result, ValidationError, ValidationErrorKind};

/// A file that passed validation and is open for reading.
///
/// The handle refers to the same file that was inspected: the checks are
/// repeated against the open handle, so a path swapped for a symlink or a
/// different file between inspection and opening is rejected.
#[derive(Debug)]
pub struct ValidatedFile {
    path: PathBuf,
    file: File,
    len: u64,
}

impl ValidatedFile {
    /// The fully resolved path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The size of the file in bytes, as seen through the open handle.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the file is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Return the open handle.
    pub fn into_file(self) -> File {
        self.file
    }

    pub(crate) fn file(&self) -> &File {
        &self.file
    }
}

/// Resolve `path` and check that it names a regular file of at most
/// `max_size` bytes, then open it.
///
/// Symlinks are followed to their final target, and every check applies to
/// that target. Devices, FIFOs, sockets and directories are refused without
/// ever being opened.
pub fn validate_path<P: AsRef<Path>>(
    path: P,
    max_size: u64,
) -> Result<ValidatedFile> {
    let requested = path.as_ref();
    let resolved = match fs::canonicalize(requested) {
        Ok(resolved) => resolved,
        Err(ref err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(reject(requested, ValidationErrorKind::NotFound));
        }
        Err(err) => return Err(Error::Io(err)),
    };
    let md = fs::metadata(&resolved)?;
    check(&resolved, &md, max_size)?;

    let file = File::open(&resolved)?;
    let opened = file.metadata()?;
    check(&resolved, &opened, max_size)?;
    if !same_file(&md, &opened) {
        return Err(reject(&resolved, ValidationErrorKind::Changed));
    }
    debug!(
        path = %resolved.display(),
        size = opened.len(),
        "validated CSV file"
    );
    Ok(ValidatedFile { path: resolved, file: file, len: opened.len() })
}

/// Open `path` without any checks beyond what opening itself does.
pub(crate) fn open_unchecked<P: AsRef<Path>>(
    path: P,
) -> Result<ValidatedFile> {
    let path = path.as_ref().to_path_buf();
    let file = File::open(&path)?;
    let len = file.metadata()?.len();
    Ok(ValidatedFile { path: path, file: file, len: len })
}

fn check(path: &Path, md: &Metadata, max_size: u64) -> Result<()> {
    if let Some(kind) = file_type_error(md) {
        return Err(reject(path, kind));
    }
    if md.len() > max_size {
        let kind =
            ValidationErrorKind::TooLarge { size: md.len(), limit: max_size };
        return Err(reject(path, kind));
    }
    Ok(())
}

#[cfg(unix)]
fn file_type_error(md: &Metadata) -> Option<ValidationErrorKind> {
    use std::os::unix::fs::FileTypeExt;

    let ft = md.file_type();
    if ft.is_file() {
        None
    } else if ft.is_dir() {
        Some(ValidationErrorKind::Directory)
    } else if ft.is_block_device() {
        Some(ValidationErrorKind::BlockDevice)
    } else if ft.is_char_device() {
        Some(ValidationErrorKind::CharDevice)
    } else if ft.is_fifo() {
        Some(ValidationErrorKind::Fifo)
    } else if ft.is_socket() {
        Some(ValidationErrorKind::Socket)
    } else {
        Some(ValidationErrorKind::NotRegular)
    }
}

#[cfg(not(unix))]
fn file_type_error(md: &Metadata) -> Option<ValidationErrorKind> {
    let ft = md.file_type();
    if ft.is_file() {
        None
    } else if ft.is_dir() {
        Some(ValidationErrorKind::Directory)
    } else {
        Some(ValidationErrorKind::NotRegular)
    }
}

#[cfg(unix)]
fn same_file(a: &Metadata, b: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;

    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
fn same_file(a: &Metadata, b: &Metadata) -> bool {
    a.len() == b.len() && a.modified().ok() == b.modified().ok()
}

fn reject(path: &Path, kind: ValidationErrorKind) -> Error {
    warn!(path = %path.display(), reason = %kind, "rejected CSV file");
    Error::Validation(ValidationError::new(path, kind))
}
