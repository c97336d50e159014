//! Capability-based file access on UTF-8 paths.

use std::io;

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8};

/// Open a file for reading using ambient authority.
///
/// # Errors
/// Returns the I/O error from opening the file.
pub fn open_file(path: &Utf8Path) -> io::Result<std::fs::File> {
    fs_utf8::File::open_ambient(path, ambient_authority()).map(fs_utf8::File::into_std)
}

/// Create or truncate a file for writing using ambient authority.
///
/// # Errors
/// Returns an error when the parent directory does not exist or the file
/// cannot be created.
pub fn create_file(path: &Utf8Path) -> io::Result<std::fs::File> {
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::other("target should include a file name"))?;
    fs_utf8::Dir::open_ambient_dir(parent_of(path), ambient_authority())?
        .create(name)
        .map(fs_utf8::File::into_std)
}

/// True when `path` names a directory that can be opened.
#[must_use]
pub fn is_dir(path: &Utf8Path) -> bool {
    fs_utf8::Dir::open_ambient_dir(path, ambient_authority()).is_ok()
}

fn parent_of(path: &Utf8Path) -> &Utf8Path {
    path.parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."))
}

/// True when `path` names an existing regular file.
///
/// Missing parents and unreadable directories count as absent.
#[must_use]
pub fn is_file(path: &Utf8Path) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    fs_utf8::Dir::open_ambient_dir(parent_of(path), ambient_authority())
        .and_then(|dir| dir.metadata(name))
        .is_ok_and(|meta| meta.is_file())
}
