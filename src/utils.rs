use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

/// Appended to the source path to form the archive path.
pub const DESTINATION_SUFFIX: &str = "-encrypted";

/// Returns the archive path for a source file (`<source>-encrypted`).
pub fn destination_for<P: AsRef<Path>>(source: P) -> PathBuf {
    let mut rv = source.as_ref().as_os_str().to_os_string();
    rv.push(DESTINATION_SUFFIX);
    PathBuf::from(rv)
}

/// Builds the name of the archive entry for a source path.
///
/// The path is kept as given but made relative and joined with
/// forward slashes.
pub fn entry_name_for<P: AsRef<Path>>(source: P) -> String {
    let parts: Vec<_> = source
        .as_ref()
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            Component::ParentDir
            | Component::RootDir
            | Component::Prefix(..)
            | Component::CurDir => None,
        })
        .collect();
    if parts.is_empty() {
        "unnamed".to_string()
    } else {
        parts.join("/")
    }
}

/// Checks that `path` is an existing, readable regular file.
pub fn check_readable(path: &Path) -> io::Result<()> {
    let metadata = fs::metadata(path)?;
    if metadata.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            "source is a directory, not a file",
        ));
    }
    File::open(path)?;
    Ok(())
}
