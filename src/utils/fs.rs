use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

use crate::core::{Contents, ImageFile};

/// Lists every entry below `root`, directories included, in a stable order.
pub fn list_entries(root: impl AsRef<Path>) -> io::Result<Vec<PathBuf>> {
    let root = root.as_ref();
    let mut entries = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        entries.push(entry.into_path());
    }
    debug!("Found {} entries under {}", entries.len(), root.display());
    Ok(entries)
}

/// Loads `path` as an [`ImageFile`] based at `root`.
///
/// Directories become content-less files; regular files are read fully.
pub async fn read_image_file(root: impl AsRef<Path>, path: impl AsRef<Path>) -> io::Result<ImageFile> {
    let path = path.as_ref();
    let metadata = fs::metadata(path).await?;
    let file = if metadata.is_dir() {
        ImageFile::null(path)
    } else {
        ImageFile::buffer(path, fs::read(path).await?)
    };

    let file = file.with_base(root.as_ref());
    Ok(match metadata.modified() {
        Ok(modified) => file.with_modified(modified),
        Err(_) => file,
    })
}

/// Writes `file` under `out_dir` at its path relative to its base.
///
/// Content-less files create the matching directory. Returns the written path.
pub async fn write_image_file(out_dir: impl AsRef<Path>, file: &ImageFile) -> io::Result<PathBuf> {
    let target = out_dir.as_ref().join(file.relative());
    match &file.contents {
        Contents::Null => fs::create_dir_all(&target).await?,
        Contents::Buffer(bytes) => {
            ensure_parent_dir(&target).await?;
            fs::write(&target, bytes).await?;
        }
        Contents::Stream(_) => {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("cannot write streamed contents of {}", file.path.display()),
            ));
        }
    }
    Ok(target)
}

/// Ensure parent directory exists
pub async fn ensure_parent_dir(path: impl AsRef<Path>) -> io::Result<()> {
    match path.as_ref().parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent).await,
        _ => Ok(()),
    }
}
