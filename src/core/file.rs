//! The file object flowing through the pipeline.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bytes::Bytes;
use futures::stream::BoxStream;

/// Content of an [`ImageFile`].
pub enum Contents {
    /// No content, e.g. a directory entry.
    Null,
    /// Fully materialized bytes.
    Buffer(Bytes),
    /// An open byte stream. The pipeline rejects these.
    Stream(BoxStream<'static, std::io::Result<Bytes>>),
}

impl fmt::Debug for Contents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Buffer(bytes) => write!(f, "Buffer({} bytes)", bytes.len()),
            Self::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// A file travelling through the stream: path, optional base directory,
/// modification time, and contents.
#[derive(Debug)]
pub struct ImageFile {
    pub path: PathBuf,
    pub base: Option<PathBuf>,
    pub modified: Option<SystemTime>,
    pub contents: Contents,
}

impl ImageFile {
    pub fn new(path: impl Into<PathBuf>, contents: Contents) -> Self {
        Self {
            path: path.into(),
            base: None,
            modified: None,
            contents,
        }
    }

    pub fn buffer(path: impl Into<PathBuf>, bytes: impl Into<Bytes>) -> Self {
        Self::new(path, Contents::Buffer(bytes.into()))
    }

    pub fn null(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Contents::Null)
    }

    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_modified(mut self, modified: SystemTime) -> Self {
        self.modified = Some(modified);
        self
    }

    pub fn is_null(&self) -> bool {
        matches!(self.contents, Contents::Null)
    }

    pub fn bytes(&self) -> Option<&Bytes> {
        match &self.contents {
            Contents::Buffer(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Extension including the leading dot (`".png"`), if any.
    pub fn extname(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
    }

    /// Replaces the extension; accepts `".webp"` or `"webp"`.
    pub fn set_extname(&mut self, extname: &str) {
        self.path.set_extension(extname.trim_start_matches('.'));
    }

    /// Path relative to `base`, or the full path when there is no base.
    pub fn relative(&self) -> &Path {
        self.base
            .as_deref()
            .and_then(|base| self.path.strip_prefix(base).ok())
            .unwrap_or(&self.path)
    }

    /// Copies path and metadata into a new file holding `bytes`.
    pub fn clone_with_contents(&self, bytes: impl Into<Bytes>) -> Self {
        Self {
            path: self.path.clone(),
            base: self.base.clone(),
            modified: self.modified,
            contents: Contents::Buffer(bytes.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extname_has_leading_dot() {
        assert_eq!(ImageFile::null("a/b.png").extname().as_deref(), Some(".png"));
        assert_eq!(ImageFile::null("a/Makefile").extname(), None);
    }

    #[test]
    fn set_extname_replaces_last_extension() {
        let mut file = ImageFile::null("src/img/photo.jpg");
        file.set_extname(".webp");
        assert_eq!(file.path, PathBuf::from("src/img/photo.webp"));
        file.set_extname("avif");
        assert_eq!(file.path, PathBuf::from("src/img/photo.avif"));
    }

    #[test]
    fn clone_keeps_metadata_with_fresh_contents() {
        let modified = SystemTime::UNIX_EPOCH;
        let file = ImageFile::buffer("src/a.png", vec![1, 2, 3])
            .with_base("src")
            .with_modified(modified);

        let copy = file.clone_with_contents(vec![9]);
        assert_eq!(copy.path, file.path);
        assert_eq!(copy.base, file.base);
        assert_eq!(copy.modified, Some(modified));
        assert_eq!(copy.bytes().map(|b| b.as_ref()), Some(&[9u8][..]));
        assert_eq!(file.bytes().map(|b| b.len()), Some(3));
    }

    #[test]
    fn relative_strips_base() {
        let file = ImageFile::null("src/images/a.png").with_base("src");
        assert_eq!(file.relative(), Path::new("images/a.png"));
        assert_eq!(ImageFile::null("x.png").relative(), Path::new("x.png"));
    }
}
