use std::fs;
use std::io::{self, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An uploaded file as seen by the validator: something that can be opened
/// into a seekable stream and that remembers the client-supplied name.
pub trait FileHandle {
    type Stream: Read + Seek;

    fn open(&self) -> io::Result<Self::Stream>;

    /// The original, untrusted file name.
    fn file_name(&self) -> &str;
}

/// Upload buffered in memory, e.g. a multipart part.
#[derive(Debug, Clone)]
pub struct MemoryFile {
    file_name: String,
    data: Arc<[u8]>,
}

impl MemoryFile {
    pub fn new(file_name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl FileHandle for MemoryFile {
    type Stream = Cursor<Arc<[u8]>>;

    fn open(&self) -> io::Result<Self::Stream> {
        Ok(Cursor::new(Arc::clone(&self.data)))
    }

    fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// A file already on disk, opened read-only on demand.
#[derive(Debug, Clone)]
pub struct DiskFile {
    path: PathBuf,
    file_name: String,
}

impl DiskFile {
    /// Uses the last path component as the original name.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, file_name }
    }

    pub fn with_file_name(path: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file_name: file_name.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileHandle for DiskFile {
    type Stream = fs::File;

    fn open(&self) -> io::Result<Self::Stream> {
        fs::File::open(&self.path)
    }

    fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl<H: FileHandle + ?Sized> FileHandle for &H {
    type Stream = H::Stream;

    fn open(&self) -> io::Result<Self::Stream> {
        (**self).open()
    }

    fn file_name(&self) -> &str {
        (**self).file_name()
    }
}
