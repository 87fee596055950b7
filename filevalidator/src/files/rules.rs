//! Validation rules applied to a single uploaded file

use std::fmt;
use std::io::{self, Read, Seek};
use tracing::debug;

use super::dimensions::{decode_dimensions, has_image_extension};
use super::messages::{ErrorArg, ErrorKind, ErrorTemplates, FileError};
use super::sniff::{detect_content_type, SNIFF_LEN};

/// Object-safe `Read + Seek`, the stream type every rule inspects.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadSeek for T {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Passed,
    Failed { kind: ErrorKind, args: Vec<ErrorArg> },
}

impl RuleOutcome {
    pub fn failed(kind: ErrorKind, args: Vec<ErrorArg>) -> Self {
        RuleOutcome::Failed { kind, args }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, RuleOutcome::Passed)
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            RuleOutcome::Passed => None,
            RuleOutcome::Failed { kind, .. } => Some(*kind),
        }
    }

    /// Resolves a failure against the template table.
    pub fn into_error(self, templates: &ErrorTemplates) -> Option<FileError> {
        match self {
            RuleOutcome::Passed => None,
            RuleOutcome::Failed { kind, args } => {
                Some(FileError::from_templates(kind, templates, args))
            }
        }
    }
}

/// A stateless check over one file.
///
/// The stream may already have been read by earlier rules: implementations
/// must rewind it before inspecting it, and report any stream failure as
/// [`ErrorKind::FileFailed`] with the original name as the only datum.
pub trait Rule: fmt::Debug + Send + Sync {
    fn validate(&self, file: &mut dyn ReadSeek, original_name: &str) -> RuleOutcome;

    /// Runs the rule and resolves a failure to a renderable error.
    fn check(
        &self,
        file: &mut dyn ReadSeek,
        original_name: &str,
        templates: &ErrorTemplates,
    ) -> Option<FileError> {
        self.validate(file, original_name).into_error(templates)
    }
}

fn file_failed(original_name: &str, err: io::Error) -> RuleOutcome {
    debug!(file = original_name, error = %err, "failed to read uploaded file");
    RuleOutcome::failed(ErrorKind::FileFailed, vec![original_name.into()])
}

/// Byte length must lie in `[min, max]`, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSize {
    pub min: u64,
    pub max: u64,
}

impl FileSize {
    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }
}

impl Rule for FileSize {
    fn validate(&self, file: &mut dyn ReadSeek, original_name: &str) -> RuleOutcome {
        if let Err(err) = file.rewind() {
            return file_failed(original_name, err);
        }

        let size = match io::copy(file, &mut io::sink()) {
            Ok(size) => size,
            Err(err) => return file_failed(original_name, err),
        };

        if size < self.min {
            return RuleOutcome::failed(ErrorKind::FileTooSmall, vec![original_name.into()]);
        }

        if size > self.max {
            return RuleOutcome::failed(ErrorKind::FileTooLarge, vec![original_name.into()]);
        }

        RuleOutcome::Passed
    }
}

/// Sniffed content type must be in the allow-list. `["*"]` allows anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeTypes {
    allowed: Vec<String>,
}

impl MimeTypes {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn any() -> Self {
        Self::new(["*"])
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    fn is_wildcard(&self) -> bool {
        self.allowed.len() == 1 && self.allowed[0] == "*"
    }
}

impl Rule for MimeTypes {
    fn validate(&self, file: &mut dyn ReadSeek, original_name: &str) -> RuleOutcome {
        if let Err(err) = file.rewind() {
            return file_failed(original_name, err);
        }

        let mut head = Vec::with_capacity(SNIFF_LEN);
        let read = (&mut *file).take(SNIFF_LEN as u64).read_to_end(&mut head);
        if head.is_empty() {
            let err = read
                .err()
                .unwrap_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof));
            return file_failed(original_name, err);
        }

        // Sniffing always sees a full window, short files are zero padded.
        head.resize(SNIFF_LEN, 0);
        let mime_type = detect_content_type(&head).trim().to_lowercase();

        if self.is_wildcard() || self.allowed.iter().any(|allowed| *allowed == mime_type) {
            return RuleOutcome::Passed;
        }

        RuleOutcome::failed(
            ErrorKind::FileTypeBad,
            vec![original_name.into(), mime_type.into()],
        )
    }
}

/// Which side of the pixel bounds a rule enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Min,
    Max,
}

fn check_pixel_size(
    file: &mut dyn ReadSeek,
    original_name: &str,
    bound: Bound,
    width: u32,
    height: u32,
) -> RuleOutcome {
    if !has_image_extension(original_name) {
        return RuleOutcome::failed(ErrorKind::ImageOnly, vec![original_name.into()]);
    }

    if let Err(err) = file.rewind() {
        return file_failed(original_name, err);
    }

    let (actual_width, actual_height) = match decode_dimensions(&mut *file) {
        Ok(dimensions) => dimensions,
        Err(err) => {
            debug!(file = original_name, error = %err, "image decode failed");
            return RuleOutcome::failed(ErrorKind::ImageOnly, vec![original_name.into()]);
        }
    };

    // width is checked before height, only the first violation is reported
    let (kind, violated) = match bound {
        Bound::Min => (
            ErrorKind::ImageSizeMin,
            actual_width < width || actual_height < height,
        ),
        Bound::Max => (
            ErrorKind::ImageSizeMax,
            actual_width > width || actual_height > height,
        ),
    };

    if violated {
        return RuleOutcome::failed(
            kind,
            vec![width.into(), height.into(), original_name.into()],
        );
    }

    RuleOutcome::Passed
}

/// Image must be at least `width` x `height` pixels. Only JPEG, PNG and GIF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinPixelSize {
    pub width: u32,
    pub height: u32,
}

impl MinPixelSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Rule for MinPixelSize {
    fn validate(&self, file: &mut dyn ReadSeek, original_name: &str) -> RuleOutcome {
        check_pixel_size(file, original_name, Bound::Min, self.width, self.height)
    }
}

/// Image must be at most `width` x `height` pixels. Only JPEG, PNG and GIF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxPixelSize {
    pub width: u32,
    pub height: u32,
}

impl MaxPixelSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Rule for MaxPixelSize {
    fn validate(&self, file: &mut dyn ReadSeek, original_name: &str) -> RuleOutcome {
        check_pixel_size(file, original_name, Bound::Max, self.width, self.height)
    }
}
