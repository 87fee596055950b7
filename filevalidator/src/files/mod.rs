pub mod dimensions;
pub mod messages;
pub mod models;
pub mod rules;
pub mod sniff;
pub mod validation;

pub use messages::{render_template, ErrorArg, ErrorKind, ErrorTemplates, FileError};
pub use models::{DiskFile, FileHandle, MemoryFile};
pub use rules::{FileSize, MaxPixelSize, MimeTypes, MinPixelSize, ReadSeek, Rule, RuleOutcome};
pub use sniff::detect_content_type;
pub use validation::{Field, FileValidator, ValidationReport, ValidatorError};
