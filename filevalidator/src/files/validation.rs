use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::messages::{ErrorArg, ErrorKind, ErrorTemplates, FileError};
use super::models::FileHandle;
use super::rules::{ReadSeek, Rule};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidatorError {
    #[error("Field map must be provided")]
    MissingFields,

    #[error("Error template map must be provided")]
    MissingTemplates,
}

/// Policy and rule chain for one named upload field.
#[derive(Debug, Default)]
pub struct Field {
    required: bool,
    single_file: bool,
    rules: Vec<Box<dyn Rule>>,
}

impl Field {
    pub fn new(required: bool, single_file: bool) -> Self {
        Self {
            required,
            single_file,
            rules: Vec::new(),
        }
    }

    pub fn with_rules(required: bool, single_file: bool, rules: Vec<Box<dyn Rule>>) -> Self {
        Self {
            required,
            single_file,
            rules,
        }
    }

    pub fn rule(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_single_file(&self) -> bool {
        self.single_file
    }

    pub fn rules(&self) -> &[Box<dyn Rule>] {
        &self.rules
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: HashMap<String, Vec<FileError>>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Errors for `field`; empty for unknown fields.
    pub fn field_errors(&self, field: &str) -> &[FileError] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }
}

/// Validates uploads grouped by form field name. Field names are matched
/// exactly, `avatar` and `Avatar` are different fields.
#[derive(Debug)]
pub struct FileValidator {
    fields: HashMap<String, Field>,
    templates: ErrorTemplates,
}

impl FileValidator {
    pub fn new(fields: Option<HashMap<String, Field>>) -> Result<Self, ValidatorError> {
        let fields = fields.ok_or(ValidatorError::MissingFields)?;

        Ok(Self {
            fields,
            templates: ErrorTemplates::defaults(),
        })
    }

    /// Replaces the whole template table. Kinds missing from `templates`
    /// render as empty strings afterwards.
    pub fn set_error_templates(
        &mut self,
        templates: Option<ErrorTemplates>,
    ) -> Result<(), ValidatorError> {
        let templates = templates.ok_or(ValidatorError::MissingTemplates)?;
        self.templates = templates;
        Ok(())
    }

    pub fn templates(&self) -> &ErrorTemplates {
        &self.templates
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Runs every declared field against the uploads. The report holds one
    /// entry per declared field, empty when the field passed. A missing
    /// upload map is a caller error and yields an invalid, empty report.
    pub fn validate<H: FileHandle>(
        &self,
        files: Option<&HashMap<String, Vec<H>>>,
    ) -> ValidationReport {
        let Some(files) = files else {
            warn!("validate called without an upload map");
            return ValidationReport {
                valid: false,
                errors: HashMap::new(),
            };
        };

        let errors: HashMap<String, Vec<FileError>> = self
            .fields
            .iter()
            .map(|(name, field)| {
                let uploads = files.get(name).map(Vec::as_slice).unwrap_or(&[]);
                (name.clone(), self.validate_field(name, field, uploads))
            })
            .collect();

        let valid = errors.values().all(Vec::is_empty);
        let error_count: usize = errors.values().map(Vec::len).sum();
        info!(
            fields = errors.len(),
            error_count,
            valid,
            "file validation finished"
        );

        ValidationReport { valid, errors }
    }

    fn validate_field<H: FileHandle>(&self, name: &str, field: &Field, uploads: &[H]) -> Vec<FileError> {
        let mut errors = Vec::new();

        if field.required && uploads.is_empty() {
            errors.push(self.error(ErrorKind::Required, Vec::new()));
        }

        if field.single_file && uploads.len() > 1 {
            debug!(field = name, count = uploads.len(), "more than one file for single-file field");
            errors.push(self.error(ErrorKind::FileSingle, Vec::new()));
            return errors;
        }

        for upload in uploads {
            let original_name = upload.file_name();
            let mut stream = match upload.open() {
                Ok(stream) => stream,
                Err(err) => {
                    warn!(field = name, file = original_name, error = %err, "failed to open upload");
                    errors.push(self.error(ErrorKind::FileFailed, vec![original_name.into()]));
                    continue;
                }
            };

            for rule in &field.rules {
                let reader: &mut dyn ReadSeek = &mut stream;
                if let Some(error) = rule.check(reader, original_name, &self.templates) {
                    debug!(field = name, file = original_name, kind = %error.kind, "rule failed");
                    errors.push(error);
                }
            }
        }

        errors
    }

    fn error(&self, kind: ErrorKind, data: Vec<ErrorArg>) -> FileError {
        FileError::from_templates(kind, &self.templates, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::models::MemoryFile;
    use crate::files::rules::{FileSize, MimeTypes};

    fn text_file(name: &str, len: usize) -> MemoryFile {
        MemoryFile::new(name, vec![b'a'; len])
    }

    #[test]
    fn test_new_requires_fields() {
        assert_eq!(FileValidator::new(None).unwrap_err(), ValidatorError::MissingFields);

        let validator = FileValidator::new(Some(HashMap::new())).unwrap();
        assert_eq!(validator.templates(), &ErrorTemplates::defaults());
    }

    #[test]
    fn test_set_error_templates_replaces_wholesale() {
        let mut validator = FileValidator::new(Some(HashMap::new())).unwrap();
        assert_eq!(
            validator.set_error_templates(None),
            Err(ValidatorError::MissingTemplates)
        );

        let mut partial = ErrorTemplates::empty();
        partial.insert(ErrorKind::Required, "Choisissez un fichier.");
        validator.set_error_templates(Some(partial)).unwrap();

        assert_eq!(validator.templates().get(ErrorKind::Required), "Choisissez un fichier.");
        assert_eq!(validator.templates().get(ErrorKind::FileSingle), "");
    }

    #[test]
    fn test_validate_without_upload_map() {
        let mut fields = HashMap::new();
        fields.insert("doc".to_string(), Field::new(true, false));
        let validator = FileValidator::new(Some(fields)).unwrap();

        let report = validator.validate::<MemoryFile>(None);
        assert!(!report.valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_required_field_missing() {
        let mut fields = HashMap::new();
        fields.insert("doc".to_string(), Field::new(true, false).rule(FileSize::new(1, 10)));
        fields.insert("optional".to_string(), Field::new(false, false));
        let validator = FileValidator::new(Some(fields)).unwrap();

        let uploads: HashMap<String, Vec<MemoryFile>> = HashMap::new();
        let report = validator.validate(Some(&uploads));

        assert!(!report.is_valid());
        assert_eq!(report.field_errors("doc").len(), 1);
        assert_eq!(report.field_errors("doc")[0].kind, ErrorKind::Required);
        assert_eq!(report.field_errors("doc")[0].render(), "Please select a file.");
        assert!(report.errors.contains_key("optional"));
        assert!(report.errors["optional"].is_empty());
    }

    #[test]
    fn test_single_file_short_circuits() {
        let mut fields = HashMap::new();
        fields.insert(
            "avatar".to_string(),
            Field::new(true, true)
                .rule(FileSize::new(1000, 2000))
                .rule(MimeTypes::new(["image/png"])),
        );
        let validator = FileValidator::new(Some(fields)).unwrap();

        let mut uploads = HashMap::new();
        uploads.insert(
            "avatar".to_string(),
            vec![text_file("a.txt", 1), text_file("b.txt", 2)],
        );
        let report = validator.validate(Some(&uploads));

        let errors = report.field_errors("avatar");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::FileSingle);
        assert!(errors[0].data.is_empty());
    }

    #[test]
    fn test_rules_accumulate_per_file() {
        let mut fields = HashMap::new();
        fields.insert(
            "docs".to_string(),
            Field::new(false, false)
                .rule(FileSize::new(10, 20))
                .rule(MimeTypes::new(["application/pdf"])),
        );
        let validator = FileValidator::new(Some(fields)).unwrap();

        let mut uploads = HashMap::new();
        uploads.insert(
            "docs".to_string(),
            vec![text_file("short.txt", 3), text_file("ok-size.txt", 15)],
        );
        let report = validator.validate(Some(&uploads));

        let kinds: Vec<ErrorKind> = report.field_errors("docs").iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![ErrorKind::FileTooSmall, ErrorKind::FileTypeBad, ErrorKind::FileTypeBad]
        );
        assert_eq!(report.error_count(), 3);
    }

    #[test]
    fn test_field_names_are_case_sensitive() {
        let mut fields = HashMap::new();
        fields.insert("Upload".to_string(), Field::new(true, false));
        let validator = FileValidator::new(Some(fields)).unwrap();

        let mut uploads = HashMap::new();
        uploads.insert("upload".to_string(), vec![text_file("a.txt", 1)]);
        let report = validator.validate(Some(&uploads));

        assert_eq!(report.field_errors("Upload")[0].kind, ErrorKind::Required);
        assert!(!report.errors.contains_key("upload"));
    }

    #[test]
    fn test_undeclared_uploads_are_ignored() {
        let mut fields = HashMap::new();
        fields.insert("doc".to_string(), Field::new(false, false));
        let validator = FileValidator::new(Some(fields)).unwrap();

        let mut uploads = HashMap::new();
        uploads.insert("other".to_string(), vec![text_file("a.txt", 1)]);
        let report = validator.validate(Some(&uploads));

        assert!(report.valid);
        assert_eq!(report.errors.len(), 1);
    }
}
