mod common;

use filevalidator::{
    DiskFile, ErrorArg, ErrorKind, ErrorTemplates, Field, FileSize, FileValidator, MaxPixelSize,
    MemoryFile, MimeTypes, MinPixelSize,
};
use std::collections::HashMap;

fn image_field() -> Field {
    Field::new(true, false)
        .rule(FileSize::new(100, 100_000))
        .rule(MimeTypes::new(["image/png", "image/jpeg"]))
        .rule(MinPixelSize::new(100, 100))
        .rule(MaxPixelSize::new(500, 500))
}

fn uploads(entries: Vec<(&str, MemoryFile)>) -> HashMap<String, Vec<MemoryFile>> {
    let mut map: HashMap<String, Vec<MemoryFile>> = HashMap::new();
    for (field, file) in entries {
        map.entry(field.to_string()).or_default().push(file);
    }
    map
}

#[test]
fn test_valid_form_has_no_errors() {
    let mut fields = HashMap::new();
    fields.insert("imageupload".to_string(), image_field());
    fields.insert(
        "fileupload".to_string(),
        Field::new(true, true)
            .rule(FileSize::new(100, 100_000))
            .rule(MimeTypes::new(["application/x-gzip"])),
    );
    fields.insert("missingupload".to_string(), Field::new(false, true));

    let validator = FileValidator::new(Some(fields)).expect("Failed to build validator");

    let png = common::png(250, 340);
    assert!((100..=100_000).contains(&png.len()));

    let files = uploads(vec![
        ("imageupload", MemoryFile::new("gopher.png", png)),
        ("imageupload", MemoryFile::new("blue.jpg", common::jpeg(200, 200))),
        ("fileupload", MemoryFile::new("car.tar.gz", common::gzip_like(2048))),
    ]);

    let report = validator.validate(Some(&files));

    for (field, errors) in &report.errors {
        for error in errors {
            panic!("{}: {}", field, error);
        }
    }
    assert!(report.valid);
    assert_eq!(report.errors.len(), 3);
    assert!(report.errors["missingupload"].is_empty());
}

#[test]
fn test_image_too_small() {
    let mut fields = HashMap::new();
    fields.insert(
        "imageupload".to_string(),
        image_field().rule(MinPixelSize::new(400, 400)),
    );
    let validator = FileValidator::new(Some(fields)).unwrap();

    let files = uploads(vec![("imageupload", MemoryFile::new("gopher.png", common::png(250, 340)))]);
    let report = validator.validate(Some(&files));

    assert!(!report.valid);
    let errors = report.field_errors("imageupload");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::ImageSizeMin);
    assert_eq!(
        errors[0].data,
        vec![
            ErrorArg::Number(400),
            ErrorArg::Number(400),
            ErrorArg::Text("gopher.png".to_string())
        ]
    );
    assert_eq!(
        errors[0].render(),
        "This image must be at least 400 pixels wide and 400 pixels high. (gopher.png)"
    );
}

#[test]
fn test_wrong_mime_type() {
    let mut fields = HashMap::new();
    fields.insert(
        "upload".to_string(),
        Field::new(false, false).rule(MimeTypes::new(["application/zip", "text/html"])),
    );
    let validator = FileValidator::new(Some(fields)).unwrap();

    let files = uploads(vec![("upload", MemoryFile::new("gopher.png", common::png(20, 20)))]);
    let report = validator.validate(Some(&files));

    let errors = report.field_errors("upload");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::FileTypeBad);
    assert_eq!(
        errors[0].data,
        vec![
            ErrorArg::Text("gopher.png".to_string()),
            ErrorArg::Text("image/png".to_string())
        ]
    );
}

#[test]
fn test_every_failing_rule_is_reported() {
    let mut fields = HashMap::new();
    fields.insert("imageupload".to_string(), image_field());
    let validator = FileValidator::new(Some(fields)).unwrap();

    // tiny text file posing as an image fails all four rules
    let files = uploads(vec![("imageupload", MemoryFile::new("fake.png", b"hello".to_vec()))]);
    let report = validator.validate(Some(&files));

    let kinds: Vec<ErrorKind> = report
        .field_errors("imageupload")
        .iter()
        .map(|e| e.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            ErrorKind::FileTooSmall,
            ErrorKind::FileTypeBad,
            ErrorKind::ImageOnly,
            ErrorKind::ImageOnly
        ]
    );
}

#[test]
fn test_single_file_field_ignores_rules() {
    let mut fields = HashMap::new();
    fields.insert("avatar".to_string(), image_field());
    fields.insert(
        "single".to_string(),
        Field::new(true, true)
            .rule(FileSize::new(1_000_000, 2_000_000))
            .rule(MinPixelSize::new(5000, 5000)),
    );
    let validator = FileValidator::new(Some(fields)).unwrap();

    let files = uploads(vec![
        ("single", MemoryFile::new("a.txt", b"a".to_vec())),
        ("single", MemoryFile::new("b.txt", b"b".to_vec())),
        ("single", MemoryFile::new("c.txt", b"c".to_vec())),
    ]);
    let report = validator.validate(Some(&files));

    let errors = report.field_errors("single");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::FileSingle);
    assert_eq!(errors[0].render(), "Only one file upload allowed.");

    let avatar = report.field_errors("avatar");
    assert_eq!(avatar.len(), 1);
    assert_eq!(avatar[0].kind, ErrorKind::Required);
}

#[test]
fn test_gif_and_jpeg_dimensions() {
    let mut fields = HashMap::new();
    fields.insert(
        "pictures".to_string(),
        Field::new(false, false)
            .rule(MinPixelSize::new(50, 50))
            .rule(MaxPixelSize::new(120, 120)),
    );
    let validator = FileValidator::new(Some(fields)).unwrap();

    let files = uploads(vec![
        ("pictures", MemoryFile::new("ok.gif", common::gif(60, 60))),
        ("pictures", MemoryFile::new("wide.JPEG", common::jpeg(200, 80))),
        ("pictures", MemoryFile::new("short.gif", common::gif(80, 10))),
    ]);
    let report = validator.validate(Some(&files));

    let errors = report.field_errors("pictures");
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].kind, ErrorKind::ImageSizeMax);
    assert_eq!(errors[0].data[2], ErrorArg::Text("wide.JPEG".to_string()));
    assert_eq!(errors[1].kind, ErrorKind::ImageSizeMin);
    assert_eq!(errors[1].data[2], ErrorArg::Text("short.gif".to_string()));
}

#[test]
fn test_custom_templates() {
    let mut fields = HashMap::new();
    fields.insert("doc".to_string(), Field::new(true, false));
    let mut validator = FileValidator::new(Some(fields)).unwrap();

    let mut templates = ErrorTemplates::empty();
    templates.insert(ErrorKind::Required, "Veuillez choisir un fichier.");
    validator.set_error_templates(Some(templates)).unwrap();

    let files: HashMap<String, Vec<MemoryFile>> = HashMap::new();
    let report = validator.validate(Some(&files));

    let error = &report.field_errors("doc")[0];
    assert_eq!(error.kind, ErrorKind::Required);
    assert_eq!(error.render(), "Veuillez choisir un fichier.");
    assert_eq!(
        error.render_with(&ErrorTemplates::defaults()),
        "Please select a file."
    );
}

#[test]
fn test_disk_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("upload-1");
    std::fs::write(&path, common::png(150, 150)).unwrap();

    let mut fields = HashMap::new();
    fields.insert("imageupload".to_string(), image_field());
    let validator = FileValidator::new(Some(fields)).unwrap();

    let mut files = HashMap::new();
    files.insert(
        "imageupload".to_string(),
        vec![
            DiskFile::with_file_name(&path, "photo.png"),
            DiskFile::with_file_name(dir.path().join("gone"), "missing.png"),
        ],
    );
    let report = validator.validate(Some(&files));

    let errors = report.field_errors("imageupload");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::FileFailed);
    assert_eq!(errors[0].render(), "This file failed to upload. Please retry. (missing.png)");
}

#[test]
fn test_report_serializes_per_field() {
    let mut fields = HashMap::new();
    fields.insert("doc".to_string(), Field::new(true, false));
    fields.insert("extra".to_string(), Field::new(false, false));
    let validator = FileValidator::new(Some(fields)).unwrap();

    let files: HashMap<String, Vec<MemoryFile>> = HashMap::new();
    let json = serde_json::to_value(validator.validate(Some(&files))).unwrap();

    assert_eq!(json["valid"], false);
    assert_eq!(json["errors"]["doc"][0]["kind"], "required");
    assert_eq!(json["errors"]["doc"][0]["message"], "Please select a file.");
    assert_eq!(json["errors"]["extra"], serde_json::json!([]));
}
