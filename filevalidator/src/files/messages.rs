//! Error kinds, message templates and renderable file errors

use serde::{ser::SerializeStruct, Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt::{self, Write};
use std::str::FromStr;

/// Stable identifiers for every validation failure. The key strings never
/// change, only the templates they resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    FileFailed,
    FileSingle,
    FileTooLarge,
    FileTooSmall,
    FileTypeBad,
    ImageOnly,
    ImageSizeMin,
    ImageSizeMax,
    Required,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 9] = [
        ErrorKind::FileFailed,
        ErrorKind::FileSingle,
        ErrorKind::FileTooLarge,
        ErrorKind::FileTooSmall,
        ErrorKind::FileTypeBad,
        ErrorKind::ImageOnly,
        ErrorKind::ImageSizeMin,
        ErrorKind::ImageSizeMax,
        ErrorKind::Required,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ErrorKind::FileFailed => "file_failed",
            ErrorKind::FileSingle => "file_single",
            ErrorKind::FileTooLarge => "file_too_large",
            ErrorKind::FileTooSmall => "file_too_small",
            ErrorKind::FileTypeBad => "file_type_bad",
            ErrorKind::ImageOnly => "image_only",
            ErrorKind::ImageSizeMin => "image_size_min",
            ErrorKind::ImageSizeMax => "image_size_max",
            ErrorKind::Required => "required",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }

    fn default_template(&self) -> &'static str {
        match self {
            ErrorKind::FileFailed => "This file failed to upload. Please retry. (%s)",
            ErrorKind::FileSingle => "Only one file upload allowed.",
            ErrorKind::FileTooLarge => "This file is too large. (%s)",
            ErrorKind::FileTooSmall => "This file is too small. (%s)",
            ErrorKind::FileTypeBad => "This type of file is not allowed. (%s) [%s]",
            ErrorKind::ImageOnly => "This file is not an image. (%s)",
            ErrorKind::ImageSizeMin => {
                "This image must be at least %d pixels wide and %d pixels high. (%s)"
            }
            ErrorKind::ImageSizeMax => {
                "This image cannot be more than %d pixels wide and %d pixels high. (%s)"
            }
            ErrorKind::Required => "Please select a file.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ErrorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| format!("Unknown error kind: {}", s))
    }
}

/// A single positional value substituted into a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorArg {
    Number(u64),
    Text(String),
}

impl fmt::Display for ErrorArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorArg::Number(n) => write!(f, "{}", n),
            ErrorArg::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ErrorArg {
    fn from(value: &str) -> Self {
        ErrorArg::Text(value.to_string())
    }
}

impl From<String> for ErrorArg {
    fn from(value: String) -> Self {
        ErrorArg::Text(value)
    }
}

impl From<u32> for ErrorArg {
    fn from(value: u32) -> Self {
        ErrorArg::Number(value as u64)
    }
}

impl From<u64> for ErrorArg {
    fn from(value: u64) -> Self {
        ErrorArg::Number(value)
    }
}

/// Template table keyed by error-kind key.
///
/// Keys that are missing resolve to an empty template, so replacing the
/// table with a partial map silently blanks the omitted kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorTemplates {
    messages: HashMap<String, String>,
}

impl ErrorTemplates {
    /// The default English templates, one per [`ErrorKind`].
    pub fn defaults() -> Self {
        let messages = ErrorKind::ALL
            .iter()
            .map(|kind| (kind.key().to_string(), kind.default_template().to_string()))
            .collect();
        Self { messages }
    }

    pub fn empty() -> Self {
        Self {
            messages: HashMap::new(),
        }
    }

    pub fn get(&self, kind: ErrorKind) -> &str {
        self.messages.get(kind.key()).map(String::as_str).unwrap_or("")
    }

    pub fn insert(&mut self, kind: ErrorKind, template: impl Into<String>) {
        self.messages.insert(kind.key().to_string(), template.into());
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.messages.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for ErrorTemplates {
    fn default() -> Self {
        Self::defaults()
    }
}

impl From<HashMap<String, String>> for ErrorTemplates {
    fn from(messages: HashMap<String, String>) -> Self {
        Self { messages }
    }
}

/// A validation failure: the template it was created from plus the data to
/// substitute. Presentation layers can look up `kind` in another language
/// table and re-render with the same `data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileError {
    pub kind: ErrorKind,
    pub template: String,
    pub data: Vec<ErrorArg>,
}

impl FileError {
    pub fn new(kind: ErrorKind, template: impl Into<String>, data: Vec<ErrorArg>) -> Self {
        Self {
            kind,
            template: template.into(),
            data,
        }
    }

    pub fn from_templates(kind: ErrorKind, templates: &ErrorTemplates, data: Vec<ErrorArg>) -> Self {
        Self::new(kind, templates.get(kind), data)
    }

    pub fn render(&self) -> String {
        render_template(&self.template, &self.data)
    }

    /// Renders the same data with a different template, e.g. a translation.
    pub fn render_with(&self, templates: &ErrorTemplates) -> String {
        render_template(templates.get(self.kind), &self.data)
    }
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl std::error::Error for FileError {}

impl Serialize for FileError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FileError", 4)?;
        state.serialize_field("kind", &self.kind)?;
        state.serialize_field("template", &self.template)?;
        state.serialize_field("data", &self.data)?;
        state.serialize_field("message", &self.render())?;
        state.end()
    }
}

/// Substitutes `data` into printf-style verbs (`%s`, `%d`, `%v`, `%q`, `%%`).
///
/// Verbs consume arguments in order unless an explicit 1-based index
/// (`%[2]d`) repositions the cursor. Flags `-` and `0`, a width and a
/// precision are honoured; `+`, `#` and space are accepted and ignored.
/// With no data the template comes back verbatim.
pub fn render_template(template: &str, data: &[ErrorArg]) -> String {
    if data.is_empty() {
        return template.to_string();
    }

    let mut out = String::with_capacity(template.len() + 16);
    let mut next = 0usize;
    let mut reordered = false;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut directive = Directive::default();
        let mut raw = String::from('%');
        let mut bad_index = false;

        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => directive.left = true,
                '0' => directive.zero = true,
                '+' | '#' | ' ' => {}
                _ => break,
            }
            raw.push(flag);
            chars.next();
        }

        if let Some(index) = parse_index(&mut chars, &mut raw, data.len()) {
            reordered = true;
            match index {
                Ok(index) => next = index,
                Err(()) => bad_index = true,
            }
        }

        directive.width = parse_number(&mut chars, &mut raw);
        if chars.next_if_eq(&'.').is_some() {
            raw.push('.');
            directive.precision = Some(parse_number(&mut chars, &mut raw).unwrap_or(0));
        }

        if let Some(index) = parse_index(&mut chars, &mut raw, data.len()) {
            reordered = true;
            match index {
                Ok(index) => next = index,
                Err(()) => bad_index = true,
            }
        }

        match chars.next() {
            None => out.push_str("%!(NOVERB)"),
            Some('%') => out.push('%'),
            Some(verb @ ('s' | 'd' | 'v' | 'q')) if bad_index => {
                let _ = write!(out, "%!{}(BADINDEX)", verb);
            }
            Some(verb @ ('s' | 'd' | 'v' | 'q')) => match data.get(next) {
                Some(arg) => {
                    next += 1;
                    directive.write(&mut out, verb, arg);
                }
                None => {
                    let _ = write!(out, "%!{}(MISSING)", verb);
                }
            },
            Some(other) => {
                out.push_str(&raw);
                out.push(other);
            }
        }
    }

    if !reordered && next < data.len() {
        let extra: Vec<String> = data[next..].iter().map(ErrorArg::to_string).collect();
        let _ = write!(out, "%!(EXTRA {})", extra.join(", "));
    }

    out
}

// Width and precision beyond this are clamped.
const MAX_PAD: usize = 1_000_000;

#[derive(Debug, Default)]
struct Directive {
    left: bool,
    zero: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

impl Directive {
    fn write(&self, out: &mut String, verb: char, arg: &ErrorArg) {
        let body = match (arg, verb) {
            (ErrorArg::Number(n), _) => match self.precision {
                Some(digits) => format!("{:0>width$}", n, width = digits.min(MAX_PAD)),
                None => n.to_string(),
            },
            (ErrorArg::Text(text), 'q') => format!("{:?}", self.truncate(text)),
            (ErrorArg::Text(text), _) => self.truncate(text).to_string(),
        };

        let len = body.chars().count();
        let pad = self.width.unwrap_or(0).min(MAX_PAD).saturating_sub(len);
        if self.left {
            out.push_str(&body);
            out.extend(std::iter::repeat(' ').take(pad));
        } else {
            let fill = if self.zero { '0' } else { ' ' };
            out.extend(std::iter::repeat(fill).take(pad));
            out.push_str(&body);
        }
    }

    fn truncate<'a>(&self, text: &'a str) -> &'a str {
        match self.precision.and_then(|p| text.char_indices().nth(p)) {
            Some((end, _)) => &text[..end],
            None => text,
        }
    }
}

fn parse_number(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    raw: &mut String,
) -> Option<usize> {
    let mut value: Option<usize> = None;
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        raw.push(c);
        let digit = c.to_digit(10).unwrap_or(0) as usize;
        value = Some(value.unwrap_or(0).saturating_mul(10).saturating_add(digit));
    }
    value
}

/// Parses `[n]`, returning the zero-based index or `Err` when it is out of
/// range or malformed. `None` when no bracket follows.
fn parse_index(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    raw: &mut String,
    len: usize,
) -> Option<Result<usize, ()>> {
    chars.next_if_eq(&'[')?;
    raw.push('[');
    let number = parse_number(chars, raw);
    if chars.next_if_eq(&']').is_none() {
        for c in chars.by_ref() {
            raw.push(c);
            if c == ']' {
                break;
            }
        }
        return Some(Err(()));
    }
    raw.push(']');
    match number {
        Some(n) if n >= 1 && n <= len => Some(Ok(n - 1)),
        _ => Some(Err(())),
    }
}
