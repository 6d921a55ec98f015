use osu_schema::Seconds;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadErrorKind {
    /// Missing magic line or an inherited first timing point.
    Format,
    /// Hit objects seen before the column count is known, or a column count out of range.
    Dependency,
    /// Required fields missing once the whole chart is consumed.
    Schema,
    /// A single malformed record. The line is skipped and parsing continues.
    Line,
    /// No difficulty of the set could be loaded.
    Set,
}

impl LoadErrorKind {
    pub(crate) fn from_code(code: &'static str) -> Self {
        match code {
            "E1001" | "E1002" | "E1101" => Self::Format,
            "E2001" | "E2002" => Self::Dependency,
            "E3001" => Self::Schema,
            "E4001" | "E4002" | "E4003" | "E4004" | "E4005" => Self::Line,
            "E5001" => Self::Set,
            _ => Self::Format,
        }
    }

    pub fn is_recoverable(self) -> bool {
        self == Self::Line
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error(
    "{code}: {message} (line {line}){}",
    .file.as_deref().map(|f| format!(" in {f}")).unwrap_or_default()
)]
pub struct LoadError {
    pub code: &'static str,
    pub kind: LoadErrorKind,
    pub message: String,
    /// 1-based source line, 0 when the error is not tied to a line.
    pub line: usize,

    pub file: Option<String>,
    pub section: Option<&'static str>,
    pub column: Option<u16>,
    pub time: Option<Seconds>,
    pub missing: Vec<&'static str>,
    pub context: Option<String>,
}

impl LoadError {
    pub(crate) fn new(code: &'static str, message: impl Into<String>, line: usize) -> Self {
        Self {
            code,
            kind: LoadErrorKind::from_code(code),
            message: message.into(),
            line,

            file: None,
            section: None,
            column: None,
            time: None,
            missing: Vec::new(),
            context: None,
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_section(mut self, section: &'static str) -> Self {
        self.section = Some(section);
        self
    }

    pub fn with_column(mut self, column: u16) -> Self {
        self.column = Some(column);
        self
    }

    pub fn with_time(mut self, time: Seconds) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_missing(mut self, missing: Vec<&'static str>) -> Self {
        self.missing = missing;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}
