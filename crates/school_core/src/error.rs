use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchoolError {
    #[error("line {line}: malformed line '{content}': {reason}")]
    MalformedLine {
        line: usize,
        content: String,
        reason: String,
    },

    #[error("line {line}: duplicate school name '{name}' in '{content}'")]
    DuplicateName {
        line: usize,
        name: String,
        content: String,
    },

    #[error("line {line}: school '{origin}' not found for command '{content}'")]
    UnknownOrigin {
        line: usize,
        origin: String,
        content: String,
    },

    #[error("line {line}: school '{origin}' has no name '{name}' to split in '{content}'")]
    NameNotInOrigin {
        line: usize,
        name: String,
        origin: String,
        content: String,
    },

    #[error("line {line}: splitting '{name}' would leave school '{origin}' without names in '{content}'")]
    EmptyOrigin {
        line: usize,
        name: String,
        origin: String,
        content: String,
    },

    #[error("unknown stage label '{0}'")]
    UnknownStage(String),

    #[error("invalid ruleset: {0}")]
    InvalidRuleset(String),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("ruleset parse error: {0}")]
    RulesetParse(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SchoolError {
    /// Integrity violations and malformed input halt the run; everything else
    /// is a configuration or environment problem that can be retried.
    pub fn is_fatal(&self) -> bool {
        match self {
            SchoolError::MalformedLine { .. } => true,
            SchoolError::DuplicateName { .. } => true,
            SchoolError::UnknownOrigin { .. } => true,
            SchoolError::NameNotInOrigin { .. } => true,
            SchoolError::EmptyOrigin { .. } => true,
            _ => false,
        }
    }

    /// Source line the error points at, when it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            SchoolError::MalformedLine { line, .. }
            | SchoolError::DuplicateName { line, .. }
            | SchoolError::UnknownOrigin { line, .. }
            | SchoolError::NameNotInOrigin { line, .. }
            | SchoolError::EmptyOrigin { line, .. } => Some(*line),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SchoolError>;
