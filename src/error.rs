use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::loader::Rule as PropertiesRule;
use crate::parser::Rule;

/// A value that is neither words nor well-formed placeholders
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ParseError(Box<pest::error::Error<Rule>>);

impl ParseError {
    /// Line and column (1-based) where tokenizing stopped
    pub fn line_col(&self) -> (usize, usize) {
        match self.0.line_col {
            pest::error::LineColLocation::Pos(pos) => pos,
            pest::error::LineColLocation::Span(start, _) => start,
        }
    }
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        Self(Box::new(err))
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("cannot parse value of `{key}` ({value:?}): {source}")]
    Parse {
        key: String,
        value: String,
        #[source]
        source: ParseError,
    },

    #[error("`{requesting_key}` references undefined key `{missing_key}`")]
    UndefinedReference {
        requesting_key: String,
        missing_key: String,
    },

    #[error("resolving `{key}`: cyclic reference {}", format_cycle(.cycle))]
    CyclicReference { key: String, cycle: Vec<String> },

    #[error("resolving `{key}` exceeded the maximum reference depth of {limit}")]
    DepthExceeded { key: String, limit: usize },
}

impl ResolveError {
    /// Key whose resolution failed
    pub fn key(&self) -> &str {
        match self {
            ResolveError::Parse { key, .. }
            | ResolveError::CyclicReference { key, .. }
            | ResolveError::DepthExceeded { key, .. } => key,
            ResolveError::UndefinedReference { requesting_key, .. } => requesting_key,
        }
    }
}

fn format_cycle(cycle: &[String]) -> String {
    match cycle.first() {
        Some(first) => format!("{} -> {first}", cycle.join(" -> ")),
        None => String::new(),
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("`{name}` is neither a file nor a bundled resource")]
    NotFound { name: String },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed properties in `{name}`: {source}")]
    Syntax {
        name: String,
        #[source]
        source: Box<pest::error::Error<PropertiesRule>>,
    },
}
