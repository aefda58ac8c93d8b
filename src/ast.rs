use std::borrow::Cow;
use std::fmt;

/// A single token of a property value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Literal word, copied to the output unchanged
    Literal(Cow<'a, str>),
    /// Placeholder reference: `${key}`
    Reference(Cow<'a, str>),
}

/// Tokens of one value, in source order
pub type TokenSequence<'a> = Vec<Token<'a>>;

impl<'a> Token<'a> {
    pub fn literal(text: impl Into<Cow<'a, str>>) -> Self {
        Token::Literal(text.into())
    }

    pub fn reference(key: impl Into<Cow<'a, str>>) -> Self {
        Token::Reference(key.into())
    }

    /// Detach the token from the input it was parsed from
    pub fn into_owned(self) -> Token<'static> {
        match self {
            Token::Literal(text) => Token::Literal(Cow::Owned(text.into_owned())),
            Token::Reference(key) => Token::Reference(Cow::Owned(key.into_owned())),
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Token::Literal(_))
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Literal(text) => f.write_str(text),
            Token::Reference(key) => write!(f, "${{{key}}}"),
        }
    }
}
