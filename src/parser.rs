use std::borrow::Cow;

use pest::{Parser, iterators::Pair};
use pest_derive::Parser;

use crate::ast::{Token, TokenSequence};
use crate::error::ParseError;

#[derive(Parser)]
#[grammar = "src/placeholder.pest"]
pub struct PlaceholderParser;

/// Split a raw property value into words and `${key}` references.
///
/// Whitespace between tokens is discarded, so `"${a}  x"` and `"${a} x"`
/// produce the same sequence.
pub fn tokenize(raw: &str) -> Result<TokenSequence<'_>, ParseError> {
    PlaceholderParser::parse_value(raw)
}

impl PlaceholderParser {
    /// Parse one property value into a list of tokens
    pub fn parse_value(input: &str) -> Result<TokenSequence<'_>, ParseError> {
        let mut pairs = PlaceholderParser::parse(Rule::value, input)?;
        let Some(value) = pairs.next() else {
            return Ok(Vec::new());
        };

        Ok(value
            .into_inner()
            .filter_map(Self::parse_token)
            .collect::<Vec<_>>())
    }

    fn parse_token(pair: Pair<Rule>) -> Option<Token> {
        match pair.as_rule() {
            Rule::placeholder => {
                let name = pair.into_inner().next()?;
                Some(Token::Reference(Cow::Borrowed(name.as_str())))
            }
            Rule::word => Some(Token::Literal(Cow::Borrowed(pair.as_str()))),
            _ => None,
        }
    }
}
