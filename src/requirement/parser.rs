//! Hand-written recursive descent parser for requirement and marker strings.

use super::marker::{MarkerExpression, MarkerOperator, MarkerTree, MarkerValue, MarkerVariable};
use super::Requirement;
use crate::error::RequirementParseError;
use crate::version::{Operator, Specifier, SpecifierSet};
use std::collections::BTreeSet;

type ParseResult<T> = Result<T, RequirementParseError>;

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Skip whitespace, reporting whether any was consumed.
    fn eat_whitespace(&mut self) -> bool {
        let start = self.pos;
        self.take_while(char::is_whitespace);
        self.pos > start
    }

    fn eat_char(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    /// Consume `word` only when it is not the prefix of a longer identifier.
    fn eat_keyword(&mut self, word: &str) -> bool {
        let rest = self.rest();
        if !rest.starts_with(word) {
            return false;
        }
        let boundary = rest[word.len()..]
            .chars()
            .next()
            .is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'));
        if boundary {
            self.pos += word.len();
        }
        boundary
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn error(&self, message: impl Into<String>) -> RequirementParseError {
        RequirementParseError::new(self.input, self.pos, message)
    }
}

pub(crate) fn parse_requirement(input: &str) -> ParseResult<Requirement> {
    let mut cursor = Cursor::new(input);
    cursor.eat_whitespace();

    let name = parse_identifier(
        &mut cursor,
        "Expected package name at the start of dependency specifier",
    )?;
    cursor.eat_whitespace();

    let extras = parse_extras(&mut cursor)?;
    cursor.eat_whitespace();

    let (specifier, url) = if cursor.eat_char('@') {
        cursor.eat_whitespace();
        let url = cursor.take_while(|c| !c.is_whitespace());
        if url.is_empty() {
            return Err(cursor.error("Expected URL after @"));
        }
        let spaced = cursor.eat_whitespace();
        if !cursor.at_end() && !spaced {
            return Err(cursor.error("Expected whitespace after URL"));
        }
        (SpecifierSet::new(), Some(url.to_string()))
    } else {
        (parse_specifier(&mut cursor)?, None)
    };
    cursor.eat_whitespace();

    let marker = if cursor.eat_char(';') {
        cursor.eat_whitespace();
        let marker = parse_marker_or(&mut cursor)?;
        cursor.eat_whitespace();
        Some(marker)
    } else {
        None
    };

    if !cursor.at_end() {
        let message = if url.is_none() && specifier.is_empty() && marker.is_none() {
            "Expected end or semicolon (after name and no valid version specifier)"
        } else {
            "Expected end or semicolon"
        };
        return Err(cursor.error(message));
    }

    Ok(Requirement {
        name: name.to_string(),
        extras,
        specifier,
        url,
        marker,
    })
}

/// `[A-Za-z0-9]([A-Za-z0-9._-]*[A-Za-z0-9])?`
fn parse_identifier<'a>(cursor: &mut Cursor<'a>, expected: &str) -> ParseResult<&'a str> {
    if !cursor.peek().is_some_and(|c| c.is_ascii_alphanumeric()) {
        return Err(cursor.error(expected));
    }
    let start = cursor.pos;
    let ident = cursor.take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    let trimmed = ident.trim_end_matches(['.', '_', '-']);
    cursor.pos = start + trimmed.len();
    Ok(trimmed)
}

fn parse_extras(cursor: &mut Cursor<'_>) -> ParseResult<BTreeSet<String>> {
    let mut extras = BTreeSet::new();
    if !cursor.eat_char('[') {
        return Ok(extras);
    }
    cursor.eat_whitespace();
    if cursor.eat_char(']') {
        return Ok(extras);
    }

    loop {
        let extra = parse_identifier(cursor, "Expected extra name")?;
        extras.insert(extra.to_string());
        cursor.eat_whitespace();
        if cursor.eat_char(',') {
            cursor.eat_whitespace();
            continue;
        }
        if cursor.eat_char(']') {
            return Ok(extras);
        }
        return Err(cursor.error("Expected comma between extra names or closing bracket"));
    }
}

fn parse_specifier(cursor: &mut Cursor<'_>) -> ParseResult<SpecifierSet> {
    if cursor.eat_char('(') {
        cursor.eat_whitespace();
        let set = parse_version_many(cursor)?;
        cursor.eat_whitespace();
        if !cursor.eat_char(')') {
            return Err(cursor.error(
                "Expected matching RIGHT_PARENTHESIS for LEFT_PARENTHESIS, after version specifier",
            ));
        }
        Ok(set)
    } else {
        parse_version_many(cursor)
    }
}

fn parse_version_many(cursor: &mut Cursor<'_>) -> ParseResult<SpecifierSet> {
    let mut specifiers = Vec::new();
    if Operator::parse_prefix(cursor.rest()).is_none() {
        return Ok(SpecifierSet::new());
    }

    loop {
        let start = cursor.pos;
        let Some((operator, len)) = Operator::parse_prefix(cursor.rest()) else {
            return Err(cursor.error("Expected version specifier after comma"));
        };
        cursor.pos += len;
        cursor.eat_whitespace();
        let version = cursor.take_while(|c| !c.is_whitespace() && !matches!(c, ',' | ';' | ')'));
        if version.is_empty() {
            return Err(cursor.error("Expected version after operator"));
        }
        let text = format!("{}{}", operator, version);
        let specifier: Specifier = text.parse().map_err(|e| {
            RequirementParseError::new(cursor.input, start, format!("{}", e))
        })?;
        specifiers.push(specifier);

        cursor.eat_whitespace();
        if !cursor.eat_char(',') {
            break;
        }
        cursor.eat_whitespace();
    }

    Ok(specifiers.into_iter().collect())
}

pub(crate) fn parse_marker(input: &str) -> ParseResult<MarkerTree> {
    let mut cursor = Cursor::new(input);
    cursor.eat_whitespace();
    let tree = parse_marker_or(&mut cursor)?;
    cursor.eat_whitespace();
    if !cursor.at_end() {
        return Err(cursor.error("Expected end of marker expression"));
    }
    Ok(tree)
}

fn parse_marker_or(cursor: &mut Cursor<'_>) -> ParseResult<MarkerTree> {
    let mut terms = vec![parse_marker_and(cursor)?];
    loop {
        let save = cursor.pos;
        cursor.eat_whitespace();
        if cursor.eat_keyword("or") {
            cursor.eat_whitespace();
            terms.push(parse_marker_and(cursor)?);
        } else {
            cursor.pos = save;
            break;
        }
    }
    Ok(if terms.len() == 1 {
        terms.remove(0)
    } else {
        MarkerTree::Or(terms)
    })
}

fn parse_marker_and(cursor: &mut Cursor<'_>) -> ParseResult<MarkerTree> {
    let mut terms = vec![parse_marker_atom(cursor)?];
    loop {
        let save = cursor.pos;
        cursor.eat_whitespace();
        if cursor.eat_keyword("and") {
            cursor.eat_whitespace();
            terms.push(parse_marker_atom(cursor)?);
        } else {
            cursor.pos = save;
            break;
        }
    }
    Ok(if terms.len() == 1 {
        terms.remove(0)
    } else {
        MarkerTree::And(terms)
    })
}

fn parse_marker_atom(cursor: &mut Cursor<'_>) -> ParseResult<MarkerTree> {
    cursor.eat_whitespace();
    if cursor.eat_char('(') {
        cursor.eat_whitespace();
        let tree = parse_marker_or(cursor)?;
        cursor.eat_whitespace();
        if !cursor.eat_char(')') {
            return Err(cursor.error(
                "Expected matching RIGHT_PARENTHESIS for LEFT_PARENTHESIS, after marker expression",
            ));
        }
        return Ok(tree);
    }

    let lhs = parse_marker_value(cursor)?;
    cursor.eat_whitespace();
    let op = parse_marker_op(cursor)?;
    cursor.eat_whitespace();
    let rhs = parse_marker_value(cursor)?;
    Ok(MarkerTree::Expression(MarkerExpression { lhs, op, rhs }))
}

fn parse_marker_value(cursor: &mut Cursor<'_>) -> ParseResult<MarkerValue> {
    match cursor.peek() {
        Some(quote @ ('"' | '\'')) => {
            cursor.eat_char(quote);
            let value = cursor.take_while(|c| c != quote);
            if !cursor.eat_char(quote) {
                return Err(cursor.error("Unterminated quoted string"));
            }
            Ok(MarkerValue::Literal(value.to_string()))
        }
        _ => {
            let start = cursor.pos;
            let word = cursor.take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.'));
            match MarkerVariable::from_name(word) {
                Some(variable) => Ok(MarkerValue::Variable(variable)),
                None => {
                    cursor.pos = start;
                    Err(cursor.error("Expected a marker variable or quoted string"))
                }
            }
        }
    }
}

fn parse_marker_op(cursor: &mut Cursor<'_>) -> ParseResult<MarkerOperator> {
    if cursor.eat_keyword("in") {
        return Ok(MarkerOperator::In);
    }
    let save = cursor.pos;
    if cursor.eat_keyword("not") {
        cursor.eat_whitespace();
        if cursor.eat_keyword("in") {
            return Ok(MarkerOperator::NotIn);
        }
        cursor.pos = save;
        return Err(cursor.error("Expected 'in' after 'not'"));
    }
    if let Some((operator, len)) = Operator::parse_prefix(cursor.rest()) {
        cursor.pos += len;
        return Ok(MarkerOperator::Version(operator));
    }
    // legacy `extra="name"` spelling
    if cursor.eat_char('=') {
        return Ok(MarkerOperator::Version(Operator::Equal));
    }
    Err(cursor.error("Expected marker operator, one of <=, <, !=, ==, >=, >, ~=, ===, in, not in"))
}
