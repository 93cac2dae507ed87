//! Equality predicates, association expressions and sort keys
//!
//! Association relations are declared with a small expression language:
//!
//! ```text
//! project = ${id} and status = 'open' && archived = false
//! ```
//!
//! Each condition compares a field of the target table with either a literal
//! or a `${path}` placeholder read from the source record. [`PredicateExpr`]
//! is the parsed form, [`PredicateExpr::bind`] substitutes placeholders and
//! yields a [`Predicate`] the store can execute.

use crate::value::Value;
use nom::{
	IResult, Parser,
	branch::alt,
	bytes::complete::{tag, take_while},
	character::complete::{char, digit1, multispace0, satisfy},
	combinator::{map, map_res, opt, recognize},
	sequence::{delimited, pair},
};
use thiserror::Error;

/// Errors raised while parsing an association expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredicateError {
	#[error("empty predicate expression")]
	Empty,

	#[error("unexpected end of expression, expected {expected}")]
	UnexpectedEnd { expected: &'static str },

	#[error("unexpected `{found}` at offset {offset}, expected {expected}")]
	UnexpectedToken {
		offset: usize,
		found: String,
		expected: &'static str,
	},

	#[error("unterminated string literal starting at offset {0}")]
	UnterminatedString(usize),

	#[error("unterminated placeholder starting at offset {0}")]
	UnterminatedPlaceholder(usize),
}

/// One `field = value` equality test
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Condition {
	pub field: String,
	pub value: Value,
}

/// Conjunction of equality conditions; empty matches every record
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Predicate {
	conditions: Vec<Condition>,
}

impl Predicate {
	/// Predicate matching every record
	pub fn all() -> Self {
		Self::default()
	}

	/// Add a `field = value` condition
	///
	/// # Examples
	///
	/// ```
	/// use beanloader_core::{Predicate, Value};
	///
	/// let predicate = Predicate::all().eq("owner", 1).eq("status", "open");
	/// assert_eq!(predicate.conditions().len(), 2);
	/// assert!(predicate.matches(|field| match field {
	///     "owner" => Value::from(1),
	///     _ => Value::from("open"),
	/// }));
	/// ```
	pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
		self.conditions.push(Condition {
			field: field.into(),
			value: value.into(),
		});
		self
	}

	pub fn conditions(&self) -> &[Condition] {
		&self.conditions
	}

	/// Evaluate against a record whose fields are read through `read`
	///
	/// A multi-valued field matches when any of its values equals the
	/// condition's value.
	pub fn matches(&self, mut read: impl FnMut(&str) -> Value) -> bool {
		self.conditions.iter().all(|condition| {
			match read(&condition.field) {
				Value::List(items) if !matches!(condition.value, Value::List(_)) => {
					items.contains(&condition.value)
				}
				value => value == condition.value,
			}
		})
	}
}

/// Right-hand side of a parsed condition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
	Literal(Value),
	/// `${path}` read from the source record
	Placeholder(String),
}

/// A parsed association expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PredicateExpr {
	terms: Vec<(String, Operand)>,
}

impl PredicateExpr {
	/// Parse an association expression
	///
	/// # Examples
	///
	/// ```
	/// use beanloader_core::{Operand, PredicateExpr, Value};
	///
	/// let expr = PredicateExpr::parse("project = ${id} and status = 'open'").unwrap();
	/// assert_eq!(expr.placeholders().collect::<Vec<_>>(), vec!["id"]);
	///
	/// let predicate = expr.bind(|_path| Ok::<_, ()>(Value::from(7))).unwrap();
	/// assert_eq!(predicate.conditions()[0].value, Value::from(7));
	/// ```
	pub fn parse(input: &str) -> Result<Self, PredicateError> {
		let tokens = tokenize(input)?;
		if tokens.is_empty() {
			return Err(PredicateError::Empty);
		}

		let mut terms = Vec::new();
		let mut iter = tokens.into_iter().peekable();
		loop {
			let field = match iter.next() {
				Some((_, Token::Ident(name))) => name,
				Some((offset, other)) => {
					return Err(unexpected(offset, &other, "field name"));
				}
				None => return Err(PredicateError::UnexpectedEnd { expected: "field name" }),
			};
			match iter.next() {
				Some((_, Token::Equals)) => {}
				Some((offset, other)) => return Err(unexpected(offset, &other, "`=`")),
				None => return Err(PredicateError::UnexpectedEnd { expected: "`=`" }),
			}
			let operand = match iter.next() {
				Some((_, Token::Placeholder(path))) => Operand::Placeholder(path),
				Some((_, Token::Literal(value))) => Operand::Literal(value),
				Some((_, Token::Ident(word))) => Operand::Literal(keyword_literal(&word)?),
				Some((offset, other)) => return Err(unexpected(offset, &other, "value")),
				None => return Err(PredicateError::UnexpectedEnd { expected: "value" }),
			};
			terms.push((field, operand));

			match iter.next() {
				None => break,
				Some((_, Token::And)) => {}
				Some((offset, other)) => return Err(unexpected(offset, &other, "`and`")),
			}
		}

		Ok(Self { terms })
	}

	/// Paths referenced by `${...}` placeholders, in order of appearance
	pub fn placeholders(&self) -> impl Iterator<Item = &str> {
		self.terms.iter().filter_map(|(_, operand)| match operand {
			Operand::Placeholder(path) => Some(path.as_str()),
			Operand::Literal(_) => None,
		})
	}

	pub fn terms(&self) -> &[(String, Operand)] {
		&self.terms
	}

	/// Substitute placeholders with values read through `read`
	///
	/// A condition whose placeholder reads `Null` is dropped from the
	/// resulting predicate.
	pub fn bind<E>(
		&self,
		mut read: impl FnMut(&str) -> Result<Value, E>,
	) -> Result<Predicate, E> {
		let mut predicate = Predicate::all();
		for (field, operand) in &self.terms {
			let value = match operand {
				Operand::Literal(value) => value.clone(),
				Operand::Placeholder(path) => match read(path)? {
					Value::Null => continue,
					value => value,
				},
			};
			predicate = predicate.eq(field.clone(), value);
		}
		Ok(predicate)
	}
}

/// Ordering applied to the records of a to-many relation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
	pub path: String,
	pub ascending: bool,
}

impl SortKey {
	pub fn asc(path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			ascending: true,
		}
	}

	pub fn desc(path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			ascending: false,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
	Ident(String),
	Equals,
	And,
	Literal(Value),
	Placeholder(String),
}

impl Token {
	fn describe(&self) -> String {
		match self {
			Token::Ident(name) => name.clone(),
			Token::Equals => "=".to_string(),
			Token::And => "and".to_string(),
			Token::Literal(value) => value.to_string(),
			Token::Placeholder(path) => format!("${{{}}}", path),
		}
	}
}

fn unexpected(offset: usize, token: &Token, expected: &'static str) -> PredicateError {
	PredicateError::UnexpectedToken {
		offset,
		found: token.describe(),
		expected,
	}
}

fn keyword_literal(word: &str) -> Result<Value, PredicateError> {
	match word {
		"true" => Ok(Value::Bool(true)),
		"false" => Ok(Value::Bool(false)),
		"null" => Ok(Value::Null),
		other => Ok(Value::Text(other.to_string())),
	}
}

fn is_ident_start(c: char) -> bool {
	c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// `${path}`, the path trimmed
fn placeholder(input: &str) -> IResult<&str, Token> {
	map(
		delimited(tag("${"), take_while(|c: char| c != '}'), char('}')),
		|path: &str| Token::Placeholder(path.trim().to_string()),
	)
	.parse(input)
}

/// `'text'` or `"text"`, without escapes
fn quoted(input: &str) -> IResult<&str, Token> {
	map(
		alt((
			delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
			delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
		)),
		|text: &str| Token::Literal(Value::Text(text.to_string())),
	)
	.parse(input)
}

/// Integer, or float when it has a fractional part or overflows `i64`
fn number(input: &str) -> IResult<&str, Token> {
	map_res(
		recognize(pair(pair(opt(char('-')), digit1), opt(pair(char('.'), digit1)))),
		|literal: &str| {
			literal
				.parse::<i64>()
				.map(Value::Int)
				.or_else(|_| literal.parse::<f64>().map(Value::Float))
				.map(Token::Literal)
		},
	)
	.parse(input)
}

/// Field name, keyword operand or the word `and` in any case
fn word(input: &str) -> IResult<&str, Token> {
	map(
		recognize(pair(satisfy(is_ident_start), take_while(is_ident_char))),
		|word: &str| {
			if word.eq_ignore_ascii_case("and") {
				Token::And
			} else {
				Token::Ident(word.to_string())
			}
		},
	)
	.parse(input)
}

fn token(input: &str) -> IResult<&str, Token> {
	alt((
		placeholder,
		quoted,
		number,
		map(tag("&&"), |_| Token::And),
		map(char('='), |_| Token::Equals),
		word,
	))
	.parse(input)
}

/// Why no token starts at `rest`
fn lex_error(offset: usize, rest: &str) -> PredicateError {
	if rest.starts_with("${") {
		PredicateError::UnterminatedPlaceholder(offset)
	} else if rest.starts_with(['\'', '"']) {
		PredicateError::UnterminatedString(offset)
	} else {
		PredicateError::UnexpectedToken {
			offset,
			found: rest.chars().next().map(String::from).unwrap_or_default(),
			expected: "token",
		}
	}
}

/// Split `input` into tokens paired with their byte offset
fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, PredicateError> {
	let mut tokens = Vec::new();
	let mut rest = input;
	loop {
		if let Ok((after, _)) = multispace0::<&str, nom::error::Error<&str>>(rest) {
			rest = after;
		}
		if rest.is_empty() {
			return Ok(tokens);
		}
		let offset = input.len() - rest.len();
		match token(rest) {
			Ok((after, token)) => {
				tokens.push((offset, token));
				rest = after;
			}
			Err(_) => return Err(lex_error(offset, rest)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_parse_mixed_operands() {
		let expr =
			PredicateExpr::parse("project = ${id} and status = 'open' && weight = 2.5 AND done = false")
				.unwrap();
		assert_eq!(
			expr.terms(),
			&[
				("project".to_string(), Operand::Placeholder("id".to_string())),
				("status".to_string(), Operand::Literal(Value::from("open"))),
				("weight".to_string(), Operand::Literal(Value::Float(2.5))),
				("done".to_string(), Operand::Literal(Value::Bool(false))),
			]
		);
	}

	#[rstest]
	fn test_bind_drops_null_placeholders() {
		let expr = PredicateExpr::parse("owner = ${owner} and team = ${team.id}").unwrap();
		let predicate = expr
			.bind(|path| {
				Ok::<_, ()>(match path {
					"owner" => Value::Null,
					_ => Value::from(9),
				})
			})
			.unwrap();
		assert_eq!(
			predicate.conditions(),
			&[Condition {
				field: "team".to_string(),
				value: Value::from(9),
			}]
		);
	}

	#[rstest]
	fn test_bind_propagates_read_errors() {
		let expr = PredicateExpr::parse("owner = ${owner}").unwrap();
		let result = expr.bind(|_| Err::<Value, _>("boom"));
		assert_eq!(result, Err("boom"));
	}

	#[rstest]
	#[case("", PredicateError::Empty)]
	#[case("owner =", PredicateError::UnexpectedEnd { expected: "value" })]
	#[case("owner = ${id", PredicateError::UnterminatedPlaceholder(8))]
	#[case("owner = 'x", PredicateError::UnterminatedString(8))]
	fn test_parse_errors(#[case] input: &str, #[case] expected: PredicateError) {
		assert_eq!(PredicateExpr::parse(input), Err(expected));
	}

	#[rstest]
	#[case("owner = #", 8, "#")]
	#[case("owner = 1 & done = true", 10, "&")]
	#[case("-x = 1", 0, "-")]
	fn test_parse_rejects_stray_characters(#[case] input: &str, #[case] offset: usize, #[case] found: &str) {
		assert_eq!(
			PredicateExpr::parse(input),
			Err(PredicateError::UnexpectedToken {
				offset,
				found: found.to_string(),
				expected: "token",
			})
		);
	}

	#[rstest]
	fn test_parse_whitespace_and_numbers() {
		let expr = PredicateExpr::parse("\tlevel=-3&&ratio = 0.25\n and  owner = ${ manager.id }  ").unwrap();
		assert_eq!(
			expr.terms(),
			&[
				("level".to_string(), Operand::Literal(Value::Int(-3))),
				("ratio".to_string(), Operand::Literal(Value::Float(0.25))),
				("owner".to_string(), Operand::Placeholder("manager.id".to_string())),
			]
		);
	}

	#[rstest]
	fn test_parse_keywords_and_bare_words() {
		let expr = PredicateExpr::parse("kind = \"a b\" and flag = true and state = open and gone = null").unwrap();
		let operands: Vec<_> = expr.terms().iter().map(|(_, operand)| operand.clone()).collect();
		assert_eq!(
			operands,
			vec![
				Operand::Literal(Value::from("a b")),
				Operand::Literal(Value::Bool(true)),
				Operand::Literal(Value::from("open")),
				Operand::Literal(Value::Null),
			]
		);
	}

	#[rstest]
	fn test_parse_rejects_missing_conjunction() {
		let err = PredicateExpr::parse("a = 1 b = 2").unwrap_err();
		assert!(matches!(err, PredicateError::UnexpectedToken { expected: "`and`", .. }));
	}

	#[rstest]
	fn test_matches_multi_valued_field() {
		let predicate = Predicate::all().eq("tags", "red");
		assert!(predicate.matches(|_| Value::List(vec![Value::from("blue"), Value::from("red")])));
		assert!(!predicate.matches(|_| Value::List(vec![Value::from("blue")])));
	}
}
