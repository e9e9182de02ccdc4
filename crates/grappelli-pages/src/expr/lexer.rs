//! Lexical grammar for binding expressions, as nom parsers.
//!
//! Every token parser skips leading whitespace. Punctuators match longest
//! first, so `op("=")` never accepts the start of `==` or `=>`.

use nom::{
	IResult, Parser,
	branch::alt,
	bytes::complete::{is_not, take_while},
	character::complete::{anychar, char, digit0, digit1, one_of, satisfy},
	combinator::{map, opt, recognize, verify},
	error::{ErrorKind, ParseError},
	multi::fold_many0,
	sequence::{pair, preceded},
};

use crate::error::ExprError;

/// Parser result over expression text.
pub(crate) type PResult<'a, O> = IResult<&'a str, O, SyntaxError<'a>>;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SyntaxErrorKind {
	/// Plain backtracking failure
	Mismatch,
	Expected(String),
	UnterminatedString,
	InvalidTarget(String),
}

/// Failure position plus what went wrong there.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SyntaxError<'a> {
	input: &'a str,
	kind: SyntaxErrorKind,
}

impl<'a> SyntaxError<'a> {
	pub(crate) fn new(input: &'a str, kind: SyntaxErrorKind) -> Self {
		Self {
			input: input.trim_start(),
			kind,
		}
	}

	/// Converts into the public error, with offsets relative to `source`.
	pub(crate) fn into_expr_error(self, source: &str) -> ExprError {
		let offset = source.len() - self.input.len();
		let expected = match self.kind {
			SyntaxErrorKind::UnterminatedString => return ExprError::UnterminatedString(offset),
			SyntaxErrorKind::InvalidTarget(target) => {
				return ExprError::InvalidAssignment { target, offset };
			}
			SyntaxErrorKind::Expected(label) => label,
			SyntaxErrorKind::Mismatch => "expression".to_string(),
		};
		match lexeme(self.input) {
			Ok((_, found)) => ExprError::UnexpectedToken {
				found: found.to_string(),
				offset,
			},
			Err(_) => match self.input.chars().next() {
				Some(found) => ExprError::UnexpectedChar { found, offset },
				None => ExprError::UnexpectedEnd { expected },
			},
		}
	}
}

impl<'a> ParseError<&'a str> for SyntaxError<'a> {
	fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
		Self::new(input, SyntaxErrorKind::Mismatch)
	}

	fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
		other
	}
}

fn mismatch<O>(input: &str) -> PResult<'_, O> {
	Err(nom::Err::Error(SyntaxError::new(input, SyntaxErrorKind::Mismatch)))
}

/// Turns a backtracking failure of `parser` into a hard "expected `label`"
/// failure at the current position.
pub(crate) fn expected<'a, O, P>(label: &'static str, mut parser: P) -> impl FnMut(&'a str) -> PResult<'a, O>
where
	P: Parser<&'a str, Output = O, Error = SyntaxError<'a>>,
{
	move |input: &'a str| match parser.parse(input) {
		Err(nom::Err::Error(_)) => Err(nom::Err::Failure(SyntaxError::new(
			input,
			SyntaxErrorKind::Expected(label.to_string()),
		))),
		other => other,
	}
}

/// Requires the punctuator `token`, failing hard with "expected 'token'".
pub(crate) fn closing<'a>(token: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
	move |input: &'a str| match op(token).parse(input) {
		Err(nom::Err::Error(_)) => Err(nom::Err::Failure(SyntaxError::new(
			input,
			SyntaxErrorKind::Expected(format!("'{token}'")),
		))),
		other => other,
	}
}

pub(crate) fn ws(input: &str) -> PResult<'_, &str> {
	take_while(char::is_whitespace).parse(input)
}

const PUNCTUATORS: &[&str] = &[
	"===", "!==", "=>", "==", "!=", "<=", ">=", "&&", "||", "??", "?.", "(", ")", "[", "]", "{",
	"}", ",", ".", ":", "?", "+", "-", "*", "/", "%", "<", ">", "!", "=",
];

/// Longest punctuator at the start of `input`.
///
/// `a?.5:1` is a conditional, so `?.` before a digit lexes as `?`.
fn punctuator(input: &str) -> PResult<'_, &str> {
	let digit_follows = input
		.strip_prefix("?.")
		.is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()));
	match PUNCTUATORS
		.iter()
		.find(|p| input.starts_with(**p) && !(**p == "?." && digit_follows))
	{
		Some(p) => Ok((&input[p.len()..], &input[..p.len()])),
		None => mismatch(input),
	}
}

/// The punctuator `token` exactly.
pub(crate) fn op<'a>(token: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
	move |input: &'a str| preceded(ws, verify(punctuator, |p: &str| p == token)).parse(input)
}

fn identifier_text(input: &str) -> PResult<'_, &str> {
	recognize(pair(
		satisfy(|c| c.is_alphabetic() || c == '_' || c == '$'),
		take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '$'),
	))
	.parse(input)
}

pub(crate) fn identifier(input: &str) -> PResult<'_, String> {
	map(preceded(ws, identifier_text), str::to_string).parse(input)
}

fn number_text(input: &str) -> PResult<'_, &str> {
	recognize((
		alt((
			recognize((digit1, opt((char('.'), digit0)))),
			recognize((char('.'), digit1)),
		)),
		opt((one_of("eE"), opt(one_of("+-")), digit1)),
	))
	.parse(input)
}

/// Decimal literal such as `1`, `1.5`, `.5`, or `2e3`.
pub(crate) fn number(input: &str) -> PResult<'_, f64> {
	let (rest, text) = preceded(ws, number_text).parse(input)?;
	match text.parse() {
		Ok(n) => Ok((rest, n)),
		Err(_) => mismatch(input),
	}
}

enum Fragment<'a> {
	Literal(&'a str),
	Escaped(char),
}

fn escape(c: char) -> char {
	match c {
		'n' => '\n',
		't' => '\t',
		'r' => '\r',
		'0' => '\0',
		other => other,
	}
}

/// Quoted string in `'`, `"`, or backticks, with backslash escapes.
pub(crate) fn string_literal(input: &str) -> PResult<'_, String> {
	let (start, _) = ws(input)?;
	let (rest, quote) = one_of("\"'`").parse(start)?;
	let stop = match quote {
		'"' => "\"\\",
		'\'' => "'\\",
		_ => "`\\",
	};
	let (rest, text) = fold_many0(
		alt((
			map(is_not(stop), Fragment::Literal),
			map(preceded(char('\\'), anychar), |c| Fragment::Escaped(escape(c))),
		)),
		String::new,
		|mut text, fragment| {
			match fragment {
				Fragment::Literal(s) => text.push_str(s),
				Fragment::Escaped(c) => text.push(c),
			}
			text
		},
	)
	.parse(rest)?;
	match char::<&str, SyntaxError<'_>>(quote).parse(rest) {
		Ok((rest, _)) => Ok((rest, text)),
		Err(_) => Err(nom::Err::Failure(SyntaxError::new(
			start,
			SyntaxErrorKind::UnterminatedString,
		))),
	}
}

/// Raw text of the next token, used to report what was found.
fn lexeme(input: &str) -> PResult<'_, &str> {
	alt((
		number_text,
		identifier_text,
		recognize(string_literal),
		punctuator,
	))
	.parse(input)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_operators_prefer_longest_match() {
		assert_eq!(punctuator("=== b"), Ok((" b", "===")));
		assert!(op("=").parse("== b").is_err());
		assert!(op("!").parse("!=").is_err());
		assert_eq!(op("=>").parse("  => x"), Ok((" x", "=>")));
	}

	#[rstest]
	#[case("1.5", 1.5)]
	#[case(".5", 0.5)]
	#[case("2e3", 2000.0)]
	#[case(" 7 ", 7.0)]
	fn test_numbers(#[case] source: &str, #[case] expected: f64) {
		assert_eq!(number(source).map(|(_, n)| n), Ok(expected));
	}

	#[rstest]
	fn test_string_escapes() {
		assert_eq!(string_literal(r#"'it\'s'"#), Ok(("", "it's".to_string())));
		assert_eq!(string_literal(r#""a\nb" +"#), Ok((" +", "a\nb".to_string())));
		assert_eq!(string_literal("``"), Ok(("", String::new())));
	}

	#[rstest]
	fn test_unterminated_string() {
		let Err(nom::Err::Failure(err)) = string_literal("'abc") else {
			panic!("expected a hard failure");
		};
		assert_eq!(err.into_expr_error("'abc"), ExprError::UnterminatedString(0));
	}

	#[rstest]
	fn test_identifiers() {
		assert_eq!(identifier("  $item_2.x"), Ok((".x", "$item_2".to_string())));
		assert!(identifier("2x").is_err());
	}

	#[rstest]
	fn test_optional_chain_before_digit_is_conditional() {
		assert_eq!(punctuator("?.5:1"), Ok((".5:1", "?")));
		assert_eq!(punctuator("?.name"), Ok(("name", "?.")));
	}

	#[rstest]
	#[case("# b", ExprError::UnexpectedChar { found: '#', offset: 2 })]
	#[case(" b", ExprError::UnexpectedToken { found: "b".into(), offset: 3 })]
	#[case("", ExprError::UnexpectedEnd { expected: "expression".into() })]
	fn test_error_reports_next_token(#[case] rest: &str, #[case] expected: ExprError) {
		let source = format!("a {rest}");
		let at = &source[2..];
		let err = SyntaxError::new(at, SyntaxErrorKind::Mismatch);
		assert_eq!(err.into_expr_error(&source), expected);
	}
}
