//! Minimal HTML fragment parser.
//!
//! Accepts the markup a template author writes: elements, quoted, unquoted,
//! and bare attributes, self-closing syntax, void elements, comments, and
//! the common named entities. It is not a conforming HTML5 parser; mismatched
//! closing tags close the innermost matching element, and unknown entities
//! pass through verbatim.
//!
//! Markup is scanned with nom into a flat sequence of `Markup` items, which
//! [`parse_fragment`] folds into a tree.

use nom::{
	IResult, Parser,
	branch::alt,
	bytes::complete::{is_not, tag, take_till, take_until, take_while, take_while1},
	character::complete::{char, digit1, hex_digit1, one_of, satisfy},
	combinator::{cut, map, map_opt, not, opt, recognize, value},
	error::{ContextError, ErrorKind, ParseError, context},
	multi::{fold_many0, many0, many0_count},
	sequence::{delimited, pair, preceded, terminated},
};

use super::{Node, is_void_element};
use crate::error::{TemplateError, TemplateResult};

#[derive(Debug, Clone, PartialEq)]
struct MarkupError<'a> {
	input: &'a str,
	message: Option<&'static str>,
}

impl<'a> ParseError<&'a str> for MarkupError<'a> {
	fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
		Self {
			input,
			message: None,
		}
	}

	fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
		other
	}
}

impl<'a> ContextError<&'a str> for MarkupError<'a> {
	// The innermost context names the failure and its position.
	fn add_context(input: &'a str, ctx: &'static str, other: Self) -> Self {
		match other.message {
			Some(_) => other,
			None => Self {
				input,
				message: Some(ctx),
			},
		}
	}
}

type MResult<'a, O> = IResult<&'a str, O, MarkupError<'a>>;

/// One lexical item of a fragment.
#[derive(Debug, Clone, PartialEq)]
enum Markup<'a> {
	Text(&'a str),
	Comment(&'a str),
	Open {
		name: &'a str,
		attributes: Vec<(&'a str, &'a str)>,
		self_closing: bool,
	},
	Close(&'a str),
}

fn is_space(c: char) -> bool {
	c.is_whitespace()
}

fn comment(input: &str) -> MResult<'_, Markup<'_>> {
	context(
		"unterminated comment",
		map(
			preceded(tag("<!--"), cut(terminated(take_until("-->"), tag("-->")))),
			Markup::Comment,
		),
	)
	.parse(input)
}

fn close_tag(input: &str) -> MResult<'_, Markup<'_>> {
	context(
		"unterminated closing tag",
		map(
			preceded(tag("</"), cut(terminated(take_till(|c: char| c == '>'), char('>')))),
			Markup::Close,
		),
	)
	.parse(input)
}

fn tag_name(input: &str) -> MResult<'_, &str> {
	recognize(pair(
		satisfy(|c| c.is_ascii_alphabetic()),
		take_while(|c: char| !is_space(c) && c != '>' && c != '/'),
	))
	.parse(input)
}

/// Whitespace and stray slashes between attributes.
fn attribute_gap(input: &str) -> MResult<'_, usize> {
	many0_count(alt((
		take_while1(is_space),
		terminated(tag("/"), not(char('>'))),
	)))
	.parse(input)
}

fn quoted<'a>(quote: char) -> impl FnMut(&'a str) -> MResult<'a, &'a str> {
	move |input: &'a str| {
		context(
			"unterminated attribute value",
			preceded(char(quote), cut(terminated(take_till(move |c: char| c == quote), char(quote)))),
		)
		.parse(input)
	}
}

fn attribute(input: &str) -> MResult<'_, (&str, &str)> {
	let name = take_while1(|c: char| !is_space(c) && c != '=' && c != '>' && c != '/');
	let assigned = preceded(
		(take_while(is_space), char('='), take_while(is_space)),
		alt((
			quoted('"'),
			quoted('\''),
			take_while(|c: char| !is_space(c) && c != '>'),
		)),
	);
	map(pair(name, opt(assigned)), |(name, value)| (name, value.unwrap_or(""))).parse(input)
}

fn open_tag(input: &str) -> MResult<'_, Markup<'_>> {
	let (input, name) = preceded(char('<'), tag_name).parse(input)?;
	let (input, attributes) = many0(preceded(attribute_gap, attribute)).parse(input)?;
	let (input, self_closing) = context(
		"unterminated tag",
		cut(preceded(
			attribute_gap,
			alt((value(true, tag("/>")), value(false, tag(">")))),
		)),
	)
	.parse(input)?;
	Ok((
		input,
		Markup::Open {
			name,
			attributes,
			self_closing,
		},
	))
}

/// Text up to the next `<`; a `<` that starts no tag is text too.
fn text(input: &str) -> MResult<'_, Markup<'_>> {
	map(
		recognize(pair(opt(char('<')), take_till(|c: char| c == '<'))),
		Markup::Text,
	)
	.parse(input)
}

fn markup(input: &str) -> MResult<'_, Markup<'_>> {
	alt((comment, close_tag, open_tag, text)).parse(input)
}

fn markup_error(source: &str, err: nom::Err<MarkupError<'_>>) -> TemplateError {
	match err {
		nom::Err::Error(err) | nom::Err::Failure(err) => TemplateError::Html {
			offset: source.len() - err.input.len(),
			message: err.message.unwrap_or("malformed markup").to_string(),
		},
		nom::Err::Incomplete(_) => TemplateError::Html {
			offset: source.len(),
			message: "unexpected end of markup".to_string(),
		},
	}
}

/// Parses `source` into a fragment node.
///
/// # Errors
///
/// Returns [`TemplateError::Html`] on an unterminated tag or comment.
pub fn parse_fragment(source: &str) -> TemplateResult<Node> {
	let fragment = Node::fragment();
	// The fragment root is never popped
	let mut stack = vec![fragment.clone()];
	let mut rest = source;

	while !rest.is_empty() {
		let (next, item) = markup(rest).map_err(|err| markup_error(source, err))?;
		rest = next;
		let parent = stack.last().cloned().unwrap_or_else(|| fragment.clone());
		match item {
			Markup::Text(raw) => parent.append_child(&Node::text(decode_entities(raw))),
			Markup::Comment(body) => parent.append_child(&Node::comment(body)),
			Markup::Close(name) => {
				let name = name.trim().to_ascii_lowercase();
				if let Some(index) = stack
					.iter()
					.rposition(|node| node.tag_name().as_deref() == Some(name.as_str()))
				{
					stack.truncate(index.max(1));
				}
			}
			Markup::Open {
				name,
				attributes,
				self_closing,
			} => {
				let name = name.to_ascii_lowercase();
				let element = Node::element(name.clone());
				for (attribute, raw) in attributes {
					element.set_attribute(attribute, decode_entities(raw));
				}
				parent.append_child(&element);
				if !self_closing && !is_void_element(&name) {
					stack.push(element);
				}
			}
		}
	}
	Ok(fragment)
}

fn entity(input: &str) -> MResult<'_, char> {
	let named = alt((
		value('&', tag("amp")),
		value('<', tag("lt")),
		value('>', tag("gt")),
		value('"', tag("quot")),
		value('\'', tag("apos")),
		value('\u{a0}', tag("nbsp")),
	));
	let numeric = preceded(
		char('#'),
		map_opt(
			alt((
				preceded(one_of("xX"), map_opt(hex_digit1, |hex: &str| u32::from_str_radix(hex, 16).ok())),
				map_opt(digit1, |dec: &str| dec.parse().ok()),
			)),
			char::from_u32,
		),
	);
	delimited(char('&'), alt((named, numeric)), char(';')).parse(input)
}

enum Piece<'a> {
	Plain(&'a str),
	Char(char),
}

/// Replaces the common named and numeric entities.
pub fn decode_entities(raw: &str) -> String {
	if !raw.contains('&') {
		return raw.to_string();
	}

	let decoded = fold_many0(
		alt((
			map(entity, Piece::Char),
			map(is_not("&"), Piece::Plain),
			map(char('&'), Piece::Char),
		)),
		|| String::with_capacity(raw.len()),
		|mut output, piece| {
			match piece {
				Piece::Plain(text) => output.push_str(text),
				Piece::Char(c) => output.push(c),
			}
			output
		},
	)
	.parse(raw);
	match decoded {
		Ok((_, output)) => output,
		Err(_) => raw.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dom::NodeKind;
	use rstest::rstest;

	#[rstest]
	fn test_nested_elements_and_text() {
		let fragment = parse_fragment("<ul><li>one</li><li>two</li></ul>").unwrap();
		let ul = fragment.first_child().unwrap();
		assert_eq!(ul.tag_name().as_deref(), Some("ul"));
		assert_eq!(ul.child_count(), 2);
		assert_eq!(ul.text_content(), "onetwo");
	}

	#[rstest]
	#[case(r#"<input type="text" disabled value=x>"#, "disabled", "")]
	#[case(r#"<input type='a b'>"#, "type", "a b")]
	#[case(r#"<a href="?a=1&amp;b=2">"#, "href", "?a=1&b=2")]
	#[case(r#"<input value = "spaced" / >"#, "value", "spaced")]
	fn test_attribute_forms(#[case] source: &str, #[case] name: &str, #[case] expected: &str) {
		let fragment = parse_fragment(source).unwrap();
		let element = fragment.first_child().unwrap();
		assert_eq!(element.attribute(name).as_deref(), Some(expected));
	}

	#[rstest]
	fn test_void_and_self_closing_do_not_nest() {
		let fragment = parse_fragment("<p>a<br>b<span/>c</p>").unwrap();
		let p = fragment.first_child().unwrap();
		assert_eq!(p.child_count(), 5);
		assert_eq!(p.text_content(), "abc");
	}

	#[rstest]
	fn test_comments_are_preserved() {
		let fragment = parse_fragment("<!-- note -->x").unwrap();
		assert_eq!(fragment.first_child().unwrap().kind(), NodeKind::Comment);
		assert_eq!(fragment.first_child().unwrap().data().as_deref(), Some(" note "));
	}

	#[rstest]
	fn test_stray_angle_bracket_is_text() {
		let fragment = parse_fragment("a < b").unwrap();
		assert_eq!(fragment.text_content(), "a < b");
	}

	#[rstest]
	fn test_text_entities_are_decoded() {
		let fragment = parse_fragment("<p>fish &amp; chips &lt;3</p>tail").unwrap();
		let p = fragment.first_child().unwrap();
		assert_eq!(p.first_child().unwrap().data().as_deref(), Some("fish & chips <3"));
		assert_eq!(fragment.child_count(), 2);
		assert_eq!(fragment.text_content(), "fish & chips <3tail");
	}

	#[rstest]
	fn test_mismatched_close_pops_to_matching_element() {
		let fragment = parse_fragment("<div><span>a</div>b</section>c").unwrap();
		assert_eq!(fragment.child_count(), 3);
		assert_eq!(fragment.first_child().unwrap().text_content(), "a");
	}

	#[rstest]
	#[case("<div class=\"x", 11, "unterminated attribute value")]
	#[case("ok<!-- open", 2, "unterminated comment")]
	#[case("<p>x</p", 4, "unterminated closing tag")]
	#[case("<div id=a", 9, "unterminated tag")]
	fn test_unterminated_markup_is_error(
		#[case] source: &str,
		#[case] offset: usize,
		#[case] message: &str,
	) {
		let Err(TemplateError::Html {
			offset: found,
			message: text,
		}) = parse_fragment(source)
		else {
			panic!("expected a markup error for {source:?}");
		};
		assert_eq!((found, text.as_str()), (offset, message));
	}

	#[rstest]
	fn test_decode_numeric_entities() {
		assert_eq!(decode_entities("&#65;&#x42;&bogus;"), "AB&bogus;");
		assert_eq!(decode_entities("a&b &amp"), "a&b &amp");
	}
}
