//! Expression grammar built from nom combinators.
//!
//! Precedence, loosest first: arrow functions, assignment, the conditional
//! operator, `??`, `||`, `&&`, equality, relational, additive,
//! multiplicative, unary, then postfix member access, indexing, and calls.

use nom::{
	Parser,
	branch::alt,
	combinator::{consumed, map, opt, value},
	multi::{many0, separated_list0},
	sequence::{delimited, pair, preceded, terminated},
};

use super::lexer::{
	PResult, SyntaxError, SyntaxErrorKind, closing, expected, identifier, number, op, string_literal,
	ws,
};
use crate::error::ExprError;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
	Not,
	Neg,
	Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
	StrictEq,
	StrictNe,
	LooseEq,
	LooseNe,
	Lt,
	Le,
	Gt,
	Ge,
	Add,
	Sub,
	Mul,
	Div,
	Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogicalOp {
	And,
	Or,
	Nullish,
}

/// Left side of an assignment.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AssignTarget {
	Member { object: Box<Expr>, property: String },
	Index { object: Box<Expr>, index: Box<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
	Literal(Value),
	Ident(String),
	Array(Vec<Expr>),
	Object(Vec<(String, Expr)>),
	Member {
		object: Box<Expr>,
		property: String,
		optional: bool,
	},
	Index {
		object: Box<Expr>,
		index: Box<Expr>,
	},
	Call {
		callee: Box<Expr>,
		args: Vec<Expr>,
	},
	Unary {
		op: UnaryOp,
		operand: Box<Expr>,
	},
	Binary {
		op: BinaryOp,
		left: Box<Expr>,
		right: Box<Expr>,
	},
	Logical {
		op: LogicalOp,
		left: Box<Expr>,
		right: Box<Expr>,
	},
	Conditional {
		test: Box<Expr>,
		consequent: Box<Expr>,
		alternate: Box<Expr>,
	},
	Arrow {
		params: Vec<String>,
		body: Box<Expr>,
	},
	Assign {
		target: AssignTarget,
		value: Box<Expr>,
	},
}

pub(crate) fn parse(source: &str) -> Result<Expr, ExprError> {
	match terminated(expression, ws).parse(source) {
		Ok(("", expr)) => Ok(expr),
		Ok((rest, _)) => Err(SyntaxError::new(rest, SyntaxErrorKind::Mismatch).into_expr_error(source)),
		Err(nom::Err::Error(err) | nom::Err::Failure(err)) => Err(err.into_expr_error(source)),
		Err(nom::Err::Incomplete(_)) => Err(ExprError::UnexpectedEnd {
			expected: "expression".to_string(),
		}),
	}
}

fn expression(input: &str) -> PResult<'_, Expr> {
	alt((arrow, assignment)).parse(input)
}

fn arrow(input: &str) -> PResult<'_, Expr> {
	let (input, params) = alt((
		map(identifier, |name| vec![name]),
		delimited(op("("), separated_list0(op(","), identifier), op(")")),
	))
	.parse(input)?;
	let (input, _) = op("=>").parse(input)?;
	let (input, body) = expected("expression", expression).parse(input)?;
	Ok((
		input,
		Expr::Arrow {
			params,
			body: Box::new(body),
		},
	))
}

fn assignment(input: &str) -> PResult<'_, Expr> {
	let (rest, (text, target)) = consumed(conditional).parse(input)?;
	let Ok((rest, _)) = op("=").parse(rest) else {
		return Ok((rest, target));
	};
	let target = match target {
		Expr::Member {
			object,
			property,
			optional: false,
		} => AssignTarget::Member { object, property },
		Expr::Index { object, index } => AssignTarget::Index { object, index },
		_ => {
			return Err(nom::Err::Failure(SyntaxError::new(
				input,
				SyntaxErrorKind::InvalidTarget(text.trim().to_string()),
			)));
		}
	};
	let (rest, value) = expected("expression", expression).parse(rest)?;
	Ok((
		rest,
		Expr::Assign {
			target,
			value: Box::new(value),
		},
	))
}

fn conditional(input: &str) -> PResult<'_, Expr> {
	let (input, test) = nullish(input)?;
	let Ok((rest, _)) = op("?").parse(input) else {
		return Ok((input, test));
	};
	let (rest, consequent) = expected("expression", expression).parse(rest)?;
	let (rest, _) = closing(":").parse(rest)?;
	let (rest, alternate) = expected("expression", expression).parse(rest)?;
	Ok((
		rest,
		Expr::Conditional {
			test: Box::new(test),
			consequent: Box::new(consequent),
			alternate: Box::new(alternate),
		},
	))
}

/// `operand (operator operand)*`, folded to the left.
fn chain<'a, O, P>(
	input: &'a str,
	operand: fn(&'a str) -> PResult<'a, Expr>,
	operator: P,
	build: fn(O, Expr, Expr) -> Expr,
) -> PResult<'a, Expr>
where
	P: Parser<&'a str, Output = O, Error = SyntaxError<'a>>,
{
	let (input, first) = operand(input)?;
	let (input, rest) = many0(pair(operator, expected("expression", operand))).parse(input)?;
	let folded = rest
		.into_iter()
		.fold(first, |left, (op, right)| build(op, left, right));
	Ok((input, folded))
}

fn logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
	Expr::Logical {
		op,
		left: Box::new(left),
		right: Box::new(right),
	}
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
	Expr::Binary {
		op,
		left: Box::new(left),
		right: Box::new(right),
	}
}

fn nullish(input: &str) -> PResult<'_, Expr> {
	chain(input, or, value(LogicalOp::Nullish, op("??")), logical)
}

fn or(input: &str) -> PResult<'_, Expr> {
	chain(input, and, value(LogicalOp::Or, op("||")), logical)
}

fn and(input: &str) -> PResult<'_, Expr> {
	chain(input, equality, value(LogicalOp::And, op("&&")), logical)
}

fn equality(input: &str) -> PResult<'_, Expr> {
	let operator = alt((
		value(BinaryOp::StrictEq, op("===")),
		value(BinaryOp::StrictNe, op("!==")),
		value(BinaryOp::LooseEq, op("==")),
		value(BinaryOp::LooseNe, op("!=")),
	));
	chain(input, relational, operator, binary)
}

fn relational(input: &str) -> PResult<'_, Expr> {
	let operator = alt((
		value(BinaryOp::Le, op("<=")),
		value(BinaryOp::Ge, op(">=")),
		value(BinaryOp::Lt, op("<")),
		value(BinaryOp::Gt, op(">")),
	));
	chain(input, additive, operator, binary)
}

fn additive(input: &str) -> PResult<'_, Expr> {
	let operator = alt((value(BinaryOp::Add, op("+")), value(BinaryOp::Sub, op("-"))));
	chain(input, multiplicative, operator, binary)
}

fn multiplicative(input: &str) -> PResult<'_, Expr> {
	let operator = alt((
		value(BinaryOp::Mul, op("*")),
		value(BinaryOp::Div, op("/")),
		value(BinaryOp::Rem, op("%")),
	));
	chain(input, unary, operator, binary)
}

fn unary(input: &str) -> PResult<'_, Expr> {
	let prefix = alt((
		value(UnaryOp::Not, op("!")),
		value(UnaryOp::Neg, op("-")),
		value(UnaryOp::Plus, op("+")),
	));
	alt((
		map(pair(prefix, expected("expression", unary)), |(op, operand)| Expr::Unary {
			op,
			operand: Box::new(operand),
		}),
		postfix,
	))
	.parse(input)
}

enum Suffix {
	Member(String, bool),
	Index(Expr),
	Call(Vec<Expr>),
}

fn suffix(input: &str) -> PResult<'_, Suffix> {
	alt((
		map(preceded(op("."), expected("property name", identifier)), |name| {
			Suffix::Member(name, false)
		}),
		map(preceded(op("?."), expected("property name", identifier)), |name| {
			Suffix::Member(name, true)
		}),
		map(
			delimited(op("["), expected("expression", expression), closing("]")),
			Suffix::Index,
		),
		map(preceded(op("("), call_args), Suffix::Call),
	))
	.parse(input)
}

fn postfix(input: &str) -> PResult<'_, Expr> {
	let (input, head) = primary(input)?;
	let (input, suffixes) = many0(suffix).parse(input)?;
	let expr = suffixes.into_iter().fold(head, |expr, suffix| match suffix {
		Suffix::Member(property, optional) => Expr::Member {
			object: Box::new(expr),
			property,
			optional,
		},
		Suffix::Index(index) => Expr::Index {
			object: Box::new(expr),
			index: Box::new(index),
		},
		Suffix::Call(args) => Expr::Call {
			callee: Box::new(expr),
			args,
		},
	});
	Ok((input, expr))
}

/// Comma-separated expressions up to `close`, allowing a trailing comma.
fn list<'a>(input: &'a str, close: &'static str) -> PResult<'a, Vec<Expr>> {
	terminated(
		terminated(separated_list0(op(","), expression), opt(op(","))),
		closing(close),
	)
	.parse(input)
}

fn call_args(input: &str) -> PResult<'_, Vec<Expr>> {
	list(input, ")")
}

fn array_items(input: &str) -> PResult<'_, Vec<Expr>> {
	list(input, "]")
}

fn keyword_or_ident(name: String) -> Expr {
	match name.as_str() {
		"true" => Expr::Literal(Value::Bool(true)),
		"false" => Expr::Literal(Value::Bool(false)),
		"null" => Expr::Literal(Value::Null),
		"undefined" => Expr::Literal(Value::Undefined),
		"NaN" => Expr::Literal(Value::Number(f64::NAN)),
		"Infinity" => Expr::Literal(Value::Number(f64::INFINITY)),
		_ => Expr::Ident(name),
	}
}

fn primary(input: &str) -> PResult<'_, Expr> {
	alt((
		map(number, |n| Expr::Literal(Value::Number(n))),
		map(string_literal, |s| Expr::Literal(Value::from(s))),
		map(identifier, keyword_or_ident),
		delimited(op("("), expected("expression", expression), closing(")")),
		map(preceded(op("["), array_items), Expr::Array),
		object,
	))
	.parse(input)
}

fn object(input: &str) -> PResult<'_, Expr> {
	let (input, _) = op("{").parse(input)?;
	let (input, entries) =
		terminated(separated_list0(op(","), property), opt(op(","))).parse(input)?;
	let (input, _) = closing("}").parse(input)?;
	Ok((input, Expr::Object(entries)))
}

fn property(input: &str) -> PResult<'_, (String, Expr)> {
	let (input, key) = alt((
		identifier,
		string_literal,
		map(number, |n| Value::Number(n).to_string()),
	))
	.parse(input)?;
	let (input, value) = opt(preceded(op(":"), expected("expression", expression))).parse(input)?;
	// Shorthand `{ name }`
	let value = value.unwrap_or_else(|| Expr::Ident(key.clone()));
	Ok((input, (key, value)))
}
