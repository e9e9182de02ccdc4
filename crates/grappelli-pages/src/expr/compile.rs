//! Lowering of the expression tree into closures.
//!
//! Identifiers are resolved once, at compile time, to a (frame depth, slot)
//! pair. Frame 0 at the bottom holds the context values in key order; each
//! arrow function pushes a frame for its parameters.

use std::rc::Rc;

use super::parser::{AssignTarget, BinaryOp, Expr, LogicalOp, UnaryOp};
use crate::error::{EvalError, EvalResult, ExprError};
use crate::value::Value;

/// Runtime environment: one frame of values plus its enclosing frame.
pub(crate) struct Env {
	values: Rc<[Value]>,
	parent: Option<Rc<Env>>,
}

impl Env {
	pub(crate) fn root(values: Rc<[Value]>) -> Rc<Env> {
		Rc::new(Env {
			values,
			parent: None,
		})
	}

	fn lookup(self: &Rc<Env>, depth: usize, slot: usize) -> Value {
		let mut env = self;
		for _ in 0..depth {
			match &env.parent {
				Some(parent) => env = parent,
				None => return Value::Undefined,
			}
		}
		env.values.get(slot).cloned().unwrap_or_default()
	}
}

pub(crate) type Compiled = Rc<dyn Fn(&Rc<Env>) -> EvalResult<Value>>;

/// Names visible at a point in the expression, innermost frame last.
pub(crate) struct Resolver<'a> {
	frames: Vec<Vec<&'a str>>,
}

impl<'a> Resolver<'a> {
	pub(crate) fn new(keys: &'a [Rc<str>]) -> Self {
		Self {
			frames: vec![keys.iter().map(|k| &**k).collect()],
		}
	}

	fn resolve(&self, name: &str) -> Option<(usize, usize)> {
		self.frames.iter().rev().enumerate().find_map(|(depth, frame)| {
			frame
				.iter()
				.rposition(|candidate| *candidate == name)
				.map(|slot| (depth, slot))
		})
	}

	fn available(&self) -> String {
		self.frames
			.iter()
			.flatten()
			.copied()
			.collect::<Vec<_>>()
			.join(", ")
	}
}

fn compiled<F>(f: F) -> Compiled
where
	F: Fn(&Rc<Env>) -> EvalResult<Value> + 'static,
{
	Rc::new(f)
}

pub(crate) fn lower<'a>(expr: &'a Expr, resolver: &mut Resolver<'a>) -> Result<Compiled, ExprError> {
	let lowered = match expr {
		Expr::Literal(value) => {
			let value = value.clone();
			compiled(move |_| Ok(value.clone()))
		}
		Expr::Ident(name) => {
			let (depth, slot) =
				resolver
					.resolve(name)
					.ok_or_else(|| ExprError::UnknownIdentifier {
						name: name.clone(),
						available: resolver.available(),
					})?;
			compiled(move |env| Ok(env.lookup(depth, slot)))
		}
		Expr::Array(items) => {
			let items = lower_all(items, resolver)?;
			compiled(move |env| {
				let values = items.iter().map(|item| item(env)).collect::<EvalResult<Vec<_>>>()?;
				Ok(Value::array(values))
			})
		}
		Expr::Object(entries) => {
			let entries = entries
				.iter()
				.map(|(key, value)| Ok((key.clone(), lower(value, resolver)?)))
				.collect::<Result<Vec<_>, ExprError>>()?;
			compiled(move |env| {
				let mut map = indexmap::IndexMap::with_capacity(entries.len());
				for (key, value) in &entries {
					map.insert(key.clone(), value(env)?);
				}
				Ok(Value::from(map))
			})
		}
		Expr::Member {
			object,
			property,
			optional,
		} => {
			let object = lower(object, resolver)?;
			let (property, optional) = (property.clone(), *optional);
			compiled(move |env| {
				let target = object(env)?;
				if optional && target.is_nullish() {
					return Ok(Value::Undefined);
				}
				target.get_member(&property)
			})
		}
		Expr::Index { object, index } => {
			let object = lower(object, resolver)?;
			let index = lower(index, resolver)?;
			compiled(move |env| object(env)?.get_index(&index(env)?))
		}
		Expr::Call { callee, args } => {
			let callee_fn = lower(callee, resolver)?;
			let args = lower_all(args, resolver)?;
			let label = callee_label(callee);
			compiled(move |env| {
				let target = callee_fn(env)?;
				let values = args.iter().map(|arg| arg(env)).collect::<EvalResult<Vec<_>>>()?;
				match target {
					Value::Function(_) | Value::Signal(_) => target.call(&values),
					_ => Err(EvalError::NotCallable(label.clone())),
				}
			})
		}
		Expr::Unary { op, operand } => {
			let operand = lower(operand, resolver)?;
			let op = *op;
			compiled(move |env| {
				let value = operand(env)?;
				Ok(match op {
					UnaryOp::Not => Value::Bool(!value.is_truthy()),
					UnaryOp::Neg => Value::Number(-value.to_number()),
					UnaryOp::Plus => Value::Number(value.to_number()),
				})
			})
		}
		Expr::Binary { op, left, right } => {
			let left = lower(left, resolver)?;
			let right = lower(right, resolver)?;
			let op = *op;
			compiled(move |env| Ok(binary(op, &left(env)?, &right(env)?)))
		}
		Expr::Logical { op, left, right } => {
			let left = lower(left, resolver)?;
			let right = lower(right, resolver)?;
			let op = *op;
			compiled(move |env| {
				let lhs = left(env)?;
				let short_circuit = match op {
					LogicalOp::And => !lhs.is_truthy(),
					LogicalOp::Or => lhs.is_truthy(),
					LogicalOp::Nullish => !lhs.is_nullish(),
				};
				if short_circuit { Ok(lhs) } else { right(env) }
			})
		}
		Expr::Conditional {
			test,
			consequent,
			alternate,
		} => {
			let test = lower(test, resolver)?;
			let consequent = lower(consequent, resolver)?;
			let alternate = lower(alternate, resolver)?;
			compiled(move |env| {
				if test(env)?.is_truthy() {
					consequent(env)
				} else {
					alternate(env)
				}
			})
		}
		Expr::Arrow { params, body } => {
			resolver.frames.push(params.iter().map(String::as_str).collect());
			let body = lower(body, resolver);
			resolver.frames.pop();
			let body = body?;
			let arity = params.len();
			compiled(move |env| {
				let (env, body) = (env.clone(), body.clone());
				Ok(Value::function("arrow", move |args| {
					let values: Vec<Value> = (0..arity)
						.map(|i| args.get(i).cloned().unwrap_or_default())
						.collect();
					let frame = Rc::new(Env {
						values: values.into(),
						parent: Some(env.clone()),
					});
					body(&frame)
				}))
			})
		}
		Expr::Assign { target, value } => {
			let value = lower(value, resolver)?;
			match target {
				AssignTarget::Member { object, property } => {
					let object = lower(object, resolver)?;
					let property = property.clone();
					compiled(move |env| {
						let target = object(env)?;
						let assigned = value(env)?;
						target.set_member(&property, assigned.clone())?;
						Ok(assigned)
					})
				}
				AssignTarget::Index { object, index } => {
					let object = lower(object, resolver)?;
					let index = lower(index, resolver)?;
					compiled(move |env| {
						let target = object(env)?;
						let key = index(env)?;
						let assigned = value(env)?;
						target.set_index(&key, assigned.clone())?;
						Ok(assigned)
					})
				}
			}
		}
	};
	Ok(lowered)
}

fn lower_all<'a>(exprs: &'a [Expr], resolver: &mut Resolver<'a>) -> Result<Vec<Compiled>, ExprError> {
	exprs.iter().map(|expr| lower(expr, resolver)).collect()
}

fn callee_label(callee: &Expr) -> String {
	match callee {
		Expr::Ident(name) => name.clone(),
		Expr::Member {
			object, property, ..
		} => format!("{}.{property}", callee_label(object)),
		_ => "expression".to_string(),
	}
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
	use core::cmp::Ordering;

	let ordered = |accept: fn(Ordering) -> bool| {
		Value::Bool(left.compare(right).is_some_and(accept))
	};
	match op {
		BinaryOp::StrictEq => Value::Bool(left == right),
		BinaryOp::StrictNe => Value::Bool(left != right),
		BinaryOp::LooseEq => Value::Bool(left.loose_eq(right)),
		BinaryOp::LooseNe => Value::Bool(!left.loose_eq(right)),
		BinaryOp::Lt => ordered(Ordering::is_lt),
		BinaryOp::Le => ordered(Ordering::is_le),
		BinaryOp::Gt => ordered(Ordering::is_gt),
		BinaryOp::Ge => ordered(Ordering::is_ge),
		BinaryOp::Add => left.add(right),
		BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
		BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
		BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
		BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
	}
}
