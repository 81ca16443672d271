use serde_json::Value;
use time::OffsetDateTime;

use trove_domain::ColumnType;

/// A bound parameter or decoded cell.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	Text(String),
	Timestamp(OffsetDateTime),
	Json(Value),
}
impl SqlValue {
	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}

	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Self::Int(value) => Some(*value),
			_ => None,
		}
	}

	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Self::Int(value) => Some(*value as f64),
			Self::Float(value) => Some(*value),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Text(value) => Some(value.as_str()),
			_ => None,
		}
	}

	/// Stores without a boolean type hand back `0`/`1`.
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(value) => Some(*value),
			Self::Int(0) => Some(false),
			Self::Int(1) => Some(true),
			_ => None,
		}
	}

	pub fn as_timestamp(&self) -> Option<OffsetDateTime> {
		match self {
			Self::Timestamp(value) => Some(*value),
			_ => None,
		}
	}
}
impl From<bool> for SqlValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}
impl From<i32> for SqlValue {
	fn from(value: i32) -> Self {
		Self::Int(i64::from(value))
	}
}
impl From<i64> for SqlValue {
	fn from(value: i64) -> Self {
		Self::Int(value)
	}
}
impl From<&str> for SqlValue {
	fn from(value: &str) -> Self {
		Self::Text(value.to_string())
	}
}
impl From<String> for SqlValue {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}
impl From<OffsetDateTime> for SqlValue {
	fn from(value: OffsetDateTime) -> Self {
		Self::Timestamp(value)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
	Eq,
	NotEq,
	Lt,
	Lte,
	Gt,
	Gte,
}
impl BinaryOp {
	pub(crate) fn symbol(self) -> &'static str {
		match self {
			Self::Eq => "=",
			Self::NotEq => "<>",
			Self::Lt => "<",
			Self::Lte => "<=",
			Self::Gt => ">",
			Self::Gte => ">=",
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
	Column { table: Option<String>, name: String },
	Literal(SqlValue),
	TypedNull(ColumnType),
	Lower(Box<Expr>),
	Coalesce(Vec<Expr>),
	Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
	/// `LIKE` with the backslash escape character.
	Like { expr: Box<Expr>, pattern: Box<Expr>, negated: bool },
	And(Vec<Expr>),
	Or(Vec<Expr>),
	Not(Box<Expr>),
	IsNull(Box<Expr>),
	IsNotNull(Box<Expr>),
	/// An empty list compiles to `FALSE`.
	InList { expr: Box<Expr>, values: Vec<SqlValue> },
	Case { branches: Vec<(Expr, Expr)>, otherwise: Box<Expr> },
	Subquery(Box<Select>),
	CountAll,
}
impl Expr {
	pub fn col(table: &str, name: &str) -> Self {
		Self::Column { table: Some(table.to_string()), name: name.to_string() }
	}

	pub fn bare(name: &str) -> Self {
		Self::Column { table: None, name: name.to_string() }
	}

	pub fn lit(value: impl Into<SqlValue>) -> Self {
		Self::Literal(value.into())
	}

	pub fn truth() -> Self {
		Self::Literal(SqlValue::Bool(true))
	}

	pub fn falsity() -> Self {
		Self::Literal(SqlValue::Bool(false))
	}

	pub fn is_falsity(&self) -> bool {
		matches!(self, Self::Literal(SqlValue::Bool(false)))
	}

	/// Conjunction with nested conjunctions flattened. Empty input is `TRUE`.
	pub fn all(parts: Vec<Expr>) -> Self {
		let mut flat = Vec::with_capacity(parts.len());

		for part in parts {
			match part {
				Self::And(inner) => flat.extend(inner),
				Self::Literal(SqlValue::Bool(true)) => {},
				other => flat.push(other),
			}
		}

		match flat.len() {
			0 => Self::truth(),
			1 => flat.remove(0),
			_ => Self::And(flat),
		}
	}

	/// Disjunction with nested disjunctions flattened. Empty input is `FALSE`.
	pub fn any(parts: Vec<Expr>) -> Self {
		let mut flat = Vec::with_capacity(parts.len());

		for part in parts {
			match part {
				Self::Or(inner) => flat.extend(inner),
				Self::Literal(SqlValue::Bool(false)) => {},
				other => flat.push(other),
			}
		}

		match flat.len() {
			0 => Self::falsity(),
			1 => flat.remove(0),
			_ => Self::Or(flat),
		}
	}

	pub fn coalesce(parts: Vec<Expr>) -> Self {
		Self::Coalesce(parts)
	}

	pub fn eq(self, other: Expr) -> Self {
		self.binary(BinaryOp::Eq, other)
	}

	pub fn not_eq(self, other: Expr) -> Self {
		self.binary(BinaryOp::NotEq, other)
	}

	pub fn lt(self, other: Expr) -> Self {
		self.binary(BinaryOp::Lt, other)
	}

	pub fn gt(self, other: Expr) -> Self {
		self.binary(BinaryOp::Gt, other)
	}

	pub fn gte(self, other: Expr) -> Self {
		self.binary(BinaryOp::Gte, other)
	}

	pub fn like(self, pattern: impl Into<String>) -> Self {
		Self::Like {
			expr: Box::new(self),
			pattern: Box::new(Self::lit(pattern.into())),
			negated: false,
		}
	}

	pub fn not_like(self, pattern: impl Into<String>) -> Self {
		Self::Like {
			expr: Box::new(self),
			pattern: Box::new(Self::lit(pattern.into())),
			negated: true,
		}
	}

	pub fn lower(self) -> Self {
		Self::Lower(Box::new(self))
	}

	pub fn is_null(self) -> Self {
		Self::IsNull(Box::new(self))
	}

	pub fn is_not_null(self) -> Self {
		Self::IsNotNull(Box::new(self))
	}

	pub fn in_list<I, V>(self, values: I) -> Self
	where
		I: IntoIterator<Item = V>,
		V: Into<SqlValue>,
	{
		Self::InList { expr: Box::new(self), values: values.into_iter().map(Into::into).collect() }
	}

	pub fn negate(self) -> Self {
		Self::Not(Box::new(self))
	}

	fn binary(self, op: BinaryOp, other: Expr) -> Self {
		Self::Binary { op, left: Box::new(self), right: Box::new(other) }
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
	Wildcard,
	Expr { expr: Expr, alias: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Source {
	Table { name: String, alias: String },
	/// `(branch UNION ALL branch ...) AS alias`.
	Union { branches: Vec<Select>, alias: String },
}
impl Source {
	pub fn table(name: &str, alias: &str) -> Self {
		Self::Table { name: name.to_string(), alias: alias.to_string() }
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
	Inner,
	Left,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
	pub kind: JoinKind,
	pub source: Source,
	pub on: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
	pub expr: Expr,
	pub descending: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
	pub items: Vec<SelectItem>,
	pub from: Option<Source>,
	pub joins: Vec<Join>,
	pub filter: Option<Expr>,
	pub order_by: Vec<OrderBy>,
	pub limit: Option<u64>,
}
impl Select {
	pub fn from(source: Source) -> Self {
		Self { from: Some(source), ..Self::default() }
	}

	pub fn item(mut self, expr: Expr, alias: &str) -> Self {
		self.items.push(SelectItem::Expr { expr, alias: Some(alias.to_string()) });

		self
	}

	pub fn wildcard(mut self) -> Self {
		self.items.push(SelectItem::Wildcard);

		self
	}

	pub fn join(mut self, kind: JoinKind, source: Source, on: Expr) -> Self {
		self.joins.push(Join { kind, source, on });

		self
	}

	/// AND the predicate onto the existing filter.
	pub fn and_where(mut self, predicate: Expr) -> Self {
		self.filter = Some(match self.filter.take() {
			Some(existing) => Expr::all(vec![existing, predicate]),
			None => predicate,
		});

		self
	}

	pub fn order_by(mut self, expr: Expr, descending: bool) -> Self {
		self.order_by.push(OrderBy { expr, descending });

		self
	}

	pub fn limit(mut self, limit: u64) -> Self {
		self.limit = Some(limit);

		self
	}

	pub fn has_join(&self, alias: &str) -> bool {
		self.joins.iter().any(|join| match &join.source {
			Source::Table { alias: existing, .. } | Source::Union { alias: existing, .. } =>
				existing == alias,
		})
	}
}
