use trove_domain::ColumnType;

use crate::sql::ast::{Expr, JoinKind, Select, SelectItem, Source, SqlValue};

/// Target SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
	/// `$n` placeholders; typed nulls are cast so union branches agree on column types.
	Postgres,
	/// `?` placeholders; bare `NULL` already unifies across union branches.
	MySql,
}
impl Dialect {
	fn type_name(self, ty: ColumnType) -> &'static str {
		match self {
			Self::Postgres => match ty {
				ColumnType::Text => "TEXT",
				ColumnType::Integer => "BIGINT",
				ColumnType::Boolean => "BOOLEAN",
				ColumnType::Timestamp => "TIMESTAMPTZ",
				ColumnType::Json => "JSONB",
				ColumnType::Decimal => "NUMERIC",
				ColumnType::Float => "DOUBLE PRECISION",
				ColumnType::Time => "TIME",
			},
			Self::MySql => match ty {
				ColumnType::Text => "TEXT",
				ColumnType::Integer => "BIGINT",
				ColumnType::Boolean => "BOOLEAN",
				ColumnType::Timestamp => "TIMESTAMP",
				ColumnType::Json => "JSON",
				ColumnType::Decimal => "DECIMAL",
				ColumnType::Float => "DOUBLE",
				ColumnType::Time => "TIME",
			},
		}
	}

	/// Column type used in DDL for the denormalized index.
	pub fn ddl_type(self, ty: ColumnType) -> &'static str {
		self.type_name(ty)
	}

	fn escape_clause(self) -> &'static str {
		match self {
			Self::Postgres => " ESCAPE '\\'",
			Self::MySql => " ESCAPE '\\\\'",
		}
	}
}

/// SQL text plus positional parameters in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
	pub sql: String,
	pub params: Vec<SqlValue>,
}

pub fn compile(select: &Select, dialect: Dialect) -> CompiledQuery {
	let mut compiler = Compiler { dialect, sql: String::new(), params: Vec::new() };

	compiler.select(select);

	CompiledQuery { sql: compiler.sql, params: compiler.params }
}

struct Compiler {
	dialect: Dialect,
	sql: String,
	params: Vec<SqlValue>,
}
impl Compiler {
	fn select(&mut self, select: &Select) {
		self.sql.push_str("SELECT ");

		if select.items.is_empty() {
			self.sql.push('*');
		}

		for (idx, item) in select.items.iter().enumerate() {
			if idx > 0 {
				self.sql.push_str(", ");
			}

			match item {
				SelectItem::Wildcard => self.sql.push('*'),
				SelectItem::Expr { expr, alias } => {
					self.expr(expr);

					if let Some(alias) = alias {
						self.sql.push_str(" AS ");
						self.sql.push_str(alias);
					}
				},
			}
		}

		if let Some(source) = &select.from {
			self.sql.push_str(" FROM ");
			self.source(source);
		}

		for join in &select.joins {
			self.sql.push_str(match join.kind {
				JoinKind::Inner => " INNER JOIN ",
				JoinKind::Left => " LEFT JOIN ",
			});
			self.source(&join.source);
			self.sql.push_str(" ON ");
			self.expr(&join.on);
		}

		if let Some(filter) = &select.filter {
			self.sql.push_str(" WHERE ");
			self.expr(filter);
		}

		for (idx, order) in select.order_by.iter().enumerate() {
			self.sql.push_str(if idx == 0 { " ORDER BY " } else { ", " });
			self.expr(&order.expr);

			if order.descending {
				self.sql.push_str(" DESC");
			}
		}

		if let Some(limit) = select.limit {
			self.sql.push_str(" LIMIT ");
			self.sql.push_str(&limit.to_string());
		}
	}

	fn source(&mut self, source: &Source) {
		match source {
			Source::Table { name, alias } => {
				self.sql.push_str(name);

				if name != alias {
					self.sql.push(' ');
					self.sql.push_str(alias);
				}
			},
			Source::Union { branches, alias } => {
				self.sql.push('(');

				for (idx, branch) in branches.iter().enumerate() {
					if idx > 0 {
						self.sql.push_str(" UNION ALL ");
					}

					self.sql.push('(');
					self.select(branch);
					self.sql.push(')');
				}

				self.sql.push_str(") AS ");
				self.sql.push_str(alias);
			},
		}
	}

	fn expr(&mut self, expr: &Expr) {
		match expr {
			Expr::Column { table, name } => {
				if let Some(table) = table {
					self.sql.push_str(table);
					self.sql.push('.');
				}

				self.sql.push_str(name);
			},
			Expr::Literal(value) => self.literal(value),
			Expr::TypedNull(ty) => match self.dialect {
				Dialect::Postgres => {
					self.sql.push_str("CAST(NULL AS ");
					self.sql.push_str(self.dialect.type_name(*ty));
					self.sql.push(')');
				},
				Dialect::MySql => self.sql.push_str("NULL"),
			},
			Expr::Lower(inner) => {
				self.sql.push_str("LOWER(");
				self.expr(inner);
				self.sql.push(')');
			},
			Expr::Coalesce(parts) => {
				self.sql.push_str("COALESCE(");
				self.list(parts, ", ");
				self.sql.push(')');
			},
			Expr::Binary { op, left, right } => {
				self.operand(left);
				self.sql.push(' ');
				self.sql.push_str(op.symbol());
				self.sql.push(' ');
				self.operand(right);
			},
			Expr::Like { expr, pattern, negated } => {
				self.operand(expr);
				self.sql.push_str(if *negated { " NOT LIKE " } else { " LIKE " });
				self.operand(pattern);
				self.sql.push_str(self.dialect.escape_clause());
			},
			Expr::And(parts) =>
				if parts.is_empty() {
					self.sql.push_str("TRUE");
				} else {
					self.sql.push('(');
					self.list(parts, " AND ");
					self.sql.push(')');
				},
			Expr::Or(parts) =>
				if parts.is_empty() {
					self.sql.push_str("FALSE");
				} else {
					self.sql.push('(');
					self.list(parts, " OR ");
					self.sql.push(')');
				},
			Expr::Not(inner) => {
				self.sql.push_str("NOT (");
				self.expr(inner);
				self.sql.push(')');
			},
			Expr::IsNull(inner) => {
				self.operand(inner);
				self.sql.push_str(" IS NULL");
			},
			Expr::IsNotNull(inner) => {
				self.operand(inner);
				self.sql.push_str(" IS NOT NULL");
			},
			Expr::InList { expr, values } => {
				if values.is_empty() {
					self.sql.push_str("FALSE");

					return;
				}

				self.operand(expr);
				self.sql.push_str(" IN (");

				for (idx, value) in values.iter().enumerate() {
					if idx > 0 {
						self.sql.push_str(", ");
					}

					self.literal(value);
				}

				self.sql.push(')');
			},
			Expr::Case { branches, otherwise } => {
				self.sql.push_str("CASE");

				for (condition, value) in branches {
					self.sql.push_str(" WHEN ");
					self.expr(condition);
					self.sql.push_str(" THEN ");
					self.expr(value);
				}

				self.sql.push_str(" ELSE ");
				self.expr(otherwise);
				self.sql.push_str(" END");
			},
			Expr::Subquery(select) => {
				self.sql.push('(');
				self.select(select);
				self.sql.push(')');
			},
			Expr::CountAll => self.sql.push_str("COUNT(*)"),
		}
	}

	fn operand(&mut self, expr: &Expr) {
		let compound = matches!(
			expr,
			Expr::Binary { .. }
				| Expr::Like { .. }
				| Expr::IsNull(_)
				| Expr::IsNotNull(_)
				| Expr::InList { .. }
		);

		if compound {
			self.sql.push('(');
			self.expr(expr);
			self.sql.push(')');
		} else {
			self.expr(expr);
		}
	}

	fn list(&mut self, parts: &[Expr], separator: &str) {
		for (idx, part) in parts.iter().enumerate() {
			if idx > 0 {
				self.sql.push_str(separator);
			}

			self.expr(part);
		}
	}

	fn literal(&mut self, value: &SqlValue) {
		match value {
			SqlValue::Null => self.sql.push_str("NULL"),
			SqlValue::Bool(true) => self.sql.push_str("TRUE"),
			SqlValue::Bool(false) => self.sql.push_str("FALSE"),
			other => {
				self.params.push(other.clone());

				match self.dialect {
					Dialect::Postgres => {
						self.sql.push('$');
						self.sql.push_str(&self.params.len().to_string());
					},
					Dialect::MySql => self.sql.push('?'),
				}
			},
		}
	}
}
