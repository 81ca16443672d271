use trove_domain::CANONICAL_COLUMNS;

use crate::sql::Dialect;

pub const SEARCH_INDEX_TABLE: &str = "search_index";
pub const SEARCH_INDEX_NEXT_TABLE: &str = "search_index_next";

pub fn render_schema() -> String {
	let init = include_str!("../../../sql/init.sql");
	let mut out = expand_includes(init);

	for statement in render_search_index_table(SEARCH_INDEX_TABLE) {
		out.push_str(&statement);
		out.push_str(";\n");
	}

	out
}

/// DDL for a denormalized index table with one column per canonical column.
///
/// `id` alone is not unique: indexed entities share the id space of their model's primary keys,
/// so identity also covers `model` and `model_index_id`.
pub fn render_search_index_table(table: &str) -> Vec<String> {
	let columns = CANONICAL_COLUMNS
		.iter()
		.map(|column| {
			let not_null = if column.name() == "model" || column.name() == "id" {
				" NOT NULL"
			} else {
				""
			};

			format!("\t{} {}{not_null}", column.name(), Dialect::Postgres.ddl_type(column.ty()))
		})
		.collect::<Vec<_>>()
		.join(",\n");

	vec![
		format!("CREATE TABLE IF NOT EXISTS {table} (\n{columns}\n)"),
		format!(
			"CREATE UNIQUE INDEX IF NOT EXISTS {} ON {table} (model, id, COALESCE(model_index_id, 0))",
			identity_index_name(table)
		),
	]
}

pub fn identity_index_name(table: &str) -> String {
	format!("{table}_identity")
}

/// Split a script on `;`, dropping blank statements.
pub fn split_statements(sql: &str) -> Vec<&str> {
	sql.split(';').map(str::trim).filter(|statement| !statement.is_empty()).collect()
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_core_user.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_core_user.sql")),
				"tables/002_collection.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_collection.sql")),
				"tables/003_metabase_database.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_metabase_database.sql")),
				"tables/004_metabase_table.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_metabase_table.sql")),
				"tables/005_report_card.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_report_card.sql")),
				"tables/006_report_dashboard.sql" =>
					out.push_str(include_str!("../../../sql/tables/006_report_dashboard.sql")),
				"tables/007_report_dashboardcard.sql" =>
					out.push_str(include_str!("../../../sql/tables/007_report_dashboardcard.sql")),
				"tables/008_segment.sql" =>
					out.push_str(include_str!("../../../sql/tables/008_segment.sql")),
				"tables/009_action.sql" =>
					out.push_str(include_str!("../../../sql/tables/009_action.sql")),
				"tables/010_model_index.sql" =>
					out.push_str(include_str!("../../../sql/tables/010_model_index.sql")),
				"tables/011_revision.sql" =>
					out.push_str(include_str!("../../../sql/tables/011_revision.sql")),
				"tables/012_moderation_review.sql" =>
					out.push_str(include_str!("../../../sql/tables/012_moderation_review.sql")),
				"tables/013_bookmarks.sql" =>
					out.push_str(include_str!("../../../sql/tables/013_bookmarks.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use trove_domain::CANONICAL_COLUMNS;

	use crate::schema::{render_schema, render_search_index_table, split_statements};

	#[test]
	fn includes_are_expanded() {
		let sql = render_schema();

		assert!(!sql.contains("\\ir "));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS report_card"));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS search_index ("));
		assert!(sql.contains("search_index_identity"));
	}

	#[test]
	fn index_table_has_every_canonical_column_in_order() {
		let ddl = render_search_index_table("search_index_next");
		let create = &ddl[0];
		let mut cursor = 0;

		for column in CANONICAL_COLUMNS {
			let needle = format!("\t{} ", column.name());
			let found = create[cursor..]
				.find(&needle)
				.unwrap_or_else(|| panic!("{} is missing or out of order", column.name()));

			cursor += found + needle.len();
		}

		assert!(ddl[1].starts_with("CREATE UNIQUE INDEX IF NOT EXISTS search_index_next_identity"));
	}

	#[test]
	fn blank_statements_are_dropped() {
		assert_eq!(split_statements("A;\n ;B ;"), vec!["A", "B"]);
	}
}
