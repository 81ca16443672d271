//! Permission-path model.
//!
//! A user's permissions arrive as a set of paths:
//!
//! - `/` grants everything.
//! - `/collection/<id>/` and `/collection/root/` grant write, with `read/` appended they grant
//!   read only.
//! - `/db/<id>/` grants unrestricted data access including native queries, `/db/<id>/native/`
//!   grants native query creation, `/db/<id>/schema/`, `/db/<id>/schema/<schema>/` and
//!   `/db/<id>/schema/<schema>/table/<table-id>/` grant query-builder access at the given
//!   granularity.
//! - `/block/db/<id>/` blocks data access to the database entirely.
//!
//! Unrecognized paths are ignored.

use std::collections::BTreeSet;

/// Collections whose contents the user may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionVisibility {
	All,
	Ids { ids: BTreeSet<i64>, root: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewData {
	Unrestricted,
	Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CreateQueries {
	No,
	QueryBuilder,
	QueryBuilderAndNative,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
	admin: bool,
	root_read: bool,
	root_write: bool,
	collection_read: BTreeSet<i64>,
	collection_write: BTreeSet<i64>,
	db_full: BTreeSet<i64>,
	db_native: BTreeSet<i64>,
	db_query_builder: BTreeSet<i64>,
	schema_query_builder: BTreeSet<(i64, String)>,
	table_query_builder: BTreeSet<(i64, i64)>,
	db_blocked: BTreeSet<i64>,
}
impl PermissionSet {
	pub fn parse<I, S>(paths: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut set = Self::default();

		for path in paths {
			set.insert(path.as_ref());
		}

		set
	}

	pub fn admin() -> Self {
		Self { admin: true, ..Self::default() }
	}

	pub fn is_admin(&self) -> bool {
		self.admin
	}

	pub fn visible_collections(&self) -> CollectionVisibility {
		if self.admin {
			return CollectionVisibility::All;
		}

		CollectionVisibility::Ids {
			ids: self.collection_read.union(&self.collection_write).copied().collect(),
			root: self.root_read || self.root_write,
		}
	}

	/// `None` is the root collection.
	pub fn can_read_collection(&self, id: Option<i64>) -> bool {
		if self.admin {
			return true;
		}

		match id {
			Some(id) => self.collection_read.contains(&id) || self.collection_write.contains(&id),
			None => self.root_read || self.root_write,
		}
	}

	/// `None` is the root collection.
	pub fn can_write_collection(&self, id: Option<i64>) -> bool {
		if self.admin {
			return true;
		}

		match id {
			Some(id) => self.collection_write.contains(&id),
			None => self.root_write,
		}
	}

	pub fn view_data(&self, db_id: i64) -> ViewData {
		if !self.admin && self.db_blocked.contains(&db_id) {
			ViewData::Blocked
		} else {
			ViewData::Unrestricted
		}
	}

	/// Query-creation level for a database, optionally narrowed to one table.
	pub fn create_queries(
		&self,
		db_id: i64,
		schema: Option<&str>,
		table_id: Option<i64>,
	) -> CreateQueries {
		if self.admin || self.db_full.contains(&db_id) || self.db_native.contains(&db_id) {
			return CreateQueries::QueryBuilderAndNative;
		}
		if self.db_query_builder.contains(&db_id) {
			return CreateQueries::QueryBuilder;
		}
		if let Some(schema) = schema
			&& self.schema_query_builder.contains(&(db_id, schema.to_string()))
		{
			return CreateQueries::QueryBuilder;
		}
		if let Some(table_id) = table_id
			&& self.table_query_builder.contains(&(db_id, table_id))
		{
			return CreateQueries::QueryBuilder;
		}

		CreateQueries::No
	}

	fn insert(&mut self, path: &str) {
		let path = path.trim();

		if path == "/" {
			self.admin = true;

			return;
		}

		let Some(inner) = path.strip_prefix('/').and_then(|rest| rest.strip_suffix('/')) else {
			return;
		};
		let segments: Vec<&str> = inner.split('/').collect();

		match segments.as_slice() {
			["collection", "root"] => self.root_write = true,
			["collection", "root", "read"] => self.root_read = true,
			["collection", id] =>
				if let Ok(id) = id.parse() {
					self.collection_write.insert(id);
				},
			["collection", id, "read"] =>
				if let Ok(id) = id.parse() {
					self.collection_read.insert(id);
				},
			["db", id] =>
				if let Ok(id) = id.parse() {
					self.db_full.insert(id);
				},
			["db", id, "native"] =>
				if let Ok(id) = id.parse() {
					self.db_native.insert(id);
				},
			["db", id, "schema"] =>
				if let Ok(id) = id.parse() {
					self.db_query_builder.insert(id);
				},
			["db", id, "schema", schema] =>
				if let Ok(id) = id.parse() {
					self.schema_query_builder.insert((id, (*schema).to_string()));
				},
			["db", id, "schema", _, "table", table_id] => {
				if let (Ok(id), Ok(table_id)) = (id.parse(), table_id.parse()) {
					self.table_query_builder.insert((id, table_id));
				}
			},
			["block", "db", id] =>
				if let Ok(id) = id.parse() {
					self.db_blocked.insert(id);
				},
			_ => {},
		}
	}
}
