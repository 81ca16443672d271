//! Small batch lookups used to hydrate ranked results.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::{
	Result,
	sql::{self, Expr, Select, Source},
	store::{Row, SearchStore},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
	pub id: i64,
	pub first_name: Option<String>,
	pub last_name: Option<String>,
	pub email: String,
}
impl UserRecord {
	/// "First Last" when either part is known, the email address otherwise.
	pub fn common_name(&self) -> String {
		let parts = [self.first_name.as_deref(), self.last_name.as_deref()]
			.into_iter()
			.flatten()
			.map(str::trim)
			.filter(|part| !part.is_empty())
			.collect::<Vec<_>>();

		if parts.is_empty() { self.email.clone() } else { parts.join(" ") }
	}

	fn from_row(row: &Row) -> Result<Self> {
		Ok(Self {
			id: row.require_i64("id")?,
			first_name: row.text("first_name").map(str::to_string),
			last_name: row.text("last_name").map(str::to_string),
			email: row.text("email").unwrap_or_default().to_string(),
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionRecord {
	pub id: i64,
	pub name: String,
	#[serde(rename = "type")]
	pub collection_type: Option<String>,
	pub authority_level: Option<String>,
	#[serde(skip)]
	pub location: String,
}
impl CollectionRecord {
	fn from_row(row: &Row) -> Result<Self> {
		Ok(Self {
			id: row.require_i64("id")?,
			name: row.text("name").unwrap_or_default().to_string(),
			collection_type: row.text("type").map(str::to_string),
			authority_level: row.text("authority_level").map(str::to_string),
			location: row.text("location").unwrap_or("/").to_string(),
		})
	}
}

pub async fn users_by_id(
	store: &dyn SearchStore,
	ids: &BTreeSet<i64>,
) -> Result<HashMap<i64, UserRecord>> {
	if ids.is_empty() {
		return Ok(HashMap::new());
	}

	let select = Select::from(Source::table("core_user", "core_user"))
		.item(Expr::col("core_user", "id"), "id")
		.item(Expr::col("core_user", "first_name"), "first_name")
		.item(Expr::col("core_user", "last_name"), "last_name")
		.item(Expr::col("core_user", "email"), "email")
		.and_where(Expr::col("core_user", "id").in_list(ids.iter().copied()));
	let query = sql::compile(&select, store.dialect());
	let rows = store.fetch_all(&query).await?;
	let mut out = HashMap::with_capacity(rows.len());

	for row in &rows {
		let user = UserRecord::from_row(row)?;

		out.insert(user.id, user);
	}

	Ok(out)
}

pub async fn collections_by_id(
	store: &dyn SearchStore,
	ids: &BTreeSet<i64>,
) -> Result<HashMap<i64, CollectionRecord>> {
	if ids.is_empty() {
		return Ok(HashMap::new());
	}

	let select = Select::from(Source::table("collection", "collection"))
		.item(Expr::col("collection", "id"), "id")
		.item(Expr::col("collection", "name"), "name")
		.item(Expr::col("collection", "type"), "type")
		.item(Expr::col("collection", "authority_level"), "authority_level")
		.item(Expr::col("collection", "location"), "location")
		.and_where(Expr::col("collection", "id").in_list(ids.iter().copied()));
	let query = sql::compile(&select, store.dialect());
	let rows = store.fetch_all(&query).await?;
	let mut out = HashMap::with_capacity(rows.len());

	for row in &rows {
		let collection = CollectionRecord::from_row(row)?;

		out.insert(collection.id, collection);
	}

	Ok(out)
}

/// Ids of every personal collection root.
pub async fn personal_collection_ids(store: &dyn SearchStore) -> Result<BTreeSet<i64>> {
	let select = Select::from(Source::table("collection", "collection"))
		.item(Expr::col("collection", "id"), "id")
		.and_where(Expr::col("collection", "personal_owner_id").is_not_null());
	let query = sql::compile(&select, store.dialect());
	let rows = store.fetch_all(&query).await?;

	rows.iter().map(|row| row.require_i64("id")).collect()
}

#[cfg(test)]
mod tests {
	use crate::lookups::UserRecord;

	#[test]
	fn common_name_prefers_full_name() {
		let user = UserRecord {
			id: 1,
			first_name: Some("Ada".to_string()),
			last_name: Some("Lovelace".to_string()),
			email: "ada@example.com".to_string(),
		};

		assert_eq!(user.common_name(), "Ada Lovelace");

		let user = UserRecord { first_name: None, last_name: Some(" ".to_string()), ..user };

		assert_eq!(user.common_name(), "ada@example.com");
	}
}
