use trove_domain::SearchableModel;
use trove_service::{ChangeKind, Indexer};

use super::{bootstrap, test_db};

#[tokio::test]
#[ignore = "Requires external Postgres. Set TROVE_PG_DSN to run."]
async fn reindex_is_idempotent() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping reindex_is_idempotent; set TROVE_PG_DSN to run this test.");

		return;
	};
	let db = bootstrap(&test_db).await;
	let indexer = Indexer::new(&db);
	let first = indexer.reindex_all().await.expect("First reindex failed.");
	let second = indexer.reindex_all().await.expect("Second reindex failed.");
	let count: i64 = sqlx::query_scalar("SELECT count(*) FROM search_index")
		.fetch_one(&db.pool)
		.await
		.expect("Failed to count index rows.");

	assert_eq!(first, second);
	assert_eq!(count as u64, second.total);
	assert_eq!(second.rows_by_model.get(&SearchableModel::Card), Some(&2));

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TROVE_PG_DSN to run."]
async fn changes_are_reflected_in_the_index() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping changes_are_reflected_in_the_index; set TROVE_PG_DSN to run this test.");

		return;
	};
	let db = bootstrap(&test_db).await;
	let indexer = Indexer::new(&db);

	indexer.reindex_all().await.expect("Reindex failed.");

	sqlx::query("UPDATE report_card SET name = 'Orders by week' WHERE id = 1")
		.execute(&db.pool)
		.await
		.expect("Failed to rename card.");

	let report =
		indexer.apply_change(1, SearchableModel::Card, ChangeKind::Update).await.expect("Update.");

	assert_eq!((report.deleted, report.inserted), (1, 1));

	let name: String =
		sqlx::query_scalar("SELECT name FROM search_index WHERE model = 'card' AND id = 1")
			.fetch_one(&db.pool)
			.await
			.expect("Failed to read indexed card.");

	assert_eq!(name, "Orders by week");

	sqlx::query("UPDATE collection SET name = 'Revenue Ops' WHERE id = 5")
		.execute(&db.pool)
		.await
		.expect("Failed to rename collection.");
	indexer
		.apply_change(5, SearchableModel::Collection, ChangeKind::Update)
		.await
		.expect("Collection update.");

	let collection_name: Option<String> = sqlx::query_scalar(
		"SELECT collection_name FROM search_index WHERE model = 'card' AND id = 1",
	)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to read indexed card.");

	assert_eq!(collection_name.as_deref(), Some("Revenue Ops"));

	sqlx::query("UPDATE metabase_database SET name = 'Lakehouse' WHERE id = 3")
		.execute(&db.pool)
		.await
		.expect("Failed to rename database.");

	let report = indexer
		.apply_change(3, SearchableModel::Database, ChangeKind::Update)
		.await
		.expect("Database update.");
	let database_name: Option<String> = sqlx::query_scalar(
		"SELECT database_name FROM search_index WHERE model = 'table' AND id = 12",
	)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to read indexed table.");

	assert_eq!((report.deleted, report.inserted, report.refreshed), (1, 1, 1));
	assert_eq!(database_name.as_deref(), Some("Lakehouse"));

	sqlx::query("DELETE FROM report_card WHERE id = 1")
		.execute(&db.pool)
		.await
		.expect("Failed to delete card.");

	let report =
		indexer.apply_change(1, SearchableModel::Card, ChangeKind::Delete).await.expect("Delete.");
	let remaining: i64 =
		sqlx::query_scalar("SELECT count(*) FROM search_index WHERE model = 'card' AND id = 1")
			.fetch_one(&db.pool)
			.await
			.expect("Failed to count indexed cards.");

	assert_eq!((report.deleted, report.inserted), (1, 0));
	assert_eq!(remaining, 0);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}
