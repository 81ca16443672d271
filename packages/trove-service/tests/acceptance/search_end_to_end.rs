use std::collections::BTreeSet;

use trove_service::{Indexer, SearchRequest};

use super::{bootstrap, build_service, test_config, test_db};

fn admin_request(q: &str) -> SearchRequest {
	SearchRequest {
		q: Some(q.to_string()),
		current_user_id: Some(1),
		permissions: Some(vec!["/".to_string()]),
		..Default::default()
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TROVE_PG_DSN to run."]
async fn source_and_index_engines_agree() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping source_and_index_engines_agree; set TROVE_PG_DSN to run this test.");

		return;
	};
	let db = bootstrap(&test_db).await;
	let source = build_service(test_config(test_db.dsn().to_string(), "source"), &db);
	let response = source.search(admin_request("orders")).await.expect("Source search failed.");
	let names = response.data.iter().map(|item| item.name.clone()).collect::<BTreeSet<_>>();

	assert_eq!(response.total, 2);
	assert_eq!(names, BTreeSet::from(["Orders by month".to_string(), "orders".to_string()]));

	Indexer::new(&db).reindex_all().await.expect("Reindex failed.");

	let index = build_service(test_config(test_db.dsn().to_string(), "index"), &db);
	let indexed = index.search(admin_request("orders")).await.expect("Index search failed.");
	let indexed_names = indexed.data.iter().map(|item| item.name.clone()).collect::<BTreeSet<_>>();

	assert_eq!(indexed_names, names);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TROVE_PG_DSN to run."]
async fn collection_permissions_hide_unreadable_items() {
	let Some(test_db) = test_db().await else {
		eprintln!(
			"Skipping collection_permissions_hide_unreadable_items; set TROVE_PG_DSN to run this test."
		);

		return;
	};
	let db = bootstrap(&test_db).await;
	let service = build_service(test_config(test_db.dsn().to_string(), "source"), &db);
	let request = SearchRequest {
		q: Some("revenue".to_string()),
		current_user_id: Some(2),
		permissions: Some(vec!["/collection/5/read/".to_string()]),
		..Default::default()
	};
	let response = service.search(request.clone()).await.expect("Search failed.");

	assert!(response.data.is_empty());

	let response = service
		.search(SearchRequest {
			permissions: Some(vec!["/collection/6/read/".to_string()]),
			..request
		})
		.await
		.expect("Search failed.");

	assert_eq!(response.data.len(), 1);
	assert_eq!(response.data[0].name, "Revenue");

	test_db.cleanup().await.expect("Failed to clean up test database.");
}
