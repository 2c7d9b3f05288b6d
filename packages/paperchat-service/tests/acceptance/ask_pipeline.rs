use std::sync::Arc;

use paperchat_domain::Role;
use paperchat_service::{AskRequest, Error, ListMessagesRequest, Providers, SubscribeRequest, UpstreamKind};

use super::{
	FailingCompletion, StubBilling, StubEmbedding, build_service, free_tier_providers,
	seed_ready_document, test_config, test_env,
};

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set PAPERCHAT_PG_DSN and PAPERCHAT_QDRANT_URL to run."]
async fn answer_appends_an_ordered_question_answer_pair() {
	let Some((test_db, qdrant_url)) = test_env().await else {
		eprintln!(
			"Skipping answer_appends_an_ordered_question_answer_pair; set PAPERCHAT_PG_DSN and PAPERCHAT_QDRANT_URL to run this test."
		);

		return;
	};
	let blob_root = tempfile::tempdir().expect("Failed to create temp dir.");
	let cfg = test_config(&test_db, &qdrant_url, &blob_root.path().to_string_lossy());
	let service = build_service(cfg, free_tier_providers("The report covers Q3."))
		.await
		.expect("Failed to build service.");
	let document_id = seed_ready_document(&service, "owner-1").await;
	let response = service
		.ask(AskRequest {
			owner_id: "owner-1".to_string(),
			document_id,
			question: "What does the report cover?".to_string(),
		})
		.await
		.expect("Ask should succeed.");

	assert_eq!(response.human.role, Role::Human);
	assert_eq!(response.human.body, "What does the report cover?");
	assert_eq!(response.ai.role, Role::Ai);
	assert_eq!(response.ai.body, "The report covers Q3.");

	let log = service
		.list_messages(ListMessagesRequest { owner_id: "owner-1".to_string(), document_id })
		.await
		.expect("Failed to list messages.");

	assert_eq!(log.entries.len(), 2);
	assert_eq!(log.entries[0].role, Role::Human);
	assert_eq!(log.entries[1].role, Role::Ai);
	assert!(log.entries[0].created_at <= log.entries[1].created_at);

	drop(service);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set PAPERCHAT_PG_DSN and PAPERCHAT_QDRANT_URL to run."]
async fn completion_failure_keeps_the_question_durable() {
	let Some((test_db, qdrant_url)) = test_env().await else {
		eprintln!(
			"Skipping completion_failure_keeps_the_question_durable; set PAPERCHAT_PG_DSN and PAPERCHAT_QDRANT_URL to run this test."
		);

		return;
	};
	let blob_root = tempfile::tempdir().expect("Failed to create temp dir.");
	let cfg = test_config(&test_db, &qdrant_url, &blob_root.path().to_string_lossy());
	let providers = Providers::new(
		Arc::new(StubEmbedding),
		Arc::new(FailingCompletion),
		Arc::new(StubBilling { has_active_membership: false }),
	);
	let service = build_service(cfg, providers).await.expect("Failed to build service.");
	let document_id = seed_ready_document(&service, "owner-1").await;
	let result = service
		.ask(AskRequest {
			owner_id: "owner-1".to_string(),
			document_id,
			question: "Will this fail?".to_string(),
		})
		.await;

	let Err(Error::Upstream { which: UpstreamKind::Completion, .. }) = result else {
		panic!("Expected a completion upstream failure, got {result:?}.");
	};

	// The question stays in the log; no answer entry was written.
	let log = service
		.list_messages(ListMessagesRequest { owner_id: "owner-1".to_string(), document_id })
		.await
		.expect("Failed to list messages.");

	assert_eq!(log.entries.len(), 1);
	assert_eq!(log.entries[0].role, Role::Human);
	assert_eq!(log.entries[0].body, "Will this fail?");

	drop(service);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set PAPERCHAT_PG_DSN and PAPERCHAT_QDRANT_URL to run."]
async fn subscribers_observe_each_append() {
	let Some((test_db, qdrant_url)) = test_env().await else {
		eprintln!(
			"Skipping subscribers_observe_each_append; set PAPERCHAT_PG_DSN and PAPERCHAT_QDRANT_URL to run this test."
		);

		return;
	};
	let blob_root = tempfile::tempdir().expect("Failed to create temp dir.");
	let cfg = test_config(&test_db, &qdrant_url, &blob_root.path().to_string_lossy());
	let service = build_service(cfg, free_tier_providers("Answer."))
		.await
		.expect("Failed to build service.");
	let document_id = seed_ready_document(&service, "owner-1").await;
	let mut receiver = service
		.subscribe(SubscribeRequest { owner_id: "owner-1".to_string(), document_id })
		.await
		.expect("Failed to subscribe.");

	// Initial snapshot is the empty persisted log.
	receiver.changed().await.expect("Subscription closed early.");
	assert!(receiver.borrow_and_update().entries.is_empty());

	service
		.ask(AskRequest {
			owner_id: "owner-1".to_string(),
			document_id,
			question: "Anyone listening?".to_string(),
		})
		.await
		.expect("Ask should succeed.");

	// The final snapshot holds the full ordered pair.
	receiver.changed().await.expect("Subscription closed early.");

	let snapshot = receiver.borrow_and_update().clone();

	assert_eq!(snapshot.entries.last().map(|entry| entry.role), Some(Role::Ai));
	assert_eq!(snapshot.entries.len(), 2);

	drop(service);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set PAPERCHAT_PG_DSN and PAPERCHAT_QDRANT_URL to run."]
async fn asking_about_someone_elses_document_is_not_found() {
	let Some((test_db, qdrant_url)) = test_env().await else {
		eprintln!(
			"Skipping asking_about_someone_elses_document_is_not_found; set PAPERCHAT_PG_DSN and PAPERCHAT_QDRANT_URL to run this test."
		);

		return;
	};
	let blob_root = tempfile::tempdir().expect("Failed to create temp dir.");
	let cfg = test_config(&test_db, &qdrant_url, &blob_root.path().to_string_lossy());
	let service = build_service(cfg, free_tier_providers("Answer."))
		.await
		.expect("Failed to build service.");
	let document_id = seed_ready_document(&service, "owner-1").await;
	let result = service
		.ask(AskRequest {
			owner_id: "owner-2".to_string(),
			document_id,
			question: "Can I see this?".to_string(),
		})
		.await;

	assert!(matches!(result, Err(Error::NotFound { .. })), "Got {result:?}.");

	drop(service);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}
