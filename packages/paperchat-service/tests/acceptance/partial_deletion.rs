use paperchat_service::{
	AskRequest, DeleteRequest, DeletionStep, Error, ListRequest, PaperchatService, UploadRequest,
};
use paperchat_storage::{blob::FsBlobStore, db::Db, outbox, qdrant::QdrantStore};

use super::{build_service, free_tier_providers, test_config, test_env};

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set PAPERCHAT_PG_DSN and PAPERCHAT_QDRANT_URL to run."]
async fn full_deletion_removes_every_store() {
	let Some((test_db, qdrant_url)) = test_env().await else {
		eprintln!(
			"Skipping full_deletion_removes_every_store; set PAPERCHAT_PG_DSN and PAPERCHAT_QDRANT_URL to run this test."
		);

		return;
	};
	let blob_root = tempfile::tempdir().expect("Failed to create temp dir.");
	let cfg = test_config(&test_db, &qdrant_url, &blob_root.path().to_string_lossy());
	let service =
		build_service(cfg, free_tier_providers("Answer.")).await.expect("Failed to build service.");
	let response = service
		.upload(
			UploadRequest {
				owner_id: "owner-1".to_string(),
				name: "report.txt".to_string(),
				mime_type: "text/plain".to_string(),
				data: b"A short report about revenue and growth in all regions.".to_vec(),
			},
			None,
		)
		.await
		.expect("Upload should succeed.");
	let now = time::OffsetDateTime::now_utc();
	let job = outbox::claim_next_indexing_job(&service.db, now, 30)
		.await
		.expect("Failed to claim indexing job.")
		.expect("Expected an indexing job.");

	service.index_document(job.document_id).await.expect("Indexing should succeed.");
	outbox::mark_indexing_done(&service.db, job.outbox_id, now)
		.await
		.expect("Failed to mark job done.");

	let deleted = service
		.delete(DeleteRequest {
			owner_id: "owner-1".to_string(),
			document_id: response.document_id,
			steps: None,
		})
		.await
		.expect("Deletion should succeed.");

	assert_eq!(deleted.completed, DeletionStep::ALL.to_vec());

	// Metadata, blob, and chat access are all gone.
	let listing = service
		.list_documents(ListRequest { owner_id: "owner-1".to_string() })
		.await
		.expect("Failed to list documents.");

	assert!(listing.documents.is_empty());

	let key = FsBlobStore::key_for("owner-1", response.document_id);

	assert!(matches!(
		service.blobs.read(&key).await,
		Err(paperchat_storage::Error::NotFound(_))
	));

	let ask = service
		.ask(AskRequest {
			owner_id: "owner-1".to_string(),
			document_id: response.document_id,
			question: "Still there?".to_string(),
		})
		.await;

	assert!(matches!(ask, Err(Error::NotFound { .. })), "Got {ask:?}.");

	drop(service);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set PAPERCHAT_PG_DSN and PAPERCHAT_QDRANT_URL to run."]
async fn deleting_someone_elses_document_is_not_found() {
	let Some((test_db, qdrant_url)) = test_env().await else {
		eprintln!(
			"Skipping deleting_someone_elses_document_is_not_found; set PAPERCHAT_PG_DSN and PAPERCHAT_QDRANT_URL to run this test."
		);

		return;
	};
	let blob_root = tempfile::tempdir().expect("Failed to create temp dir.");
	let cfg = test_config(&test_db, &qdrant_url, &blob_root.path().to_string_lossy());
	let service =
		build_service(cfg, free_tier_providers("Answer.")).await.expect("Failed to build service.");
	let response = service
		.upload(
			UploadRequest {
				owner_id: "owner-1".to_string(),
				name: "report.txt".to_string(),
				mime_type: "text/plain".to_string(),
				data: b"Revenue grew in every region this quarter.".to_vec(),
			},
			None,
		)
		.await
		.expect("Upload should succeed.");
	let now = time::OffsetDateTime::now_utc();
	let job = outbox::claim_next_indexing_job(&service.db, now, 30)
		.await
		.expect("Failed to claim indexing job.")
		.expect("Expected an indexing job.");

	service.index_document(job.document_id).await.expect("Indexing should succeed.");
	outbox::mark_indexing_done(&service.db, job.outbox_id, now)
		.await
		.expect("Failed to mark job done.");

	// Neither a full run nor a targeted one may touch another owner's stores.
	let full = service
		.delete(DeleteRequest {
			owner_id: "owner-2".to_string(),
			document_id: response.document_id,
			steps: None,
		})
		.await;

	assert!(matches!(full, Err(Error::NotFound { .. })), "Got {full:?}.");

	let targeted = service
		.delete(DeleteRequest {
			owner_id: "owner-2".to_string(),
			document_id: response.document_id,
			steps: Some(vec![DeletionStep::Vector]),
		})
		.await;

	assert!(matches!(targeted, Err(Error::NotFound { .. })), "Got {targeted:?}.");

	// The owner still sees the document and its vectors answer questions.
	let listing = service
		.list_documents(ListRequest { owner_id: "owner-1".to_string() })
		.await
		.expect("Failed to list documents.");

	assert_eq!(listing.documents.len(), 1);

	service
		.ask(AskRequest {
			owner_id: "owner-1".to_string(),
			document_id: response.document_id,
			question: "How did revenue develop?".to_string(),
		})
		.await
		.expect("Ask should still succeed for the owner.");

	drop(service);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set PAPERCHAT_PG_DSN and PAPERCHAT_QDRANT_URL to run."]
async fn vector_failure_reports_residue_and_a_targeted_retry_clears_it() {
	let Some((test_db, qdrant_url)) = test_env().await else {
		eprintln!(
			"Skipping vector_failure_reports_residue_and_a_targeted_retry_clears_it; set PAPERCHAT_PG_DSN and PAPERCHAT_QDRANT_URL to run this test."
		);

		return;
	};
	let blob_root = tempfile::tempdir().expect("Failed to create temp dir.");
	let cfg = test_config(&test_db, &qdrant_url, &blob_root.path().to_string_lossy());
	let service =
		build_service(cfg, free_tier_providers("Answer.")).await.expect("Failed to build service.");
	let response = service
		.upload(
			UploadRequest {
				owner_id: "owner-1".to_string(),
				name: "report.txt".to_string(),
				mime_type: "text/plain".to_string(),
				data: b"A report whose vectors will outlive its first deletion.".to_vec(),
			},
			None,
		)
		.await
		.expect("Upload should succeed.");
	let now = time::OffsetDateTime::now_utc();
	let job = outbox::claim_next_indexing_job(&service.db, now, 30)
		.await
		.expect("Failed to claim indexing job.")
		.expect("Expected an indexing job.");

	service.index_document(job.document_id).await.expect("Indexing should succeed.");
	outbox::mark_indexing_done(&service.db, job.outbox_id, now)
		.await
		.expect("Failed to mark job done.");

	// Same Postgres and blob root, but the vector client points at a closed
	// port, so only the vector step can fail.
	let mut broken_cfg = test_config(&test_db, &qdrant_url, &blob_root.path().to_string_lossy());

	broken_cfg.storage.qdrant.url = "http://127.0.0.1:1".to_string();

	let broken = {
		let db = Db::connect(&broken_cfg.storage.postgres)
			.await
			.expect("Failed to connect to Postgres.");
		let blobs =
			FsBlobStore::new(&broken_cfg.storage.blobs).await.expect("Failed to open blob store.");
		let qdrant =
			QdrantStore::new(&broken_cfg.storage.qdrant).expect("Failed to build Qdrant client.");

		PaperchatService::with_providers(broken_cfg, db, blobs, qdrant, free_tier_providers("Answer."))
	};
	let result = broken
		.delete(DeleteRequest {
			owner_id: "owner-1".to_string(),
			document_id: response.document_id,
			steps: None,
		})
		.await;
	let Err(Error::PartialDeletion { failed }) = result else {
		panic!("Expected a partial deletion, got {result:?}.");
	};

	assert_eq!(failed, vec![DeletionStep::Vector]);

	// Metadata and blob are already gone; retrying just the vector step
	// against the healthy store clears the residue.
	let retry = service
		.delete(DeleteRequest {
			owner_id: "owner-1".to_string(),
			document_id: response.document_id,
			steps: Some(vec![DeletionStep::Vector]),
		})
		.await
		.expect("Targeted retry should succeed.");

	assert_eq!(retry.completed, vec![DeletionStep::Vector]);

	drop(broken);
	drop(service);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set PAPERCHAT_PG_DSN and PAPERCHAT_QDRANT_URL to run."]
async fn targeted_steps_retry_only_the_residue() {
	let Some((test_db, qdrant_url)) = test_env().await else {
		eprintln!(
			"Skipping targeted_steps_retry_only_the_residue; set PAPERCHAT_PG_DSN and PAPERCHAT_QDRANT_URL to run this test."
		);

		return;
	};
	let blob_root = tempfile::tempdir().expect("Failed to create temp dir.");
	let cfg = test_config(&test_db, &qdrant_url, &blob_root.path().to_string_lossy());
	let service =
		build_service(cfg, free_tier_providers("Answer.")).await.expect("Failed to build service.");
	let response = service
		.upload(
			UploadRequest {
				owner_id: "owner-1".to_string(),
				name: "report.txt".to_string(),
				mime_type: "text/plain".to_string(),
				data: b"Another short report body.".to_vec(),
			},
			None,
		)
		.await
		.expect("Upload should succeed.");

	// Blob-only deletion leaves the metadata row in place.
	let partial = service
		.delete(DeleteRequest {
			owner_id: "owner-1".to_string(),
			document_id: response.document_id,
			steps: Some(vec![DeletionStep::Blob]),
		})
		.await
		.expect("Blob deletion should succeed.");

	assert_eq!(partial.completed, vec![DeletionStep::Blob]);

	let listing = service
		.list_documents(ListRequest { owner_id: "owner-1".to_string() })
		.await
		.expect("Failed to list documents.");

	assert_eq!(listing.documents.len(), 1);

	// Retrying the remaining steps finishes the job; re-running the blob step
	// against an already-removed blob is not an error.
	let rest = service
		.delete(DeleteRequest {
			owner_id: "owner-1".to_string(),
			document_id: response.document_id,
			steps: Some(vec![DeletionStep::Metadata, DeletionStep::Blob, DeletionStep::Vector]),
		})
		.await
		.expect("Retry deletion should succeed.");

	assert_eq!(rest.completed, DeletionStep::ALL.to_vec());

	let listing = service
		.list_documents(ListRequest { owner_id: "owner-1".to_string() })
		.await
		.expect("Failed to list documents.");

	assert!(listing.documents.is_empty());

	drop(service);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set PAPERCHAT_PG_DSN and PAPERCHAT_QDRANT_URL to run."]
async fn deletion_is_idempotent() {
	let Some((test_db, qdrant_url)) = test_env().await else {
		eprintln!(
			"Skipping deletion_is_idempotent; set PAPERCHAT_PG_DSN and PAPERCHAT_QDRANT_URL to run this test."
		);

		return;
	};
	let blob_root = tempfile::tempdir().expect("Failed to create temp dir.");
	let cfg = test_config(&test_db, &qdrant_url, &blob_root.path().to_string_lossy());
	let service =
		build_service(cfg, free_tier_providers("Answer.")).await.expect("Failed to build service.");
	let response = service
		.upload(
			UploadRequest {
				owner_id: "owner-1".to_string(),
				name: "report.txt".to_string(),
				mime_type: "text/plain".to_string(),
				data: b"Body to delete twice.".to_vec(),
			},
			None,
		)
		.await
		.expect("Upload should succeed.");

	service
		.delete(DeleteRequest {
			owner_id: "owner-1".to_string(),
			document_id: response.document_id,
			steps: None,
		})
		.await
		.expect("First deletion should succeed.");

	// A targeted re-run of the already-completed steps is not an error.
	let retry = service
		.delete(DeleteRequest {
			owner_id: "owner-1".to_string(),
			document_id: response.document_id,
			steps: Some(DeletionStep::ALL.to_vec()),
		})
		.await
		.expect("Re-running completed steps should succeed.");

	assert_eq!(retry.completed, DeletionStep::ALL.to_vec());

	// A fresh full deletion of the now-missing document reports NotFound.
	let gone = service
		.delete(DeleteRequest {
			owner_id: "owner-1".to_string(),
			document_id: response.document_id,
			steps: None,
		})
		.await;

	assert!(matches!(gone, Err(Error::NotFound { .. })), "Got {gone:?}.");

	drop(service);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}
