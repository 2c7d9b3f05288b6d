use std::sync::{Arc, Mutex, atomic::AtomicUsize};

use tokio::sync::watch;

use paperchat_domain::DocumentStatus;
use paperchat_service::{
	AskRequest, ListRequest, Providers, UploadProgress, UploadRequest,
};
use paperchat_storage::outbox;

use super::{SpyCompletion, StubBilling, StubEmbedding, build_service, test_config, test_env};

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set PAPERCHAT_PG_DSN and PAPERCHAT_QDRANT_URL to run."]
async fn upload_walks_the_lifecycle_and_indexing_marks_ready() {
	let Some((test_db, qdrant_url)) = test_env().await else {
		eprintln!(
			"Skipping upload_walks_the_lifecycle_and_indexing_marks_ready; set PAPERCHAT_PG_DSN and PAPERCHAT_QDRANT_URL to run this test."
		);

		return;
	};
	let blob_root = tempfile::tempdir().expect("Failed to create temp dir.");
	let cfg = test_config(&test_db, &qdrant_url, &blob_root.path().to_string_lossy());
	let seen_context = Arc::new(Mutex::new(Vec::new()));
	let providers = Providers::new(
		Arc::new(StubEmbedding),
		Arc::new(SpyCompletion {
			answer: "Grounded answer.".to_string(),
			calls: Arc::new(AtomicUsize::new(0)),
			seen_context: seen_context.clone(),
		}),
		Arc::new(StubBilling { has_active_membership: false }),
	);
	let service = build_service(cfg, providers).await.expect("Failed to build service.");

	// A 1024-byte plain-text report.
	let line = "Quarterly revenue grew in every region during the period.\n";
	let mut body = String::new();

	while body.len() + line.len() <= 1_024 {
		body.push_str(line);
	}
	body.push_str(&"x".repeat(1_024 - body.len()));

	let (progress_tx, mut progress_rx) = watch::channel(UploadProgress::Uploading { fraction: 0. });
	let phases = Arc::new(Mutex::new(Vec::new()));
	let recorder = {
		let phases = phases.clone();

		tokio::spawn(async move {
			while progress_rx.changed().await.is_ok() {
				let phase = *progress_rx.borrow_and_update();

				phases.lock().unwrap_or_else(|err| err.into_inner()).push(phase);
			}
		})
	};
	let response = service
		.upload(
			UploadRequest {
				owner_id: "owner-1".to_string(),
				name: "report.txt".to_string(),
				mime_type: "text/plain".to_string(),
				data: body.clone().into_bytes(),
			},
			Some(&progress_tx),
		)
		.await
		.expect("Upload should succeed.");

	drop(progress_tx);

	let _ = recorder.await;

	assert_eq!(response.status, DocumentStatus::Generating);
	assert!(response.download_url.ends_with(&format!("owner-1/{}", response.document_id)));

	// Phases arrive in lifecycle order, ending at the generating hand-off.
	let phases = phases.lock().unwrap_or_else(|err| err.into_inner()).clone();
	let uploaded_at = phases
		.iter()
		.position(|phase| *phase == UploadProgress::Uploaded)
		.expect("Expected an uploaded phase.");
	let saving_at = phases
		.iter()
		.position(|phase| *phase == UploadProgress::Saving)
		.expect("Expected a saving phase.");
	let generating_at = phases
		.iter()
		.position(|phase| *phase == UploadProgress::Generating)
		.expect("Expected a generating phase.");

	assert!(uploaded_at < saving_at && saving_at < generating_at);
	assert!(matches!(phases.first(), Some(UploadProgress::Uploading { .. })));

	// The enqueued job indexes the document and marks it ready.
	let now = time::OffsetDateTime::now_utc();
	let job = outbox::claim_next_indexing_job(&service.db, now, 30)
		.await
		.expect("Failed to claim indexing job.")
		.expect("Expected an indexing job.");

	assert_eq!(job.document_id, response.document_id);

	let report =
		service.index_document(job.document_id).await.expect("Indexing should succeed.");

	assert!(report.chunks >= 5, "Expected several chunks for 1024 chars, got {}.", report.chunks);

	outbox::mark_indexing_done(&service.db, job.outbox_id, now)
		.await
		.expect("Failed to mark job done.");

	let listing = service
		.list_documents(ListRequest { owner_id: "owner-1".to_string() })
		.await
		.expect("Failed to list documents.");
	let summary = listing
		.documents
		.iter()
		.find(|doc| doc.document_id == response.document_id)
		.expect("Expected the uploaded document in the listing.");

	assert_eq!(summary.status, DocumentStatus::Ready);
	assert_eq!(summary.size_bytes, 1_024);

	// Retrieval now feeds stored chunks into the completion call.
	service
		.ask(AskRequest {
			owner_id: "owner-1".to_string(),
			document_id: response.document_id,
			question: "How did revenue develop?".to_string(),
		})
		.await
		.expect("Ask should succeed after indexing.");

	let seen = seen_context.lock().unwrap_or_else(|err| err.into_inner());

	assert!(
		seen.iter().any(|chunk| chunk.contains("Quarterly revenue grew")),
		"Expected retrieved context to contain document text."
	);

	drop(seen);
	drop(service);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set PAPERCHAT_PG_DSN and PAPERCHAT_QDRANT_URL to run."]
async fn oversized_upload_fails_the_document() {
	let Some((test_db, qdrant_url)) = test_env().await else {
		eprintln!(
			"Skipping oversized_upload_fails_the_document; set PAPERCHAT_PG_DSN and PAPERCHAT_QDRANT_URL to run this test."
		);

		return;
	};
	let blob_root = tempfile::tempdir().expect("Failed to create temp dir.");
	let mut cfg = test_config(&test_db, &qdrant_url, &blob_root.path().to_string_lossy());

	cfg.storage.blobs.max_bytes = 16;

	let service = build_service(cfg, super::free_tier_providers("Answer."))
		.await
		.expect("Failed to build service.");
	let result = service
		.upload(
			UploadRequest {
				owner_id: "owner-1".to_string(),
				name: "big.txt".to_string(),
				mime_type: "text/plain".to_string(),
				data: vec![b'x'; 64],
			},
			None,
		)
		.await;

	assert!(result.is_err(), "Expected the oversized upload to fail.");

	let listing = service
		.list_documents(ListRequest { owner_id: "owner-1".to_string() })
		.await
		.expect("Failed to list documents.");

	assert_eq!(listing.documents.len(), 1);
	assert_eq!(listing.documents[0].status, DocumentStatus::Failed);
	assert!(listing.documents[0].failure_reason.is_some());

	drop(service);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set PAPERCHAT_PG_DSN and PAPERCHAT_QDRANT_URL to run."]
async fn metadata_failure_after_storage_marks_the_document_failed() {
	let Some((test_db, qdrant_url)) = test_env().await else {
		eprintln!(
			"Skipping metadata_failure_after_storage_marks_the_document_failed; set PAPERCHAT_PG_DSN and PAPERCHAT_QDRANT_URL to run this test."
		);

		return;
	};
	let blob_root = tempfile::tempdir().expect("Failed to create temp dir.");
	let cfg = test_config(&test_db, &qdrant_url, &blob_root.path().to_string_lossy());
	let service = build_service(cfg, super::free_tier_providers("Answer."))
		.await
		.expect("Failed to build service.");

	// The blob write succeeds, then enqueueing the indexing job hits the
	// missing table. The document must land in failed, not stay mid-lifecycle.
	sqlx::query("DROP TABLE indexing_outbox")
		.execute(&service.db.pool)
		.await
		.expect("Failed to drop outbox table.");

	let result = service
		.upload(
			UploadRequest {
				owner_id: "owner-1".to_string(),
				name: "report.txt".to_string(),
				mime_type: "text/plain".to_string(),
				data: b"A body that stores fine but cannot be enqueued.".to_vec(),
			},
			None,
		)
		.await;

	assert!(result.is_err(), "Expected the upload to fail.");

	let listing = service
		.list_documents(ListRequest { owner_id: "owner-1".to_string() })
		.await
		.expect("Failed to list documents.");

	assert_eq!(listing.documents.len(), 1);
	assert_eq!(listing.documents[0].status, DocumentStatus::Failed);
	assert!(listing.documents[0].failure_reason.is_some());

	drop(service);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}
