use std::time::Duration as StdDuration;

use time::{Duration, OffsetDateTime};
use tokio::time as tokio_time;

use paperchat_service::PaperchatService;
use paperchat_storage::{models::IndexingOutboxEntry, outbox};

const BASE_BACKOFF_MS: i64 = 500;
const MAX_BACKOFF_MS: i64 = 30_000;
const MAX_OUTBOX_ERROR_CHARS: usize = 1_024;

/// Drains the indexing outbox forever. One job per iteration keeps lease
/// bookkeeping simple; concurrency comes from running several workers, which
/// `FOR UPDATE SKIP LOCKED` claiming makes safe.
pub async fn run_worker(service: PaperchatService) -> color_eyre::Result<()> {
	let poll_interval = StdDuration::from_millis(service.cfg.indexing.poll_interval_ms);

	loop {
		match process_outbox_once(&service).await {
			Ok(true) => {
				// Drain the backlog before sleeping again.
				continue;
			},
			Ok(false) => {},
			Err(err) => {
				tracing::error!(error = %err, "Indexing outbox processing failed.");
			},
		}

		tokio_time::sleep(poll_interval).await;
	}
}

/// Claims and runs at most one job. Returns whether a job was claimed.
async fn process_outbox_once(service: &PaperchatService) -> color_eyre::Result<bool> {
	let now = OffsetDateTime::now_utc();
	let job =
		outbox::claim_next_indexing_job(&service.db, now, service.cfg.indexing.lease_seconds).await?;
	let Some(job) = job else {
		return Ok(false);
	};

	match handle_job(service, &job).await {
		Ok(()) => {
			outbox::mark_indexing_done(&service.db, job.outbox_id, OffsetDateTime::now_utc()).await?;
		},
		Err(err) => {
			fail_job(service, &job, &err.to_string()).await?;
			tracing::error!(
				error = %err,
				outbox_id = %job.outbox_id,
				document_id = %job.document_id,
				"Outbox job failed."
			);
		},
	}

	Ok(true)
}

async fn handle_job(
	service: &PaperchatService,
	job: &IndexingOutboxEntry,
) -> paperchat_service::Result<()> {
	match job.op.as_str() {
		outbox::OP_INDEX => {
			let report = service.index_document(job.document_id).await?;

			tracing::info!(
				document_id = %report.document_id,
				chunks = report.chunks,
				"Indexing job completed."
			);

			Ok(())
		},
		other => Err(paperchat_service::Error::InvalidRequest {
			message: format!("Unsupported outbox op: {other}."),
		}),
	}
}

/// Reschedules a failed job with backoff, or parks it and fails the document
/// once attempts are exhausted.
async fn fail_job(
	service: &PaperchatService,
	job: &IndexingOutboxEntry,
	error: &str,
) -> color_eyre::Result<()> {
	let attempts = job.attempts.saturating_add(1);
	let error_text = truncate_error(error);
	let now = OffsetDateTime::now_utc();

	if attempts >= service.cfg.indexing.max_attempts {
		outbox::mark_indexing_dead(&service.db, job.outbox_id, attempts, &error_text, now).await?;
		service.mark_indexing_failed(job.document_id, &error_text).await?;
		tracing::warn!(
			document_id = %job.document_id,
			attempts,
			"Indexing gave up; document marked failed."
		);

		return Ok(());
	}

	let available_at = now + backoff_for_attempt(attempts);

	outbox::mark_indexing_failed(&service.db, job.outbox_id, attempts, &error_text, available_at, now)
		.await?;

	Ok(())
}

fn backoff_for_attempt(attempt: i32) -> Duration {
	let attempts = attempt.max(1) as u32;
	let exp = attempts.saturating_sub(1).min(6);
	let base = BASE_BACKOFF_MS.saturating_mul(1 << exp);
	let capped = base.min(MAX_BACKOFF_MS);

	Duration::milliseconds(capped)
}

fn truncate_error(text: &str) -> String {
	if text.chars().count() <= MAX_OUTBOX_ERROR_CHARS {
		return text.to_string();
	}

	let mut out: String = text.chars().take(MAX_OUTBOX_ERROR_CHARS).collect();

	out.push_str("...");

	out
}
