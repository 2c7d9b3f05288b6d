use time::OffsetDateTime;

use crate::chat::{ChatEntry, Role};

/// Body shown for the optimistic pending-answer entry.
pub const PLACEHOLDER_BODY: &str = "Thinking...";

/// Merges a locally-optimistic message list with an authoritative snapshot.
///
/// If the local list does not end in a placeholder, the snapshot wins
/// outright. If it does, the snapshot only wins once it contains a real AI
/// entry past the locally-known persisted prefix; until then the local list
/// is kept unchanged so the view never visibly shrinks while an answer is
/// pending. Matching by position rather than by question text keeps a
/// resubmitted identical question pending until its own answer arrives.
pub fn reconcile(local: &[ChatEntry], snapshot: &[ChatEntry]) -> Vec<ChatEntry> {
	let Some(last) = local.last() else {
		return snapshot.to_vec();
	};

	if last.role != Role::Placeholder {
		return snapshot.to_vec();
	}

	// Persisted entries carry an id; the optimistic pair does not, so the
	// pending question can only land at or after `persisted_len` in the log.
	let persisted_len = local.iter().filter(|entry| entry.id.is_some()).count();
	let answered = snapshot.len() > persisted_len
		&& snapshot[persisted_len..].iter().any(|entry| entry.role == Role::Ai);

	if answered { snapshot.to_vec() } else { local.to_vec() }
}

/// Transport-free client view of one document's chat.
///
/// Holds at most one trailing optimistic pair: the human question just
/// submitted plus a placeholder answer entry.
#[derive(Clone, Debug, Default)]
pub struct ChatView {
	entries: Vec<ChatEntry>,
	last_error: Option<String>,
}
impl ChatView {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn entries(&self) -> &[ChatEntry] {
		&self.entries
	}

	pub fn last_error(&self) -> Option<&str> {
		self.last_error.as_deref()
	}

	pub fn has_pending(&self) -> bool {
		self.entries.last().map(|entry| entry.role == Role::Placeholder).unwrap_or(false)
	}

	/// Appends the optimistic question/placeholder pair. Returns `false` when
	/// an answer is already pending; a second submission must wait.
	pub fn submit_question(&mut self, question: &str, now: OffsetDateTime) -> bool {
		if self.has_pending() {
			return false;
		}

		self.entries.push(ChatEntry::new(Role::Human, question, now));
		self.entries.push(ChatEntry::new(Role::Placeholder, PLACEHOLDER_BODY, now));

		true
	}

	/// Applies an authoritative snapshot through [`reconcile`].
	pub fn apply_snapshot(&mut self, snapshot: &[ChatEntry]) {
		self.entries = reconcile(&self.entries, snapshot);
		self.last_error = None;
	}

	/// Replaces a pending placeholder with a client-only failure entry. The
	/// persisted log is untouched; the question stays durable server-side.
	pub fn fail_pending(&mut self, reason: &str, now: OffsetDateTime) {
		if !self.has_pending() {
			return;
		}

		self.entries.pop();
		self.entries.push(ChatEntry::new(Role::Ai, format!("Whoops... {reason}"), now));
	}

	/// Records a subscription error while keeping the last known list.
	pub fn record_error(&mut self, message: impl Into<String>) {
		self.last_error = Some(message.into());
	}
}
