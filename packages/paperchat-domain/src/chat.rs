use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Closed set of message authors. `Placeholder` exists only in client-side
/// views and must never reach the persisted log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	Human,
	Ai,
	Placeholder,
}
impl Role {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Human => "human",
			Self::Ai => "ai",
			Self::Placeholder => "placeholder",
		}
	}

	/// Parses a persisted role. `placeholder` is deliberately absent.
	pub fn parse_persisted(raw: &str) -> Option<Self> {
		match raw {
			"human" => Some(Self::Human),
			"ai" => Some(Self::Ai),
			_ => None,
		}
	}

	pub fn is_persistable(&self) -> bool {
		!matches!(self, Self::Placeholder)
	}
}

/// One entry of a document's chat log, or a client-only optimistic entry when
/// `id` is `None`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatEntry {
	pub id: Option<Uuid>,
	pub role: Role,
	pub body: String,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}
impl ChatEntry {
	pub fn new(role: Role, body: impl Into<String>, created_at: OffsetDateTime) -> Self {
		Self { id: None, role, body: body.into(), created_at }
	}
}
