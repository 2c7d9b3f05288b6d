use serde::{Deserialize, Serialize};

/// Ingestion states of a document.
///
/// `Ready` and `Failed` are terminal for the ingestion path; deletion removes
/// the record entirely and is handled elsewhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
	Uploading,
	Uploaded,
	Saving,
	Generating,
	Ready,
	Failed,
}
impl DocumentStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Uploading => "uploading",
			Self::Uploaded => "uploaded",
			Self::Saving => "saving",
			Self::Generating => "generating",
			Self::Ready => "ready",
			Self::Failed => "failed",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"uploading" => Some(Self::Uploading),
			"uploaded" => Some(Self::Uploaded),
			"saving" => Some(Self::Saving),
			"generating" => Some(Self::Generating),
			"ready" => Some(Self::Ready),
			"failed" => Some(Self::Failed),
			_ => None,
		}
	}

	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Ready | Self::Failed)
	}

	/// Whether `self -> to` is a legal transition. `Failed` is reachable from
	/// any non-terminal state.
	pub fn can_transition(&self, to: Self) -> bool {
		if self.is_terminal() {
			return false;
		}
		if to == Self::Failed {
			return true;
		}

		matches!(
			(self, to),
			(Self::Uploading, Self::Uploaded)
				| (Self::Uploaded, Self::Saving)
				| (Self::Saving, Self::Generating)
				| (Self::Generating, Self::Ready)
		)
	}
}
impl std::fmt::Display for DocumentStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
