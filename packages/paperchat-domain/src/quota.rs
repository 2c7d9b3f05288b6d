use serde::{Deserialize, Serialize};

/// Read-only plan flag resolved from the billing collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
	pub has_active_membership: bool,
}

/// Per-tier cap on persisted human messages for one document.
///
/// Invariant (enforced by config validation): `pro_limit > free_limit >= 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuotaPolicy {
	pub free_limit: u32,
	pub pro_limit: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuotaDenial {
	UpgradeRequired { limit: u32 },
	PlanLimitReached { limit: u32 },
}
impl QuotaDenial {
	pub fn reason(&self) -> String {
		match self {
			Self::UpgradeRequired { limit } => format!(
				"You have reached the free limit of {limit} questions per document. Upgrade to continue."
			),
			Self::PlanLimitReached { limit } => {
				format!("You have reached your plan limit of {limit} questions per document.")
			},
		}
	}

	pub fn upgrade_required(&self) -> bool {
		matches!(self, Self::UpgradeRequired { .. })
	}
}
impl std::fmt::Display for QuotaDenial {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.reason())
	}
}

/// Admission check for one new question. The caller supplies a fresh count of
/// persisted human messages; nothing is cached here.
pub fn admit(human_count: u64, plan: Plan, policy: &QuotaPolicy) -> Result<(), QuotaDenial> {
	if plan.has_active_membership {
		if human_count >= u64::from(policy.pro_limit) {
			return Err(QuotaDenial::PlanLimitReached { limit: policy.pro_limit });
		}
	} else if human_count >= u64::from(policy.free_limit) {
		return Err(QuotaDenial::UpgradeRequired { limit: policy.free_limit });
	}

	Ok(())
}
