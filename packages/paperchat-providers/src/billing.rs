use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// Fetches one owner's plan from the billing collaborator.
///
/// The endpoint is expected to answer `{"has_active_membership": bool}`; a
/// missing flag is treated as the free tier.
pub async fn get_plan(
	cfg: &paperchat_config::BillingProviderConfig,
	owner_id: &str,
) -> Result<bool> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let res = client
		.get(url)
		.query(&[("owner_id", owner_id)])
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.send()
		.await
		.map_err(Error::classify)?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_plan_response(json)
}

fn parse_plan_response(json: Value) -> Result<bool> {
	match json.get("has_active_membership") {
		Some(flag) => flag.as_bool().ok_or_else(|| Error::InvalidResponse {
			message: "Plan flag has_active_membership must be a boolean.".to_string(),
		}),
		None => Ok(false),
	}
}
