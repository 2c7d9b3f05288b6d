use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

const SYSTEM_PROMPT: &str = "\
You answer questions about one uploaded document. Use only the provided context \
excerpts. When the context does not contain the answer, say so instead of guessing.";

/// Asks the completion provider for an answer grounded in `context` chunks.
pub async fn complete(
	cfg: &paperchat_config::CompletionProviderConfig,
	question: &str,
	context: &[String],
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": [
			{ "role": "system", "content": render_system_prompt(context) },
			{ "role": "user", "content": question },
		],
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await
		.map_err(Error::classify)?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_completion_response(json)
}

fn render_system_prompt(context: &[String]) -> String {
	let mut prompt = String::from(SYSTEM_PROMPT);

	if !context.is_empty() {
		prompt.push_str("\n\nContext excerpts:");

		for (at, chunk) in context.iter().enumerate() {
			prompt.push_str(&format!("\n\n[{}] {chunk}", at + 1));
		}
	}

	prompt
}

fn parse_completion_response(json: Value) -> Result<String> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|choices| choices.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|message| message.get("content"))
		.and_then(|v| v.as_str())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Completion response is missing choices[0].message.content.".to_string(),
		})?;

	Ok(content.to_string())
}
