use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CapaService, Error, Result};
use capa_domain::{KnowledgeRecord, normalize};

const TEMPORARY_KEYS: [&str; 2] = ["temp_actions", "temporary_actions"];
const PREVENTIVE_KEYS: [&str; 2] = ["prev_actions", "preventive_actions"];

/// What a closed issue hands over for retention.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClosureInput {
	pub source_id: i64,
	#[serde(default)]
	pub machine_name: Option<String>,
	#[serde(default)]
	pub issue_description: String,
	#[serde(default)]
	pub whys_json: Option<String>,
	/// The user-adjusted plan: `{"temp_actions": [...], "prev_actions": [...]}`.
	#[serde(default)]
	pub action_plan_json: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CaptureOutcome {
	Stored { source_id: i64 },
	Skipped { source_id: i64 },
}

impl CapaService {
	/// Upserts the knowledge record for a closed issue. Issues with neither whys nor actions are
	/// skipped.
	pub async fn capture_on_close(&self, input: ClosureInput) -> Result<CaptureOutcome> {
		let source_id = input.source_id;

		if source_id <= 0 {
			return Err(Error::InvalidRequest {
				message: format!("source_id must be positive, got {source_id}."),
			});
		}

		let whys = normalize::why_items(input.whys_json.as_deref());
		let (temporary, preventive) = split_action_plan(input.action_plan_json.as_deref());

		if whys.is_empty() && temporary.is_empty() && preventive.is_empty() {
			tracing::info!(source_id, "Closed issue has no whys or actions. Skipping capture.");

			return Ok(CaptureOutcome::Skipped { source_id });
		}

		let mut record = KnowledgeRecord::new(source_id, input.issue_description.trim());

		record.machine_name =
			input.machine_name.map(|name| name.trim().to_string()).filter(|name| !name.is_empty());
		record.whys_json = if whys.is_empty() { None } else { input.whys_json };
		record.temporary_actions_json = encode_list(&temporary);
		record.preventive_actions_json = encode_list(&preventive);

		self.store.upsert(&record).await?;

		tracing::info!(
			source_id,
			whys = whys.len(),
			temporary_actions = temporary.len(),
			preventive_actions = preventive.len(),
			"Captured knowledge record."
		);

		Ok(CaptureOutcome::Stored { source_id })
	}

	/// Soft-disables or re-enables a record. Unknown ids are reported as `NotFound`.
	pub async fn set_active(&self, source_id: i64, active: bool) -> Result<()> {
		if self.store.set_active(source_id, active).await? {
			tracing::info!(source_id, active, "Updated knowledge record state.");

			Ok(())
		} else {
			Err(Error::NotFound {
				message: format!("No knowledge record for source_id {source_id}."),
			})
		}
	}
}

/// Temporary and preventive action texts from a plan payload. Anything unreadable counts as no
/// actions.
fn split_action_plan(raw: Option<&str>) -> (Vec<String>, Vec<String>) {
	let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
		return (Vec::new(), Vec::new());
	};
	let value = match serde_json::from_str::<Value>(raw) {
		Ok(Value::String(inner)) => serde_json::from_str::<Value>(&inner).unwrap_or(Value::Null),
		Ok(value) => value,
		Err(_) => Value::Null,
	};

	(actions_under(&value, &TEMPORARY_KEYS), actions_under(&value, &PREVENTIVE_KEYS))
}

fn actions_under(plan: &Value, keys: &[&str]) -> Vec<String> {
	keys.iter()
		.find_map(|key| plan.get(*key))
		.map(normalize::action_items_from_value)
		.unwrap_or_default()
}

fn encode_list(items: &[String]) -> Option<String> {
	if items.is_empty() {
		return None;
	}

	serde_json::to_string(items).ok()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reads_the_adjusted_plan_shape() {
		let raw = r#"{
			"temp_actions": [{"action_text": "Clear the jam"}, {}],
			"prev_actions": [{"action_text": "Weekly roller check"}, "Train operators"]
		}"#;
		let (temporary, preventive) = split_action_plan(Some(raw));

		assert_eq!(temporary, vec!["Clear the jam".to_string()]);
		assert_eq!(preventive, vec![
			"Weekly roller check".to_string(),
			"Train operators".to_string()
		]);
	}

	#[test]
	fn accepts_long_keys_and_double_encoding() {
		let inner = r#"{"temporary_actions": ["Stop line"], "preventive_actions": []}"#;
		let raw = serde_json::to_string(inner).expect("encode");
		let (temporary, preventive) = split_action_plan(Some(&raw));

		assert_eq!(temporary, vec!["Stop line".to_string()]);
		assert!(preventive.is_empty());
	}

	#[test]
	fn unreadable_plans_have_no_actions() {
		assert_eq!(split_action_plan(Some("{not json")), (Vec::new(), Vec::new()));
		assert_eq!(split_action_plan(Some("[1, 2]")), (Vec::new(), Vec::new()));
		assert_eq!(split_action_plan(None), (Vec::new(), Vec::new()));
	}

	#[test]
	fn empty_lists_encode_as_null() {
		assert_eq!(encode_list(&[]), None);
		assert_eq!(encode_list(&["a".to_string()]).as_deref(), Some(r#"["a"]"#));
	}
}
