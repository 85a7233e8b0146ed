use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::normalize;

/// Which payload a query wants back. Validity is inferred from field presence, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
	RootCause,
	ActionPlan,
}
impl CandidateKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::RootCause => "root_cause",
			Self::ActionPlan => "action_plan",
		}
	}
}

/// Retained learning from one closed issue. One record per source issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
	pub source_id: i64,
	#[serde(with = "crate::time_serde", default = "crate::time_serde::default_now")]
	pub created_at: OffsetDateTime,
	#[serde(default = "default_active")]
	pub active: bool,
	#[serde(default)]
	pub machine_name: Option<String>,
	#[serde(default)]
	pub issue_description: String,
	/// Serialized why-list, in any of the shapes [`normalize`] recognizes.
	#[serde(default, deserialize_with = "raw_json_field")]
	pub whys_json: Option<String>,
	#[serde(default, deserialize_with = "raw_json_field")]
	pub temporary_actions_json: Option<String>,
	#[serde(default, deserialize_with = "raw_json_field")]
	pub preventive_actions_json: Option<String>,
}
impl KnowledgeRecord {
	pub fn new(source_id: i64, issue_description: impl Into<String>) -> Self {
		Self {
			source_id,
			created_at: OffsetDateTime::now_utc(),
			active: true,
			machine_name: None,
			issue_description: issue_description.into(),
			whys_json: None,
			temporary_actions_json: None,
			preventive_actions_json: None,
		}
	}

	pub fn why_items(&self) -> Vec<String> {
		normalize::why_items(self.whys_json.as_deref())
	}

	pub fn why_text(&self) -> String {
		normalize::why_text(self.whys_json.as_deref())
	}

	pub fn temporary_actions(&self) -> Vec<String> {
		normalize::action_items(self.temporary_actions_json.as_deref())
	}

	pub fn preventive_actions(&self) -> Vec<String> {
		normalize::action_items(self.preventive_actions_json.as_deref())
	}

	pub fn is_root_cause_candidate(&self) -> bool {
		!self.why_items().is_empty()
	}

	pub fn is_action_plan_candidate(&self) -> bool {
		!self.temporary_actions().is_empty() || !self.preventive_actions().is_empty()
	}

	pub fn satisfies(&self, kind: CandidateKind) -> bool {
		match kind {
			CandidateKind::RootCause => self.is_root_cause_candidate(),
			CandidateKind::ActionPlan => self.is_action_plan_candidate(),
		}
	}

	/// Exact, case-sensitive machine equality. A record without a machine never matches.
	pub fn matches_machine(&self, machine: &str) -> bool {
		self.machine_name.as_deref() == Some(machine)
	}
}

/// The incoming issue for which recommendations are sought.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryContext {
	pub issue_description: String,
	#[serde(default)]
	pub machine_name: Option<String>,
	/// The issue's finalized why-list, compared against candidate why-lists for action plans.
	#[serde(default, deserialize_with = "raw_json_field")]
	pub whys_json: Option<String>,
}
impl QueryContext {
	pub fn new(issue_description: impl Into<String>) -> Self {
		Self { issue_description: issue_description.into(), machine_name: None, whys_json: None }
	}

	pub fn with_machine(mut self, machine_name: impl Into<String>) -> Self {
		self.machine_name = Some(machine_name.into());

		self
	}

	pub fn with_whys_json(mut self, whys_json: impl Into<String>) -> Self {
		self.whys_json = Some(whys_json.into());

		self
	}

	pub fn with_whys<I, S>(self, whys: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let items: Vec<Value> = whys.into_iter().map(|why| Value::String(why.into())).collect();

		self.with_whys_json(Value::Array(items).to_string())
	}

	/// The machine filter, if any. Blank names mean "no filter".
	pub fn machine_filter(&self) -> Option<&str> {
		self.machine_name.as_deref().map(str::trim).filter(|name| !name.is_empty())
	}

	pub fn why_text(&self) -> String {
		normalize::why_text(self.whys_json.as_deref())
	}
}

fn default_active() -> bool {
	true
}

/// Serialized list fields arrive either as JSON text or, in hand-written corpora, as inline JSON.
/// Inline values are re-encoded so the normalizer sees one representation.
fn raw_json_field<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: serde::Deserializer<'de>,
{
	let value = Option::<Value>::deserialize(deserializer)?;

	Ok(match value {
		None | Some(Value::Null) => None,
		Some(Value::String(text)) => Some(text),
		Some(other) => Some(other.to_string()),
	})
}
