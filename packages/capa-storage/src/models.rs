use time::OffsetDateTime;

/// One row of `ai_knowledge_base`. The three JSON columns hold the raw text captured at closure.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct KnowledgeRow {
	pub source_id: i64,
	pub machine_name: Option<String>,
	pub issue_description: String,
	pub whys_json: Option<String>,
	pub temporary_actions_json: Option<String>,
	pub preventive_actions_json: Option<String>,
	pub created_at: OffsetDateTime,
	pub is_active: bool,
}

/// Coarse pre-filter pushed down to SQL. Content checks that need JSON decoding stay with the
/// caller.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
	pub machine_name: Option<String>,
	pub require_whys: bool,
	pub require_actions: bool,
}
