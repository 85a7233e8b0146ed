use crate::{
	Error, Result,
	db::Db,
	models::{KnowledgeRow, ListFilter},
};

const SELECT_COLUMNS: &str = "\
SELECT
	source_id,
	machine_name,
	issue_description,
	whys_json,
	temporary_actions_json,
	preventive_actions_json,
	created_at,
	is_active
FROM ai_knowledge_base";

/// Inserts or replaces the row for `row.source_id`. Re-closing a CAPA refreshes `created_at`.
pub async fn upsert_knowledge(db: &Db, row: &KnowledgeRow) -> Result<()> {
	if row.source_id <= 0 {
		return Err(Error::InvalidArgument(format!(
			"source_id must be positive, got {}.",
			row.source_id
		)));
	}

	sqlx::query(
		"\
INSERT INTO ai_knowledge_base (
	source_id,
	machine_name,
	issue_description,
	whys_json,
	temporary_actions_json,
	preventive_actions_json,
	created_at,
	is_active
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
ON CONFLICT (source_id) DO UPDATE
SET
	machine_name = EXCLUDED.machine_name,
	issue_description = EXCLUDED.issue_description,
	whys_json = EXCLUDED.whys_json,
	temporary_actions_json = EXCLUDED.temporary_actions_json,
	preventive_actions_json = EXCLUDED.preventive_actions_json,
	created_at = EXCLUDED.created_at,
	is_active = EXCLUDED.is_active",
	)
	.bind(row.source_id)
	.bind(row.machine_name.as_deref())
	.bind(row.issue_description.as_str())
	.bind(row.whys_json.as_deref())
	.bind(row.temporary_actions_json.as_deref())
	.bind(row.preventive_actions_json.as_deref())
	.bind(row.created_at)
	.bind(row.is_active)
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Active rows, newest first. Ties on `created_at` break on `source_id` descending so the order
/// is total.
pub async fn list_active(db: &Db, filter: &ListFilter) -> Result<Vec<KnowledgeRow>> {
	let sql = format!(
		"\
{SELECT_COLUMNS}
WHERE is_active = TRUE
	AND ($1::text IS NULL OR machine_name = $1)
	AND (NOT $2 OR whys_json IS NOT NULL)
	AND (NOT $3 OR temporary_actions_json IS NOT NULL OR preventive_actions_json IS NOT NULL)
ORDER BY created_at DESC, source_id DESC"
	);
	let rows = sqlx::query_as::<_, KnowledgeRow>(&sql)
		.bind(filter.machine_name.as_deref())
		.bind(filter.require_whys)
		.bind(filter.require_actions)
		.fetch_all(&db.pool)
		.await?;

	Ok(rows)
}

pub async fn get_knowledge(db: &Db, source_id: i64) -> Result<Option<KnowledgeRow>> {
	let sql = format!("{SELECT_COLUMNS}\nWHERE source_id = $1");
	let row = sqlx::query_as::<_, KnowledgeRow>(&sql)
		.bind(source_id)
		.fetch_optional(&db.pool)
		.await?;

	Ok(row)
}

/// Returns `false` when no row carries `source_id`.
pub async fn set_active(db: &Db, source_id: i64, active: bool) -> Result<bool> {
	let result = sqlx::query("UPDATE ai_knowledge_base SET is_active = $2 WHERE source_id = $1")
		.bind(source_id)
		.bind(active)
		.execute(&db.pool)
		.await?;

	Ok(result.rows_affected() > 0)
}
