use std::sync::RwLock;

use crate::{BoxFuture, Error, Result};
use capa_domain::{CandidateKind, KnowledgeRecord};
use capa_storage::{
	db::Db,
	models::{KnowledgeRow, ListFilter},
	queries,
};

/// Which records a query wants from the store. `kind` is a hint that lets a store skip rows that
/// cannot qualify; the candidate filter re-checks content either way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
	pub machine_name: Option<String>,
	pub kind: Option<CandidateKind>,
}

/// Read side and closure-time write side of the knowledge base.
pub trait KnowledgeStore
where
	Self: Send + Sync,
{
	/// Active records matching `filter`, newest first.
	fn list_candidates<'a>(
		&'a self,
		filter: &'a RecordFilter,
	) -> BoxFuture<'a, Result<Vec<KnowledgeRecord>>>;

	fn upsert<'a>(&'a self, record: &'a KnowledgeRecord) -> BoxFuture<'a, Result<()>>;

	/// Returns `false` when `source_id` is unknown.
	fn set_active<'a>(&'a self, source_id: i64, active: bool) -> BoxFuture<'a, Result<bool>>;
}

impl KnowledgeStore for Db {
	fn list_candidates<'a>(
		&'a self,
		filter: &'a RecordFilter,
	) -> BoxFuture<'a, Result<Vec<KnowledgeRecord>>> {
		Box::pin(async move {
			let list_filter = ListFilter {
				machine_name: filter.machine_name.clone(),
				require_whys: filter.kind == Some(CandidateKind::RootCause),
				require_actions: filter.kind == Some(CandidateKind::ActionPlan),
			};
			let rows = queries::list_active(self, &list_filter).await?;

			Ok(rows.into_iter().map(record_from_row).collect())
		})
	}

	fn upsert<'a>(&'a self, record: &'a KnowledgeRecord) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			queries::upsert_knowledge(self, &row_from_record(record)).await?;

			Ok(())
		})
	}

	fn set_active<'a>(&'a self, source_id: i64, active: bool) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move { Ok(queries::set_active(self, source_id, active).await?) })
	}
}

/// In-process store backed by a vector. Used for JSON corpora and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
	records: RwLock<Vec<KnowledgeRecord>>,
}
impl MemoryStore {
	pub fn new(records: Vec<KnowledgeRecord>) -> Self {
		Self { records: RwLock::new(records) }
	}

	/// Parses a JSON array of records.
	pub fn from_json(raw: &str) -> Result<Self> {
		let records: Vec<KnowledgeRecord> =
			serde_json::from_str(raw).map_err(|err| Error::InvalidRequest {
				message: format!("Failed to parse knowledge corpus: {err}."),
			})?;

		Ok(Self::new(records))
	}

	pub fn snapshot(&self) -> Vec<KnowledgeRecord> {
		self.records.read().unwrap_or_else(|err| err.into_inner()).clone()
	}

	fn list_sync(&self, filter: &RecordFilter) -> Vec<KnowledgeRecord> {
		let records = self.records.read().unwrap_or_else(|err| err.into_inner());
		let mut out: Vec<KnowledgeRecord> = records
			.iter()
			.filter(|record| record.active)
			.filter(|record| {
				filter.machine_name.as_deref().is_none_or(|machine| record.matches_machine(machine))
			})
			.cloned()
			.collect();

		out.sort_by(|a, b| {
			b.created_at.cmp(&a.created_at).then_with(|| b.source_id.cmp(&a.source_id))
		});

		out
	}

	fn upsert_sync(&self, record: &KnowledgeRecord) {
		let mut records = self.records.write().unwrap_or_else(|err| err.into_inner());

		match records.iter_mut().find(|existing| existing.source_id == record.source_id) {
			Some(existing) => *existing = record.clone(),
			None => records.push(record.clone()),
		}
	}

	fn set_active_sync(&self, source_id: i64, active: bool) -> bool {
		let mut records = self.records.write().unwrap_or_else(|err| err.into_inner());

		match records.iter_mut().find(|record| record.source_id == source_id) {
			Some(record) => {
				record.active = active;

				true
			},
			None => false,
		}
	}
}
impl KnowledgeStore for MemoryStore {
	fn list_candidates<'a>(
		&'a self,
		filter: &'a RecordFilter,
	) -> BoxFuture<'a, Result<Vec<KnowledgeRecord>>> {
		let records = self.list_sync(filter);

		Box::pin(async move { Ok(records) })
	}

	fn upsert<'a>(&'a self, record: &'a KnowledgeRecord) -> BoxFuture<'a, Result<()>> {
		self.upsert_sync(record);

		Box::pin(async move { Ok(()) })
	}

	fn set_active<'a>(&'a self, source_id: i64, active: bool) -> BoxFuture<'a, Result<bool>> {
		let found = self.set_active_sync(source_id, active);

		Box::pin(async move { Ok(found) })
	}
}

fn record_from_row(row: KnowledgeRow) -> KnowledgeRecord {
	KnowledgeRecord {
		source_id: row.source_id,
		created_at: row.created_at,
		active: row.is_active,
		machine_name: row.machine_name,
		issue_description: row.issue_description,
		whys_json: row.whys_json,
		temporary_actions_json: row.temporary_actions_json,
		preventive_actions_json: row.preventive_actions_json,
	}
}

fn row_from_record(record: &KnowledgeRecord) -> KnowledgeRow {
	KnowledgeRow {
		source_id: record.source_id,
		machine_name: record.machine_name.clone(),
		issue_description: record.issue_description.clone(),
		whys_json: record.whys_json.clone(),
		temporary_actions_json: record.temporary_actions_json.clone(),
		preventive_actions_json: record.preventive_actions_json.clone(),
		created_at: record.created_at,
		is_active: record.active,
	}
}

#[cfg(test)]
mod tests {
	use time::{Duration, OffsetDateTime};

	use super::*;

	fn record(source_id: i64, machine: &str, age_days: i64) -> KnowledgeRecord {
		let mut record = KnowledgeRecord::new(source_id, format!("issue {source_id}"));

		record.machine_name = Some(machine.to_string());
		record.created_at = OffsetDateTime::UNIX_EPOCH + Duration::days(1_000 - age_days);

		record
	}

	#[tokio::test]
	async fn lists_active_records_newest_first() {
		let mut inactive = record(4, "M1", 0);

		inactive.active = false;

		let store = MemoryStore::new(vec![
			record(1, "M1", 5),
			record(2, "M2", 1),
			inactive,
			record(3, "M1", 1),
		]);
		let all = store.list_candidates(&RecordFilter::default()).await.expect("list failed");
		let ids = all.iter().map(|record| record.source_id).collect::<Vec<_>>();

		assert_eq!(ids, vec![3, 2, 1]);

		let filter = RecordFilter { machine_name: Some("M1".to_string()), kind: None };
		let m1 = store.list_candidates(&filter).await.expect("list failed");
		let ids = m1.iter().map(|record| record.source_id).collect::<Vec<_>>();

		assert_eq!(ids, vec![3, 1]);
	}

	#[tokio::test]
	async fn upsert_replaces_by_source_id() {
		let store = MemoryStore::new(vec![record(1, "M1", 5)]);
		let mut replacement = record(1, "M9", 0);

		replacement.issue_description = "rewritten".to_string();

		store.upsert(&replacement).await.expect("upsert failed");

		let snapshot = store.snapshot();

		assert_eq!(snapshot.len(), 1);
		assert_eq!(snapshot[0].issue_description, "rewritten");
		assert_eq!(snapshot[0].machine_name.as_deref(), Some("M9"));
	}

	#[tokio::test]
	async fn set_active_reports_unknown_ids() {
		let store = MemoryStore::new(vec![record(1, "M1", 5)]);

		assert!(store.set_active(1, false).await.expect("toggle failed"));
		assert!(!store.set_active(2, false).await.expect("toggle failed"));
		assert!(store.list_candidates(&RecordFilter::default()).await.expect("list").is_empty());
	}

	#[test]
	fn corpus_json_accepts_inline_lists() {
		let raw =
			r#"[{"source_id": 7, "issue_description": "belt slip", "whys_json": ["loose tensioner"]}]"#;
		let store = MemoryStore::from_json(raw).expect("corpus parse failed");
		let snapshot = store.snapshot();

		assert_eq!(snapshot[0].why_items(), vec!["loose tensioner".to_string()]);
		assert!(snapshot[0].active);
	}

	#[test]
	fn rows_and_records_map_field_for_field() {
		let mut original = record(9, "M1", 2);

		original.whys_json = Some(r#"["a"]"#.to_string());
		original.active = false;

		assert_eq!(record_from_row(row_from_record(&original)), original);
	}
}
