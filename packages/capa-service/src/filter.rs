use capa_domain::{CandidateKind, KnowledgeRecord};

/// Keeps active records that match `machine` exactly (when given) and carry the content `kind`
/// needs. Output is newest first regardless of input order, which the keyword fallback relies on.
pub fn filter_candidates(
	records: Vec<KnowledgeRecord>,
	kind: CandidateKind,
	machine: Option<&str>,
) -> Vec<KnowledgeRecord> {
	let mut kept: Vec<KnowledgeRecord> = records
		.into_iter()
		.filter(|record| record.active)
		.filter(|record| machine.is_none_or(|machine| record.matches_machine(machine)))
		.filter(|record| record.satisfies(kind))
		.collect();

	kept.sort_by(|a, b| {
		b.created_at.cmp(&a.created_at).then_with(|| b.source_id.cmp(&a.source_id))
	});

	kept
}

#[cfg(test)]
mod tests {
	use time::{Duration, OffsetDateTime};

	use super::*;

	fn record(
		source_id: i64,
		machine: Option<&str>,
		whys: &str,
		temp: Option<&str>,
	) -> KnowledgeRecord {
		let mut record = KnowledgeRecord::new(source_id, "issue");

		record.machine_name = machine.map(str::to_string);
		record.whys_json = Some(whys.to_string());
		record.temporary_actions_json = temp.map(str::to_string);
		record.created_at = OffsetDateTime::UNIX_EPOCH + Duration::days(source_id);

		record
	}

	fn ids(records: &[KnowledgeRecord]) -> Vec<i64> {
		records.iter().map(|record| record.source_id).collect()
	}

	#[test]
	fn content_invariant_depends_on_kind() {
		let records = vec![
			record(1, Some("M1"), "[]", Some(r#"["add inspection step"]"#)),
			record(2, Some("M1"), r#"["worn roller"]"#, None),
		];

		let rca = filter_candidates(records.clone(), CandidateKind::RootCause, None);

		assert_eq!(ids(&rca), vec![2]);
		assert_eq!(ids(&filter_candidates(records, CandidateKind::ActionPlan, None)), vec![1]);
	}

	#[test]
	fn machine_filter_is_exact_and_never_relaxed() {
		let records = vec![
			record(1, Some("M1"), r#"["a"]"#, None),
			record(2, Some("m1"), r#"["b"]"#, None),
			record(3, None, r#"["c"]"#, None),
		];

		let m1 = filter_candidates(records.clone(), CandidateKind::RootCause, Some("M1"));

		assert_eq!(ids(&m1), vec![1]);
		assert!(filter_candidates(records, CandidateKind::RootCause, Some("M7")).is_empty());
	}

	#[test]
	fn inactive_records_are_dropped_and_order_is_newest_first() {
		let mut hidden = record(5, None, r#"["x"]"#, None);

		hidden.active = false;

		let records =
			vec![record(1, None, r#"["a"]"#, None), hidden, record(3, None, r#"["c"]"#, None)];

		assert_eq!(ids(&filter_candidates(records, CandidateKind::RootCause, None)), vec![3, 1]);
	}
}
