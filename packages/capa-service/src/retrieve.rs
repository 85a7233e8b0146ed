use std::time::Duration;

use serde::Serialize;

use crate::{
	CapaService, EmbeddingAdapter, RecordFilter, Result, fallback, filter,
	funnel::{self, FunnelHit, FunnelPlan},
};
use capa_domain::{CandidateKind, KnowledgeRecord, QueryContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
	Semantic,
	Keyword,
}

/// The field whose similarity decided the final position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedField {
	IssueDescription,
	Whys,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
	pub source_id: i64,
	pub machine_name: Option<String>,
	pub issue_description: String,
	pub match_kind: MatchKind,
	pub matched_field: MatchedField,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub issue_similarity: Option<f32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub whys_similarity: Option<f32>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub matched_keywords: Vec<String>,
	pub why_items: Vec<String>,
	pub temporary_actions: Vec<String>,
	pub preventive_actions: Vec<String>,
	#[serde(skip)]
	pub record: KnowledgeRecord,
}
impl RankedCandidate {
	fn semantic(record: KnowledgeRecord, hit: &FunnelHit) -> Self {
		let matched_field = if hit.whys_similarity.is_some() {
			MatchedField::Whys
		} else {
			MatchedField::IssueDescription
		};

		Self::build(record, MatchKind::Semantic, matched_field, |candidate| {
			candidate.issue_similarity = Some(hit.issue_similarity);
			candidate.whys_similarity = hit.whys_similarity;
		})
	}

	fn keyword(record: KnowledgeRecord, matched: Vec<String>) -> Self {
		Self::build(record, MatchKind::Keyword, MatchedField::IssueDescription, |candidate| {
			candidate.matched_keywords = matched;
		})
	}

	fn build(
		record: KnowledgeRecord,
		match_kind: MatchKind,
		matched_field: MatchedField,
		annotate: impl FnOnce(&mut Self),
	) -> Self {
		let mut candidate = Self {
			source_id: record.source_id,
			machine_name: record.machine_name.clone(),
			issue_description: record.issue_description.clone(),
			match_kind,
			matched_field,
			issue_similarity: None,
			whys_similarity: None,
			matched_keywords: Vec::new(),
			why_items: record.why_items(),
			temporary_actions: record.temporary_actions(),
			preventive_actions: record.preventive_actions(),
			record,
		};

		annotate(&mut candidate);

		candidate
	}
}

impl CapaService {
	/// Past root-cause analyses for a new issue, best first.
	pub async fn recommend_root_causes(
		&self,
		query: &QueryContext,
		limit: Option<usize>,
	) -> Result<Vec<RankedCandidate>> {
		self.retrieve(CandidateKind::RootCause, query, limit).await
	}

	/// Past action plans for an issue whose why-list is final, best first.
	pub async fn recommend_action_plans(
		&self,
		query: &QueryContext,
		limit: Option<usize>,
	) -> Result<Vec<RankedCandidate>> {
		self.retrieve(CandidateKind::ActionPlan, query, limit).await
	}

	/// Only store failures are returned as errors. Provider trouble of any kind ends in the keyword
	/// fallback.
	pub async fn retrieve(
		&self,
		kind: CandidateKind,
		query: &QueryContext,
		limit: Option<usize>,
	) -> Result<Vec<RankedCandidate>> {
		let retrieval = &self.cfg.retrieval;
		let limit = limit.unwrap_or(retrieval.default_limit as usize);

		if limit == 0 {
			return Ok(Vec::new());
		}

		let machine = query.machine_filter();
		let store_filter =
			RecordFilter { machine_name: machine.map(str::to_string), kind: Some(kind) };
		let records = self.store.list_candidates(&store_filter).await?;
		let pool = filter::filter_candidates(records, kind, machine);

		tracing::debug!(
			kind = kind.as_str(),
			machine = machine.unwrap_or(""),
			candidates = pool.len(),
			"Filtered retrieval candidates."
		);

		let plan = FunnelPlan {
			kind,
			stage1_keep: retrieval.stage1_keep as usize,
			stage2_keep: retrieval.stage2_keep as usize,
			limit,
		};
		let hits = self.rank_semantic(&pool, query, plan).await;

		if !hits.is_empty() {
			tracing::debug!(
				kind = kind.as_str(),
				results = hits.len(),
				path = "semantic",
				"Retrieved."
			);

			return Ok(hits
				.iter()
				.map(|hit| RankedCandidate::semantic(pool[hit.index].clone(), hit))
				.collect());
		}

		let fallback_pool = if retrieval.fallback_relax_machine && machine.is_some() {
			let relaxed = RecordFilter { machine_name: None, kind: Some(kind) };

			filter::filter_candidates(self.store.list_candidates(&relaxed).await?, kind, None)
		} else {
			pool
		};
		let min_chars = retrieval.min_keyword_chars as usize;
		let matches =
			fallback::keyword_fallback(&fallback_pool, &query.issue_description, min_chars, limit);

		tracing::debug!(
			kind = kind.as_str(),
			results = matches.len(),
			path = "keyword",
			"Retrieved."
		);

		Ok(matches
			.into_iter()
			.map(|hit| RankedCandidate::keyword(fallback_pool[hit.index].clone(), hit.matched))
			.collect())
	}

	async fn rank_semantic(
		&self,
		pool: &[KnowledgeRecord],
		query: &QueryContext,
		plan: FunnelPlan,
	) -> Vec<FunnelHit> {
		let adapter = EmbeddingAdapter::new(self.providers.embedding.as_ref());
		let ranking = funnel::rank(&adapter, pool, query, plan);

		match self.cfg.retrieval.timeout_ms {
			Some(timeout_ms) =>
				match tokio::time::timeout(Duration::from_millis(timeout_ms), ranking).await {
					Ok(hits) => hits,
					Err(_) => {
						tracing::warn!(
							timeout_ms,
							"Semantic retrieval timed out. Using keyword fallback."
						);

						Vec::new()
					},
				},
			None => ranking.await,
		}
	}
}
