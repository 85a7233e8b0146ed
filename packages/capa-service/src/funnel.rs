//! Two-stage semantic ranking.
//!
//! Stage 1 scores every candidate's issue description against the query and keeps a fixed-size
//! shortlist. Stage 2, for action-plan queries only, re-orders that shortlist by why-list
//! similarity. Both cuts are relative; no absolute similarity threshold is applied.

use std::cmp::Ordering;

use crate::EmbeddingAdapter;
use capa_domain::{CandidateKind, KnowledgeRecord, QueryContext, similarity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunnelPlan {
	pub kind: CandidateKind,
	pub stage1_keep: usize,
	pub stage2_keep: usize,
	pub limit: usize,
}

/// One surviving candidate, by position in the ranked pool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunnelHit {
	pub index: usize,
	pub issue_similarity: f32,
	/// `None` for root-cause queries, which have no second stage, and for action-plan queries whose
	/// why-list has no embedding.
	pub whys_similarity: Option<f32>,
}

/// Ranks `pool` against `query`. Returns `[]` when there is no semantic signal at all: the
/// provider is unavailable, the query description cannot be embedded, or no candidate
/// description can.
pub async fn rank(
	adapter: &EmbeddingAdapter<'_>,
	pool: &[KnowledgeRecord],
	query: &QueryContext,
	plan: FunnelPlan,
) -> Vec<FunnelHit> {
	if pool.is_empty() || plan.limit == 0 || !adapter.is_available() {
		return Vec::new();
	}

	let Some(query_vec) = adapter.embed_one(&query.issue_description).await else {
		tracing::debug!("Query issue description has no embedding.");

		return Vec::new();
	};
	let query_vec = query_vec.as_slice();
	let descriptions =
		pool.iter().map(|record| record.issue_description.clone()).collect::<Vec<_>>();
	let vectors = adapter.embed(&descriptions).await;
	let mut shortlist = vectors
		.iter()
		.enumerate()
		.filter_map(|(index, vector)| {
			// A candidate without its own embedding has no comparable score.
			let vector = vector.as_deref()?;

			Some(FunnelHit {
				index,
				issue_similarity: similarity::similarity(Some(query_vec), Some(vector)),
				whys_similarity: None,
			})
		})
		.collect::<Vec<_>>();

	shortlist.sort_by(|a, b| cmp_f32_desc(a.issue_similarity, b.issue_similarity));
	shortlist.truncate(plan.stage1_keep);

	tracing::debug!(
		kind = plan.kind.as_str(),
		pool = pool.len(),
		embedded = vectors.iter().filter(|vector| vector.is_some()).count(),
		shortlist = shortlist.len(),
		"Stage 1 ranked candidates."
	);

	if plan.kind == CandidateKind::ActionPlan {
		rerank_by_whys(adapter, pool, query, &mut shortlist).await;
	}

	shortlist.truncate(plan.stage2_keep.min(plan.limit));

	shortlist
}

async fn rerank_by_whys(
	adapter: &EmbeddingAdapter<'_>,
	pool: &[KnowledgeRecord],
	query: &QueryContext,
	shortlist: &mut [FunnelHit],
) {
	let query_whys = query.why_text();
	let query_vec =
		if query_whys.trim().is_empty() { None } else { adapter.embed_one(&query_whys).await };

	let Some(query_vec) = query_vec else {
		// Stage-1 order stands and no why score is reported.
		tracing::debug!("Query why-list has no embedding. Keeping stage 1 order.");

		return;
	};
	let query_vec = query_vec.as_slice();
	let why_texts = shortlist.iter().map(|hit| pool[hit.index].why_text()).collect::<Vec<_>>();
	let vectors = adapter.embed(&why_texts).await;

	for (hit, vector) in shortlist.iter_mut().zip(&vectors) {
		hit.whys_similarity = Some(similarity::similarity(Some(query_vec), vector.as_deref()));
	}

	shortlist.sort_by(|a, b| {
		cmp_f32_desc(a.whys_similarity.unwrap_or(0.0), b.whys_similarity.unwrap_or(0.0))
	});

	tracing::debug!(shortlist = shortlist.len(), "Stage 2 re-ranked candidates by why-list.");
}

/// Descending order with NaN sorted last.
pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}
