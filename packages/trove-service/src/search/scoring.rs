//! Relevance scoring.
//!
//! A result's score is the weighted sum of independent criteria. With a non-empty query, a
//! result that matches no searchable column scores zero regardless of the other criteria.

use std::sync::{Arc, OnceLock};

use serde::{Serialize, Serializer};
use time::OffsetDateTime;
use unicode_segmentation::UnicodeSegmentation;

use trove_config::{Ranking, RankingText};
use trove_domain::{Column, Feature, FeatureSet, SearchableModel, text};

use crate::search::result::SearchResult;

pub const TEXT: &str = "text-match";

/// Per-request inputs shared by every criterion.
#[derive(Debug, Clone)]
pub struct ScoreInput {
	/// Folded query tokens.
	pub tokens: Arc<[String]>,
	pub include_native_query: bool,
	pub surrounding_match_context: usize,
	pub now: OffsetDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct Evaluation {
	pub score: f32,
	pub column: Option<Column>,
	pub context: Option<MatchContext>,
}
impl Evaluation {
	fn of(score: f32) -> Self {
		Self { score, ..Self::default() }
	}
}

pub trait Criterion
where
	Self: Send + Sync,
{
	fn name(&self) -> &'static str;

	fn weight(&self) -> f32;

	/// Unweighted score in `[0, 1]`, except text which sums column scores.
	fn evaluate(&self, result: &SearchResult, input: &ScoreInput) -> Evaluation;
}

#[derive(Debug, Clone)]
pub struct SubScore {
	pub name: &'static str,
	pub weight: f32,
	pub score: f32,
	pub column: Option<Column>,
	pub context: Option<MatchContext>,
}

#[derive(Debug, Clone)]
pub struct Score {
	pub total: f32,
	pub scores: Vec<SubScore>,
}
impl Score {
	pub fn text(&self) -> Option<&SubScore> {
		self.scores.iter().find(|score| score.name == TEXT)
	}

	/// Column whose text matched best.
	pub fn matched_column(&self) -> Option<Column> {
		self.text().and_then(|score| score.column)
	}
}

pub struct Scorer {
	criteria: Vec<Box<dyn Criterion>>,
	input: ScoreInput,
}
impl Scorer {
	pub fn new(
		ranking: &Ranking,
		features: &FeatureSet,
		search_string: Option<&str>,
		include_native_query: bool,
		surrounding_match_context: usize,
		now: OffsetDateTime,
	) -> Self {
		let weights = &ranking.weights;
		let mut criteria: Vec<Box<dyn Criterion>> = vec![
			Box::new(TextMatch { weight: weights.text, sub: ranking.text.clone() }),
			Box::new(Flag { name: "pinned", weight: weights.pinned, test: is_pinned }),
			Box::new(Flag { name: "bookmarked", weight: weights.bookmarked, test: is_bookmarked }),
			Box::new(Recency { weight: weights.recency, stale_days: ranking.stale_time_days }),
			Box::new(DashboardCount {
				weight: weights.dashboard,
				ceiling: ranking.dashboard_count_ceiling,
			}),
			Box::new(ModelPrior { weight: weights.model }),
		];

		if features.has(Feature::OfficialCollections) {
			criteria.push(Box::new(Flag {
				name: "official-collection",
				weight: weights.official_collection,
				test: is_official,
			}));
		}
		if features.has(Feature::ContentVerification) {
			criteria.push(Box::new(Flag {
				name: "verified",
				weight: weights.verified,
				test: is_verified,
			}));
		}

		let tokens = search_string.map(text::fold_tokens).unwrap_or_default();

		Self {
			criteria,
			input: ScoreInput {
				tokens: tokens.into(),
				include_native_query,
				surrounding_match_context,
				now,
			},
		}
	}

	pub fn score(&self, result: &SearchResult) -> Score {
		let mut total = 0.0;
		let mut scores = Vec::with_capacity(self.criteria.len());

		for criterion in &self.criteria {
			let evaluation = criterion.evaluate(result, &self.input);

			total += criterion.weight() * evaluation.score;

			scores.push(SubScore {
				name: criterion.name(),
				weight: criterion.weight(),
				score: evaluation.score,
				column: evaluation.column,
				context: evaluation.context,
			});
		}

		let text_missed = scores.iter().any(|score| score.name == TEXT && score.score <= 0.0);

		if !self.input.tokens.is_empty() && text_missed {
			total = 0.0;
		}

		Score { total, scores }
	}
}

struct TextMatch {
	weight: f32,
	sub: RankingText,
}
impl TextMatch {
	fn column_score(&self, column_tokens: &[String], query: &[String]) -> f32 {
		if column_tokens.is_empty() || query.iter().all(|qt| hit_count(column_tokens, qt) == 0) {
			return 0.0;
		}

		let n = query.len() as f32;
		let exact = query.iter().filter(|qt| column_tokens.contains(qt)).count() as f32 / n;
		let consecutivity = longest_run(column_tokens, query) as f32 / n;
		let occurrences =
			(query.iter().map(|qt| hit_count(column_tokens, qt)).sum::<usize>() as f32 / n).min(1.0);
		let fullness = column_tokens
			.iter()
			.filter(|ct| query.iter().any(|qt| ct.contains(qt.as_str())))
			.count() as f32
			/ column_tokens.len() as f32;
		let prefix = query
			.iter()
			.zip(column_tokens)
			.take_while(|(qt, ct)| ct.starts_with(qt.as_str()))
			.count() as f32
			/ n;
		let parts = [
			(self.sub.exact_match, exact),
			(self.sub.consecutivity, consecutivity),
			(self.sub.total_occurrences, occurrences),
			(self.sub.fullness, fullness),
			(self.sub.prefix, prefix),
		];
		let weight_sum: f32 = parts.iter().map(|(weight, _)| weight).sum();

		if weight_sum <= 0.0 {
			return 0.0;
		}

		parts.iter().map(|(weight, score)| weight * score).sum::<f32>() / weight_sum
	}
}
impl Criterion for TextMatch {
	fn name(&self) -> &'static str {
		TEXT
	}

	fn weight(&self) -> f32 {
		self.weight
	}

	fn evaluate(&self, result: &SearchResult, input: &ScoreInput) -> Evaluation {
		if input.tokens.is_empty() {
			return Evaluation::default();
		}

		let mut total = 0.0;
		let mut best: Option<(Column, f32, &str)> = None;

		for column in result.model.searchable_columns(input.include_native_query) {
			if column == Column::DatasetQuery && result.query_type.as_deref() != Some("native") {
				continue;
			}

			let Some(raw) = result.text(column) else {
				continue;
			};
			let score = self.column_score(&text::fold_tokens(raw), &input.tokens);

			total += score;

			if score > 0.0 && best.is_none_or(|(_, top, _)| score > top) {
				best = Some((column, score, raw));
			}
		}

		Evaluation {
			score: total,
			column: best.map(|(column, _, _)| column),
			context: best.map(|(_, _, raw)| {
				MatchContext::new(raw, input.tokens.clone(), input.surrounding_match_context)
			}),
		}
	}
}

fn hit_count(column: &[String], token: &str) -> usize {
	column.iter().filter(|ct| ct.contains(token)).count()
}

/// Length of the longest run of consecutive query tokens found in consecutive column tokens.
fn longest_run(column: &[String], query: &[String]) -> usize {
	let mut longest = 0;

	for start in 0..column.len() {
		for first in 0..query.len() {
			let run = column[start..]
				.iter()
				.zip(&query[first..])
				.take_while(|(ct, qt)| ct.contains(qt.as_str()))
				.count();

			longest = longest.max(run);
		}
	}

	longest
}

struct Flag {
	name: &'static str,
	weight: f32,
	test: fn(&SearchResult) -> bool,
}
impl Criterion for Flag {
	fn name(&self) -> &'static str {
		self.name
	}

	fn weight(&self) -> f32 {
		self.weight
	}

	fn evaluate(&self, result: &SearchResult, _: &ScoreInput) -> Evaluation {
		Evaluation::of(if (self.test)(result) { 1.0 } else { 0.0 })
	}
}

fn is_pinned(result: &SearchResult) -> bool {
	result.collection_position.is_some_and(|position| position > 0)
}

fn is_bookmarked(result: &SearchResult) -> bool {
	result.bookmark
}

fn is_official(result: &SearchResult) -> bool {
	result.collection_authority_level.as_deref() == Some("official")
}

fn is_verified(result: &SearchResult) -> bool {
	result.moderated_status.as_deref() == Some("verified")
}

struct Recency {
	weight: f32,
	stale_days: f32,
}
impl Criterion for Recency {
	fn name(&self) -> &'static str {
		"recency"
	}

	fn weight(&self) -> f32 {
		self.weight
	}

	fn evaluate(&self, result: &SearchResult, input: &ScoreInput) -> Evaluation {
		let Some(edited) = result.last_edited_at.or(result.updated_at) else {
			return Evaluation::default();
		};
		let days = ((input.now - edited).as_seconds_f32() / 86_400.0).max(0.0);

		Evaluation::of((1.0 - days / self.stale_days).clamp(0.0, 1.0))
	}
}

struct DashboardCount {
	weight: f32,
	ceiling: f32,
}
impl Criterion for DashboardCount {
	fn name(&self) -> &'static str {
		"dashboard"
	}

	fn weight(&self) -> f32 {
		self.weight
	}

	fn evaluate(&self, result: &SearchResult, _: &ScoreInput) -> Evaluation {
		let count = result.dashboardcard_count.unwrap_or(0).max(0) as f32;

		Evaluation::of((count / self.ceiling).min(1.0))
	}
}

struct ModelPrior {
	weight: f32,
}
impl Criterion for ModelPrior {
	fn name(&self) -> &'static str {
		"model"
	}

	fn weight(&self) -> f32 {
		self.weight
	}

	fn evaluate(&self, result: &SearchResult, _: &ScoreInput) -> Evaluation {
		let n = SearchableModel::ALL.len() as f32;

		Evaluation::of((n - result.model.prior_position() as f32) / n)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
	pub text: String,
	pub is_match: bool,
}

/// Words around query matches in one column. Segments are computed on first access.
#[derive(Debug, Clone)]
pub struct MatchContext {
	text: String,
	tokens: Arc<[String]>,
	radius: usize,
	segments: OnceLock<Vec<Segment>>,
}
impl MatchContext {
	pub fn new(text: &str, tokens: Arc<[String]>, radius: usize) -> Self {
		Self { text: text.to_string(), tokens, radius, segments: OnceLock::new() }
	}

	pub fn is_evaluated(&self) -> bool {
		self.segments.get().is_some()
	}

	pub fn segments(&self) -> &[Segment] {
		self.segments.get_or_init(|| self.compute())
	}

	fn compute(&self) -> Vec<Segment> {
		let words = self.text.unicode_words().collect::<Vec<_>>();
		let matched = words
			.iter()
			.map(|word| {
				let folded = text::fold(word);

				self.tokens.iter().any(|token| folded.contains(token.as_str()))
			})
			.collect::<Vec<_>>();
		let mut windows: Vec<(usize, usize)> = Vec::new();

		for (idx, _) in matched.iter().enumerate().filter(|(_, hit)| **hit) {
			let start = idx.saturating_sub(self.radius);
			let end = (idx + self.radius + 1).min(words.len());

			match windows.last_mut() {
				Some(last) if start <= last.1 => last.1 = last.1.max(end),
				_ => windows.push((start, end)),
			}
		}

		let mut out: Vec<Segment> = Vec::new();

		for (window_idx, (start, end)) in windows.into_iter().enumerate() {
			if window_idx > 0 {
				out.push(Segment { text: "...".to_string(), is_match: false });
			}

			let mut current: Option<Segment> = None;

			for idx in start..end {
				match current.as_mut() {
					Some(segment) if segment.is_match == matched[idx] => {
						segment.text.push(' ');
						segment.text.push_str(words[idx]);
					},
					_ => {
						out.extend(current.take());

						current = Some(Segment { text: words[idx].to_string(), is_match: matched[idx] });
					},
				}
			}

			out.extend(current);
		}

		out
	}
}
impl Serialize for MatchContext {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		self.segments().serialize(serializer)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use time::{Duration, macros::datetime};

	use trove_config::Ranking;
	use trove_domain::{Column, Feature, FeatureSet, SearchableModel};

	use crate::search::{
		result::SearchResult,
		scoring::{MatchContext, Scorer, Segment, TEXT},
	};

	const NOW: time::OffsetDateTime = datetime!(2026-03-11 12:00 UTC);

	fn scorer(q: Option<&str>, features: FeatureSet) -> Scorer {
		Scorer::new(&Ranking::default(), &features, q, false, 2, NOW)
	}

	fn text_score(scorer: &Scorer, result: &SearchResult) -> f32 {
		scorer.score(result).text().map(|score| score.score).unwrap_or_default()
	}

	#[test]
	fn non_matching_rows_score_zero_despite_other_signals() {
		let scorer = scorer(Some("zzreport-nonexistent"), FeatureSet::default());
		let mut result = SearchResult::new(SearchableModel::Dashboard, 1, "Orders");

		result.bookmark = true;
		result.collection_position = Some(1);

		assert_eq!(scorer.score(&result).total, 0.0);
	}

	#[test]
	fn text_score_grows_with_matched_columns() {
		let scorer = scorer(Some("orders"), FeatureSet::default());
		let name_only = SearchResult::new(SearchableModel::Card, 1, "Orders");
		let mut both = name_only.clone();

		both.description = Some("All orders by week".to_string());

		assert!(text_score(&scorer, &name_only) > 0.0);
		assert!(text_score(&scorer, &both) > text_score(&scorer, &name_only));
	}

	#[test]
	fn exact_and_prefix_matches_beat_substrings() {
		let scorer = scorer(Some("order"), FeatureSet::default());
		let exact = SearchResult::new(SearchableModel::Card, 1, "Order");
		let inner = SearchResult::new(SearchableModel::Card, 2, "Reorder log");

		assert!(text_score(&scorer, &exact) > text_score(&scorer, &inner));
	}

	#[test]
	fn accents_fold_on_both_sides() {
		let scorer = scorer(Some("cafe"), FeatureSet::default());
		let result = SearchResult::new(SearchableModel::Collection, 1, "Café sales");

		assert!(scorer.score(&result).total > 0.0);
	}

	#[test]
	fn blank_query_ranks_on_other_signals() {
		let scorer = scorer(None, FeatureSet::default());
		let mut result = SearchResult::new(SearchableModel::Database, 1, "Warehouse");

		result.updated_at = Some(NOW - Duration::days(1));

		let score = scorer.score(&result);

		assert!(score.total > 0.0);
		assert_eq!(score.matched_column(), None);
	}

	#[test]
	fn recency_decays_to_zero_when_stale() {
		let scorer = scorer(None, FeatureSet::default());
		let recency = |days: i64| {
			let mut result = SearchResult::new(SearchableModel::Card, 1, "x");

			result.last_edited_at = Some(NOW - Duration::days(days));

			scorer
				.score(&result)
				.scores
				.iter()
				.find(|score| score.name == "recency")
				.map(|score| score.score)
				.unwrap_or_default()
		};

		assert!(recency(1) > recency(90));
		assert_eq!(recency(400), 0.0);
	}

	#[test]
	fn feature_gated_criteria_only_apply_when_enabled() {
		let mut result = SearchResult::new(SearchableModel::Card, 1, "Orders");

		result.moderated_status = Some("verified".to_string());

		let plain = scorer(Some("orders"), FeatureSet::default()).score(&result);
		let verified = scorer(
			Some("orders"),
			FeatureSet::default().with(Feature::ContentVerification),
		)
		.score(&result);

		assert!(plain.scores.iter().all(|score| score.name != "verified"));
		assert!(verified.total > plain.total);
	}

	#[test]
	fn display_name_match_is_reported() {
		let scorer = scorer(Some("revenue"), FeatureSet::default());
		let mut result = SearchResult::new(SearchableModel::Table, 1, "fct_rev_daily");

		result.display_name = Some("Revenue Daily".to_string());

		let score = scorer.score(&result);

		assert_eq!(score.matched_column(), Some(Column::DisplayName));
		assert_eq!(score.text().map(|score| score.name), Some(TEXT));
	}

	#[test]
	fn match_context_is_lazy_and_windowed() {
		let tokens: Arc<[String]> = vec!["orders".to_string()].into();
		let context = MatchContext::new(
			"Weekly orders by region and channel for the finance team with orders totals",
			tokens,
			1,
		);

		assert!(!context.is_evaluated());

		let segments = context.segments();

		assert!(context.is_evaluated());
		assert_eq!(
			segments,
			&[
				Segment { text: "Weekly".to_string(), is_match: false },
				Segment { text: "orders".to_string(), is_match: true },
				Segment { text: "by".to_string(), is_match: false },
				Segment { text: "...".to_string(), is_match: false },
				Segment { text: "with".to_string(), is_match: false },
				Segment { text: "orders".to_string(), is_match: true },
				Segment { text: "totals".to_string(), is_match: false },
			]
		);
	}
}
