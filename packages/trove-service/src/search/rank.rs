use std::{cmp::Ordering, collections::BinaryHeap};

use futures::StreamExt;

use crate::{
	Result,
	search::{result::SearchResult, scoring::Score},
};
use trove_storage::{Row, RowStream};

/// Larger capacities grow the heap on demand.
const MAX_PREALLOCATED: usize = 1_024;

#[derive(Debug, Clone)]
pub struct ScoredResult {
	pub result: SearchResult,
	pub score: Score,
}

/// Pull rows until `max_results` positive results are retained or the stream ends.
///
/// The stream is dropped before returning, which closes the cursor even when rows remain.
pub async fn rank<F>(
	mut rows: RowStream<'_>,
	max_results: usize,
	mut prepare: F,
) -> Result<Vec<ScoredResult>>
where
	F: FnMut(Row) -> Result<Option<ScoredResult>>,
{
	let mut top = TopResults::new(max_results);
	let mut read = 0_usize;
	let mut dropped = 0_usize;

	while top.len() < max_results {
		let Some(row) = rows.next().await else {
			break;
		};

		read += 1;

		match prepare(row?)? {
			Some(scored) if scored.score.total > 0.0 => top.push(scored),
			_ => dropped += 1,
		}
	}

	drop(rows);

	tracing::debug!(read, dropped, kept = top.len(), "Ranked search rows.");

	Ok(top.into_sorted())
}

/// Best `capacity` results seen so far. Ties keep the earlier arrival.
pub struct TopResults {
	capacity: usize,
	next_seq: u64,
	heap: BinaryHeap<Entry>,
}
impl TopResults {
	pub fn new(capacity: usize) -> Self {
		let reserved = capacity.saturating_add(1).min(MAX_PREALLOCATED);

		Self { capacity, next_seq: 0, heap: BinaryHeap::with_capacity(reserved) }
	}

	fn len(&self) -> usize {
		self.heap.len()
	}

	pub fn push(&mut self, item: ScoredResult) {
		if self.capacity == 0 {
			return;
		}

		let entry = Entry { total: item.score.total, seq: self.next_seq, item };

		self.next_seq += 1;

		self.heap.push(entry);

		if self.heap.len() > self.capacity {
			// The heap root is the worst entry.
			self.heap.pop();
		}
	}

	/// Score descending, then arrival order.
	pub fn into_sorted(self) -> Vec<ScoredResult> {
		self.heap.into_sorted_vec().into_iter().map(|entry| entry.item).collect()
	}
}

struct Entry {
	total: f32,
	seq: u64,
	item: ScoredResult,
}
impl PartialEq for Entry {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}
impl Eq for Entry {}
impl PartialOrd for Entry {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}
impl Ord for Entry {
	// Greater means worse: lower score, or later arrival on a tie.
	fn cmp(&self, other: &Self) -> Ordering {
		other.total.total_cmp(&self.total).then(self.seq.cmp(&other.seq))
	}
}

#[cfg(test)]
mod tests {
	use std::sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	};

	use futures::{StreamExt, stream};

	use trove_domain::SearchableModel;
	use trove_storage::{Row, RowStream, SqlValue};

	use crate::search::{
		rank::{ScoredResult, TopResults, rank},
		result::SearchResult,
		scoring::Score,
	};

	fn scored(id: i64, total: f32) -> ScoredResult {
		ScoredResult {
			result: SearchResult::new(SearchableModel::Card, id, format!("card {id}")),
			score: Score { total, scores: Vec::new() },
		}
	}

	fn row(id: i64, score: f64) -> trove_storage::Result<Row> {
		Ok(Row::new().with("id", id).with("score", SqlValue::Float(score)))
	}

	fn prepare(row: Row) -> crate::Result<Option<ScoredResult>> {
		let id = row.i64("id").unwrap_or_default();
		let total = row.get("score").as_f64().unwrap_or_default() as f32;

		Ok(Some(scored(id, total)))
	}

	#[test]
	fn heap_evicts_the_worst_and_keeps_earlier_ties() {
		let mut top = TopResults::new(2);

		top.push(scored(1, 1.0));
		top.push(scored(2, 3.0));
		top.push(scored(3, 2.0));
		top.push(scored(4, 2.0));

		let ids = top.into_sorted().iter().map(|entry| entry.result.id).collect::<Vec<_>>();

		assert_eq!(ids, vec![2, 3]);
	}

	#[test]
	fn unbounded_capacity_reserves_a_bounded_heap() {
		let mut top = TopResults::new(usize::MAX);

		assert!(top.heap.capacity() < 4_096);

		top.push(scored(1, 1.0));
		top.push(scored(2, 2.0));

		let ids = top.into_sorted().iter().map(|entry| entry.result.id).collect::<Vec<_>>();

		assert_eq!(ids, vec![2, 1]);
	}

	#[tokio::test]
	async fn ranking_stops_once_full_and_skips_non_positive() {
		let pulled = Arc::new(AtomicUsize::new(0));
		let counter = pulled.clone();
		let rows: RowStream<'static> = stream::iter(
			[(1, 0.0), (2, 1.5), (3, -1.0), (4, 4.0), (5, 9.0), (6, 9.0)]
				.map(|(id, score)| row(id, score)),
		)
		.inspect(move |_| {
			counter.fetch_add(1, Ordering::SeqCst);
		})
		.boxed();
		let ranked = rank(rows, 2, prepare).await.expect("rank");
		let ids = ranked.iter().map(|entry| entry.result.id).collect::<Vec<_>>();

		assert_eq!(ids, vec![4, 2]);
		assert_eq!(pulled.load(Ordering::SeqCst), 4);
	}

	#[tokio::test]
	async fn exhausted_streams_return_everything_sorted() {
		let rows: RowStream<'static> =
			stream::iter([(1, 1.0), (2, 3.0), (3, 3.0)].map(|(id, score)| row(id, score))).boxed();
		let ranked = rank(rows, 10, prepare).await.expect("rank");
		let ids = ranked.iter().map(|entry| entry.result.id).collect::<Vec<_>>();

		assert_eq!(ids, vec![2, 3, 1]);
	}
}
