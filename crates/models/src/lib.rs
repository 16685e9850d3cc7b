use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of an upload request: a trade the client wants stored.
/// `price_usd` and `order_type` are optional; a candidate without a price is
/// still insertable.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TransactionCandidate {
	pub symbol: String,
	pub amount: f64,
	#[serde(default)]
	pub price_usd: Option<f64>,
	#[serde(default)]
	pub order_type: Option<String>,
	pub date: NaiveDate,
	#[serde(default)]
	pub file_name: Option<String>,
}

/// A persisted trade. Created once by bulk insert, never mutated.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TransactionRecord {
	pub id: String,
	pub user_id: String,
	pub symbol: String,
	pub amount: f64,
	pub price_usd: Option<f64>,
	pub order_type: Option<String>,
	pub date: NaiveDate,
	pub file_name: Option<String>,
}

impl TransactionRecord {
	pub fn from_candidate(id: String, user_id: String, candidate: &TransactionCandidate) -> Self {
		Self {
			id,
			user_id,
			symbol: candidate.symbol.clone(),
			amount: candidate.amount,
			price_usd: candidate.price_usd,
			order_type: candidate.order_type.clone(),
			date: candidate.date,
			file_name: candidate.file_name.clone(),
		}
	}
}

/// Aggregate position for one symbol: the sum of the user's amounts.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Holding {
	pub symbol: String,
	pub total: f64,
}

/// Per-row outcome of a bulk insert. `index` refers to the position of the
/// candidate in the submitted batch; `row` echoes the rejected candidate so
/// callers can render it without keeping their own copy.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SkippedRow {
	pub index: usize,
	pub reason: String,
	pub row: TransactionCandidate,
}

/// Result of a bulk insert: how many rows landed, and why the rest did not.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct UploadReport {
	pub inserted: usize,
	pub skipped: Vec<SkippedRow>,
}
