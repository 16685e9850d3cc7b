use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use models::{Holding, SkippedRow, TransactionCandidate, TransactionRecord, UploadReport};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::error::{ApiError, Result};

#[derive(Debug, Clone)]
pub struct HoldingsFilter {
    pub symbol: Option<String>,
    pub page: usize,
    pub page_size: usize,
}

#[derive(Debug, Clone)]
pub struct TransactionFilter {
    pub symbol: Option<String>,
    pub file: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: usize,
    pub page_size: usize,
}

/// Storage collaborator for transaction records.
/// This abstraction allows swapping between the file-backed store and a
/// database-backed implementation.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Bulk insert with authoritative screening: each candidate is
    /// re-validated (finite, non-negative amount) and checked for an
    /// existing `(user, symbol, amount, date, file)` match before the
    /// survivors are appended in one write. Screening is per-row and
    /// best-effort; one skipped row never blocks the others.
    async fn insert_candidates(
        &self,
        user_id: &str,
        candidates: &[TransactionCandidate],
    ) -> Result<UploadReport>;

    /// Aggregate holdings (sum of amounts per symbol) for one user.
    async fn holdings(&self, user_id: &str, filter: &HoldingsFilter) -> Result<Vec<Holding>>;

    /// Transaction history for one user, ordered by date descending.
    async fn transactions(
        &self,
        user_id: &str,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionRecord>>;
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct StoreDocument {
    transactions: Vec<TransactionRecord>,
}

/// File-backed implementation keeping all records in one JSON document.
pub struct JsonFileStore {
    store_path: PathBuf,
    lock: RwLock<()>,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(store_path: P) -> Self {
        Self {
            store_path: store_path.as_ref().to_path_buf(),
            lock: RwLock::new(()),
        }
    }

    /// Load the store document. A missing file is an empty store; a file
    /// that exists but cannot be read or parsed is an error (the duplicate
    /// check must not silently treat persisted rows as absent).
    async fn load(&self) -> Result<StoreDocument> {
        if !self.store_path.exists() {
            return Ok(StoreDocument::default());
        }
        let content = tokio::fs::read_to_string(&self.store_path).await?;
        let doc: StoreDocument = serde_json::from_str(&content)?;
        Ok(doc)
    }

    async fn save(&self, doc: &StoreDocument) -> Result<()> {
        let json = serde_json::to_string_pretty(doc)?;
        tokio::fs::write(&self.store_path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl TransactionStore for JsonFileStore {
    async fn insert_candidates(
        &self,
        user_id: &str,
        candidates: &[TransactionCandidate],
    ) -> Result<UploadReport> {
        let _guard = self.lock.write().await;

        // One read covers the existence check for the whole batch. If it
        // fails, every remaining candidate is skipped with the lookup
        // failure as its reason; nothing is written.
        let loaded = self.load().await;
        let (mut doc, existing) = match loaded {
            Ok(doc) => {
                let keys: HashSet<String> = doc
                    .transactions
                    .iter()
                    .filter(|t| t.user_id == user_id)
                    .map(record_key)
                    .collect();
                (doc, Ok(keys))
            }
            Err(e) => (StoreDocument::default(), Err(e.to_string())),
        };

        let mut report = UploadReport::default();
        let mut accepted: Vec<TransactionRecord> = Vec::new();

        for (index, candidate) in candidates.iter().enumerate() {
            let mut skip = |reason: String| {
                report.skipped.push(SkippedRow {
                    index,
                    reason,
                    row: candidate.clone(),
                });
            };

            if !candidate.amount.is_finite() {
                skip("invalid amount".to_string());
                continue;
            }
            if candidate.amount < 0.0 {
                skip("negative amount".to_string());
                continue;
            }

            match &existing {
                Err(lookup_err) => {
                    skip(format!("duplicate check failed: {}", lookup_err));
                    continue;
                }
                Ok(keys) => {
                    if keys.contains(&candidate_key(user_id, candidate)) {
                        skip("duplicate".to_string());
                        continue;
                    }
                }
            }

            let id = make_record_id(user_id, candidate, index);
            accepted.push(TransactionRecord::from_candidate(
                id,
                user_id.to_string(),
                candidate,
            ));
        }

        if !accepted.is_empty() {
            report.inserted = accepted.len();
            doc.transactions.extend(accepted);
            self.save(&doc)
                .await
                .map_err(|e| ApiError::Storage(e.to_string()))?;
        }

        Ok(report)
    }

    async fn holdings(&self, user_id: &str, filter: &HoldingsFilter) -> Result<Vec<Holding>> {
        let _guard = self.lock.read().await;
        let doc = self.load().await?;

        let needle = filter.symbol.as_deref().unwrap_or("").to_lowercase();

        let mut totals: BTreeMap<String, f64> = BTreeMap::new();
        for t in doc.transactions.iter().filter(|t| t.user_id == user_id) {
            if !needle.is_empty() && !t.symbol.to_lowercase().contains(&needle) {
                continue;
            }
            *totals.entry(t.symbol.clone()).or_insert(0.0) += t.amount;
        }

        let holdings: Vec<Holding> = totals
            .into_iter()
            .map(|(symbol, total)| Holding { symbol, total })
            .collect();

        Ok(paginate(holdings, filter.page, filter.page_size))
    }

    async fn transactions(
        &self,
        user_id: &str,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionRecord>> {
        let _guard = self.lock.read().await;
        let doc = self.load().await?;

        let symbol_needle = filter.symbol.as_deref().unwrap_or("").to_lowercase();
        let file_needle = filter.file.as_deref().unwrap_or("").to_lowercase();

        let mut rows: Vec<TransactionRecord> = doc
            .transactions
            .into_iter()
            .filter(|t| t.user_id == user_id)
            .filter(|t| symbol_needle.is_empty() || t.symbol.to_lowercase().contains(&symbol_needle))
            .filter(|t| {
                file_needle.is_empty()
                    || t.file_name
                        .as_deref()
                        .unwrap_or("")
                        .to_lowercase()
                        .contains(&file_needle)
            })
            .filter(|t| filter.from.map_or(true, |from| t.date >= from))
            .filter(|t| filter.to.map_or(true, |to| t.date <= to))
            .collect();

        rows.sort_by(|a, b| b.date.cmp(&a.date));

        Ok(paginate(rows, filter.page, filter.page_size))
    }
}

fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Vec<T> {
    let page = page.max(1);
    let offset = (page - 1) * page_size;
    items.into_iter().skip(offset).take(page_size).collect()
}

/// Key used by the authoritative duplicate check.
fn candidate_key(user_id: &str, c: &TransactionCandidate) -> String {
    storage_key(user_id, &c.symbol, c.amount, c.date, c.file_name.as_deref())
}

fn record_key(t: &TransactionRecord) -> String {
    storage_key(&t.user_id, &t.symbol, t.amount, t.date, t.file_name.as_deref())
}

fn storage_key(
    user_id: &str,
    symbol: &str,
    amount: f64,
    date: NaiveDate,
    file_name: Option<&str>,
) -> String {
    format!(
        "{}|{}|{}|{}|{}",
        user_id,
        symbol,
        amount,
        date.format("%Y-%m-%d"),
        file_name.unwrap_or("")
    )
}

fn make_record_id(user_id: &str, c: &TransactionCandidate, index: usize) -> String {
    let s = format!(
        "{}|{}|{:.8}|{}|{}|{}",
        user_id,
        c.symbol,
        c.amount,
        c.date.format("%Y-%m-%d"),
        c.file_name.as_deref().unwrap_or(""),
        index
    );

    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    let hash = hasher.finalize();

    format!("TXN-{}", hex::encode(&hash[..12]))
}
