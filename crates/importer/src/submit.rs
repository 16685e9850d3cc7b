use models::TransactionCandidate;

use crate::error::{ImportError, Result};
use crate::normalize::NormalizedRow;

/// Default checkbox state for the preview: a row starts selected when
/// symbol, amount and date are all present.
pub fn default_selection(rows: &[NormalizedRow]) -> Vec<bool> {
    rows.iter()
        .map(|r| !r.symbol.is_empty() && r.amount.is_some() && r.date.is_some())
        .collect()
}

/// Build the final candidate list for submission.
///
/// Drops unselected rows and everything that is not upload-eligible
/// (missing symbol/amount/date, negative, intra-file duplicate). The caller
/// identity must be known up front; with no identity or no surviving rows
/// the storage collaborator is never called.
pub fn assemble_submission(
    rows: &[NormalizedRow],
    selection: &[bool],
    user_id: &str,
    file_name: Option<&str>,
) -> Result<Vec<TransactionCandidate>> {
    if user_id.trim().is_empty() {
        return Err(ImportError::Unauthenticated);
    }

    let mut out = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        if !selection.get(idx).copied().unwrap_or(false) {
            continue;
        }
        if !row.upload_eligible() {
            continue;
        }
        let (Some(amount), Some(date)) = (row.amount, row.date) else {
            continue;
        };
        out.push(TransactionCandidate {
            symbol: row.symbol.clone(),
            amount,
            price_usd: row.price,
            order_type: row.order_type.clone(),
            date,
            file_name: file_name.map(|s| s.to_string()),
        });
    }

    if out.is_empty() {
        return Err(ImportError::EmptySubmission);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(symbol: &str, amount: Option<f64>, date: Option<&str>) -> NormalizedRow {
        NormalizedRow {
            symbol: symbol.to_string(),
            amount,
            amount_display: String::new(),
            price: None,
            price_display: String::new(),
            order_type: None,
            date: date.and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            date_display: String::new(),
            is_duplicate: false,
            is_negative: false,
        }
    }

    #[test]
    fn test_duplicate_pair_uploads_only_first() {
        let mut rows = vec![
            row("AAPL", Some(10.0), Some("2024-01-01")),
            row("AAPL", Some(10.0), Some("2024-01-01")),
        ];
        crate::screen::screen_rows(&mut rows);
        let selection = default_selection(&rows);

        let candidates = assemble_submission(&rows, &selection, "user-1", Some("trades.csv")).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].symbol, "AAPL");
        assert_eq!(candidates[0].file_name.as_deref(), Some("trades.csv"));
    }

    #[test]
    fn test_negative_row_excluded() {
        let mut rows = vec![
            row("BTC", Some(-5.0), Some("2024-01-01")),
            row("BTC", Some(5.0), Some("2024-01-02")),
        ];
        crate::screen::screen_rows(&mut rows);
        let selection = default_selection(&rows);

        let candidates = assemble_submission(&rows, &selection, "user-1", None).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].amount, 5.0);
    }

    #[test]
    fn test_default_selection_requires_all_fields() {
        let rows = vec![
            row("BTC", Some(1.0), Some("2024-01-01")),
            row("", Some(1.0), Some("2024-01-01")),
            row("BTC", None, Some("2024-01-01")),
            row("BTC", Some(1.0), None),
        ];
        assert_eq!(default_selection(&rows), vec![true, false, false, false]);
    }

    #[test]
    fn test_unselected_row_excluded() {
        let rows = vec![
            row("BTC", Some(1.0), Some("2024-01-01")),
            row("ETH", Some(2.0), Some("2024-01-01")),
        ];
        let candidates = assemble_submission(&rows, &[false, true], "user-1", None).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].symbol, "ETH");
    }

    #[test]
    fn test_empty_submission_is_an_error() {
        let rows = vec![row("", None, None)];
        let selection = default_selection(&rows);
        let err = assemble_submission(&rows, &selection, "user-1", None).unwrap_err();
        assert!(matches!(err, ImportError::EmptySubmission));
    }

    #[test]
    fn test_missing_identity_is_an_error() {
        let rows = vec![row("BTC", Some(1.0), Some("2024-01-01"))];
        let selection = default_selection(&rows);
        let err = assemble_submission(&rows, &selection, "", None).unwrap_err();
        assert!(matches!(err, ImportError::Unauthenticated));
    }
}
