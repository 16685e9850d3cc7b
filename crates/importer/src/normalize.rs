use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{ImportError, Result};
use crate::reader::{excel_serial_to_date, CellValue, RawTable};

/// Column-name variants mapped onto the five semantic fields. Matching is
/// case-insensitive on trimmed header text. Extend these tables when a new
/// exchange export shows up with yet another header spelling.
pub const SYMBOL_ALIASES: &[&str] = &["symbol", "asset", "ticker"];
pub const AMOUNT_ALIASES: &[&str] = &["amount", "quantity", "qty"];
pub const PRICE_ALIASES: &[&str] = &["price_usd", "price"];
pub const ORDER_TYPE_ALIASES: &[&str] = &["order_type", "order_typ", "order"];
pub const DATE_ALIASES: &[&str] = &["date", "trade date", "timestamp"];

/// A row after alias resolution and field coercion. `None` fields mean the
/// source value was absent or unparseable; the row stays visible in the
/// preview either way, with the original text in the `*_display` columns.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub symbol: String,
    pub amount: Option<f64>,
    pub amount_display: String,
    pub price: Option<f64>,
    pub price_display: String,
    pub order_type: Option<String>,
    pub date: Option<NaiveDate>,
    pub date_display: String,
    pub is_duplicate: bool,
    pub is_negative: bool,
}

impl NormalizedRow {
    /// ISO form of the date, used for storage and duplicate keys.
    pub fn iso_date(&self) -> Option<String> {
        self.date.map(|d| d.format("%Y-%m-%d").to_string())
    }

    /// A row qualifies for upload only with a symbol, a numeric amount and a
    /// parsed date, and only if the screener did not flag it.
    pub fn upload_eligible(&self) -> bool {
        !self.symbol.is_empty()
            && self.amount.is_some()
            && self.date.is_some()
            && !self.is_negative
            && !self.is_duplicate
    }
}

/// Verify that at least one alias from each required group (symbol, amount,
/// date) appears among the headers. Runs before any row is normalized; a
/// file failing this produces no preview at all.
pub fn check_required_columns(headers: &[String]) -> Result<()> {
    let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    let has_any = |aliases: &[&str]| aliases.iter().any(|a| lowered.iter().any(|h| h == a));

    let mut missing = Vec::new();
    if !has_any(SYMBOL_ALIASES) {
        missing.push("symbol");
    }
    if !has_any(AMOUNT_ALIASES) {
        missing.push("amount");
    }
    if !has_any(DATE_ALIASES) {
        missing.push("date");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ImportError::MissingRequiredColumns(missing.join(", ")))
    }
}

/// Normalize a whole table. Fails fast on the header presence check, then
/// maps every row; per-row coercion failures never abort the batch.
pub fn normalize_table(table: &RawTable) -> Result<Vec<NormalizedRow>> {
    check_required_columns(&table.headers)?;
    Ok(table.rows.iter().map(normalize_row).collect())
}

fn normalize_row(row: &HashMap<String, CellValue>) -> NormalizedRow {
    let lowered: HashMap<String, &CellValue> = row
        .iter()
        .map(|(k, v)| (k.trim().to_lowercase(), v))
        .collect();

    let lookup = |aliases: &[&str]| -> &CellValue {
        for alias in aliases {
            if let Some(cell) = lowered.get(*alias) {
                if !cell.is_empty() {
                    return cell;
                }
            }
        }
        &CellValue::Empty
    };

    let symbol_cell = lookup(SYMBOL_ALIASES);
    let amount_cell = lookup(AMOUNT_ALIASES);
    let price_cell = lookup(PRICE_ALIASES);
    let order_cell = lookup(ORDER_TYPE_ALIASES);
    let date_cell = lookup(DATE_ALIASES);

    let amount = normalize_amount(amount_cell);
    let price = normalize_price(price_cell);
    let date = normalize_date(date_cell);

    let order_type = {
        let text = order_cell.display();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    };

    let price_display = match price {
        Some(p) => format!("{:.2}", p),
        None => price_cell.display(),
    };
    let date_display = match date {
        Some(d) => d.format("%Y-%m-%d").to_string(),
        None => date_cell.display(),
    };

    NormalizedRow {
        symbol: symbol_cell.display(),
        amount,
        amount_display: amount_cell.display(),
        price,
        price_display,
        order_type,
        date,
        date_display,
        is_duplicate: false,
        is_negative: false,
    }
}

/// Numeric coercion for the amount column. Text amounts may carry thousands
/// separators; anything that still fails to parse leaves the row invalid.
pub fn normalize_amount(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(n) => Some(*n),
        CellValue::Text(s) => {
            let cleaned = s.trim().replace(',', "");
            if cleaned.is_empty() {
                return None;
            }
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    }
}

/// Price coercion: numeric values pass through, currency-formatted text like
/// "$1,234.56" is stripped of symbols, separators and whitespace first. An
/// unparseable price is absent rather than an error.
pub fn normalize_price(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(n) => Some(*n),
        CellValue::Text(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !matches!(c, '$' | '€' | '£' | ',') && !c.is_whitespace())
                .collect();
            if cleaned.is_empty() {
                return None;
            }
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    }
}

/// Date normalization, first match wins:
/// 1. already a calendar date
/// 2. numeric -> spreadsheet serial (day 0 = 1899-12-30)
/// 3. digits-only text -> serial
/// 4. other text -> known date formats
pub fn normalize_date(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Date(d) => Some(*d),
        CellValue::Number(n) => excel_serial_to_date(*n),
        CellValue::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if s.chars().all(|c| c.is_ascii_digit()) {
                return s.parse::<f64>().ok().and_then(excel_serial_to_date);
            }
            parse_date_text(s)
        }
        CellValue::Empty => None,
    }
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_normalize_price_currency_text() {
        assert_eq!(normalize_price(&text("$1,234.56")), Some(1234.56));
        assert_eq!(normalize_price(&text(" 9.45 ")), Some(9.45));
        assert_eq!(normalize_price(&text("€20.50")), Some(20.50));
        assert_eq!(normalize_price(&CellValue::Number(42.0)), Some(42.0));
        assert_eq!(normalize_price(&text("n/a")), None);
        assert_eq!(normalize_price(&CellValue::Empty), None);
    }

    #[test]
    fn test_normalize_amount() {
        assert_eq!(normalize_amount(&text("1,000")), Some(1000.0));
        assert_eq!(normalize_amount(&text("-5")), Some(-5.0));
        assert_eq!(normalize_amount(&text("five")), None);
        assert_eq!(normalize_amount(&CellValue::Number(0.25)), Some(0.25));
        assert_eq!(normalize_amount(&CellValue::Empty), None);
    }

    #[test]
    fn test_normalize_date_serial_and_text() {
        let jan1 = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert_eq!(normalize_date(&CellValue::Number(45292.0)), jan1);
        assert_eq!(normalize_date(&text("45292")), jan1);
        assert_eq!(normalize_date(&text("2024-01-01")), jan1);
        assert_eq!(normalize_date(&text("2024/01/01")), jan1);
        assert_eq!(normalize_date(&text("01/01/2024")), jan1);
        assert_eq!(normalize_date(&text("2024-01-01 13:30:00")), jan1);
        assert_eq!(normalize_date(&text("not a date")), None);
        assert_eq!(normalize_date(&CellValue::Empty), None);
    }

    #[test]
    fn test_serial_date_round_trip() {
        // Converting a serial, formatting to ISO and re-parsing lands on the
        // same calendar date.
        for serial in [25569.0, 43831.0, 45292.0, 45657.5] {
            let d = normalize_date(&CellValue::Number(serial)).unwrap();
            let iso = d.format("%Y-%m-%d").to_string();
            assert_eq!(normalize_date(&text(&iso)), Some(d));
        }
    }

    #[test]
    fn test_check_required_columns() {
        let ok = vec!["Ticker".to_string(), "Qty".to_string(), "Trade Date".to_string()];
        assert!(check_required_columns(&ok).is_ok());

        let missing_date = vec!["symbol".to_string(), "amount".to_string()];
        let err = check_required_columns(&missing_date).unwrap_err();
        match err {
            ImportError::MissingRequiredColumns(cols) => assert_eq!(cols, "date"),
            other => panic!("unexpected error: {other}"),
        }

        let nothing = vec!["foo".to_string(), "bar".to_string()];
        let err = check_required_columns(&nothing).unwrap_err();
        match err {
            ImportError::MissingRequiredColumns(cols) => {
                assert_eq!(cols, "symbol, amount, date")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_normalize_table_resolves_aliases() {
        let mut row = HashMap::new();
        row.insert("Ticker".to_string(), text("AAPL"));
        row.insert("Qty".to_string(), CellValue::Number(10.0));
        row.insert("Price_USD".to_string(), text("$150.00"));
        row.insert("Order".to_string(), text("buy"));
        row.insert("Trade Date".to_string(), text("2024-03-05"));

        let table = RawTable {
            headers: vec![
                "Ticker".to_string(),
                "Qty".to_string(),
                "Price_USD".to_string(),
                "Order".to_string(),
                "Trade Date".to_string(),
            ],
            rows: vec![row],
        };

        let rows = normalize_table(&table).unwrap();
        assert_eq!(rows.len(), 1);
        let r = &rows[0];
        assert_eq!(r.symbol, "AAPL");
        assert_eq!(r.amount, Some(10.0));
        assert_eq!(r.price, Some(150.0));
        assert_eq!(r.order_type.as_deref(), Some("buy"));
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(r.date_display, "2024-03-05");
    }

    #[test]
    fn test_invalid_row_stays_visible() {
        let mut row = HashMap::new();
        row.insert("symbol".to_string(), text("BTC"));
        row.insert("amount".to_string(), text("lots"));
        row.insert("date".to_string(), text("someday"));

        let table = RawTable {
            headers: vec!["symbol".to_string(), "amount".to_string(), "date".to_string()],
            rows: vec![row],
        };

        let rows = normalize_table(&table).unwrap();
        let r = &rows[0];
        assert_eq!(r.amount, None);
        assert_eq!(r.amount_display, "lots");
        assert_eq!(r.date, None);
        assert_eq!(r.date_display, "someday");
        assert!(!r.upload_eligible());
    }
}
