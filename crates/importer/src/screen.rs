use std::collections::HashSet;

use crate::normalize::NormalizedRow;

/// Mark negative amounts and intra-file duplicates, in file order.
///
/// A duplicate is an exact `(symbol, amount, iso-date)` match against an
/// earlier row of the same batch; the first occurrence of a key is never
/// flagged. Rows missing an amount or date cannot form a key and are never
/// flagged as duplicates. This pass is advisory only — the store repeats the
/// check against persisted records before inserting anything.
pub fn screen_rows(rows: &mut [NormalizedRow]) {
    let mut seen: HashSet<String> = HashSet::new();

    for row in rows.iter_mut() {
        row.is_negative = matches!(row.amount, Some(a) if a < 0.0);

        let (Some(amount), Some(iso)) = (row.amount, row.iso_date()) else {
            continue;
        };
        let key = format!("{}|{}|{}", row.symbol, amount, iso);
        if !seen.insert(key) {
            row.is_duplicate = true;
        }
    }
}
