use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use importer::{assemble_submission, default_selection, normalize_table, read_table, screen_rows};

fn main() -> Result<()> {
    // Usage:
    //   import <trades.csv|trades.xlsx> <user_id> [output.json]
    //
    // Parses the file, prints a preview summary and writes the candidate
    // rows (the body a client would POST to /api/upload) as JSON.

    let args: Vec<String> = env::args().skip(1).collect();

    let (input, user_id) = match (args.first(), args.get(1)) {
        (Some(input), Some(user_id)) => (PathBuf::from(input), user_id.clone()),
        _ => {
            eprintln!("Usage: import <trades.csv|trades.xlsx> <user_id> [output.json]");
            std::process::exit(2);
        }
    };
    let output = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("candidates.json"));

    let file_name = input
        .file_name()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string());

    println!("📖 Parsing {}", input.display());
    let table = read_table(&input)?;
    let mut rows = normalize_table(&table)?;
    screen_rows(&mut rows);

    let eligible = rows.iter().filter(|r| r.upload_eligible()).count();
    let duplicates = rows.iter().filter(|r| r.is_duplicate).count();
    let negatives = rows.iter().filter(|r| r.is_negative).count();
    let invalid = rows
        .iter()
        .filter(|r| r.symbol.is_empty() || r.amount.is_none() || r.date.is_none())
        .count();

    println!("\n📊 Preview ({} rows):", rows.len());
    println!("✓ Upload-eligible: {}", eligible);
    println!("✓ Duplicates (in-file): {}", duplicates);
    println!("✓ Negative amounts: {}", negatives);
    println!("✓ Invalid (missing symbol/amount/date): {}", invalid);

    let selection = default_selection(&rows);
    let candidates = assemble_submission(&rows, &selection, &user_id, file_name.as_deref())?;

    write_candidates(&output, &candidates)?;
    println!("\n✅ Wrote {} candidate row(s) to {}", candidates.len(), output.display());
    println!("   Submit with: POST /api/upload  body: {{\"rows\": <file contents>}}");

    Ok(())
}

fn write_candidates(path: &Path, candidates: &[models::TransactionCandidate]) -> Result<()> {
    let json = serde_json::to_string_pretty(candidates)?;
    std::fs::write(path, json).with_context(|| format!("Cannot write {}", path.display()))?;
    Ok(())
}
