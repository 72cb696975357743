// JSONL file operations

use crate::record::Record;
use eyre::{Context, Result};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

/// Replace the contents of a JSONL file with `records`, one per line
///
/// The file is exclusively locked while it is rewritten.
pub fn write_jsonl<'a, T, I>(path: &Path, records: I) -> Result<usize>
where
    T: Record + 'a,
    I: IntoIterator<Item = &'a T>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("Failed to create snapshot directory")?;
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)
        .context("Failed to open JSONL file for writing")?;

    // Acquire exclusive lock before truncating
    file.lock_exclusive().context("Failed to acquire file lock")?;
    file.set_len(0)?;

    let mut writer = BufWriter::new(&file);
    let mut count = 0;
    for record in records {
        let json = serde_json::to_string(record).context("Failed to serialize record")?;
        writeln!(writer, "{}", json)?;
        count += 1;
    }
    writer.flush()?;
    drop(writer);
    file.sync_all()?; // Ensure data is flushed to disk

    info!(file = ?path, count, "Wrote records to JSONL");

    // Lock is automatically released when file is dropped
    Ok(count)
}

/// Read all records from a JSONL file, returning the latest version per ID
///
/// Records come back in the order their id first appeared in the file. For
/// duplicate ids the one with the highest `updated_at` wins. Blank lines
/// and lines that fail to parse are skipped with a warning.
pub fn read_jsonl_latest<T: Record>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        // File doesn't exist yet, nothing to load
        return Ok(Vec::new());
    }

    let file = File::open(path).context("Failed to open JSONL file")?;
    let reader = BufReader::new(file);
    let mut records: Vec<T> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!(
                    file = ?path,
                    line = line_num + 1,
                    error = ?e,
                    "Failed to read line, skipping"
                );
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let record: T = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                warn!(
                    file = ?path,
                    line = line_num + 1,
                    error = ?e,
                    "Failed to parse JSON, skipping"
                );
                continue;
            }
        };

        // Keep the record with the latest updated_at
        match positions.get(record.id()) {
            Some(&pos) => {
                if record.updated_at() > records[pos].updated_at() {
                    records[pos] = record;
                }
            }
            None => {
                positions.insert(record.id().to_string(), records.len());
                records.push(record);
            }
        }
    }

    info!(
        file = ?path,
        count = records.len(),
        "Loaded latest records from JSONL"
    );

    Ok(records)
}
