use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, warn};

use crate::feed::{normalize_row, parse_fixtures, Source, SEASON_LENGTH};
use crate::store::models::ConsolidatedDocument;
use crate::store::{write_atomically, SnapshotStore};

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub document: ConsolidatedDocument,
    /// Whether the document on disk was rewritten
    pub changed: bool,
}

/// The persisted consolidated document, or an empty one if none exists yet.
pub fn load_document(path: &Path) -> Result<ConsolidatedDocument> {
    match fs::read(path) {
        Ok(raw) => serde_json::from_slice(&raw)
            .with_context(|| format!("Failed to parse {}", path.display())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(ConsolidatedDocument::new()),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

/// Rebuild every week that has a readable snapshot; keep the previous rows of
/// every other week untouched.
pub fn fold_snapshots(
    previous: &ConsolidatedDocument,
    source: &Source,
    snapshots: &SnapshotStore,
) -> ConsolidatedDocument {
    let mut document = previous.clone();
    for period in 1..=SEASON_LENGTH {
        let payload = match snapshots.load(period) {
            Ok(Some(payload)) => payload,
            Ok(None) => continue,
            Err(e) => {
                warn!("[{}] Week {}: keeping previous rows: {:#}", source.name, period, e);
                continue;
            }
        };
        let rows = parse_fixtures(&payload, source)
            .iter()
            .map(|fixture| normalize_row(period, fixture, source))
            .collect();
        document.insert(period, rows);
    }
    document
}

/// Fold all snapshots of `source` into its consolidated document, writing it
/// only when the content actually changed.
pub fn merge_source(source: &Source, snapshots: &SnapshotStore) -> Result<MergeOutcome> {
    let path = &source.consolidated_path;
    let previous = load_document(path)?;
    let document = fold_snapshots(&previous, source, snapshots);

    if document == previous {
        info!("[{}] {} unchanged, not rewritten", source.name, file_name(path));
        return Ok(MergeOutcome {
            document,
            changed: false,
        });
    }

    let body = serde_json::to_vec_pretty(&document).context("Failed to encode document")?;
    write_atomically(path, &body)?;
    info!("[{}] {} updated", source.name, file_name(path));
    Ok(MergeOutcome {
        document,
        changed: true,
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
