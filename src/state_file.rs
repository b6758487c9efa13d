use std::{fs, path::Path};

use anyhow::{Context, Result};
use token_ledger::{Ledger, LedgerConfig, LedgerSnapshot};

/// Open the ledger persisted at `path`, or an empty one if nothing is there yet.
pub fn load(path: &Path, config: LedgerConfig) -> Result<Ledger> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "starting a new ledger");
        return Ok(Ledger::in_memory(config));
    }
    let bytes = fs::read(path).with_context(|| format!("read state {}", path.display()))?;
    let snapshot: LedgerSnapshot = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse state {}", path.display()))?;
    let ledger = Ledger::restore(snapshot, config)
        .with_context(|| format!("verify state {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        height = ledger.meta().height,
        "ledger loaded"
    );
    Ok(ledger)
}

/// Write the snapshot next to `path` and rename it into place, so a reader
/// sees either the previous state or the new one.
pub fn save(path: &Path, ledger: &Ledger) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("mkdir {}", parent.display()))?;
    }
    let json = serde_json::to_vec_pretty(&ledger.snapshot()).context("encode snapshot")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replace {}", path.display()))?;
    tracing::debug!(path = %path.display(), bytes = json.len(), "ledger saved");
    Ok(())
}
