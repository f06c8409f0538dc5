//! Command implementations, one module per command group.

pub mod context;
pub mod pending;
pub mod scan;
pub mod status;

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::Result;
use scanbox_client::{HttpSubmitter, Submitter};
use scanbox_core::StoreConfig;
use scanbox_kv::{KVStore, MemoryStore, RedbStore};
use scanbox_scan::PendingStore;
use tracing::debug;

use crate::config::Endpoint;

/// Open the pending store: redb under the data dir, or memory for `--ephemeral`.
pub fn open_store(store_config: &StoreConfig, ephemeral: bool) -> Result<Arc<PendingStore>> {
    let kv: Arc<dyn KVStore> = if ephemeral {
        debug!("using in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        let path = store_config.resolve_db_path();
        Arc::new(
            RedbStore::open(&path)
                .map_err(|e| anyhow::anyhow!("failed to open local store {}: {}", path.display(), e))?,
        )
    };
    Ok(Arc::new(PendingStore::new(kv)))
}

pub fn build_submitter(endpoint: &Endpoint) -> Result<Arc<dyn Submitter>> {
    let client = HttpSubmitter::new(&endpoint.server, &endpoint.api_key)?;
    debug!("submissions go to {}", client.submit_url());
    Ok(Arc::new(client))
}

/// Ask a yes/no question. Anything but `y`/`yes` (or end of input) is no.
pub fn prompt_yes_no<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> Result<bool> {
    write!(out, "{} [y/N]: ", question)?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        writeln!(out)?;
        return Ok(false);
    }
    let answer = line.trim();
    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}

/// Convert a 1-based position typed by the user into an index.
pub fn position_to_index(position: usize) -> Result<usize> {
    position
        .checked_sub(1)
        .ok_or_else(|| anyhow::anyhow!("Positions start at 1."))
}
