//! `scanbox status`: where submissions go and what is waiting locally.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use scanbox_scan::PendingStore;
use serde::Serialize;

use crate::config::ClientConfig;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub context: Option<String>,
    pub server: Option<String>,
    pub api_key_set: bool,
    pub store: String,
    pub pending_batches: usize,
    pub pending_codes: usize,
}

pub async fn status<W: Write>(
    config: &ClientConfig,
    store: &PendingStore,
    store_label: &Path,
    json: bool,
    out: &mut W,
) -> Result<()> {
    let endpoint = config.endpoint().ok();
    let pending = store.load().await?;

    let report = StatusReport {
        context: config.current().map(|c| c.name.clone()),
        server: endpoint.as_ref().map(|e| e.server.clone()),
        api_key_set: endpoint.as_ref().is_some_and(|e| !e.api_key.is_empty()),
        store: store_label.display().to_string(),
        pending_batches: pending.len(),
        pending_codes: pending.iter().map(|p| p.data.len()).sum(),
    };

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }

    writeln!(out, "Context:   {}", report.context.as_deref().unwrap_or("-"))?;
    writeln!(out, "Server:    {}", report.server.as_deref().unwrap_or("-"))?;
    writeln!(out, "API key:   {}", if report.api_key_set { "set" } else { "-" })?;
    writeln!(out, "Store:     {}", report.store)?;
    writeln!(
        out,
        "Pending:   {} batches, {} codes",
        report.pending_batches, report.pending_codes
    )?;
    Ok(())
}
