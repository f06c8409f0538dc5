//! Review of batches kept locally after failed submissions.
//!
//! `scanbox pending list|resend|delete|clear`. Positions are 1-based, matching
//! the "Result N" labels printed by `list`.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Local, TimeZone, Utc};
use scanbox_core::PendingBatch;
use scanbox_scan::{PendingReview, SyncError};

use super::position_to_index;

/// Display format for save timestamps, e.g. `14/Jul/2023 09:30:00`.
const TS_FORMAT: &str = "%d/%b/%Y %H:%M:%S";

pub fn format_ts<Tz: TimeZone>(ts: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    ts.with_timezone(tz).format(TS_FORMAT).to_string()
}

/// Print every pending batch with its codes.
pub async fn list<W: Write>(review: &PendingReview, json: bool, out: &mut W) -> Result<()> {
    let batches = review.load().await?;
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&batches)?)?;
        return Ok(());
    }
    write_table(&batches, &Local, out)
}

fn write_table<Tz: TimeZone, W: Write>(batches: &[PendingBatch], tz: &Tz, out: &mut W) -> Result<()>
where
    Tz::Offset: std::fmt::Display,
{
    if batches.is_empty() {
        writeln!(out, "No pending batches.")?;
        return Ok(());
    }
    for (i, batch) in batches.iter().enumerate() {
        writeln!(
            out,
            "Result {}  {}  ({} codes)",
            i + 1,
            format_ts(&batch.ts, tz),
            batch.data.len()
        )?;
        for code in &batch.data {
            writeln!(out, "    {}", code)?;
        }
    }
    Ok(())
}

/// Resend the batch at `position`; it is removed once the service accepts it.
pub async fn resend<W: Write>(review: &PendingReview, position: usize, out: &mut W) -> Result<()> {
    let index = position_to_index(position)?;
    match review.resend(index).await {
        Ok(sent) => {
            writeln!(out, "Result {} sent ({} codes).", position, sent.data.len())?;
            Ok(())
        }
        Err(SyncError::Submission(e)) => {
            anyhow::bail!("Connect to server error: {}. Result {} kept.", e, position)
        }
        Err(e) => Err(e.into()),
    }
}

/// Delete the batch at `position` without sending it.
pub async fn delete<W: Write>(review: &PendingReview, position: usize, out: &mut W) -> Result<()> {
    let index = position_to_index(position)?;
    let removed = review.delete(index).await?;
    writeln!(
        out,
        "Result {} deleted ({} codes discarded).",
        position,
        removed.data.len()
    )?;
    Ok(())
}

pub async fn clear<W: Write>(review: &PendingReview, out: &mut W) -> Result<()> {
    review.clear_all().await?;
    writeln!(out, "All pending batches cleared.")?;
    Ok(())
}
