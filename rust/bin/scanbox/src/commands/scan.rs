//! Scan session and one-shot submit.
//!
//! A session reads one scanned code per line, the way keyboard-wedge
//! scanners type them. Lines starting with `:` are directives; a leading
//! `::` scans a code that itself starts with `:`.

use std::io::{BufRead, Write};

use anyhow::Result;
use scanbox_scan::{SaveOutcome, SyncError, SyncWorkflow};

use super::prompt_yes_no;

const HELP: &str = "\
Scan codes, one per line. Directives:
  :list        show scanned codes
  :rm <n>      remove code number n
  :clear       clear all scanned codes
  :save        submit the codes
  :help        show this help
  :quit        leave the session
A code starting with ':' is entered as '::', e.g. ::WH-01";

const CLEAR_QUESTION: &str = "Are you sure to clear result ?";
const LOCAL_SAVE_QUESTION: &str = "Connect to server was error, do you want to save on local ?";

/// How a failed save is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalSave {
    Ask,
    Always,
    Never,
}

/// Run an interactive session until `:quit` or end of input.
pub async fn run_session<R: BufRead, W: Write>(
    workflow: &mut SyncWorkflow,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    writeln!(out, "{}", HELP)?;

    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let entry = line.trim();
        if entry.is_empty() {
            continue;
        }

        let directive = match classify(entry) {
            Line::Code(code) => {
                if workflow.scan(code)? {
                    writeln!(out, "+ {}  (Found {} codes)", code, workflow.batch().len())?;
                } else {
                    writeln!(out, "= {} already scanned", code)?;
                }
                continue;
            }
            Line::Directive(directive) => directive,
        };

        let mut parts = directive.split_whitespace();
        match (parts.next().unwrap_or_default(), parts.next()) {
            ("list" | "ls", _) => print_batch(workflow, out)?,
            ("rm", Some(n)) => {
                let removed = n
                    .parse::<usize>()
                    .map_err(anyhow::Error::from)
                    .and_then(super::position_to_index)
                    .and_then(|i| workflow.remove_at(i).map_err(anyhow::Error::from));
                match removed {
                    Ok(code) => writeln!(out, "- {}  (Found {} codes)", code, workflow.batch().len())?,
                    Err(e) => writeln!(out, "Cannot remove {}: {}", n, e)?,
                }
            }
            ("clear", _) => {
                if workflow.batch().is_empty() {
                    writeln!(out, "Nothing to clear.")?;
                } else if prompt_yes_no(input, out, CLEAR_QUESTION)? {
                    workflow.clear()?;
                    writeln!(out, "Cleared.")?;
                }
            }
            ("save", _) => {
                if workflow.batch().is_empty() {
                    writeln!(out, "Nothing to save.")?;
                } else if let Err(e) = save(workflow, LocalSave::Ask, input, out).await {
                    if !is_storage_failure(&e) {
                        return Err(e);
                    }
                    writeln!(out, "Still scanning. Type :save to try again.")?;
                }
            }
            ("help", _) => writeln!(out, "{}", HELP)?,
            ("quit" | "q", _) => break,
            _ => writeln!(out, "Unknown directive \"{}\". Type :help.", entry)?,
        }
    }

    if !workflow.batch().is_empty() {
        writeln!(out, "Leaving with {} unsaved codes.", workflow.batch().len())?;
    }
    Ok(())
}

enum Line<'a> {
    Code(&'a str),
    Directive(&'a str),
}

fn classify(entry: &str) -> Line<'_> {
    match entry.strip_prefix(':') {
        Some(rest) if rest.starts_with(':') => Line::Code(rest),
        Some(directive) => Line::Directive(directive),
        None => Line::Code(entry),
    }
}

fn is_storage_failure(e: &anyhow::Error) -> bool {
    e.downcast_ref::<SyncError>().is_some_and(SyncError::is_storage)
}

/// Save the batch, resolving a failure according to `local`.
///
/// Returns `Err` only for storage failures and workflow misuse; a rejected
/// submission is reported and handled, not propagated. When the local save
/// itself fails the batch stays in the workflow untouched and its codes are
/// printed, since they reached neither the service nor the store.
pub async fn save<R: BufRead, W: Write>(
    workflow: &mut SyncWorkflow,
    local: LocalSave,
    input: &mut R,
    out: &mut W,
) -> Result<SaveOutcome> {
    let outcome = workflow.save().await?;
    match &outcome {
        SaveOutcome::Submitted { count } => {
            writeln!(out, "Saved {} codes.", count)?;
        }
        SaveOutcome::NeedsConfirmation { reason } => {
            writeln!(out, "Connection error: {}", reason)?;
            let keep = match local {
                LocalSave::Always => true,
                LocalSave::Never => false,
                LocalSave::Ask => prompt_yes_no(input, out, LOCAL_SAVE_QUESTION)?,
            };
            if keep {
                let pending = match workflow.confirm_local_save().await {
                    Ok(p) => p,
                    Err(e) if e.is_storage() => {
                        workflow.abandon()?;
                        writeln!(out, "Could not save locally: {}", e)?;
                        writeln!(out, "Unsaved codes:")?;
                        for code in workflow.batch() {
                            writeln!(out, "  {}", code)?;
                        }
                        return Err(anyhow::Error::new(e).context("Could not save locally"));
                    }
                    Err(e) => return Err(e.into()),
                };
                writeln!(
                    out,
                    "Kept {} codes locally. Use `scanbox pending resend` later.",
                    pending.data.len()
                )?;
            } else {
                workflow.decline()?;
                writeln!(out, "Not saved.")?;
            }
        }
    }
    Ok(outcome)
}

/// One-shot submit of codes given on the command line.
pub async fn submit<R: BufRead, W: Write>(
    workflow: &mut SyncWorkflow,
    codes: Vec<String>,
    local: LocalSave,
    input: &mut R,
    out: &mut W,
) -> Result<SaveOutcome> {
    for code in codes {
        let code = code.trim().to_string();
        if !code.is_empty() {
            workflow.scan(code)?;
        }
    }
    match save(workflow, local, input, out).await {
        Err(e) => match e.downcast_ref::<SyncError>() {
            Some(SyncError::EmptyBatch) => anyhow::bail!("No codes given."),
            _ => Err(e),
        },
        other => other,
    }
}

fn print_batch<W: Write>(workflow: &SyncWorkflow, out: &mut W) -> Result<()> {
    let batch = workflow.batch();
    writeln!(out, "Found {} codes", batch.len())?;
    if batch.is_empty() {
        writeln!(out, "  not have any result")?;
    }
    for (i, code) in batch.iter().enumerate() {
        writeln!(out, "  {:3}. {}", i + 1, code)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use scanbox_kv::{KVError, KVStore, MemoryStore};
    use scanbox_scan::testing::StubSubmitter;
    use scanbox_scan::{FailurePolicy, PendingStore, SyncState};

    use super::*;

    fn setup(submitter: Arc<StubSubmitter>) -> (SyncWorkflow, Arc<PendingStore>) {
        let store = Arc::new(PendingStore::new(Arc::new(MemoryStore::new())));
        let wf = SyncWorkflow::new(submitter, Arc::clone(&store), FailurePolicy::default());
        (wf, store)
    }

    struct ReadOnlyKv;

    impl KVStore for ReadOnlyKv {
        fn get(&self, _key: &str) -> Result<Option<String>, KVError> {
            Ok(None)
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), KVError> {
            Err(KVError::Storage("read-only filesystem".into()))
        }
    }

    /// Every submission fails and the local store cannot be written.
    fn unwritable(policy: FailurePolicy) -> SyncWorkflow {
        let store = Arc::new(PendingStore::new(Arc::new(ReadOnlyKv)));
        SyncWorkflow::new(Arc::new(StubSubmitter::failing()), store, policy)
    }

    async fn script(wf: &mut SyncWorkflow, lines: &str) -> String {
        let mut out = Vec::new();
        run_session(wf, &mut Cursor::new(lines.to_string()), &mut out)
            .await
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn session_dedupes_and_removes() {
        let (mut wf, _) = setup(Arc::new(StubSubmitter::default()));
        let out = script(&mut wf, "A\nB\nA\n:rm 1\n:rm 9\n:list\n").await;

        assert_eq!(wf.batch().snapshot(), ["B"]);
        assert!(out.contains("= A already scanned"));
        assert!(out.contains("- A  (Found 1 codes)"));
        assert!(out.contains("Cannot remove 9"));
        assert!(out.contains("Leaving with 1 unsaved codes."));
    }

    #[tokio::test]
    async fn session_save_success() {
        let submitter = Arc::new(StubSubmitter::default());
        let (mut wf, store) = setup(submitter.clone());
        let out = script(&mut wf, "A\nB\n:save\n:quit\nC\n").await;

        assert!(out.contains("Saved 2 codes."));
        assert!(wf.batch().is_empty());
        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(submitter.calls().len(), 1);
    }

    #[tokio::test]
    async fn session_failed_save_kept_locally() {
        let (mut wf, store) = setup(Arc::new(StubSubmitter::failing()));
        let out = script(&mut wf, "A\nB\n:save\ny\n").await;

        assert!(out.contains(LOCAL_SAVE_QUESTION));
        let pending = store.load().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].data.snapshot(), ["A", "B"]);
        assert_eq!(wf.batch().len(), 2);
    }

    #[tokio::test]
    async fn session_failed_save_declined() {
        let (mut wf, store) = setup(Arc::new(StubSubmitter::failing()));
        let out = script(&mut wf, "A\n:save\nn\nB\n").await;

        assert!(out.contains("Not saved."));
        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(wf.batch().snapshot(), ["A", "B"]);
    }

    #[tokio::test]
    async fn failed_local_save_keeps_codes() {
        let mut wf = unwritable(FailurePolicy {
            clear_on_local_save: true,
            clear_on_decline: true,
        });
        wf.scan("A").unwrap();
        wf.scan("B").unwrap();
        let mut out = Vec::new();

        let err = save(&mut wf, LocalSave::Always, &mut Cursor::new(""), &mut out)
            .await
            .unwrap_err();
        assert!(is_storage_failure(&err));
        assert_eq!(wf.state(), &SyncState::Idle);
        assert_eq!(wf.batch().snapshot(), ["A", "B"]);

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Unsaved codes:\n  A\n  B\n"));
    }

    #[tokio::test]
    async fn session_survives_failed_local_save() {
        let mut wf = unwritable(FailurePolicy::default());
        let out = script(&mut wf, "A\nB\n:save\ny\nC\n").await;

        assert!(out.contains("Could not save locally"));
        assert!(out.contains("Still scanning."));
        assert_eq!(wf.batch().snapshot(), ["A", "B", "C"]);
    }

    #[tokio::test]
    async fn double_colon_scans_literal_code() {
        let (mut wf, _) = setup(Arc::new(StubSubmitter::default()));
        let out = script(&mut wf, "::WH-01\n:WH-02\nA\n").await;

        assert_eq!(wf.batch().snapshot(), [":WH-01", "A"]);
        assert!(out.contains("+ :WH-01  (Found 1 codes)"));
        assert!(out.contains("Unknown directive \":WH-02\""));
    }

    #[tokio::test]
    async fn session_clear_needs_confirmation() {
        let (mut wf, _) = setup(Arc::new(StubSubmitter::default()));
        script(&mut wf, "A\n:clear\nn\n").await;
        assert_eq!(wf.batch().len(), 1);

        script(&mut wf, ":clear\ny\n").await;
        assert!(wf.batch().is_empty());
    }

    #[tokio::test]
    async fn submit_with_forced_local_save() {
        let (mut wf, store) = setup(Arc::new(StubSubmitter::failing()));
        let mut out = Vec::new();
        let outcome = submit(
            &mut wf,
            vec!["A".into(), " ".into(), "A".into(), "B".into()],
            LocalSave::Always,
            &mut Cursor::new(""),
            &mut out,
        )
        .await
        .unwrap();

        assert!(matches!(outcome, SaveOutcome::NeedsConfirmation { .. }));
        assert_eq!(store.load().await.unwrap()[0].data.snapshot(), ["A", "B"]);
    }

    #[tokio::test]
    async fn submit_without_codes_fails() {
        let (mut wf, _) = setup(Arc::new(StubSubmitter::default()));
        let mut out = Vec::new();
        let err = submit(&mut wf, vec![], LocalSave::Never, &mut Cursor::new(""), &mut out)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No codes given.");
    }
}
