//! Backup, write, restart, verify and rollback of a store change.
//!
//! The shell that consumes the store gives no completion signal and may
//! rewrite or discard a document it does not expect. A change is therefore
//! only considered applied once the shell has been restarted and the value
//! resolved from the live system matches the requested one. Anything else
//! restores the backup taken before the write.
//!
//! ```text
//! Idle -> BackedUp -> Written -> RestartRequested -> Verified
//!                             |                   \-> RolledBack
//!                             \-> Skipped (written, unverified)
//! ```
//!
//! Failures before `Written` abort with the document untouched.

use std::time::Duration;

use serde::Serialize;

use crate::config::DEFAULT_SETTLE_DELAY_MS;
use crate::error::Result;
use crate::shell::ShellProcess;
use crate::store::{ConfigurationTree, Store};

/// Steps of a transaction, in the order they are reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionState {
    Idle,
    BackedUp,
    Written,
    RestartRequested,
    Skipped,
    Verified,
    RolledBack,
}

/// Terminal outcome of a mutating operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum TransactionStatus {
    /// The live system reports the requested value.
    Verified,
    /// Verification failed and the backup was restored.
    RolledBack { reason: String },
    /// Written without a restart; the caller restarts the shell later.
    WrittenUnverified,
}

/// Caller-controlled transaction behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOptions {
    /// Write only; do not restart the shell or verify.
    pub skip_restart: bool,
    /// Log every state transition at `info` and keep a step trace in the report.
    pub trace: bool,
    /// Wait between restarting the shell and verifying.
    pub settle: Duration,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self { skip_restart: false, trace: false, settle: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS) }
    }
}

/// What a transaction did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReport {
    #[serde(flatten)]
    pub status: TransactionStatus,
    pub states: Vec<TransactionState>,
    /// Value that was requested.
    pub expected: String,
    /// Value resolved from the live system after the restart.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed: Option<String>,
    /// `false` if a rollback was needed but restoring the backup failed.
    pub restored: bool,
    /// Step messages, filled when tracing is enabled.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<String>,
}

impl TransactionReport {
    fn new(expected: &str) -> Self {
        Self {
            status: TransactionStatus::WrittenUnverified,
            states: vec![TransactionState::Idle],
            expected: expected.to_string(),
            observed: None,
            restored: true,
            trace: Vec::new(),
        }
    }

    /// The last state reached.
    #[must_use]
    pub fn final_state(&self) -> TransactionState {
        self.states.last().copied().unwrap_or(TransactionState::Idle)
    }

    #[must_use]
    pub const fn is_verified(&self) -> bool { matches!(self.status, TransactionStatus::Verified) }
}

/// Fixed wait after restarting the shell.
pub trait Settle {
    fn wait(&self, duration: Duration);
}

/// Blocks the calling thread for the settle duration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepSettle;

impl Settle for SleepSettle {
    fn wait(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Re-resolves the value in effect for the transaction's target from the
/// live system (fresh store read and fresh topology).
pub trait LiveResolver {
    /// Returns the value currently in effect, if any.
    ///
    /// # Errors
    ///
    /// Any error is treated as a failed verification.
    fn resolve(&self) -> Result<Option<String>>;
}

/// Runs store changes through backup, write, restart and verification.
pub struct Transaction<'a> {
    store: &'a Store,
    shell: &'a dyn ShellProcess,
    settle: &'a dyn Settle,
}

impl<'a> Transaction<'a> {
    #[must_use]
    pub fn new(store: &'a Store, shell: &'a dyn ShellProcess, settle: &'a dyn Settle) -> Self {
        Self { store, shell, settle }
    }

    /// Applies `mutate` to the current document and commits the result.
    ///
    /// `expected` is compared with what `live` resolves after the restart.
    ///
    /// # Errors
    ///
    /// Returns an error only when a step before the write fails (load,
    /// mutation, backup or the write itself). Later failures are reported
    /// through [`TransactionStatus::RolledBack`].
    pub fn run<F>(
        &self,
        mutate: F,
        expected: &str,
        live: &dyn LiveResolver,
        options: &TransactionOptions,
    ) -> Result<TransactionReport>
    where
        F: FnOnce(&ConfigurationTree) -> Result<ConfigurationTree>,
    {
        let mut report = TransactionReport::new(expected);

        let current = self.store.load()?;
        let candidate = mutate(&current)?;

        let bytes = self.store.backup()?;
        record(&mut report, options, TransactionState::BackedUp, &format!("backup of {bytes} bytes taken"));

        self.store.write(&candidate)?;
        record(&mut report, options, TransactionState::Written, &self.store.path().display().to_string());

        if options.skip_restart {
            record(&mut report, options, TransactionState::Skipped, "restart skipped, change not verified");
            report.status = TransactionStatus::WrittenUnverified;
            return Ok(report);
        }

        if let Err(err) = self.shell.restart() {
            self.roll_back(&mut report, options, format!("shell restart failed: {err}"));
            return Ok(report);
        }
        record(&mut report, options, TransactionState::RestartRequested, "shell restart requested");

        self.settle.wait(options.settle);

        match live.resolve() {
            Ok(Some(observed)) if observed == expected => {
                report.observed = Some(observed);
                record(&mut report, options, TransactionState::Verified, expected);
                report.status = TransactionStatus::Verified;
            }
            Ok(observed) => {
                let reason = format!(
                    "expected '{expected}', live system reports '{}'",
                    observed.as_deref().unwrap_or("nothing")
                );
                report.observed = observed;
                self.roll_back(&mut report, options, reason);
            }
            Err(err) => self.roll_back(&mut report, options, format!("verification failed: {err}")),
        }

        Ok(report)
    }

    /// Restores the backup and restarts the shell again, both best effort.
    fn roll_back(&self, report: &mut TransactionReport, options: &TransactionOptions, reason: String) {
        tracing::warn!(reason = %reason, "transaction: rolling back");

        if let Err(err) = self.store.restore() {
            tracing::error!(error = %err, "transaction: failed to restore backup");
            report.restored = false;
        }
        if let Err(err) = self.shell.restart() {
            tracing::warn!(error = %err, "transaction: shell restart after rollback failed");
        }

        record(report, options, TransactionState::RolledBack, &reason);
        report.status = TransactionStatus::RolledBack { reason };
    }
}

fn record(report: &mut TransactionReport, options: &TransactionOptions, state: TransactionState, detail: &str) {
    if options.trace {
        tracing::info!(state = ?state, detail, "transaction: state changed");
        report.trace.push(format!("{state:?}: {detail}"));
    } else {
        tracing::debug!(state = ?state, detail, "transaction: state changed");
    }
    report.states.push(state);
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::fs;
    use std::time::SystemTime;

    use tempfile::TempDir;

    use super::*;
    use crate::error::WallspaceError;
    use crate::store::{Choice, DisplayConfig, Slot};

    #[derive(Default)]
    struct CountingShell {
        restarts: Cell<usize>,
        fail: bool,
    }

    impl ShellProcess for CountingShell {
        fn restart(&self) -> Result<usize> {
            self.restarts.set(self.restarts.get() + 1);
            if self.fail {
                return Err(WallspaceError::ShellError("denied".to_string()));
            }
            Ok(1)
        }
    }

    #[derive(Default)]
    struct RecordingSettle {
        waits: RefCell<Vec<Duration>>,
    }

    impl Settle for RecordingSettle {
        fn wait(&self, duration: Duration) { self.waits.borrow_mut().push(duration); }
    }

    struct FixedResolver(Result<Option<String>>);

    impl LiveResolver for FixedResolver {
        fn resolve(&self) -> Result<Option<String>> {
            match &self.0 {
                Ok(value) => Ok(value.clone()),
                Err(err) => Err(WallspaceError::ReadError(err.to_string())),
            }
        }
    }

    fn tree(provider: &str) -> ConfigurationTree {
        ConfigurationTree {
            system_default: Some(DisplayConfig {
                idle: Some(Slot::new(Choice::new(provider, vec![1]), SystemTime::UNIX_EPOCH)),
                ..DisplayConfig::default()
            }),
            ..ConfigurationTree::default()
        }
    }

    fn seeded_store(dir: &TempDir) -> Store {
        let store = Store::new(dir.path().join("Index.plist"));
        store.write(&tree("before")).unwrap();
        store
    }

    fn options() -> TransactionOptions { TransactionOptions { settle: Duration::ZERO, ..TransactionOptions::default() } }

    #[test]
    fn test_verified_when_live_value_matches() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir);
        let shell = CountingShell::default();
        let settle = RecordingSettle::default();

        let report = Transaction::new(&store, &shell, &settle)
            .run(|_| Ok(tree("after")), "Aerial", &FixedResolver(Ok(Some("Aerial".to_string()))), &options())
            .unwrap();

        assert_eq!(report.status, TransactionStatus::Verified);
        assert_eq!(
            report.states,
            vec![
                TransactionState::Idle,
                TransactionState::BackedUp,
                TransactionState::Written,
                TransactionState::RestartRequested,
                TransactionState::Verified,
            ]
        );
        assert_eq!(shell.restarts.get(), 1);
        assert_eq!(settle.waits.borrow().as_slice(), [Duration::ZERO]);
        assert_eq!(store.load().unwrap(), tree("after"));
    }

    #[test]
    fn test_mismatch_rolls_back_to_backup_bytes() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir);
        let before = fs::read(store.path()).unwrap();
        let shell = CountingShell::default();

        let report = Transaction::new(&store, &shell, &SleepSettle)
            .run(|_| Ok(tree("after")), "Aerial", &FixedResolver(Ok(Some("Flurry".to_string()))), &options())
            .unwrap();

        assert!(matches!(report.status, TransactionStatus::RolledBack { .. }));
        assert_eq!(report.final_state(), TransactionState::RolledBack);
        assert_eq!(report.observed.as_deref(), Some("Flurry"));
        assert!(report.restored);
        assert_eq!(fs::read(store.path()).unwrap(), before);
        assert_eq!(fs::read(store.backup_path()).unwrap(), before);
        assert_eq!(shell.restarts.get(), 2, "restarted again after restoring");
    }

    #[test]
    fn test_resolver_error_rolls_back() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir);
        let before = fs::read(store.path()).unwrap();

        let resolver = FixedResolver(Err(WallspaceError::TopologyError("gone".to_string())));
        let report = Transaction::new(&store, &CountingShell::default(), &SleepSettle)
            .run(|_| Ok(tree("after")), "Aerial", &resolver, &options())
            .unwrap();

        assert!(matches!(report.status, TransactionStatus::RolledBack { ref reason } if reason.contains("gone")));
        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn test_nothing_resolved_rolls_back() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir);

        let report = Transaction::new(&store, &CountingShell::default(), &SleepSettle)
            .run(|_| Ok(tree("after")), "Aerial", &FixedResolver(Ok(None)), &options())
            .unwrap();

        assert!(matches!(report.status, TransactionStatus::RolledBack { ref reason } if reason.contains("nothing")));
    }

    #[test]
    fn test_shell_failure_rolls_back() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir);
        let before = fs::read(store.path()).unwrap();
        let shell = CountingShell { fail: true, ..CountingShell::default() };

        let report = Transaction::new(&store, &shell, &SleepSettle)
            .run(|_| Ok(tree("after")), "Aerial", &FixedResolver(Ok(Some("Aerial".to_string()))), &options())
            .unwrap();

        assert!(matches!(report.status, TransactionStatus::RolledBack { .. }));
        assert!(!report.states.contains(&TransactionState::RestartRequested));
        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn test_skip_restart_is_written_unverified() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir);
        let shell = CountingShell::default();
        let settle = RecordingSettle::default();
        let options = TransactionOptions { skip_restart: true, ..options() };

        let report = Transaction::new(&store, &shell, &settle)
            .run(|_| Ok(tree("after")), "Aerial", &FixedResolver(Ok(None)), &options)
            .unwrap();

        assert_eq!(report.status, TransactionStatus::WrittenUnverified);
        assert_eq!(report.final_state(), TransactionState::Skipped);
        assert_eq!(shell.restarts.get(), 0);
        assert!(settle.waits.borrow().is_empty());
        assert_eq!(store.load().unwrap(), tree("after"));
    }

    #[test]
    fn test_mutation_error_aborts_without_writing() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir);
        let before = fs::read(store.path()).unwrap();

        let result = Transaction::new(&store, &CountingShell::default(), &SleepSettle).run(
            |_| Err(WallspaceError::DisplayNotFound(4)),
            "Aerial",
            &FixedResolver(Ok(None)),
            &options(),
        );

        assert!(matches!(result, Err(WallspaceError::DisplayNotFound(4))));
        assert_eq!(fs::read(store.path()).unwrap(), before);
        assert!(!store.backup_path().exists());
    }

    #[test]
    fn test_missing_store_aborts() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join("Index.plist"));

        let result = Transaction::new(&store, &CountingShell::default(), &SleepSettle).run(
            |tree| Ok(tree.clone()),
            "Aerial",
            &FixedResolver(Ok(None)),
            &options(),
        );
        assert!(matches!(result, Err(WallspaceError::ReadError(_))));
        assert!(!store.path().exists());
    }

    #[test]
    fn test_trace_collects_steps() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir);
        let options = TransactionOptions { trace: true, skip_restart: true, ..options() };

        let report = Transaction::new(&store, &CountingShell::default(), &SleepSettle)
            .run(|_| Ok(tree("after")), "Aerial", &FixedResolver(Ok(None)), &options)
            .unwrap();

        assert_eq!(report.trace.len(), 3);
        assert!(report.trace[0].starts_with("BackedUp"));
    }

    #[test]
    fn test_default_options() {
        let options = TransactionOptions::default();
        assert!(!options.skip_restart);
        assert!(!options.trace);
        assert_eq!(options.settle, Duration::from_secs(3));
    }
}
