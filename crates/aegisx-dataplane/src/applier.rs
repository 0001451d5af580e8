//! Atomically swaps the live kernel ruleset to a translated IR, with
//! automatic rollback on failure.
//!
//! The loader (`nft -f -`) either commits an entire script or rejects it as
//! a unit, which is what makes the swap atomic from the kernel's
//! perspective: there is no partially-applied state for callers to observe.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use aegisx_core::error::ApplyError;
use aegisx_core::types::Ir;

use crate::translator::{self, TABLE_FAMILY};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Configuration the applier needs; owned by the controller.
#[derive(Debug, Clone)]
pub struct ApplierConfig {
    pub table_name: String,
    pub rollback_dir: PathBuf,
    pub dry_run: bool,
}

pub struct Applier {
    config: ApplierConfig,
}

impl Applier {
    pub fn new(config: ApplierConfig) -> Self {
        Self { config }
    }

    /// Translate `ir`, snapshot the live ruleset, load the new one, and roll
    /// back automatically if the loader rejects it.
    pub fn apply(&self, ir: &Ir) -> Result<(), ApplyError> {
        let script = translator::translate(ir, &self.config.table_name);

        if self.config.dry_run {
            tracing::info!(table = %self.config.table_name, "dry-run: not touching the kernel");
            tracing::debug!(script = %script, "would load this ruleset");
            return Ok(());
        }

        match self.snapshot() {
            Ok(path) => tracing::info!(snapshot = %path.display(), "captured pre-apply snapshot"),
            Err(e) => tracing::warn!(error = %e, "could not capture pre-apply snapshot"),
        }

        let result = self.load_script(&script, "apply");

        if let Err(e) = &result {
            tracing::error!(error = %e, "loader rejected ruleset, rolling back");
            if let Err(rollback_err) = self.rollback() {
                tracing::error!(error = %rollback_err, "rollback also failed");
            }
        }

        result
    }

    /// Restore the most recently captured snapshot.
    pub fn rollback(&self) -> Result<(), ApplyError> {
        let latest = self.latest_snapshot()?.ok_or(ApplyError::NoSnapshot)?;
        let script = fs::read_to_string(&latest)?;
        self.load_script(&script, "rollback")
    }

    /// Remove the table entirely. Absence of the table is success.
    pub fn flush(&self) -> Result<(), ApplyError> {
        let output = Command::new("nft")
            .args(["delete", "table", TABLE_FAMILY, &self.config.table_name])
            .output()?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("No such file or directory") {
            return Ok(());
        }
        Err(ApplyError::LoaderFailure {
            phase: "flush",
            exit_code: output.status.code(),
            output: stderr.to_string(),
        })
    }

    /// Current live ruleset text for the managed table.
    pub fn status(&self) -> Result<String, ApplyError> {
        let output = Command::new("nft")
            .args(["list", "table", TABLE_FAMILY, &self.config.table_name])
            .output()?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).to_string());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("No such file or directory") {
            return Ok(String::new());
        }
        Err(ApplyError::StatusError(stderr.to_string()))
    }

    /// Line-set symmetric difference between the live ruleset and the
    /// translated form of `ir`: `-` lines are only live, `+` lines are only
    /// proposed.
    pub fn diff(&self, ir: &Ir) -> String {
        let proposed = translator::translate(ir, &self.config.table_name);
        let live = self.status().unwrap_or_default();

        let live_lines: Vec<&str> = live.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        let proposed_lines: Vec<&str> = proposed
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        let mut out = String::new();
        let mut removed = 0;
        let mut added = 0;

        for line in &live_lines {
            if !proposed_lines.contains(line) {
                out.push_str(&format!("- {line}\n"));
                removed += 1;
            }
        }
        for line in &proposed_lines {
            if !live_lines.contains(line) {
                out.push_str(&format!("+ {line}\n"));
                added += 1;
            }
        }

        if added == 0 && removed == 0 {
            return out;
        }
        format!("{added} additions, {removed} removals\n{out}")
    }

    fn load_script(&self, script: &str, phase: &'static str) -> Result<(), ApplyError> {
        let temp_path = self.config.rollback_dir.join(format!(".load-{}.conf", std::process::id()));
        fs::create_dir_all(&self.config.rollback_dir)?;
        fs::write(&temp_path, script)?;

        let result = run_loader(&temp_path, phase);
        let _ = fs::remove_file(&temp_path);
        result
    }

    fn snapshot(&self) -> Result<PathBuf, ApplyError> {
        let text = self
            .status()
            .map_err(|e| ApplyError::SnapshotFailure(e.to_string()))?;

        fs::create_dir_all(&self.config.rollback_dir)
            .map_err(|e| ApplyError::SnapshotFailure(e.to_string()))?;
        set_dir_permissions(&self.config.rollback_dir);

        let millis = chrono::Utc::now().timestamp_millis();
        let path = self
            .config
            .rollback_dir
            .join(format!("rollback-{millis}.conf"));
        fs::write(&path, text).map_err(|e| ApplyError::SnapshotFailure(e.to_string()))?;
        set_file_permissions(&path);

        Ok(path)
    }

    fn latest_snapshot(&self) -> Result<Option<PathBuf>, ApplyError> {
        if !self.config.rollback_dir.is_dir() {
            return Ok(None);
        }
        let mut candidates: Vec<PathBuf> = fs::read_dir(&self.config.rollback_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("rollback-") && n.ends_with(".conf"))
                    .unwrap_or(false)
            })
            .collect();
        candidates.sort();
        Ok(candidates.pop())
    }
}

fn run_loader(path: &Path, phase: &'static str) -> Result<(), ApplyError> {
    let output = Command::new("nft")
        .arg("-f")
        .arg(path)
        .stdin(Stdio::null())
        .output()?;

    if output.status.success() {
        return Ok(());
    }

    Err(ApplyError::LoaderFailure {
        phase,
        exit_code: output.status.code(),
        output: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

#[cfg(unix)]
fn set_dir_permissions(dir: &Path) {
    if let Ok(meta) = fs::metadata(dir) {
        let mut perms = meta.permissions();
        perms.set_mode(0o700);
        let _ = fs::set_permissions(dir, perms);
    }
}

#[cfg(not(unix))]
fn set_dir_permissions(_dir: &Path) {}

#[cfg(unix)]
fn set_file_permissions(path: &Path) {
    if let Ok(meta) = fs::metadata(path) {
        let mut perms = meta.permissions();
        perms.set_mode(0o600);
        let _ = fs::set_permissions(path, perms);
    }
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use aegisx_core::types::Ir;
    use chrono::Utc;
    use uuid::Uuid;

    fn empty_ir() -> Ir {
        Ir {
            id: Uuid::new_v4(),
            version: 0,
            created_at: Utc::now(),
            firewall_rules: Vec::new(),
            nat_rules: Vec::new(),
            load_balancers: Vec::new(),
            vpn_configs: Vec::new(),
            ids_rules: Vec::new(),
        }
    }

    #[test]
    fn dry_run_never_touches_the_kernel() {
        let dir = tempfile::tempdir().unwrap();
        let applier = Applier::new(ApplierConfig {
            table_name: "aegisx_test".to_string(),
            rollback_dir: dir.path().to_path_buf(),
            dry_run: true,
        });
        assert!(applier.apply(&empty_ir()).is_ok());
        // No snapshot should have been written in dry-run mode.
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn rollback_without_snapshot_fails() {
        let dir = tempfile::tempdir().unwrap();
        let applier = Applier::new(ApplierConfig {
            table_name: "aegisx_test".to_string(),
            rollback_dir: dir.path().to_path_buf(),
            dry_run: false,
        });
        assert!(matches!(applier.rollback(), Err(ApplyError::NoSnapshot)));
    }

    #[test]
    fn latest_snapshot_picks_lexicographically_last_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("rollback-100.conf"), "old").unwrap();
        fs::write(dir.path().join("rollback-200.conf"), "new").unwrap();
        let applier = Applier::new(ApplierConfig {
            table_name: "aegisx_test".to_string(),
            rollback_dir: dir.path().to_path_buf(),
            dry_run: false,
        });
        let latest = applier.latest_snapshot().unwrap().unwrap();
        assert_eq!(latest.file_name().unwrap().to_str().unwrap(), "rollback-200.conf");
    }
}
