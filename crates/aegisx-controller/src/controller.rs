//! Policy Controller: the single mutation-serialising entry point that
//! composes the parser, validator, compiler, translator, and applier, and
//! owns the last successfully applied IR.

use std::path::PathBuf;
use std::sync::Arc;

use aegisx_core::error::{ApplyError, CompileError, ParseError};
use aegisx_core::types::{Ir, Manifest};
use aegisx_dataplane::{Applier, ApplierConfig};
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Apply(#[from] ApplyError),
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub table_name: String,
    pub rollback_dir: PathBuf,
    pub dry_run: bool,
    pub policy_dir: PathBuf,
    pub reload_interval: std::time::Duration,
}

impl ControllerConfig {
    pub fn default_reload_interval() -> std::time::Duration {
        std::time::Duration::from_secs(10)
    }
}

/// Owns the single writer lock that serialises every mutating operation
/// against the kernel. Reads (`status`, `current_ir`) may proceed
/// concurrently with each other but are blocked while a mutation is
/// in-flight, so the current-IR pointer is never observably out of step
/// with the live kernel state.
pub struct PolicyController {
    config: ControllerConfig,
    applier: Applier,
    current_ir: RwLock<Option<Ir>>,
    write_lock: Mutex<()>,
}

impl PolicyController {
    pub fn new(config: ControllerConfig) -> Self {
        let applier = Applier::new(ApplierConfig {
            table_name: config.table_name.clone(),
            rollback_dir: config.rollback_dir.clone(),
            dry_run: config.dry_run,
        });
        Self {
            config,
            applier,
            current_ir: RwLock::new(None),
            write_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Compiles `manifests` and applies the result. The write lock spans
    /// compilation through the in-memory IR-pointer update, so a reader
    /// never observes a current IR compiled from manifests whose apply
    /// hasn't finished.
    pub async fn apply_manifests(&self, manifests: &[Manifest]) -> Result<(), PipelineError> {
        let _guard = self.write_lock.lock().await;
        let ir = aegisx_compiler::compile(manifests)?;
        self.apply_ir_locked(&ir).await
    }

    pub async fn apply_ir(&self, ir: &Ir) -> Result<(), PipelineError> {
        let _guard = self.write_lock.lock().await;
        self.apply_ir_locked(ir).await
    }

    async fn apply_ir_locked(&self, ir: &Ir) -> Result<(), PipelineError> {
        self.applier.apply(ir)?;
        *self.current_ir.write().await = Some(ir.clone());
        Ok(())
    }

    pub async fn apply_directory(&self) -> Result<(), PipelineError> {
        let manifests = aegisx_manifest::parse_directory(&self.config.policy_dir)?;
        self.apply_manifests(&manifests).await
    }

    pub async fn diff_manifests(&self, manifests: &[Manifest]) -> Result<String, PipelineError> {
        let ir = aegisx_compiler::compile(manifests)?;
        Ok(self.applier.diff(&ir))
    }

    pub async fn rollback(&self) -> Result<(), PipelineError> {
        let _guard = self.write_lock.lock().await;
        self.applier.rollback()?;
        Ok(())
    }

    pub async fn flush(&self) -> Result<(), PipelineError> {
        let _guard = self.write_lock.lock().await;
        self.applier.flush()?;
        *self.current_ir.write().await = None;
        Ok(())
    }

    pub async fn status(&self) -> Result<String, PipelineError> {
        Ok(self.applier.status()?)
    }

    pub async fn current_ir(&self) -> Option<Ir> {
        self.current_ir.read().await.clone()
    }
}

/// Convenience for callers that want to share one controller across tasks.
pub type SharedController = Arc<PolicyController>;
