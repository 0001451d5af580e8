//! Cooperative reload loop: wake on a fixed interval, re-apply the policy
//! directory, log and continue on failure. A single bad tick never brings
//! the loop down; it is cancellable only between iterations, never
//! mid-apply, so an in-flight kernel swap always runs to completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::controller::SharedController;

pub async fn watch_and_reload(controller: SharedController, cancel: Arc<AtomicBool>) {
    let interval = controller.config().reload_interval;
    tracing::info!(?interval, "starting policy watcher");

    loop {
        if cancel.load(Ordering::Relaxed) {
            tracing::info!("policy watcher cancelled");
            return;
        }

        match controller.apply_directory().await {
            Ok(()) => tracing::debug!("watcher tick applied cleanly"),
            Err(e) => tracing::warn!(error = %e, "watcher tick failed, will retry next interval"),
        }

        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{ControllerConfig, PolicyController};
    use std::time::Duration;

    #[tokio::test]
    async fn watcher_stops_promptly_when_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let controller = Arc::new(PolicyController::new(ControllerConfig {
            table_name: "aegisx_test".to_string(),
            rollback_dir: dir.path().join("rollback"),
            dry_run: true,
            policy_dir: dir.path().to_path_buf(),
            reload_interval: Duration::from_millis(10),
        }));
        let cancel = Arc::new(AtomicBool::new(false));

        let cancel_clone = cancel.clone();
        let handle = tokio::spawn(watch_and_reload(controller, cancel_clone));

        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.store(true, Ordering::Relaxed);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("watcher did not stop in time")
            .unwrap();
    }
}
