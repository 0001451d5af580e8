//! `watch` command handler: runs the reload loop until Ctrl-C.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use aegisx_controller::{watch_and_reload, SharedController};
use colored::Colorize;

pub async fn handle_watch(controller: SharedController) -> anyhow::Result<()> {
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_for_signal = cancel.clone();

    println!("{} Watching policy directory, Ctrl-C to stop", "→".bright_blue());

    let watcher = tokio::spawn(watch_and_reload(controller, cancel));
    tokio::signal::ctrl_c().await?;
    cancel_for_signal.store(true, Ordering::Relaxed);
    let _ = watcher.await;

    println!("{} Watcher stopped", "✓".green());
    Ok(())
}
