//! `rollback` command handler.

use aegisx_controller::PolicyController;
use colored::Colorize;

pub async fn handle_rollback(controller: &PolicyController) -> anyhow::Result<()> {
    println!("{} Rolling back to the most recent snapshot...", "→".bright_blue());
    controller.rollback().await?;
    println!("{} Rolled back", "✓".green());
    Ok(())
}
