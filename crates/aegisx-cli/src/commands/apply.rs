//! `apply`, `diff`, and `flush` command handlers.

use aegisx_controller::PolicyController;
use colored::Colorize;

pub async fn handle_apply(controller: &PolicyController) -> anyhow::Result<()> {
    println!("{} Applying policy directory...", "→".bright_blue());
    controller.apply_directory().await?;
    println!("{} Applied policy directory", "✓".green());
    Ok(())
}

pub async fn handle_diff(controller: &PolicyController, dir: &std::path::Path) -> anyhow::Result<()> {
    let manifests = aegisx_manifest::parse_directory(dir)?;
    let diff = controller.diff_manifests(&manifests).await?;
    print!("{diff}");
    Ok(())
}

pub async fn handle_flush(controller: &PolicyController) -> anyhow::Result<()> {
    controller.flush().await?;
    println!("{} Flushed the managed table", "✓".green());
    Ok(())
}
