//! `validate` command handler: parse and validate without applying.

use colored::Colorize;
use std::path::Path;

pub async fn handle_validate(path: &Path) -> anyhow::Result<()> {
    println!("{} Validating {}...", "→".bright_blue(), path.display());

    let manifests = if path.is_dir() {
        aegisx_manifest::parse_directory(path)?
    } else {
        aegisx_manifest::parse_file(path)?
    };

    aegisx_compiler::validate_all(&manifests)?;

    println!(
        "{} {} manifest(s) are valid",
        "✓".green().bold(),
        manifests.len()
    );
    Ok(())
}
