//! `status` command handler.

use aegisx_controller::PolicyController;
use colored::Colorize;

pub async fn handle_status(controller: &PolicyController) -> anyhow::Result<()> {
    let ruleset = controller.status().await?;
    if ruleset.trim().is_empty() {
        println!("{} managed table is empty or not present", "→".bright_blue());
    } else {
        println!("{ruleset}");
    }

    match controller.current_ir().await {
        Some(ir) => println!(
            "{} last applied IR {} at {} ({} firewall rules, {} NAT rules)",
            "✓".green(),
            ir.id,
            ir.created_at,
            ir.firewall_rules.len(),
            ir.nat_rules.len()
        ),
        None => println!("{} no IR has been applied yet this process", "→".bright_blue()),
    }

    Ok(())
}
