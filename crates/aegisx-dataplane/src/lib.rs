//! Aegis-X Dataplane
//!
//! Translates the compiled intermediate representation into the kernel
//! packet-filter CLI's native syntax, and applies it to the live kernel with
//! atomic rollback on failure.

pub mod applier;
pub mod translator;

pub use applier::{Applier, ApplierConfig};
pub use translator::translate;

/// Check whether the `nft` binary is reachable on this host.
pub fn check_nftables_available() -> bool {
    std::process::Command::new("nft")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
