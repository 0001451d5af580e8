//! Validates parsed manifests before they reach the compiler.
//!
//! Validation is pure, side-effect-free, and never short-circuits: every
//! manifest is checked and every problem found is accumulated into a single
//! [`ValidationError`], each message carrying enough context (namespace,
//! name, rule index/name) for an operator to locate the offending field
//! without re-reading the manifest.

use aegisx_core::error::ValidationError;
use aegisx_core::types::{Manifest, NatType, ResourceSpec};
use aegisx_core::validation::{validate_cidr, validate_host_port, validate_interface_name, validate_port_range};

const KNOWN_PROTOCOLS: &[&str] = &["tcp", "udp", "icmp", "any", ""];
const KNOWN_LB_ALGORITHMS: &[&str] = &["roundrobin", "leastconn", "source", "random", ""];

/// Validate every manifest, returning `Ok(())` only if none of them produced
/// an error. On failure, the returned [`ValidationError`] carries one
/// message per problem found, across all manifests.
pub fn validate_all(manifests: &[Manifest]) -> Result<(), ValidationError> {
    let mut messages = Vec::new();

    for manifest in manifests {
        let prefix = manifest.metadata.qualified_name();

        if manifest.metadata.name.is_empty() {
            messages.push(format!("{prefix}: metadata.name cannot be empty"));
        }

        match &manifest.spec {
            ResourceSpec::Firewall(spec) => validate_firewall(&prefix, spec, &mut messages),
            ResourceSpec::Nat(spec) => validate_nat(&prefix, spec, &mut messages),
            ResourceSpec::LoadBalancer(spec) => validate_load_balancer(&prefix, spec, &mut messages),
            ResourceSpec::Vpn(spec) => validate_vpn(&prefix, spec, &mut messages),
            ResourceSpec::Ids(_) => {}
        }
    }

    if messages.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(messages))
    }
}

fn validate_firewall(
    prefix: &str,
    spec: &aegisx_core::types::FirewallPolicySpec,
    messages: &mut Vec<String>,
) {
    for (index, rule) in spec.rules.iter().enumerate() {
        let ctx = format!("{prefix} rule[{index}] {}", rule.name);

        if rule.name.is_empty() {
            messages.push(format!("{ctx}: name cannot be empty"));
        }

        let protocol = rule.protocol.to_lowercase();
        if !KNOWN_PROTOCOLS.contains(&protocol.as_str()) {
            messages.push(format!("{ctx}: unknown protocol {:?}", rule.protocol));
        }

        for selector in [&rule.source, &rule.destination] {
            for addr in &selector.addresses {
                if let Err(e) = validate_cidr(addr) {
                    messages.push(format!("{ctx}: {e}"));
                }
            }
            for port in &selector.ports {
                if *port == 0 {
                    messages.push(format!("{ctx}: port cannot be 0"));
                }
            }
            for range in &selector.port_ranges {
                if let Err(e) = validate_port_range(range.start, range.end) {
                    messages.push(format!("{ctx}: {e}"));
                }
            }
        }

        if let Some(rate_limit) = &rule.rate_limit {
            if !is_valid_rate_expression(&rate_limit.rate) {
                messages.push(format!(
                    "{ctx}: rateLimit.rate {:?} must be \"N/second\" or \"N/minute\"",
                    rate_limit.rate
                ));
            }
        }
    }
}

fn is_valid_rate_expression(rate: &str) -> bool {
    let Some((count, unit)) = rate.split_once('/') else {
        return false;
    };
    count.parse::<u32>().is_ok() && matches!(unit, "second" | "minute")
}

fn validate_nat(prefix: &str, spec: &aegisx_core::types::NatPolicySpec, messages: &mut Vec<String>) {
    for (index, rule) in spec.rules.iter().enumerate() {
        let ctx = format!("{prefix} rule[{index}] {}", rule.name);

        if rule.name.is_empty() {
            messages.push(format!("{ctx}: name cannot be empty"));
        }

        if rule.nat_type != NatType::Masquerade && rule.to_address.is_empty() {
            messages.push(format!("{ctx}: toAddress is required for {}", rule.nat_type));
        }
        if !rule.to_address.is_empty() {
            if let Err(e) = validate_cidr(&rule.to_address) {
                messages.push(format!("{ctx}: toAddress: {e}"));
            }
        }
        if let Some(iface) = &rule.out_interface {
            if let Err(e) = validate_interface_name(iface) {
                messages.push(format!("{ctx}: outInterface: {e}"));
            }
        }
    }
}

fn validate_load_balancer(
    prefix: &str,
    spec: &aegisx_core::types::LoadBalancerPolicySpec,
    messages: &mut Vec<String>,
) {
    if spec.frontend.bind.is_empty() {
        messages.push(format!("{prefix}: frontend.bind cannot be empty"));
    }
    if spec.frontend.mode.is_empty() {
        messages.push(format!("{prefix}: frontend.mode cannot be empty"));
    }
    if !KNOWN_LB_ALGORITHMS.contains(&spec.backend.algorithm.as_str()) {
        messages.push(format!(
            "{prefix}: unknown backend.algorithm {:?}",
            spec.backend.algorithm
        ));
    }
    if spec.backend.servers.is_empty() {
        messages.push(format!("{prefix}: backend.servers must have at least one entry"));
    }
    for server in &spec.backend.servers {
        if let Err(e) = validate_host_port(server) {
            messages.push(format!("{prefix}: backend.servers: {e}"));
        }
    }
}

fn validate_vpn(prefix: &str, spec: &aegisx_core::types::VpnPolicySpec, messages: &mut Vec<String>) {
    if spec.interface.is_empty() {
        messages.push(format!("{prefix}: interface cannot be empty"));
    } else if let Err(e) = validate_interface_name(&spec.interface) {
        messages.push(format!("{prefix}: interface: {e}"));
    }
    if spec.listen_port == 0 {
        messages.push(format!("{prefix}: listenPort cannot be 0"));
    }
    if let Err(e) = validate_cidr(&spec.address) {
        messages.push(format!("{prefix}: address: {e}"));
    }
    for (index, peer) in spec.peers.iter().enumerate() {
        if peer.public_key.is_empty() {
            messages.push(format!("{prefix} peer[{index}]: publicKey cannot be empty"));
        }
        for allowed in &peer.allowed_ips {
            if let Err(e) = validate_cidr(allowed) {
                messages.push(format!("{prefix} peer[{index}]: allowedIPs: {e}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegisx_core::types::*;
    use std::collections::HashMap;

    fn firewall_manifest(rules: Vec<FirewallRuleSpec>) -> Manifest {
        Manifest {
            api_version: API_VERSION.to_string(),
            kind: ManifestKind::FirewallPolicy,
            metadata: Metadata {
                name: "test".to_string(),
                namespace: "default".to_string(),
                labels: HashMap::new(),
                annotations: HashMap::new(),
            },
            spec: ResourceSpec::Firewall(FirewallPolicySpec {
                rules,
                default_action: None,
            }),
        }
    }

    fn rule(name: &str, addr: &str) -> FirewallRuleSpec {
        FirewallRuleSpec {
            name: name.to_string(),
            priority: 0,
            action: Action::Allow,
            protocol: "tcp".to_string(),
            source: TrafficSelector {
                addresses: vec![addr.to_string()],
                ..Default::default()
            },
            destination: TrafficSelector::default(),
            state: vec![],
            rate_limit: None,
            log: false,
            comment: String::new(),
        }
    }

    #[test]
    fn valid_manifest_passes() {
        let manifest = firewall_manifest(vec![rule("allow-http", "10.0.0.0/8")]);
        assert!(validate_all(&[manifest]).is_ok());
    }

    #[test]
    fn invalid_address_is_reported_with_context() {
        let manifest = firewall_manifest(vec![rule("allow-http", "not-an-ip")]);
        let err = validate_all(&[manifest]).unwrap_err();
        assert_eq!(err.messages.len(), 1);
        assert!(err.messages[0].contains("default/test rule[0] allow-http"));
        assert!(err.messages[0].contains("not-an-ip"));
    }

    #[test]
    fn errors_accumulate_across_manifests() {
        let m1 = firewall_manifest(vec![rule("r1", "bad-addr-1")]);
        let m2 = firewall_manifest(vec![rule("r2", "bad-addr-2")]);
        let err = validate_all(&[m1, m2]).unwrap_err();
        assert_eq!(err.messages.len(), 2);
    }

    #[test]
    fn zero_port_is_rejected() {
        let mut r = rule("r1", "10.0.0.0/8");
        r.destination.ports = vec![0];
        let manifest = firewall_manifest(vec![r]);
        let err = validate_all(&[manifest]).unwrap_err();
        assert!(err.messages[0].contains("port cannot be 0"));
    }

    #[test]
    fn backwards_port_range_is_rejected() {
        let mut r = rule("r1", "10.0.0.0/8");
        r.destination.port_ranges = vec![PortRange { start: 90, end: 80 }];
        let manifest = firewall_manifest(vec![r]);
        assert!(validate_all(&[manifest]).is_err());
    }
}
