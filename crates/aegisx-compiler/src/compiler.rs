//! Compiles validated manifests into the intermediate representation.
//!
//! Compilation is deterministic modulo IR identity: the same manifests
//! always produce the same `firewallRules`/`natRules`/opaque blocks, but a
//! fresh `id`/`version` every time, since IR identity names an application
//! attempt rather than the logical policy content.

use aegisx_core::error::CompileResult;
use aegisx_core::types::{
    Chain, CompiledFirewallRule, CompiledNatRule, FirewallRuleSpec, Ir, Manifest, ResourceSpec,
    Verdict, DEFAULT_ACTION_PRIORITY,
};
use chrono::Utc;
use uuid::Uuid;

use crate::validate_all;

pub fn compile(manifests: &[Manifest]) -> CompileResult<Ir> {
    validate_all(manifests)?;

    let mut ir = Ir {
        id: Uuid::new_v4(),
        version: Utc::now().timestamp_millis(),
        created_at: Utc::now(),
        firewall_rules: Vec::new(),
        nat_rules: Vec::new(),
        load_balancers: Vec::new(),
        vpn_configs: Vec::new(),
        ids_rules: Vec::new(),
    };

    for manifest in manifests {
        let qualified = manifest.metadata.qualified_name();
        match &manifest.spec {
            ResourceSpec::Firewall(spec) => {
                for (index, rule) in spec.rules.iter().enumerate() {
                    ir.firewall_rules
                        .push(compile_firewall_rule(&qualified, index, rule));
                }
                if let Some(default_action) = spec.default_action {
                    ir.firewall_rules.push(CompiledFirewallRule {
                        priority: DEFAULT_ACTION_PRIORITY,
                        chain: Chain::Forward,
                        action: Verdict::from(default_action),
                        protocol: String::new(),
                        src_addrs: Vec::new(),
                        dst_addrs: Vec::new(),
                        src_ports: Vec::new(),
                        dst_ports: Vec::new(),
                        states: Vec::new(),
                        rate_limit: String::new(),
                        log: false,
                        comment: format!("{qualified}/default"),
                    });
                }
            }
            ResourceSpec::Nat(spec) => {
                for rule in &spec.rules {
                    ir.nat_rules.push(CompiledNatRule {
                        nat_type: rule.nat_type,
                        src_addr: rule.source.addresses.first().cloned().unwrap_or_default(),
                        dst_addr: rule
                            .destination
                            .addresses
                            .first()
                            .cloned()
                            .unwrap_or_default(),
                        to_addr: rule.to_address.clone(),
                        out_iface: rule.out_interface.clone(),
                    });
                }
            }
            ResourceSpec::LoadBalancer(spec) => ir.load_balancers.push(spec.clone()),
            ResourceSpec::Vpn(spec) => ir.vpn_configs.push(spec.clone()),
            ResourceSpec::Ids(spec) => ir.ids_rules.push(spec.clone()),
        }
    }

    // Stable sort: equal-priority rules retain their relative input order.
    ir.firewall_rules.sort_by_key(|r| r.priority);

    Ok(ir)
}

fn compile_firewall_rule(qualified: &str, index: usize, rule: &FirewallRuleSpec) -> CompiledFirewallRule {
    let priority = if rule.priority > 0 {
        rule.priority
    } else {
        (index as u32 + 1) * 100
    };

    let protocol = match rule.protocol.to_lowercase().as_str() {
        "" | "any" => String::new(),
        other => other.to_string(),
    };

    CompiledFirewallRule {
        priority,
        chain: select_chain(rule),
        action: Verdict::from(rule.action),
        protocol,
        src_addrs: rule.source.addresses.clone(),
        dst_addrs: rule.destination.addresses.clone(),
        src_ports: format_ports(&rule.source),
        dst_ports: format_ports(&rule.destination),
        states: rule.state.clone(),
        rate_limit: rule
            .rate_limit
            .as_ref()
            .map(|r| r.rate.clone())
            .unwrap_or_default(),
        log: rule.log,
        comment: format!("{qualified}/{}", rule.name),
    }
}

/// Destination mentioning zone `localhost` routes to `input`; source
/// mentioning it routes to `output`; everything else is `forward`.
fn select_chain(rule: &FirewallRuleSpec) -> Chain {
    if rule.destination.zones.iter().any(|z| z == "localhost") {
        Chain::Input
    } else if rule.source.zones.iter().any(|z| z == "localhost") {
        Chain::Output
    } else {
        Chain::Forward
    }
}

fn format_ports(selector: &aegisx_core::types::TrafficSelector) -> Vec<String> {
    let mut ports: Vec<String> = selector.ports.iter().map(|p| p.to_string()).collect();
    ports.extend(
        selector
            .port_ranges
            .iter()
            .map(|r| format!("{}-{}", r.start, r.end)),
    );
    ports
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegisx_core::types::*;
    use std::collections::HashMap;

    fn manifest(rules: Vec<FirewallRuleSpec>, default_action: Option<Action>) -> Manifest {
        Manifest {
            api_version: API_VERSION.to_string(),
            kind: ManifestKind::FirewallPolicy,
            metadata: Metadata {
                name: "web-allow".to_string(),
                namespace: "default".to_string(),
                labels: HashMap::new(),
                annotations: HashMap::new(),
            },
            spec: ResourceSpec::Firewall(FirewallPolicySpec {
                rules,
                default_action,
            }),
        }
    }

    fn basic_rule(name: &str, priority: u32) -> FirewallRuleSpec {
        FirewallRuleSpec {
            name: name.to_string(),
            priority,
            action: Action::Allow,
            protocol: "tcp".to_string(),
            source: TrafficSelector::default(),
            destination: TrafficSelector {
                ports: vec![80, 443],
                ..Default::default()
            },
            state: vec![],
            rate_limit: None,
            log: false,
            comment: String::new(),
        }
    }

    #[test]
    fn basic_compile_produces_expected_rule_and_default() {
        let m = manifest(vec![basic_rule("allow-http", 0)], Some(Action::Drop));
        let ir = compile(&[m]).unwrap();

        assert_eq!(ir.firewall_rules.len(), 2);
        let first = &ir.firewall_rules[0];
        assert_eq!(first.priority, 100);
        assert_eq!(first.action, Verdict::Accept);
        assert_eq!(first.dst_ports, vec!["80".to_string(), "443".to_string()]);
        assert_eq!(first.chain, Chain::Forward);

        let default = &ir.firewall_rules[1];
        assert_eq!(default.priority, DEFAULT_ACTION_PRIORITY);
        assert_eq!(default.action, Verdict::Drop);
        assert_eq!(default.comment, "default/web-allow/default");
    }

    #[test]
    fn equal_priority_rules_keep_input_order() {
        let m = manifest(
            vec![basic_rule("a", 200), basic_rule("b", 200)],
            None,
        );
        let ir = compile(&[m]).unwrap();
        assert_eq!(ir.firewall_rules[0].comment, "default/web-allow/a");
        assert_eq!(ir.firewall_rules[1].comment, "default/web-allow/b");
    }

    #[test]
    fn compile_is_deterministic_modulo_identity() {
        let m1 = manifest(vec![basic_rule("a", 0)], None);
        let m2 = manifest(vec![basic_rule("a", 0)], None);
        let ir1 = compile(&[m1]).unwrap();
        let ir2 = compile(&[m2]).unwrap();

        assert_eq!(ir1.firewall_rules.len(), ir2.firewall_rules.len());
        assert_eq!(ir1.firewall_rules[0].comment, ir2.firewall_rules[0].comment);
        assert_ne!(ir1.id, ir2.id);
    }

    #[test]
    fn invalid_manifest_fails_to_compile() {
        let mut rule = basic_rule("bad", 0);
        rule.source.addresses = vec!["not-an-ip".to_string()];
        let m = manifest(vec![rule], None);
        assert!(compile(&[m]).is_err());
    }

    #[test]
    fn localhost_destination_routes_to_input_chain() {
        let mut rule = basic_rule("ssh-in", 0);
        rule.destination.zones = vec!["localhost".to_string()];
        let m = manifest(vec![rule], None);
        let ir = compile(&[m]).unwrap();
        assert_eq!(ir.firewall_rules[0].chain, Chain::Input);
    }
}
