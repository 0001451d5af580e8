//! Translates an [`Ir`] into the kernel packet-filter CLI's native ruleset
//! syntax. Translation is a pure function of its input: the same IR always
//! produces byte-identical output.

use aegisx_core::types::{Chain, CompiledFirewallRule, CompiledNatRule, Ir, NatType, Verdict};

pub const TABLE_FAMILY: &str = "inet";

/// Emit the full ruleset text for `table_name`: table declaration, the
/// shared connection-tracking helper chain, three filter chains, two NAT
/// chains, and every compiled rule placed in its selected chain.
pub fn translate(ir: &Ir, table_name: &str) -> String {
    let mut out = String::new();

    out.push_str(&format!("add table {TABLE_FAMILY} {table_name}\n"));

    out.push_str(&format!(
        "add chain {TABLE_FAMILY} {table_name} ct_state\n\
         add rule {TABLE_FAMILY} {table_name} ct_state ct state invalid drop\n\
         add rule {TABLE_FAMILY} {table_name} ct_state ct state established,related accept\n"
    ));

    out.push_str(&format!(
        "add chain {TABLE_FAMILY} {table_name} input {{ type filter hook input priority 0; policy drop; }}\n\
         add rule {TABLE_FAMILY} {table_name} input iifname \"lo\" accept\n\
         add rule {TABLE_FAMILY} {table_name} input jump ct_state\n"
    ));
    out.push_str(&format!(
        "add chain {TABLE_FAMILY} {table_name} forward {{ type filter hook forward priority 0; policy drop; }}\n\
         add rule {TABLE_FAMILY} {table_name} forward jump ct_state\n"
    ));
    out.push_str(&format!(
        "add chain {TABLE_FAMILY} {table_name} output {{ type filter hook output priority 0; policy accept; }}\n\
         add rule {TABLE_FAMILY} {table_name} output jump ct_state\n"
    ));

    out.push_str(&format!(
        "add chain {TABLE_FAMILY} {table_name} prerouting {{ type nat hook prerouting priority -100; }}\n"
    ));
    out.push_str(&format!(
        "add chain {TABLE_FAMILY} {table_name} postrouting {{ type nat hook postrouting priority 100; }}\n"
    ));

    for rule in &ir.firewall_rules {
        out.push_str(&translate_firewall_rule(table_name, rule));
        out.push('\n');
    }

    for rule in &ir.nat_rules {
        out.push_str(&translate_nat_rule(table_name, rule));
        out.push('\n');
    }

    out
}

fn translate_firewall_rule(table_name: &str, rule: &CompiledFirewallRule) -> String {
    let mut clauses = Vec::new();

    if !rule.protocol.is_empty() {
        clauses.push(rule.protocol.clone());
    }
    if let Some(c) = addr_clause("ip saddr", &rule.src_addrs) {
        clauses.push(c);
    }
    if let Some(c) = addr_clause("ip daddr", &rule.dst_addrs) {
        clauses.push(c);
    }
    if let Some(c) = port_clause("sport", &rule.src_ports) {
        clauses.push(c);
    }
    if let Some(c) = port_clause("dport", &rule.dst_ports) {
        clauses.push(c);
    }
    if !rule.states.is_empty() {
        let states: Vec<String> = rule.states.iter().map(|s| s.to_string()).collect();
        clauses.push(format!("ct state {}", states.join(",")));
    }
    if !rule.rate_limit.is_empty() {
        clauses.push(format!("limit rate {}", rule.rate_limit));
    }
    if rule.log {
        clauses.push(format!("log prefix \"[aegisx] {}: \"", rule.comment));
    }

    clauses.push(verdict_clause(rule.action));

    if !rule.comment.is_empty() {
        clauses.push(format!("comment \"{}\"", escape_comment(&rule.comment)));
    }

    format!(
        "add rule {TABLE_FAMILY} {table_name} {} {}",
        rule.chain,
        clauses.join(" ")
    )
}

fn verdict_clause(verdict: Verdict) -> String {
    match verdict {
        Verdict::Accept => "accept".to_string(),
        Verdict::Drop => "drop".to_string(),
        Verdict::Reject => "reject".to_string(),
        Verdict::Log => "log".to_string(),
    }
}

fn translate_nat_rule(table_name: &str, rule: &CompiledNatRule) -> String {
    let chain = match rule.nat_type {
        NatType::Snat | NatType::Masquerade => "postrouting",
        NatType::Dnat => "prerouting",
    };

    let mut clauses = Vec::new();
    if let Some(iface) = &rule.out_iface {
        clauses.push(format!("oifname \"{iface}\""));
    }
    if !rule.src_addr.is_empty() {
        clauses.push(format!("ip saddr {}", rule.src_addr));
    }
    if !rule.dst_addr.is_empty() {
        clauses.push(format!("ip daddr {}", rule.dst_addr));
    }

    let action = match rule.nat_type {
        NatType::Masquerade => "masquerade".to_string(),
        NatType::Snat => format!("snat to {}", rule.to_addr),
        NatType::Dnat => format!("dnat to {}", rule.to_addr),
    };
    clauses.push(action);

    format!(
        "add rule {TABLE_FAMILY} {table_name} {chain} {}",
        clauses.join(" ")
    )
}

/// Single-value sets use the literal; multi-value sets use `{ a, b }` syntax.
fn addr_clause(keyword: &str, addrs: &[String]) -> Option<String> {
    match addrs {
        [] => None,
        [one] => Some(format!("{keyword} {one}")),
        many => Some(format!("{keyword} {{ {} }}", many.join(", "))),
    }
}

fn port_clause(keyword: &str, ports: &[String]) -> Option<String> {
    match ports {
        [] => None,
        [one] => Some(format!("{keyword} {one}")),
        many => Some(format!("{keyword} {{ {} }}", many.join(", "))),
    }
}

fn escape_comment(comment: &str) -> String {
    comment.replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegisx_core::types::Ir;
    use chrono::Utc;
    use uuid::Uuid;

    fn empty_ir() -> Ir {
        Ir {
            id: Uuid::new_v4(),
            version: 0,
            created_at: Utc::now(),
            firewall_rules: Vec::new(),
            nat_rules: Vec::new(),
            load_balancers: Vec::new(),
            vpn_configs: Vec::new(),
            ids_rules: Vec::new(),
        }
    }

    #[test]
    fn translation_contains_table_and_chain_skeleton() {
        let text = translate(&empty_ir(), "aegisx");
        assert!(text.contains("add table inet aegisx"));
        assert!(text.contains("add chain inet aegisx input"));
        assert!(text.contains("add chain inet aegisx forward"));
        assert!(text.contains("add chain inet aegisx output"));
        assert!(text.contains("add chain inet aegisx prerouting"));
        assert!(text.contains("add chain inet aegisx postrouting"));
    }

    #[test]
    fn multi_value_addresses_use_set_syntax() {
        let mut ir = empty_ir();
        ir.firewall_rules.push(CompiledFirewallRule {
            priority: 100,
            chain: Chain::Forward,
            action: Verdict::Accept,
            protocol: "tcp".to_string(),
            src_addrs: vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()],
            dst_addrs: vec![],
            src_ports: vec![],
            dst_ports: vec!["80".to_string()],
            states: vec![],
            rate_limit: String::new(),
            log: false,
            comment: "test".to_string(),
        });
        let text = translate(&ir, "aegisx");
        assert!(text.contains("ip saddr { 10.0.0.1, 10.0.0.2 }"));
        assert!(text.contains("dport 80"));
    }

    #[test]
    fn translation_is_pure() {
        let mut ir = empty_ir();
        ir.firewall_rules.push(CompiledFirewallRule {
            priority: 100,
            chain: Chain::Input,
            action: Verdict::Drop,
            protocol: String::new(),
            src_addrs: vec![],
            dst_addrs: vec![],
            src_ports: vec![],
            dst_ports: vec![],
            states: vec![],
            rate_limit: String::new(),
            log: false,
            comment: String::new(),
        });
        assert_eq!(translate(&ir, "aegisx"), translate(&ir, "aegisx"));
    }
}
