//! Core type definitions shared across the policy pipeline: manifests as
//! authored by operators, and the backend-agnostic intermediate
//! representation the compiler produces from them.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const API_VERSION: &str = "aegisx.io/v1";

/// A single parsed policy document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: ManifestKind,
    pub metadata: Metadata,
    pub spec: ResourceSpec,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ManifestKind {
    FirewallPolicy,
    NATPolicy,
    LoadBalancerPolicy,
    VPNPolicy,
    IDSPolicy,
}

impl ManifestKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "FirewallPolicy" => Some(Self::FirewallPolicy),
            "NATPolicy" => Some(Self::NATPolicy),
            "LoadBalancerPolicy" => Some(Self::LoadBalancerPolicy),
            "VPNPolicy" => Some(Self::VPNPolicy),
            "IDSPolicy" => Some(Self::IDSPolicy),
            _ => None,
        }
    }
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FirewallPolicy => "FirewallPolicy",
            Self::NATPolicy => "NATPolicy",
            Self::LoadBalancerPolicy => "LoadBalancerPolicy",
            Self::VPNPolicy => "VPNPolicy",
            Self::IDSPolicy => "IDSPolicy",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

fn default_namespace() -> String {
    "default".to_string()
}

impl Metadata {
    /// `namespace/name`, used to prefix validation messages and rule comments.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceSpec {
    Firewall(FirewallPolicySpec),
    Nat(NatPolicySpec),
    LoadBalancer(LoadBalancerPolicySpec),
    Vpn(VpnPolicySpec),
    Ids(IdsPolicySpec),
}

// --- Firewall -----------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FirewallPolicySpec {
    #[serde(default)]
    pub rules: Vec<FirewallRuleSpec>,
    #[serde(rename = "defaultAction", default, skip_serializing_if = "Option::is_none")]
    pub default_action: Option<Action>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirewallRuleSpec {
    pub name: String,
    #[serde(default)]
    pub priority: u32,
    pub action: Action,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub source: TrafficSelector,
    #[serde(default)]
    pub destination: TrafficSelector,
    #[serde(default)]
    pub state: Vec<ConnState>,
    #[serde(rename = "rateLimit", default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitSpec>,
    #[serde(default)]
    pub log: bool,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrafficSelector {
    #[serde(default)]
    pub zones: Vec<String>,
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub ports: Vec<u16>,
    #[serde(rename = "portRanges", default)]
    pub port_ranges: Vec<PortRange>,
    #[serde(rename = "ipsets", default)]
    pub ipsets: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSpec {
    pub rate: String,
    #[serde(default)]
    pub burst: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Allow,
    Drop,
    Reject,
    Log,
}

impl Action {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ALLOW" => Some(Self::Allow),
            "DROP" => Some(Self::Drop),
            "REJECT" => Some(Self::Reject),
            "LOG" => Some(Self::Log),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Allow => "ALLOW",
            Self::Drop => "DROP",
            Self::Reject => "REJECT",
            Self::Log => "LOG",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ConnState {
    New,
    Established,
    Related,
    Invalid,
}

impl fmt::Display for ConnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Established => "established",
            Self::Related => "related",
            Self::Invalid => "invalid",
        };
        write!(f, "{s}")
    }
}

// --- NAT ------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NatPolicySpec {
    #[serde(default)]
    pub rules: Vec<NatRuleSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatRuleSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub nat_type: NatType,
    #[serde(default)]
    pub source: TrafficSelector,
    #[serde(default)]
    pub destination: TrafficSelector,
    #[serde(rename = "toAddress", default)]
    pub to_address: String,
    #[serde(rename = "outInterface", default, skip_serializing_if = "Option::is_none")]
    pub out_interface: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum NatType {
    Snat,
    Dnat,
    Masquerade,
}

impl fmt::Display for NatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Snat => "SNAT",
            Self::Dnat => "DNAT",
            Self::Masquerade => "MASQUERADE",
        };
        write!(f, "{s}")
    }
}

// --- Opaque pass-through specs ---------------------------------------------

/// Forwarded verbatim to the out-of-core load-balancer adapter; the core
/// pipeline never interprets these fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadBalancerPolicySpec {
    pub frontend: LbFrontend,
    pub backend: LbBackend,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LbFrontend {
    #[serde(default)]
    pub bind: String,
    #[serde(default)]
    pub mode: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LbBackend {
    #[serde(default)]
    pub algorithm: String,
    #[serde(default)]
    pub servers: Vec<String>,
}

/// Forwarded verbatim to the out-of-core VPN adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VpnPolicySpec {
    #[serde(default)]
    pub interface: String,
    #[serde(rename = "listenPort", default)]
    pub listen_port: u16,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub peers: Vec<VpnPeerSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VpnPeerSpec {
    #[serde(rename = "publicKey", default)]
    pub public_key: String,
    #[serde(rename = "allowedIPs", default)]
    pub allowed_ips: Vec<String>,
}

/// Forwarded verbatim to the out-of-core IDS adapter. No structural
/// validation is required beyond the spec block being present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdsPolicySpec {
    #[serde(flatten)]
    pub raw: serde_json::Map<String, serde_json::Value>,
}

// --- Intermediate representation ------------------------------------------

/// The flat, ordered, backend-agnostic snapshot the compiler produces.
/// Identity (`id`, `version`) distinguishes application *attempts*; two
/// compiles of identical manifests carry identical rule content but
/// different identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ir {
    pub id: Uuid,
    pub version: i64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "firewallRules")]
    pub firewall_rules: Vec<CompiledFirewallRule>,
    #[serde(rename = "natRules")]
    pub nat_rules: Vec<CompiledNatRule>,
    #[serde(rename = "loadBalancers", default)]
    pub load_balancers: Vec<LoadBalancerPolicySpec>,
    #[serde(rename = "vpnConfigs", default)]
    pub vpn_configs: Vec<VpnPolicySpec>,
    #[serde(rename = "idsRules", default)]
    pub ids_rules: Vec<IdsPolicySpec>,
}

impl Ir {
    pub fn empty() -> Self {
        Self {
            id: Uuid::new_v4(),
            version: Utc::now().timestamp_millis(),
            created_at: Utc::now(),
            firewall_rules: Vec::new(),
            nat_rules: Vec::new(),
            load_balancers: Vec::new(),
            vpn_configs: Vec::new(),
            ids_rules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Chain {
    Input,
    Forward,
    Output,
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Input => "input",
            Self::Forward => "forward",
            Self::Output => "output",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Verdict {
    Accept,
    Drop,
    Reject,
    Log,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Accept => "accept",
            Self::Drop => "drop",
            Self::Reject => "reject",
            Self::Log => "log",
        };
        write!(f, "{s}")
    }
}

impl From<Action> for Verdict {
    fn from(a: Action) -> Self {
        match a {
            Action::Allow => Self::Accept,
            Action::Drop => Self::Drop,
            Action::Reject => Self::Reject,
            Action::Log => Self::Log,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledFirewallRule {
    pub priority: u32,
    pub chain: Chain,
    pub action: Verdict,
    #[serde(default)]
    pub protocol: String,
    #[serde(rename = "srcAddrs", default)]
    pub src_addrs: Vec<String>,
    #[serde(rename = "dstAddrs", default)]
    pub dst_addrs: Vec<String>,
    #[serde(rename = "srcPorts", default)]
    pub src_ports: Vec<String>,
    #[serde(rename = "dstPorts", default)]
    pub dst_ports: Vec<String>,
    #[serde(default)]
    pub states: Vec<ConnState>,
    #[serde(rename = "rateLimit", default)]
    pub rate_limit: String,
    #[serde(default)]
    pub log: bool,
    #[serde(default)]
    pub comment: String,
}

/// Priority used for the synthetic rule emitted from `defaultAction`.
pub const DEFAULT_ACTION_PRIORITY: u32 = 99_999;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledNatRule {
    #[serde(rename = "type")]
    pub nat_type: NatType,
    #[serde(rename = "srcAddr", default)]
    pub src_addr: String,
    #[serde(rename = "dstAddr", default)]
    pub dst_addr: String,
    #[serde(rename = "toAddr", default)]
    pub to_addr: String,
    #[serde(rename = "outIface", default, skip_serializing_if = "Option::is_none")]
    pub out_iface: Option<String>,
}
