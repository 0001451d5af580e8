//! Low-level field validators shared by the manifest validator.
//!
//! Each function checks exactly one syntactic property and returns a plain
//! `String` error message on failure; the caller is responsible for adding
//! namespace/name/rule context before surfacing it to an operator.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

pub type FieldResult<T> = std::result::Result<T, String>;

/// Validate a zone/interface-style name (e.g. `eth0`, `wan`, `localhost`).
pub fn validate_interface_name(name: &str) -> FieldResult<()> {
    if name.is_empty() {
        return Err("name cannot be empty".to_string());
    }
    if name.len() > 15 {
        return Err("name too long (max 15 characters)".to_string());
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(format!("name {name:?} contains invalid characters"));
    }
    if name.starts_with('.') || name.starts_with('-') {
        return Err(format!("name {name:?} cannot start with '.' or '-'"));
    }
    Ok(())
}

pub fn validate_ip_address(ip: &str) -> FieldResult<IpAddr> {
    ip.parse::<IpAddr>()
        .map_err(|e| format!("invalid address {ip:?}: {e}"))
}

pub fn validate_ipv4_address(ip: &str) -> FieldResult<Ipv4Addr> {
    ip.parse::<Ipv4Addr>()
        .map_err(|e| format!("invalid IPv4 address {ip:?}: {e}"))
}

pub fn validate_ipv6_address(ip: &str) -> FieldResult<Ipv6Addr> {
    ip.parse::<Ipv6Addr>()
        .map_err(|e| format!("invalid IPv6 address {ip:?}: {e}"))
}

/// Validate CIDR notation (`IP/prefix`). Accepts a bare IP address too,
/// since manifests are allowed to specify single hosts without a prefix.
pub fn validate_cidr(cidr: &str) -> FieldResult<()> {
    let Some((addr, prefix)) = cidr.split_once('/') else {
        return validate_ip_address(cidr).map(|_| ());
    };

    let ip = validate_ip_address(addr)?;
    let prefix: u8 = prefix
        .parse()
        .map_err(|_| format!("invalid prefix length in {cidr:?}"))?;

    let max = if ip.is_ipv6() { 128 } else { 32 };
    if prefix > max {
        return Err(format!("prefix /{prefix} exceeds /{max} in {cidr:?}"));
    }
    Ok(())
}

pub fn validate_port(port: u32) -> FieldResult<()> {
    if port == 0 || port > 65535 {
        return Err(format!("port {port} out of range 1-65535"));
    }
    Ok(())
}

pub fn validate_port_range(start: u16, end: u16) -> FieldResult<()> {
    if start >= end {
        return Err(format!(
            "port range start ({start}) must be less than end ({end})"
        ));
    }
    Ok(())
}

/// Validate a hostname/domain name, used for load-balancer backend hosts.
pub fn validate_hostname(hostname: &str) -> FieldResult<()> {
    if hostname.is_empty() {
        return Err("hostname cannot be empty".to_string());
    }
    if hostname.len() > 253 {
        return Err("hostname too long (max 253 characters)".to_string());
    }
    for label in hostname.split('.') {
        if label.is_empty() || label.len() > 63 {
            return Err(format!("invalid hostname label in {hostname:?}"));
        }
        let first = label.chars().next();
        let last = label.chars().last();
        match (first, last) {
            (Some(f), Some(l)) if f.is_alphanumeric() && l.is_alphanumeric() => {}
            _ => return Err(format!("hostname label must start/end alphanumeric in {hostname:?}")),
        }
        if !label.chars().all(|c| c.is_alphanumeric() || c == '-') {
            return Err(format!("hostname {hostname:?} contains invalid characters"));
        }
    }
    Ok(())
}

/// Validate a `host:port` server address, as used by load-balancer backends.
pub fn validate_host_port(addr: &str) -> FieldResult<()> {
    let Some((host, port)) = addr.rsplit_once(':') else {
        return Err(format!("server address {addr:?} must be host:port"));
    };
    let port: u32 = port
        .parse()
        .map_err(|_| format!("invalid port in server address {addr:?}"))?;
    validate_port(port)?;
    if validate_ip_address(host).is_err() {
        validate_hostname(host)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interface_name() {
        assert!(validate_interface_name("eth0").is_ok());
        assert!(validate_interface_name("localhost").is_ok());
        assert!(validate_interface_name("").is_err());
        assert!(validate_interface_name(".bad").is_err());
    }

    #[test]
    fn ip_address() {
        assert!(validate_ip_address("192.168.1.1").is_ok());
        assert!(validate_ip_address("2001:db8::1").is_ok());
        assert!(validate_ip_address("not-an-ip").is_err());
    }

    #[test]
    fn cidr() {
        assert!(validate_cidr("10.0.0.0/8").is_ok());
        assert!(validate_cidr("10.0.0.1").is_ok());
        assert!(validate_cidr("2001:db8::/32").is_ok());
        assert!(validate_cidr("10.0.0.0/33").is_err());
        assert!(validate_cidr("garbage").is_err());
    }

    #[test]
    fn port_and_range() {
        assert!(validate_port(80).is_ok());
        assert!(validate_port(0).is_err());
        assert!(validate_port(70000).is_err());
        assert!(validate_port_range(80, 90).is_ok());
        assert!(validate_port_range(90, 80).is_err());
        assert!(validate_port_range(80, 80).is_err());
    }

    #[test]
    fn hostname() {
        assert!(validate_hostname("example.com").is_ok());
        assert!(validate_hostname("").is_err());
        assert!(validate_hostname("-bad.com").is_err());
    }

    #[test]
    fn host_port() {
        assert!(validate_host_port("10.0.0.1:8080").is_ok());
        assert!(validate_host_port("backend.internal:80").is_ok());
        assert!(validate_host_port("no-port").is_err());
        assert!(validate_host_port("host:notaport").is_err());
    }
}
