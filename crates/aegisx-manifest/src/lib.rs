//! Manifest parser: decodes YAML policy documents into typed [`Manifest`]s.
//!
//! Decoding is deliberately two-pass. The first pass pulls `apiVersion`,
//! `kind`, and `metadata` out of a generic [`serde_yaml::Value`] so that an
//! unknown kind or unsupported apiVersion can be reported before we ever try
//! to decode a kind-specific spec shape. The second pass decodes `spec`
//! into whichever struct the `kind` selects. Parsing never mutates
//! anything outside its own return value — it is total over its input.

use std::fs;
use std::path::Path;

use aegisx_core::error::{ParseError, ParseResult};
use aegisx_core::types::{
    FirewallPolicySpec, IdsPolicySpec, LoadBalancerPolicySpec, Manifest, ManifestKind, Metadata,
    NatPolicySpec, ResourceSpec, VpnPolicySpec, API_VERSION,
};
use serde::Deserialize as _;
use serde_yaml::Value;

/// Decode every document in a single YAML byte stream. An empty stream
/// yields an empty list, not an error. `label` identifies the source for
/// error messages (a file path, or a synthetic name for in-memory input).
pub fn parse_stream(bytes: &str, label: &str) -> ParseResult<Vec<Manifest>> {
    let mut manifests = Vec::new();

    for (index, document) in serde_yaml::Deserializer::from_str(bytes).enumerate() {
        let value = Value::deserialize(document).map_err(|e| ParseError::Malformed {
            file: label.to_string(),
            index,
            reason: e.to_string(),
        })?;

        // A blank document (e.g. a trailing `---` with nothing after it)
        // deserializes to `Value::Null`; skip it rather than erroring.
        if value.is_null() {
            continue;
        }

        manifests.push(decode_manifest(value, label, index)?);
    }

    Ok(manifests)
}

fn decode_manifest(value: Value, label: &str, index: usize) -> ParseResult<Manifest> {
    let api_version = value
        .get("apiVersion")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if api_version != API_VERSION {
        return Err(ParseError::UnsupportedApiVersion {
            file: label.to_string(),
            index,
            found: api_version,
            expected: API_VERSION,
        });
    }

    let kind_str = value
        .get("kind")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let kind = ManifestKind::from_str(&kind_str).ok_or_else(|| ParseError::UnknownKind {
        file: label.to_string(),
        index,
        found: kind_str.clone(),
    })?;

    let metadata: Metadata = value
        .get("metadata")
        .cloned()
        .map(serde_yaml::from_value)
        .transpose()
        .map_err(|e| ParseError::Malformed {
            file: label.to_string(),
            index,
            reason: format!("metadata: {e}"),
        })?
        .unwrap_or_default();

    let spec_value = value.get("spec").cloned().unwrap_or(Value::Null);
    let spec = decode_spec(kind, spec_value, label, index)?;

    Ok(Manifest {
        api_version,
        kind,
        metadata,
        spec,
    })
}

fn decode_spec(
    kind: ManifestKind,
    spec_value: Value,
    label: &str,
    index: usize,
) -> ParseResult<ResourceSpec> {
    let map_err = |e: serde_yaml::Error| ParseError::Malformed {
        file: label.to_string(),
        index,
        reason: format!("spec: {e}"),
    };

    Ok(match kind {
        ManifestKind::FirewallPolicy => {
            let spec: FirewallPolicySpec = if spec_value.is_null() {
                FirewallPolicySpec::default()
            } else {
                serde_yaml::from_value(spec_value).map_err(map_err)?
            };
            ResourceSpec::Firewall(spec)
        }
        ManifestKind::NATPolicy => {
            let spec: NatPolicySpec = if spec_value.is_null() {
                NatPolicySpec::default()
            } else {
                serde_yaml::from_value(spec_value).map_err(map_err)?
            };
            ResourceSpec::Nat(spec)
        }
        ManifestKind::LoadBalancerPolicy => {
            let spec: LoadBalancerPolicySpec = if spec_value.is_null() {
                LoadBalancerPolicySpec::default()
            } else {
                serde_yaml::from_value(spec_value).map_err(map_err)?
            };
            ResourceSpec::LoadBalancer(spec)
        }
        ManifestKind::VPNPolicy => {
            let spec: VpnPolicySpec = if spec_value.is_null() {
                VpnPolicySpec::default()
            } else {
                serde_yaml::from_value(spec_value).map_err(map_err)?
            };
            ResourceSpec::Vpn(spec)
        }
        ManifestKind::IDSPolicy => {
            let spec: IdsPolicySpec = if spec_value.is_null() {
                IdsPolicySpec::default()
            } else {
                serde_yaml::from_value(spec_value).map_err(map_err)?
            };
            ResourceSpec::Ids(spec)
        }
    })
}

/// Parse a single file.
pub fn parse_file(path: &Path) -> ParseResult<Vec<Manifest>> {
    let label = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|e| ParseError::Io {
        path: label.clone(),
        source: e,
    })?;
    parse_stream(&content, &label)
}

/// Parse every `.yaml`/`.yml` file in a directory, in lexicographic filename
/// order, concatenating their manifests in that order.
pub fn parse_directory(dir: &Path) -> ParseResult<Vec<Manifest>> {
    let mut entries: Vec<_> = fs::read_dir(dir)
        .map_err(|e| ParseError::Io {
            path: dir.display().to_string(),
            source: e,
        })?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml")
            )
        })
        .collect();
    entries.sort();

    let mut manifests = Vec::new();
    for path in entries {
        tracing::debug!(file = %path.display(), "parsing manifest file");
        manifests.extend(parse_file(&path)?);
    }
    Ok(manifests)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(kind: &str, spec: &str) -> String {
        format!(
            "apiVersion: aegisx.io/v1\nkind: {kind}\nmetadata:\n  name: test\nspec:\n{spec}\n"
        )
    }

    #[test]
    fn empty_stream_parses_to_empty_list() {
        let manifests = parse_stream("", "<memory>").unwrap();
        assert!(manifests.is_empty());
    }

    #[test]
    fn trailing_empty_document_is_ignored() {
        let src = format!(
            "{}\n---\n",
            doc(
                "FirewallPolicy",
                "  rules:\n    - name: r1\n      action: ALLOW\n"
            )
        );
        let manifests = parse_stream(&src, "<memory>").unwrap();
        assert_eq!(manifests.len(), 1);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let src = doc("BogusPolicy", "  foo: bar\n");
        let err = parse_stream(&src, "<memory>").unwrap_err();
        assert!(matches!(err, ParseError::UnknownKind { .. }));
    }

    #[test]
    fn unsupported_api_version_is_rejected() {
        let src = "apiVersion: aegisx.io/v2\nkind: FirewallPolicy\nmetadata:\n  name: x\nspec:\n  rules: []\n";
        let err = parse_stream(src, "<memory>").unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedApiVersion { .. }));
    }

    #[test]
    fn missing_spec_yields_empty_kind_specific_spec() {
        let src = "apiVersion: aegisx.io/v1\nkind: FirewallPolicy\nmetadata:\n  name: x\n";
        let manifests = parse_stream(src, "<memory>").unwrap();
        assert_eq!(manifests.len(), 1);
        match &manifests[0].spec {
            ResourceSpec::Firewall(spec) => assert!(spec.rules.is_empty()),
            _ => panic!("wrong spec variant"),
        }
    }

    #[test]
    fn multi_document_stream_parses_each_in_order() {
        let src = format!(
            "{}---\n{}",
            doc(
                "FirewallPolicy",
                "  rules:\n    - name: a\n      action: ALLOW\n"
            ),
            doc("NATPolicy", "  rules: []\n")
        );
        let manifests = parse_stream(&src, "<memory>").unwrap();
        assert_eq!(manifests.len(), 2);
        assert_eq!(manifests[0].kind, ManifestKind::FirewallPolicy);
        assert_eq!(manifests[1].kind, ManifestKind::NATPolicy);
    }

    #[test]
    fn parse_directory_reads_in_lexicographic_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("b.yaml"),
            doc("NATPolicy", "  rules: []\n"),
        )
        .unwrap();
        fs::write(
            dir.path().join("a.yaml"),
            doc(
                "FirewallPolicy",
                "  rules:\n    - name: a\n      action: ALLOW\n",
            ),
        )
        .unwrap();

        let manifests = parse_directory(dir.path()).unwrap();
        assert_eq!(manifests.len(), 2);
        assert_eq!(manifests[0].kind, ManifestKind::FirewallPolicy);
        assert_eq!(manifests[1].kind, ManifestKind::NATPolicy);
    }
}
