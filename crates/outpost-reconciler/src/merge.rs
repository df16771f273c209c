//! Override merging.
//!
//! An override fragment is applied to the computed spec as a JSON merge patch
//! (RFC 7386): keys in the fragment win, keys it omits are kept, `null`
//! deletes a key and arrays are replaced wholesale. The merged document must
//! deserialize back into the target type without losing anything the user
//! wrote.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::MergeError;

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn join(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{path}.{segment}")
    }
}

/// Find the first field of `merged` that `typed` no longer carries.
///
/// A `null` value sets nothing, so it is never reported.
fn dropped_field(merged: &Value, typed: &Value, path: &str) -> Option<String> {
    match (merged, typed) {
        (Value::Object(merged), Value::Object(typed)) => {
            merged.iter().find_map(|(key, value)| {
                if value.is_null() {
                    return None;
                }
                match typed.get(key) {
                    None => Some(join(path, key)),
                    Some(kept) => dropped_field(value, kept, &join(path, key)),
                }
            })
        }
        (Value::Array(merged), Value::Array(typed)) => merged
            .iter()
            .zip(typed)
            .enumerate()
            .find_map(|(i, (value, kept))| dropped_field(value, kept, &format!("{path}[{i}]"))),
        _ => None,
    }
}

/// Merge `fragment` over `base`.
///
/// An absent, `null` or empty fragment returns `base` unchanged.
///
/// # Errors
///
/// Returns `MergeError::NotAnObject` for a non-object fragment,
/// `MergeError::Incompatible` when the merged document does not deserialize
/// into `T`, and `MergeError::UnknownField` when it sets a field `T` does not
/// have.
pub fn merge<T>(base: T, fragment: Option<&Value>) -> Result<T, MergeError>
where
    T: Serialize + DeserializeOwned,
{
    let Some(fragment) = fragment.filter(|f| !is_empty(f)) else {
        return Ok(base);
    };
    if !fragment.is_object() {
        return Err(MergeError::NotAnObject(type_name(fragment)));
    }

    let mut document = serde_json::to_value(&base).map_err(|e| MergeError::Encode(e.to_string()))?;
    json_patch::merge(&mut document, fragment);

    let merged: T = serde_json::from_value(document.clone())
        .map_err(|e| MergeError::Incompatible(e.to_string()))?;
    let typed = serde_json::to_value(&merged).map_err(|e| MergeError::Encode(e.to_string()))?;

    if let Some(path) = dropped_field(&document, &typed, "") {
        return Err(MergeError::UnknownField { path });
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{Backend, RouteRule, RoutingSpec};
    use crate::desired::BackendPort;
    use crate::kind::RoutingKind;
    use k8s_openapi::api::networking::v1::{Ingress, IngressSpec};
    use outpost_core::{HTTPRoute, HTTPRouteSpec};
    use serde_json::json;

    fn routing_spec() -> RoutingSpec {
        RoutingSpec {
            rules: vec![RouteRule {
                path_prefix: "/".to_string(),
                backend: Backend {
                    service: "grafana-service".to_string(),
                    namespace: "monitoring".to_string(),
                    port: BackendPort::Number(3000),
                },
            }],
        }
    }

    fn ingress_spec() -> IngressSpec {
        Ingress::render(&routing_spec())
    }

    #[test]
    fn empty_fragment_is_identity() {
        let base = ingress_spec();
        assert_eq!(merge(base.clone(), None).unwrap(), base);
        assert_eq!(merge(base.clone(), Some(&Value::Null)).unwrap(), base);
        assert_eq!(merge(base.clone(), Some(&json!({}))).unwrap(), base);
    }

    #[test]
    fn override_keys_win_and_others_are_kept() {
        let fragment = json!({"ingressClassName": "nginx"});
        let merged = merge(ingress_spec(), Some(&fragment)).unwrap();

        assert_eq!(merged.ingress_class_name.as_deref(), Some("nginx"));
        assert_eq!(merged.rules, ingress_spec().rules);
    }

    #[test]
    fn arrays_are_replaced() {
        let fragment = json!({"parentRefs": [{"name": "public", "namespace": "gateways"}]});
        let base = HTTPRoute::render(&routing_spec());
        let merged = merge(base.clone(), Some(&fragment)).unwrap();

        let parents = merged.parent_refs.unwrap();
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].namespace.as_deref(), Some("gateways"));
        assert_eq!(merged.rules, base.rules);

        let fragment = json!({"hostnames": ["a.example.com"]});
        let once = merge(HTTPRouteSpec::default(), Some(&fragment)).unwrap();
        assert_eq!(once.hostnames, Some(vec!["a.example.com".to_string()]));
    }

    #[test]
    fn null_deletes() {
        let fragment = json!({"rules": null});
        let merged = merge(ingress_spec(), Some(&fragment)).unwrap();
        assert!(merged.rules.is_none());
    }

    #[test]
    fn merge_is_idempotent() {
        let fragment = json!({
            "ingressClassName": "nginx",
            "tls": [{"hosts": ["grafana.example.com"], "secretName": "grafana-tls"}]
        });
        let once = merge(ingress_spec(), Some(&fragment)).unwrap();
        let twice = merge(once.clone(), Some(&fragment)).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let fragment = json!({"ingressClassNmae": "nginx"});
        assert_eq!(
            merge(ingress_spec(), Some(&fragment)),
            Err(MergeError::UnknownField {
                path: "ingressClassNmae".to_string()
            })
        );

        let nested = json!({"tls": [{"hostz": ["x"]}]});
        assert_eq!(
            merge(ingress_spec(), Some(&nested)),
            Err(MergeError::UnknownField {
                path: "tls[0].hostz".to_string()
            })
        );
    }

    #[test]
    fn unknown_field_with_empty_value_is_rejected() {
        for (fragment, path) in [
            (json!({"notAField": {}}), "notAField"),
            (json!({"notAField": []}), "notAField"),
            (json!({"tls": [{"hostz": []}]}), "tls[0].hostz"),
        ] {
            assert_eq!(
                merge(ingress_spec(), Some(&fragment)),
                Err(MergeError::UnknownField {
                    path: path.to_string()
                })
            );
        }
    }

    #[test]
    fn known_fields_with_empty_values_are_kept() {
        let fragment = json!({"tls": [], "defaultBackend": {}});
        let merged = merge(ingress_spec(), Some(&fragment)).unwrap();
        assert_eq!(merged.tls, Some(Vec::new()));
        assert!(merged.default_backend.is_some());

        let nested_null = json!({"tls": [{"hosts": null, "secretName": "grafana-tls"}]});
        let merged = merge(ingress_spec(), Some(&nested_null)).unwrap();
        let tls = merged.tls.unwrap();
        assert_eq!(tls[0].secret_name.as_deref(), Some("grafana-tls"));
        assert!(tls[0].hosts.is_none());
    }

    #[test]
    fn incompatible_types_are_rejected() {
        let fragment = json!({"rules": "everything"});
        assert!(matches!(
            merge(ingress_spec(), Some(&fragment)),
            Err(MergeError::Incompatible(_))
        ));
    }

    #[test]
    fn non_object_fragment_is_rejected() {
        assert_eq!(
            merge(ingress_spec(), Some(&json!(["nginx"]))),
            Err(MergeError::NotAnObject("array"))
        );
    }
}
