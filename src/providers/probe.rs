//! Multi-step connection probing.
//!
//! Each provider defines an ordered fallback sequence of probe steps, from
//! an unauthenticated health check down to query-authenticated protected
//! resources. The first step that succeeds terminates the probe with the
//! server metadata it could extract. When every step fails, the error
//! surfaced is the *last* step's classification: later, credential-specific
//! failures tell an operator more than an early generic reachability one.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ErrorCode, ErrorRecord};
use crate::metrics::MetricsLedger;
use crate::providers::transport::{AuthMode, Transport};
use crate::retry::{retry_request, RetryContext, RetryPolicy};

/// Whatever the probed server told us about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerMetadata {
    pub name: String,
    pub version: String,
    pub id: String,
}

/// One step in a provider's probe sequence.
#[derive(Debug, Clone)]
pub struct ProbeStep {
    pub name: &'static str,
    pub path: String,
    pub auth: AuthMode,
}

/// Run the probe sequence. Individual step calls are retried per the
/// connection's policy; retries and step failures are recorded under the
/// `test_connection` operation when a ledger is supplied.
pub async fn run_probes(
    transport: &Transport,
    steps: &[ProbeStep],
    policy: RetryPolicy,
    metrics: Option<(&MetricsLedger, &str)>,
) -> Result<ServerMetadata, ErrorRecord> {
    let mut last_error: Option<ErrorRecord> = None;

    for step in steps {
        let context = metrics.map(|(ledger, provider)| RetryContext {
            metrics: ledger,
            provider,
            operation: "test_connection",
        });

        match retry_request(policy, context, || transport.get_value(&step.path, step.auth)).await {
            Ok(body) => {
                debug!(step = step.name, "probe step succeeded");
                return Ok(metadata_from_value(&body));
            }
            Err(error) => {
                warn!(
                    step = step.name,
                    code = %error.code,
                    status = ?error.http_status,
                    "probe step failed, falling back to next step"
                );
                last_error = Some(error);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        ErrorRecord::new(ErrorCode::Unknown, "no probe steps configured for provider")
    }))
}

/// Extract server metadata from a probe response, tolerating both the Emby
/// family's PascalCase payloads and the *arr family's camelCase ones.
/// Missing fields default to the literal "Unknown".
pub fn metadata_from_value(value: &Value) -> ServerMetadata {
    ServerMetadata {
        name: string_field(value, &["ServerName", "instanceName", "appName"]),
        version: string_field(value, &["Version", "version"]),
        id: string_field(value, &["Id", "instanceName"]),
    }
}

fn string_field(value: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| "Unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn emby_family_metadata() {
        let meta = metadata_from_value(&json!({
            "ServerName": "Living Room",
            "Version": "10.8.13",
            "Id": "abc123"
        }));
        assert_eq!(meta.name, "Living Room");
        assert_eq!(meta.version, "10.8.13");
        assert_eq!(meta.id, "abc123");
    }

    #[test]
    fn arr_family_metadata() {
        let meta = metadata_from_value(&json!({
            "appName": "Radarr",
            "version": "5.2.6",
            "instanceName": "Radarr Main"
        }));
        assert_eq!(meta.name, "Radarr Main");
        assert_eq!(meta.version, "5.2.6");
        assert_eq!(meta.id, "Radarr Main");
    }

    #[test]
    fn missing_fields_default_to_unknown() {
        let meta = metadata_from_value(&json!({ "Version": "1.0" }));
        assert_eq!(meta.name, "Unknown");
        assert_eq!(meta.version, "1.0");
        assert_eq!(meta.id, "Unknown");
    }

    #[test]
    fn non_object_bodies_yield_all_unknown() {
        let meta = metadata_from_value(&Value::Null);
        assert_eq!(meta.name, "Unknown");
        let meta = metadata_from_value(&json!(["not", "an", "object"]));
        assert_eq!(meta.version, "Unknown");
    }
}
