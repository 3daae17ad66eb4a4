//! TCP/TLS reachability check

use crate::manifest::DriverSettings;
use async_trait::async_trait;
use forgecred_core::{AuthResult, CheckSchema, CredentialCheck, FieldSpec, InputSet, Verdict};
use forgecred_network::{
    build_tls_context, parse_port, probe_tcp, timeout_from, validate_required, TlsOptions,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DRIVER: &str = "tcp-connect";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Proves a service accepts connections, optionally over TLS.
///
/// Nothing is authenticated: success means the TCP connect (and TLS
/// handshake, when enabled) completed.
#[derive(Debug, Clone)]
pub struct TcpConnectCheck {
    description: String,
    tls_port: String,
    plain_port: String,
}

impl Default for TcpConnectCheck {
    fn default() -> Self {
        Self {
            description: "TCP/TLS service reachability".to_string(),
            tls_port: "443".to_string(),
            plain_port: "80".to_string(),
        }
    }
}

impl TcpConnectCheck {
    /// Use other default ports, e.g. 636/389 for a directory server
    pub fn with_ports(mut self, tls_port: impl Into<String>, plain_port: impl Into<String>) -> Self {
        self.tls_port = tls_port.into();
        self.plain_port = plain_port.into();
        self
    }
}

/// Driver constructor; honours `tls_port`, `plain_port` and `description`
pub fn from_settings(settings: &DriverSettings) -> anyhow::Result<Arc<dyn CredentialCheck>> {
    let mut check = TcpConnectCheck::default();
    if let Some(port) = settings.get("tls_port") {
        check.tls_port = parse_port(&port.to_string())?.to_string();
    }
    if let Some(port) = settings.get("plain_port") {
        check.plain_port = parse_port(&port.to_string())?.to_string();
    }
    if let Some(description) = settings.get("description").and_then(|v| v.as_str()) {
        check.description = description.to_string();
    }
    Ok(Arc::new(check))
}

#[async_trait]
impl CredentialCheck for TcpConnectCheck {
    fn describe(&self) -> CheckSchema {
        CheckSchema::new(self.description.clone())
            .field(
                FieldSpec::text("host")
                    .with_label("Host")
                    .with_help("Hostname or IP address")
                    .required(),
            )
            .field(
                FieldSpec::boolean("use_tls")
                    .with_label("Use TLS")
                    .with_default(true),
            )
            .field(
                FieldSpec::text("port")
                    .with_label("Port")
                    .controlled_by("use_tls", self.tls_port.as_str(), self.plain_port.as_str()),
            )
            .field(
                FieldSpec::boolean("verify_cert")
                    .with_label("Verify certificate")
                    .with_default(true),
            )
            .field(FieldSpec::file("ca_file").with_label("CA certificate"))
            .field(
                FieldSpec::text("timeout")
                    .with_label("Timeout (seconds)")
                    .with_default("10"),
            )
            .field(FieldSpec::note(
                "about",
                "Only reachability is tested; no credentials are sent.",
            ))
    }

    async fn authenticate(&self, inputs: &InputSet) -> AuthResult {
        if let Err(missing) = validate_required(inputs, &["host", "port"]) {
            return Ok(Verdict::failure(missing.to_string()));
        }

        let host = inputs.text("host");
        let port = parse_port(inputs.text("port"))?;
        let connect_timeout = timeout_from(inputs, "timeout", DEFAULT_TIMEOUT);
        let tls = build_tls_context(&TlsOptions::from_inputs(inputs))?;

        debug!("Probing {}:{} (tls: {})", host, port, tls.is_some());
        let report = probe_tcp(host, port, connect_timeout, tls.as_ref()).await;
        Ok(Verdict::from(report.into_parts()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forgecred_core::{resolve, Value};
    use std::collections::BTreeMap;
    use tokio::net::TcpListener;

    fn inputs(check: &TcpConnectCheck, pairs: &[(&str, &str)]) -> InputSet {
        let raw = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect();
        resolve(&check.describe().fields, &raw).unwrap()
    }

    #[test]
    fn test_port_follows_tls_toggle() {
        let check = TcpConnectCheck::default();
        assert_eq!(inputs(&check, &[]).text("port"), "443");
        assert_eq!(inputs(&check, &[("use_tls", "false")]).text("port"), "80");
        assert_eq!(
            inputs(&check, &[("use_tls", "true"), ("port", "8443")]).text("port"),
            "8443"
        );

        let ldap = check.with_ports("636", "389");
        assert_eq!(inputs(&ldap, &[("use_tls", "false")]).text("port"), "389");
    }

    #[tokio::test]
    async fn test_reaches_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port().to_string();

        let check = TcpConnectCheck::default();
        let inputs = inputs(
            &check,
            &[("host", "127.0.0.1"), ("use_tls", "false"), ("port", port.as_str())],
        );
        let verdict = check.authenticate(&inputs).await.unwrap();
        assert!(verdict.success, "{}", verdict.message);
        assert_eq!(verdict.message, format!("Connected to 127.0.0.1:{}", port));
    }

    #[tokio::test]
    async fn test_missing_host() {
        let check = TcpConnectCheck::default();
        let verdict = check
            .authenticate(&inputs(&check, &[("host", "  ")]))
            .await
            .unwrap();
        assert!(!verdict.success);
        assert_eq!(verdict.message, "host is required");
    }

    #[tokio::test]
    async fn test_invalid_port_is_an_error() {
        let check = TcpConnectCheck::default();
        let err = check
            .authenticate(&inputs(&check, &[("host", "localhost"), ("port", "99999")]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("99999"));
    }

    #[test]
    fn test_from_settings() {
        let mut settings = BTreeMap::new();
        settings.insert("tls_port".to_string(), Value::from(636i64));
        settings.insert("plain_port".to_string(), Value::from("389"));
        settings.insert("description".to_string(), Value::from("Directory server"));

        let check = from_settings(&settings).unwrap();
        let schema = check.describe();
        assert_eq!(schema.description, "Directory server");
        let port = schema.fields.iter().find(|f| f.name == "port").unwrap();
        let dependency = port.dependency.as_ref().unwrap();
        assert_eq!(dependency.when_true, Value::from("636"));
        assert_eq!(dependency.when_false, Value::from("389"));

        settings.insert("tls_port".to_string(), Value::from("zero"));
        assert!(from_settings(&settings).is_err());
    }
}
