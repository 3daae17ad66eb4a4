//! HTTP Basic authentication check

use crate::manifest::DriverSettings;
use anyhow::{bail, Context};
use async_trait::async_trait;
use forgecred_core::{AuthResult, CheckSchema, CredentialCheck, FieldSpec, InputSet, Verdict};
use forgecred_network::{build_tls_context, timeout_from, validate_required, TlsOptions};
use reqwest::{redirect, Client, Method, StatusCode};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DRIVER: &str = "http-basic";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("forgecred/", env!("CARGO_PKG_VERSION"));

/// Verifies a username/password pair against an endpoint protected by HTTP
/// Basic authentication
#[derive(Debug, Clone)]
pub struct HttpBasicCheck {
    description: String,
    method: Method,
}

impl Default for HttpBasicCheck {
    fn default() -> Self {
        Self {
            description: "HTTP Basic authentication".to_string(),
            method: Method::GET,
        }
    }
}

/// Driver constructor; honours `method` and `description`
pub fn from_settings(settings: &DriverSettings) -> anyhow::Result<Arc<dyn CredentialCheck>> {
    let mut check = HttpBasicCheck::default();
    if let Some(method) = settings.get("method") {
        let name = method.to_string().trim().to_ascii_uppercase();
        check.method = match name.as_str() {
            "GET" => Method::GET,
            "HEAD" => Method::HEAD,
            "POST" => Method::POST,
            other => bail!("unsupported HTTP method '{}'", other),
        };
    }
    if let Some(description) = settings.get("description").and_then(|v| v.as_str()) {
        check.description = description.to_string();
    }
    Ok(Arc::new(check))
}

impl HttpBasicCheck {
    fn client(&self, url: &Url, inputs: &InputSet) -> anyhow::Result<Client> {
        let timeout = timeout_from(inputs, "timeout", DEFAULT_TIMEOUT);

        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(redirect::Policy::none());

        if url.scheme() == "https" {
            let options = TlsOptions {
                use_tls: true,
                verify_cert: inputs.flag("verify_cert"),
                ca_file: inputs.opt_text("ca_file").map(PathBuf::from),
                ..TlsOptions::default()
            };
            if let Some(ctx) = build_tls_context(&options)? {
                builder = builder.use_preconfigured_tls(ctx.connector().clone());
            }
        }

        builder.build().context("failed to build HTTP client")
    }
}

#[async_trait]
impl CredentialCheck for HttpBasicCheck {
    fn describe(&self) -> CheckSchema {
        CheckSchema::new(self.description.clone())
            .field(
                FieldSpec::text("url")
                    .with_label("URL")
                    .with_help("Protected resource, e.g. https://intranet.example.com/")
                    .required(),
            )
            .field(FieldSpec::text("username").with_label("Username").required())
            .field(FieldSpec::secret("password").with_label("Password"))
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
    }

    async fn authenticate(&self, inputs: &InputSet) -> AuthResult {
        if let Err(missing) = validate_required(inputs, &["url", "username"]) {
            return Ok(Verdict::failure(missing.to_string()));
        }

        let url = match Url::parse(inputs.text("url")) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            Ok(url) => {
                return Ok(Verdict::failure(format!(
                    "Unsupported URL scheme '{}'",
                    url.scheme()
                )))
            }
            Err(e) => return Ok(Verdict::failure(format!("Invalid URL: {}", e))),
        };
        let username = inputs.text("username");
        let password = inputs.get("password").map(|v| v.to_string());

        let client = self.client(&url, inputs)?;

        // An endpoint that lets anyone in proves nothing about the credentials
        debug!("{} {} (anonymous)", self.method, url);
        match client.request(self.method.clone(), url.clone()).send().await {
            Ok(response) if response.status().is_success() => {
                return Ok(Verdict::failure(format!(
                    "Endpoint does not require authentication (HTTP {}); credentials not verified",
                    response.status().as_u16()
                )));
            }
            Ok(_) => {}
            Err(e) => return transport_failure(e),
        }

        debug!("{} {} as {}", self.method, url, username);
        let response = match client
            .request(self.method.clone(), url)
            .basic_auth(username, password)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return transport_failure(e),
        };

        let status = response.status();
        let verdict = match status {
            s if s.is_success() => {
                Verdict::success(format!("Authenticated as {} (HTTP {})", username, s.as_u16()))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Verdict::failure(format!("Invalid credentials (HTTP {})", status.as_u16()))
            }
            s if s.is_redirection() => Verdict::failure(format!(
                "Unexpected redirect (HTTP {}); credentials not verified",
                s.as_u16()
            )),
            s => Verdict::failure(format!("Unexpected response (HTTP {})", s.as_u16())),
        };
        Ok(verdict)
    }
}

fn transport_failure(err: reqwest::Error) -> AuthResult {
    if err.is_timeout() {
        Ok(Verdict::failure("Connection timed out"))
    } else if err.is_connect() {
        Ok(Verdict::failure(format!("Connection failed: {}", err)))
    } else {
        Err(anyhow::Error::new(err).context("HTTP request failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forgecred_core::{resolve, Value};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves 200 to `admin:secret` and 401 to everything else, or 200 to
    /// everyone when `open` is set
    async fn serve(open: bool) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    let request = String::from_utf8_lossy(&request).to_ascii_lowercase();
                    // base64("admin:secret")
                    let authorized =
                        open || request.contains("authorization: basic ywrtaw46c2vjcmv0");
                    let status = if authorized {
                        "200 OK"
                    } else {
                        "401 Unauthorized"
                    };
                    let response = format!(
                        "HTTP/1.1 {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                        status
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });

        format!("http://{}/", addr)
    }

    fn inputs(pairs: &[(&str, &str)]) -> InputSet {
        let raw = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect();
        resolve(&HttpBasicCheck::default().describe().fields, &raw).unwrap()
    }

    #[tokio::test]
    async fn test_valid_credentials() {
        let url = serve(false).await;
        let verdict = HttpBasicCheck::default()
            .authenticate(&inputs(&[
                ("url", url.as_str()),
                ("username", "admin"),
                ("password", "secret"),
            ]))
            .await
            .unwrap();
        assert!(verdict.success, "{}", verdict.message);
        assert_eq!(verdict.message, "Authenticated as admin (HTTP 200)");
    }

    #[tokio::test]
    async fn test_invalid_credentials() {
        let url = serve(false).await;
        let verdict = HttpBasicCheck::default()
            .authenticate(&inputs(&[
                ("url", url.as_str()),
                ("username", "admin"),
                ("password", "wrong"),
            ]))
            .await
            .unwrap();
        assert!(!verdict.success);
        assert_eq!(verdict.message, "Invalid credentials (HTTP 401)");
    }

    #[tokio::test]
    async fn test_open_endpoint_is_not_success() {
        let url = serve(true).await;
        let verdict = HttpBasicCheck::default()
            .authenticate(&inputs(&[
                ("url", url.as_str()),
                ("username", "admin"),
                ("password", "anything"),
            ]))
            .await
            .unwrap();
        assert!(!verdict.success);
        assert!(verdict.message.contains("does not require authentication"));
    }

    #[tokio::test]
    async fn test_connection_failure() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = format!("http://127.0.0.1:{}/", port);
        let verdict = HttpBasicCheck::default()
            .authenticate(&inputs(&[("url", url.as_str()), ("username", "admin")]))
            .await
            .unwrap();
        assert!(!verdict.success);
        assert!(verdict.message.starts_with("Connection"));
    }

    #[tokio::test]
    async fn test_input_problems() {
        let check = HttpBasicCheck::default();

        let verdict = check.authenticate(&inputs(&[])).await.unwrap();
        assert_eq!(verdict.message, "url, username are required");

        let verdict = check
            .authenticate(&inputs(&[("url", "ftp://files"), ("username", "a")]))
            .await
            .unwrap();
        assert_eq!(verdict.message, "Unsupported URL scheme 'ftp'");
    }

    #[test]
    fn test_from_settings() {
        let mut settings = DriverSettings::new();
        settings.insert("method".to_string(), Value::from("head"));
        assert!(from_settings(&settings).is_ok());

        settings.insert("method".to_string(), Value::from("TRACE"));
        match from_settings(&settings) {
            Ok(_) => panic!("TRACE should be rejected"),
            Err(err) => assert!(err.to_string().contains("TRACE")),
        }
    }
}
