//! Outbound request controller: bounded retry with credential rotation.
//!
//! Every call to a rate-limited third-party service goes through
//! [`RequestController::execute`]. On a 403/429 response the credential
//! used is marked rate-limited and the next attempt picks up the next
//! usable credential of the same class — the services in question
//! rate-limit per-credential, so rotating (not merely delaying) is what
//! keeps outbound calls live. Retry is an explicit bounded loop with an
//! attempt counter.

use std::sync::Arc;

use thiserror::Error;

use crate::constants::APP_NAME;
use crate::vault::{Credential, CredentialVault, ServiceClass};

/// Errors from the request controller.
#[derive(Error, Debug)]
pub enum RequestError {
    /// No credential of the class was usable when the call started.
    #[error("no usable {0} credential (all rate-limited or none configured)")]
    NoUsableCredential(ServiceClass),

    /// Every attempt was rejected for quota; distinct from a genuine
    /// upstream failure.
    #[error("all credentials exhausted after {attempts} rate-limited attempts")]
    Exhausted { attempts: u32 },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Wraps HTTP calls with automatic credential rotation and bounded retry.
#[derive(Clone)]
pub struct RequestController {
    client: reqwest::Client,
    vault: Arc<CredentialVault>,
}

impl RequestController {
    pub fn new(vault: Arc<CredentialVault>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(APP_NAME)
            .build()
            .expect("default TLS backend available");
        Self { client, vault }
    }

    /// The vault this controller rotates over.
    pub fn vault(&self) -> &Arc<CredentialVault> {
        &self.vault
    }

    /// Perform a request with rotation-aware bounded retry.
    ///
    /// `build` constructs a fresh request for each attempt; the controller
    /// attaches the authorization header for the selected credential and
    /// sends it. A 403/429 marks the credential and rotates; any other
    /// status is returned as-is (permanent failures are the caller's
    /// concern). Anonymous calls are permitted for the repository host
    /// when no credential of that class is configured at all.
    pub async fn execute<F>(
        &self,
        class: ServiceClass,
        max_attempts: u32,
        build: F,
    ) -> Result<reqwest::Response, RequestError>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let anonymous_ok = class == ServiceClass::RepoHost && !self.vault.has_any(class);

        for attempt in 1..=max_attempts {
            let credential = self.vault.get_usable(class);
            if credential.is_none() && !anonymous_ok {
                return Err(if attempt == 1 {
                    RequestError::NoUsableCredential(class)
                } else {
                    RequestError::Exhausted {
                        attempts: attempt - 1,
                    }
                });
            }

            let mut request = build(&self.client);
            if let Some(ref cred) = credential {
                request = attach_credential(request, cred);
            }

            let response = request.send().await?;
            if is_rate_limited(response.status()) {
                match credential {
                    Some(ref cred) => self.vault.mark_rate_limited(cred),
                    // Anonymous and throttled: nothing to rotate to.
                    None => return Err(RequestError::Exhausted { attempts: attempt }),
                }
                continue;
            }
            return Ok(response);
        }

        Err(RequestError::Exhausted {
            attempts: max_attempts,
        })
    }
}

/// Attach the authorization header appropriate for the credential's class.
fn attach_credential(
    request: reqwest::RequestBuilder,
    credential: &Credential,
) -> reqwest::RequestBuilder {
    match credential.service_class {
        ServiceClass::RepoHost => request.bearer_auth(&credential.secret),
        ServiceClass::LlmProvider => request.header("x-api-key", &credential.secret),
    }
}

/// Whether a status indicates a per-credential quota rejection.
fn is_rate_limited(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status == reqwest::StatusCode::FORBIDDEN
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::SocketAddr;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal scripted HTTP server: answers successive requests with the
    /// given status codes, then stops accepting.
    async fn spawn_scripted_server(statuses: Vec<u16>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for status in statuses {
                let (mut sock, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 4096];
                let _ = sock.read(&mut buf).await;
                let body = "{}";
                let response = format!(
                    "HTTP/1.1 {status} Scripted\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len(),
                );
                let _ = sock.write_all(response.as_bytes()).await;
            }
        });
        addr
    }

    fn vault_with_repo_tokens(n: usize) -> Arc<CredentialVault> {
        let vault = CredentialVault::new();
        for i in 0..n {
            vault.add(format!("t{i}"), ServiceClass::RepoHost, format!("token-{i}"));
        }
        Arc::new(vault)
    }

    #[tokio::test]
    async fn rotates_through_rate_limited_credentials() {
        let addr = spawn_scripted_server(vec![429, 429, 200]).await;
        let vault = vault_with_repo_tokens(3);
        let controller = RequestController::new(Arc::clone(&vault));

        let response = controller
            .execute(ServiceClass::RepoHost, 5, |client| {
                client.get(format!("http://{addr}/"))
            })
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        // Exactly the first two credentials were marked rate-limited.
        let marked: Vec<bool> = vault
            .list()
            .iter()
            .map(|c| c.rate_limited_until.is_some())
            .collect();
        assert_eq!(marked, vec![true, true, false]);
    }

    #[tokio::test]
    async fn exhausted_when_all_credentials_marked() {
        let addr = spawn_scripted_server(vec![429, 429]).await;
        let vault = vault_with_repo_tokens(2);
        let controller = RequestController::new(Arc::clone(&vault));

        let err = controller
            .execute(ServiceClass::RepoHost, 5, |client| {
                client.get(format!("http://{addr}/"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::Exhausted { attempts: 2 }));
    }

    #[tokio::test]
    async fn no_usable_credential_for_llm_without_keys() {
        let controller = RequestController::new(Arc::new(CredentialVault::new()));

        // Never reaches the network: the error surfaces before any send.
        let err = controller
            .execute(ServiceClass::LlmProvider, 3, |client| {
                client.get("http://127.0.0.1:9/")
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RequestError::NoUsableCredential(ServiceClass::LlmProvider)
        ));
    }

    #[tokio::test]
    async fn anonymous_repo_host_call_when_no_tokens_configured() {
        let addr = spawn_scripted_server(vec![200]).await;
        let controller = RequestController::new(Arc::new(CredentialVault::new()));

        let response = controller
            .execute(ServiceClass::RepoHost, 5, |client| {
                client.get(format!("http://{addr}/"))
            })
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn anonymous_rate_limit_is_exhausted_immediately() {
        let addr = spawn_scripted_server(vec![429]).await;
        let controller = RequestController::new(Arc::new(CredentialVault::new()));

        let err = controller
            .execute(ServiceClass::RepoHost, 5, |client| {
                client.get(format!("http://{addr}/"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::Exhausted { attempts: 1 }));
    }

    #[tokio::test]
    async fn forbidden_also_rotates() {
        let addr = spawn_scripted_server(vec![403, 200]).await;
        let vault = vault_with_repo_tokens(2);
        let controller = RequestController::new(Arc::clone(&vault));

        let response = controller
            .execute(ServiceClass::RepoHost, 5, |client| {
                client.get(format!("http://{addr}/"))
            })
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert!(vault.list()[0].rate_limited_until.is_some());
    }

    #[tokio::test]
    async fn non_rate_limit_status_returned_as_is() {
        let addr = spawn_scripted_server(vec![404]).await;
        let vault = vault_with_repo_tokens(1);
        let controller = RequestController::new(Arc::clone(&vault));

        let response = controller
            .execute(ServiceClass::RepoHost, 5, |client| {
                client.get(format!("http://{addr}/"))
            })
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
        // Permanent failures never mark the credential.
        assert!(vault.list()[0].rate_limited_until.is_none());
    }
}
