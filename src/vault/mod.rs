//! Credential vault: labeled multi-credential store with rotation-aware
//! lookup.
//!
//! The vault holds any number of credentials per service class. A 429/403
//! from a remote service marks the credential used as rate-limited for a
//! fixed cooldown; lookups skip marked credentials so the request
//! controller can rotate to the next one. The vault is an explicitly
//! constructed, injectable instance — there is no process-wide singleton.
//!
//! Marking is idempotent and commutative (setting the same or a later
//! cooldown twice has no adverse effect), which is what makes the
//! unsynchronised read-then-mark pattern safe under concurrently
//! in-flight requests.

use std::fmt;
use std::sync::Mutex;
use std::time::Instant;

use uuid::Uuid;

use crate::constants::{ENV_GITHUB_TOKENS, ENV_LLM_KEYS, RATE_LIMIT_COOLDOWN};
use crate::env::Env;

/// The remote service a credential authenticates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceClass {
    /// Repository host API (bearer token).
    RepoHost,
    /// LLM provider API (api key).
    LlmProvider,
}

impl fmt::Display for ServiceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceClass::RepoHost => write!(f, "repo-host"),
            ServiceClass::LlmProvider => write!(f, "llm-provider"),
        }
    }
}

impl std::str::FromStr for ServiceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "repo-host" | "github" => Ok(ServiceClass::RepoHost),
            "llm-provider" | "llm" => Ok(ServiceClass::LlmProvider),
            other => Err(format!(
                "unsupported service class: '{other}'. Supported: repo-host, llm-provider"
            )),
        }
    }
}

/// A single labeled credential.
#[derive(Clone)]
pub struct Credential {
    pub id: Uuid,
    pub display_name: String,
    pub service_class: ServiceClass,
    pub secret: String,
    /// Set when a call using this credential was rejected for quota;
    /// lookups skip it until the instant has passed.
    pub rate_limited_until: Option<Instant>,
}

impl Credential {
    fn new(display_name: impl Into<String>, service_class: ServiceClass, secret: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name: display_name.into(),
            service_class,
            secret,
            rate_limited_until: None,
        }
    }

    /// Whether this credential is currently usable.
    pub fn is_usable(&self) -> bool {
        match self.rate_limited_until {
            None => true,
            Some(until) => until <= Instant::now(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("service_class", &self.service_class)
            .field("secret", &"[REDACTED]")
            .field("rate_limited_until", &self.rate_limited_until)
            .finish()
    }
}

/// Rotation-aware credential store.
pub struct CredentialVault {
    credentials: Mutex<Vec<Credential>>,
}

impl CredentialVault {
    /// Create an empty vault.
    pub fn new() -> Self {
        Self {
            credentials: Mutex::new(Vec::new()),
        }
    }

    /// Load startup credentials from the environment.
    ///
    /// Both variables take comma-separated lists so multiple secrets per
    /// service class can be supplied. Secrets are deduplicated by value.
    pub fn from_env(env: &Env) -> Self {
        let vault = Self::new();
        for (i, token) in env.list(ENV_GITHUB_TOKENS).into_iter().enumerate() {
            vault.add(format!("github-{}", i + 1), ServiceClass::RepoHost, token);
        }
        for (i, key) in env.list(ENV_LLM_KEYS).into_iter().enumerate() {
            vault.add(format!("llm-{}", i + 1), ServiceClass::LlmProvider, key);
        }
        vault
    }

    /// First credential of the class whose cooldown is unset or expired.
    ///
    /// Returns `None` when every credential of the class is currently
    /// rate-limited (or none exist) — callers must surface that as a
    /// terminal condition rather than spin-retry.
    pub fn get_usable(&self, class: ServiceClass) -> Option<Credential> {
        let creds = self.credentials.lock().unwrap();
        creds
            .iter()
            .find(|c| c.service_class == class && c.is_usable())
            .cloned()
    }

    /// Whether any credential of the class exists, usable or not.
    pub fn has_any(&self, class: ServiceClass) -> bool {
        let creds = self.credentials.lock().unwrap();
        creds.iter().any(|c| c.service_class == class)
    }

    /// Mark a credential as rate-limited for the cooldown period.
    ///
    /// Matched by id; a credential removed in the meantime is ignored.
    pub fn mark_rate_limited(&self, credential: &Credential) {
        let mut creds = self.credentials.lock().unwrap();
        if let Some(c) = creds.iter_mut().find(|c| c.id == credential.id) {
            c.rate_limited_until = Some(Instant::now() + RATE_LIMIT_COOLDOWN);
        }
    }

    /// Append a credential. A secret already present for the same service
    /// class is not added twice; the existing credential's id is returned.
    pub fn add(
        &self,
        name: impl Into<String>,
        class: ServiceClass,
        secret: impl Into<String>,
    ) -> Uuid {
        let secret = secret.into();
        let mut creds = self.credentials.lock().unwrap();
        if let Some(existing) = creds
            .iter()
            .find(|c| c.service_class == class && c.secret == secret)
        {
            return existing.id;
        }
        let cred = Credential::new(name, class, secret);
        let id = cred.id;
        creds.push(cred);
        id
    }

    /// Delete a credential by id. Returns `true` if one was removed.
    pub fn remove(&self, id: Uuid) -> bool {
        let mut creds = self.credentials.lock().unwrap();
        let before = creds.len();
        creds.retain(|c| c.id != id);
        creds.len() < before
    }

    /// Snapshot of all credentials, in insertion order.
    pub fn list(&self) -> Vec<Credential> {
        self.credentials.lock().unwrap().clone()
    }
}

impl Default for CredentialVault {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_usable_rotates_past_rate_limited() {
        let vault = CredentialVault::new();
        vault.add("first", ServiceClass::RepoHost, "token-a");
        vault.add("second", ServiceClass::RepoHost, "token-b");

        let first = vault.get_usable(ServiceClass::RepoHost).unwrap();
        assert_eq!(first.display_name, "first");

        vault.mark_rate_limited(&first);
        let second = vault.get_usable(ServiceClass::RepoHost).unwrap();
        assert_eq!(second.display_name, "second");
    }

    #[test]
    fn get_usable_none_when_all_rate_limited() {
        let vault = CredentialVault::new();
        vault.add("first", ServiceClass::RepoHost, "token-a");
        vault.add("second", ServiceClass::RepoHost, "token-b");

        for cred in vault.list() {
            vault.mark_rate_limited(&cred);
        }
        assert!(vault.get_usable(ServiceClass::RepoHost).is_none());
    }

    #[test]
    fn get_usable_respects_service_class() {
        let vault = CredentialVault::new();
        vault.add("llm", ServiceClass::LlmProvider, "sk-xyz");
        assert!(vault.get_usable(ServiceClass::RepoHost).is_none());
        assert!(vault.get_usable(ServiceClass::LlmProvider).is_some());
    }

    #[test]
    fn add_dedups_by_secret_within_class() {
        let vault = CredentialVault::new();
        let a = vault.add("one", ServiceClass::RepoHost, "same-token");
        let b = vault.add("two", ServiceClass::RepoHost, "same-token");
        assert_eq!(a, b);
        assert_eq!(vault.list().len(), 1);

        // Same secret under a different class is a distinct credential.
        let c = vault.add("three", ServiceClass::LlmProvider, "same-token");
        assert_ne!(a, c);
        assert_eq!(vault.list().len(), 2);
    }

    #[test]
    fn remove_deletes_by_id() {
        let vault = CredentialVault::new();
        let id = vault.add("one", ServiceClass::RepoHost, "tok");
        assert!(vault.remove(id));
        assert!(!vault.remove(id));
        assert!(vault.list().is_empty());
    }

    #[test]
    fn mark_rate_limited_is_idempotent() {
        let vault = CredentialVault::new();
        vault.add("one", ServiceClass::RepoHost, "tok");
        let cred = vault.get_usable(ServiceClass::RepoHost).unwrap();
        vault.mark_rate_limited(&cred);
        vault.mark_rate_limited(&cred);
        assert!(vault.get_usable(ServiceClass::RepoHost).is_none());
        assert_eq!(vault.list().len(), 1);
    }

    #[test]
    fn from_env_parses_comma_separated_and_dedups() {
        let env = Env::mock([
            (ENV_GITHUB_TOKENS, "gh-a, gh-b, gh-a"),
            (ENV_LLM_KEYS, "sk-1"),
        ]);
        let vault = CredentialVault::from_env(&env);

        let repo: Vec<_> = vault
            .list()
            .into_iter()
            .filter(|c| c.service_class == ServiceClass::RepoHost)
            .collect();
        assert_eq!(repo.len(), 2);
        assert!(vault.has_any(ServiceClass::LlmProvider));
    }

    #[test]
    fn from_env_empty_environment() {
        let vault = CredentialVault::from_env(&Env::mock(Vec::<(&str, &str)>::new()));
        assert!(!vault.has_any(ServiceClass::RepoHost));
        assert!(!vault.has_any(ServiceClass::LlmProvider));
    }

    #[test]
    fn debug_redacts_secret() {
        let vault = CredentialVault::new();
        vault.add("one", ServiceClass::RepoHost, "super-secret");
        let rendered = format!("{:?}", vault.list()[0]);
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("super-secret"));
    }
}
