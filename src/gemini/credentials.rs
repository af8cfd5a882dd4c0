//! Credential store: user-supplied API keys plus an environment fallback.

use std::fmt;
use std::sync::Arc;

/// Environment variables consulted, in order, for the fallback key.
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY", "API_KEY"];

/// An opaque API key. `Debug` only shows the last four characters.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw key, for placing on the wire.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// `...abcd` form for log lines.
    pub fn redacted(&self) -> String {
        let tail: String = self
            .0
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("...{}", tail)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.redacted())
    }
}

/// Ordered user credentials plus the names of fallback environment variables.
///
/// The store is replaced wholesale, never edited in place, so a snapshot taken
/// by [`CredentialStore::candidates`] stays valid for the call that took it.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    user: Arc<[Credential]>,
    env_vars: Arc<[String]>,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::configure(Vec::<String>::new())
    }
}

impl CredentialStore {
    /// Build a store from user keys, in trial order. Blank keys are skipped;
    /// duplicates are kept.
    pub fn configure<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let user: Vec<Credential> = keys
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .filter(|k| !k.is_empty())
            .map(Credential::new)
            .collect();

        Self {
            user: user.into(),
            env_vars: API_KEY_ENV_VARS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replace the environment variable names consulted for the fallback.
    pub fn with_env_vars<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.env_vars = names.into_iter().map(Into::into).collect();
        self
    }

    /// A new store with `keys` replacing the user credentials. The fallback
    /// variable names carry over.
    pub fn reconfigure<I, S>(&self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            env_vars: Arc::clone(&self.env_vars),
            ..Self::configure(keys)
        }
    }

    pub fn user_credentials(&self) -> &[Credential] {
        &self.user
    }

    /// Resolve the fallback key from the environment, at call time.
    pub fn environment_credential(&self) -> Option<Credential> {
        self.env_vars
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
            .map(Credential::new)
    }

    /// Candidate list for one call: the user keys if there are any, else the
    /// environment key if set, else nothing.
    pub fn candidates(&self) -> Vec<Credential> {
        if !self.user.is_empty() {
            return self.user.to_vec();
        }
        self.environment_credential().into_iter().collect()
    }

    /// True when no key is available from either source.
    pub fn is_empty(&self) -> bool {
        self.candidates().is_empty()
    }
}
