//! Domain-restricted session handling.
//!
//! The identity provider is an external collaborator reached through
//! [`IdentityProvider`]. [`SessionGuard`] owns the [`Session`], applies the
//! [`DomainPolicy`] to every identity the provider reports and publishes
//! user-facing [`SessionNotice`]s on a channel.

pub mod guard;
pub mod local;

pub use self::guard::SessionGuard;
pub use self::local::LocalIdentityProvider;

use regex::Regex;
use std::future::Future;
use thiserror::Error;
use tokio::sync::mpsc;

/// Text providers use when they refuse an account outside the allowed domain.
const DOMAIN_RESTRICTION_MARKER: &str = "Access restricted to";

/// Opaque user handle returned by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: Some(email.into()),
            display_name: None,
        }
    }
}

/// Current identity plus the loading flag that gates first paint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    identity: Option<Identity>,
    loading: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            identity: None,
            loading: true,
        }
    }

    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        !self.loading && self.identity.is_some()
    }

    /// What protected content may do right now.
    #[must_use]
    pub const fn gate(&self) -> Gate<'_> {
        if self.loading {
            return Gate::Loading;
        }
        match &self.identity {
            Some(identity) => Gate::Authorized(identity),
            None => Gate::SignedOut,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Gate<'a> {
    /// Nothing dependent on the session may render.
    Loading,
    SignedOut,
    Authorized(&'a Identity),
}

/// Parameters forwarded to the provider when starting a sign-in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignInHint {
    /// Hosted-domain hint (`hd`) so the provider only offers matching accounts.
    pub hosted_domain: String,
}

/// Accepts only emails under a single organizational domain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DomainPolicy {
    domain: String,
    suffix: String,
}

impl DomainPolicy {
    #[must_use]
    pub fn new(domain: &str) -> Self {
        let domain = domain.trim().trim_start_matches('@').to_ascii_lowercase();
        let suffix = format!("@{domain}");
        Self { domain, suffix }
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// True when `email` is a well-formed address ending with `@<domain>`.
    #[must_use]
    pub fn permits(&self, email: Option<&str>) -> bool {
        let Some(email) = email else {
            return false;
        };
        valid_email(email) && email.to_ascii_lowercase().ends_with(&self.suffix)
    }

    #[must_use]
    pub fn hint(&self) -> SignInHint {
        SignInHint {
            hosted_domain: self.domain.clone(),
        }
    }

    /// Message shown when an identity is refused.
    #[must_use]
    pub fn rejection_message(&self) -> String {
        format!(
            "Access Denied: Please sign in with your {} email address.",
            self.suffix
        )
    }
}

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").map_or(false, |re| re.is_match(email))
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("identity provider error: {0}")]
    Provider(String),
    #[error("Access restricted to {domain} accounts")]
    DomainRestricted { domain: String },
}

impl AuthError {
    /// Whether the provider refused the account because of its domain.
    #[must_use]
    pub fn is_domain_restriction(&self) -> bool {
        match self {
            Self::DomainRestricted { .. } => true,
            Self::Provider(message) => message.contains(DOMAIN_RESTRICTION_MARKER),
        }
    }
}

/// User-facing events raised by the guard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionNotice {
    DomainRejected { message: String },
    SignInFailed { message: String },
}

impl SessionNotice {
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::DomainRejected { message } | Self::SignInFailed { message } => message,
        }
    }
}

/// Boundary to the external identity provider.
///
/// `subscribe` hands out a channel that first receives the current identity and
/// then one message per change, mirroring a provider state listener.
pub trait IdentityProvider: Send + Sync {
    /// Starts a redirect-based sign-in. The outcome arrives later as a state change.
    fn sign_in_with_redirect(
        &self,
        hint: &SignInHint,
    ) -> impl Future<Output = Result<(), AuthError>> + Send;

    /// Identity produced by the return leg of a redirect handshake, if any.
    fn redirect_result(&self) -> impl Future<Output = Result<Option<Identity>, AuthError>> + Send;

    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send;

    fn current_identity(&self) -> Option<Identity>;

    fn subscribe(&self) -> mpsc::UnboundedReceiver<Option<Identity>>;
}
