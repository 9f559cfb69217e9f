//! Session guard: the only writer of [`Session`].
//!
//! Every identity reported by the provider goes through
//! [`SessionGuard::handle_state_change`]. Identities outside the organizational
//! domain are signed out once and never stored, whichever of the state change
//! and the redirect result reports them first. The loading flag flips to
//! `false` after the first change has been handled, whatever it carried.

use super::{AuthError, DomainPolicy, Identity, IdentityProvider, Session, SessionNotice};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

pub struct SessionGuard<P> {
    provider: Arc<P>,
    policy: DomainPolicy,
    session: Session,
    // uid signed out by the domain check; kept until a new sign-in starts or a
    // permitted identity is accepted
    rejected: Option<String>,
    notices: mpsc::UnboundedSender<SessionNotice>,
}

impl<P: IdentityProvider> SessionGuard<P> {
    /// Builds a guard in the loading state and the receiver for its notices.
    #[must_use]
    pub fn new(
        provider: Arc<P>,
        policy: DomainPolicy,
    ) -> (Self, mpsc::UnboundedReceiver<SessionNotice>) {
        let (notices, receiver) = mpsc::unbounded_channel();
        let guard = Self {
            provider,
            policy,
            session: Session::new(),
            rejected: None,
            notices,
        };
        (guard, receiver)
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub const fn policy(&self) -> &DomainPolicy {
        &self.policy
    }

    /// Subscribes to the provider, resolves a pending redirect and handles the
    /// first state change. Returns the subscription so the caller can keep
    /// feeding [`Self::pump`].
    pub async fn initialize(&mut self) -> mpsc::UnboundedReceiver<Option<Identity>> {
        let mut changes = self.provider.subscribe();

        self.resolve_redirect().await;

        match changes.recv().await {
            Some(identity) => self.handle_state_change(identity).await,
            None => {
                warn!("identity provider closed its state channel before reporting");
                self.finish_loading();
            }
        }

        changes
    }

    /// Handles the next queued state change. Returns `false` once the provider
    /// channel is closed.
    pub async fn pump(&mut self, changes: &mut mpsc::UnboundedReceiver<Option<Identity>>) -> bool {
        match changes.recv().await {
            Some(identity) => {
                self.handle_state_change(identity).await;
                true
            }
            None => false,
        }
    }

    /// Handles every change already queued without waiting for new ones.
    pub async fn drain(&mut self, changes: &mut mpsc::UnboundedReceiver<Option<Identity>>) {
        while let Ok(identity) = changes.try_recv() {
            self.handle_state_change(identity).await;
        }
    }

    /// Starts the redirect handshake with the hosted-domain hint.
    ///
    /// # Errors
    /// Returns the provider error after logging it and raising a notice.
    #[instrument(skip(self))]
    pub async fn sign_in(&mut self) -> Result<(), AuthError> {
        self.rejected = None;
        let hint = self.policy.hint();

        if let Err(err) = self.provider.sign_in_with_redirect(&hint).await {
            error!("Error signing in: {err}");

            let notice = if err.is_domain_restriction() {
                SessionNotice::DomainRejected {
                    message: self.policy.rejection_message(),
                }
            } else {
                SessionNotice::SignInFailed {
                    message: "Sign-in failed. Please try again.".to_string(),
                }
            };
            self.notify(notice);

            return Err(err);
        }

        Ok(())
    }

    /// Signs the current identity out.
    ///
    /// # Errors
    /// Returns the provider error after logging it; the session is left unchanged.
    #[instrument(skip(self))]
    pub async fn sign_out(&mut self) -> Result<(), AuthError> {
        self.provider.sign_out().await.map_err(|err| {
            error!("Error signing out: {err}");
            err
        })?;

        self.session.identity = None;
        info!("signed out");

        Ok(())
    }

    /// Applies the domain policy to an identity reported by the provider.
    #[instrument(skip_all)]
    pub async fn handle_state_change(&mut self, identity: Option<Identity>) {
        debug!(
            "Auth state changed: {}",
            if identity.is_some() {
                "User logged in"
            } else {
                "No user"
            }
        );

        self.session.identity = match identity {
            Some(identity) => self.admit(identity).await,
            None => None,
        };

        self.finish_loading();
    }

    /// Checks the identity produced by the return leg of a redirect.
    /// Provider errors never propagate: a domain restriction is surfaced as a
    /// notice, anything else is logged and absorbed.
    #[instrument(skip(self))]
    pub async fn resolve_redirect(&mut self) {
        match self.provider.redirect_result().await {
            Ok(Some(identity)) => {
                if let Some(identity) = self.admit(identity).await {
                    info!(email = ?identity.email, "Sign-in successful");
                }
            }
            Ok(None) => debug!("No redirect result found"),
            Err(err) => {
                error!("Error handling redirect result: {err}");
                if err.is_domain_restriction() {
                    self.notify(SessionNotice::DomainRejected {
                        message: self.policy.rejection_message(),
                    });
                }
            }
        }
    }

    /// Returns the identity when the policy permits it; otherwise signs it out
    /// (once per identity) and raises a rejection notice.
    async fn admit(&mut self, identity: Identity) -> Option<Identity> {
        if self.policy.permits(identity.email.as_deref()) {
            self.rejected = None;
            return Some(identity);
        }

        if self.rejected.as_deref() == Some(identity.uid.as_str()) {
            debug!("identity already rejected, skipping sign-out");
            return None;
        }

        warn!(
            email = ?identity.email,
            domain = %self.policy.domain(),
            "Invalid domain, signing out user"
        );
        self.rejected = Some(identity.uid);

        if let Err(err) = self.provider.sign_out().await {
            error!("Error signing out rejected identity: {err}");
        }

        self.notify(SessionNotice::DomainRejected {
            message: self.policy.rejection_message(),
        });

        None
    }

    fn finish_loading(&mut self) {
        if self.session.loading {
            self.session.loading = false;
            debug!("session resolved");
        }
    }

    fn notify(&self, notice: SessionNotice) {
        if self.notices.send(notice).is_err() {
            debug!("session notice dropped, no receiver");
        }
    }
}
