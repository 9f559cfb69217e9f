//! In-process identity provider used by the CLI and tests.
//!
//! It stands in for a hosted provider: an identity can be staged for the next
//! redirect sign-in, or set up as already returned from one. State changes are
//! broadcast to every subscriber, starting with the current identity.

use super::{AuthError, Identity, IdentityProvider, SignInHint};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Default)]
struct LocalState {
    current: Option<Identity>,
    staged: Option<Identity>,
    pending_redirect: Option<Identity>,
    subscribers: Vec<mpsc::UnboundedSender<Option<Identity>>>,
    last_hint: Option<SignInHint>,
    sign_outs: usize,
    sign_out_error: Option<String>,
    redirect_error: Option<AuthError>,
}

impl LocalState {
    fn publish(&mut self) {
        let current = self.current.clone();
        self.subscribers
            .retain(|subscriber| subscriber.send(current.clone()).is_ok());
    }
}

#[derive(Default)]
pub struct LocalIdentityProvider {
    state: Mutex<LocalState>,
}

impl LocalIdentityProvider {
    /// Provider with nobody signed in; `staged` is returned by the next sign-in.
    #[must_use]
    pub fn new(staged: Option<Identity>) -> Self {
        Self {
            state: Mutex::new(LocalState {
                staged,
                ..LocalState::default()
            }),
        }
    }

    /// Provider restoring a persisted session.
    #[must_use]
    pub fn signed_in(identity: Identity) -> Self {
        Self {
            state: Mutex::new(LocalState {
                current: Some(identity),
                ..LocalState::default()
            }),
        }
    }

    /// Provider on the return leg of a redirect handshake.
    #[must_use]
    pub fn returning_from_redirect(identity: Identity) -> Self {
        Self {
            state: Mutex::new(LocalState {
                current: Some(identity.clone()),
                pending_redirect: Some(identity),
                ..LocalState::default()
            }),
        }
    }

    /// Stages `identity` for the next redirect sign-in.
    pub fn stage(&self, identity: Identity) {
        self.lock().staged = Some(identity);
    }

    /// Makes every following sign-out fail with `message`.
    pub fn fail_sign_out(&self, message: &str) {
        self.lock().sign_out_error = Some(message.to_string());
    }

    /// Makes the next redirect resolution fail with `error`.
    pub fn fail_redirect(&self, error: AuthError) {
        self.lock().redirect_error = Some(error);
    }

    #[must_use]
    pub fn sign_out_count(&self) -> usize {
        self.lock().sign_outs
    }

    #[must_use]
    pub fn last_hint(&self) -> Option<SignInHint> {
        self.lock().last_hint.clone()
    }

    fn lock(&self) -> MutexGuard<'_, LocalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl IdentityProvider for LocalIdentityProvider {
    async fn sign_in_with_redirect(&self, hint: &SignInHint) -> Result<(), AuthError> {
        let mut state = self.lock();
        state.last_hint = Some(hint.clone());

        let Some(identity) = state.staged.take() else {
            return Err(AuthError::Provider(
                "no account available for sign-in".to_string(),
            ));
        };

        info!(hosted_domain = %hint.hosted_domain, "redirect handshake completed");
        state.current = Some(identity.clone());
        state.pending_redirect = Some(identity);
        state.publish();

        Ok(())
    }

    async fn redirect_result(&self) -> Result<Option<Identity>, AuthError> {
        let mut state = self.lock();
        if let Some(error) = state.redirect_error.take() {
            return Err(error);
        }
        Ok(state.pending_redirect.take())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let mut state = self.lock();
        if let Some(message) = &state.sign_out_error {
            return Err(AuthError::Provider(message.clone()));
        }

        state.sign_outs += 1;
        state.current = None;
        state.publish();
        debug!(sign_outs = state.sign_outs, "local session cleared");

        Ok(())
    }

    fn current_identity(&self) -> Option<Identity> {
        self.lock().current.clone()
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<Option<Identity>> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut state = self.lock();
        if sender.send(state.current.clone()).is_ok() {
            state.subscribers.push(sender);
        }
        receiver
    }
}
