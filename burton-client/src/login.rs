//! Login entry points
//!
//! Member-id logins are routed to the bootstrap on first login and to a
//! plain sign-in afterwards. Email logins are only accepted once the member
//! has been through first-time login.

use shared::models::{Member, Session};
use std::future::Future;
use std::time::Duration;

use crate::bootstrap::{BootstrapOutcome, IdentityBootstrap};
use crate::directory::{resolve_member, resolve_member_by_email};
use crate::error::{BootstrapError, CredentialFailure};
use crate::identity::{ProviderError, SignedIn, with_deadline};
use crate::ports::AuthPorts;
use crate::retry::{Timed, timed};
use crate::session::{SessionHub, SessionStorage};
use crate::{ClientConfig, ClientResult};

const SESSION_FILE: &str = "session.json";

/// A successful login through either entry point
#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    pub member: Member,
    pub session: Session,
    /// This login completed first-time login
    pub first_login: bool,
    pub must_change_password: bool,
}

impl From<BootstrapOutcome> for LoginOutcome {
    fn from(outcome: BootstrapOutcome) -> Self {
        let must_change_password = outcome.must_change_password();
        Self {
            member: outcome.member,
            session: outcome.session,
            first_login: true,
            must_change_password,
        }
    }
}

#[derive(Clone)]
pub struct LoginService {
    ports: AuthPorts,
    bootstrap: IdentityBootstrap,
    sessions: SessionHub,
    placeholder_domain: String,
    timeout: Duration,
}

impl LoginService {
    pub fn new(ports: AuthPorts, config: &ClientConfig, sessions: SessionHub) -> Self {
        let bootstrap = IdentityBootstrap::new(ports.clone(), config, sessions.clone());
        Self {
            ports,
            bootstrap,
            sessions,
            placeholder_domain: config.placeholder_domain.clone(),
            timeout: config.request_timeout(),
        }
    }

    /// REST-backed service with an initialised session hub
    pub fn connect(config: &ClientConfig) -> ClientResult<Self> {
        let storage = config.session_path.as_ref().map(|path| {
            if path.extension().is_some() {
                SessionStorage::at(path)
            } else {
                SessionStorage::new(path, SESSION_FILE)
            }
        });
        let sessions = SessionHub::new(storage);
        sessions.init();
        Ok(Self::new(AuthPorts::rest(config)?, config, sessions))
    }

    pub fn sessions(&self) -> &SessionHub {
        &self.sessions
    }

    pub fn bootstrap(&self) -> &IdentityBootstrap {
        &self.bootstrap
    }

    /// Log in with a member number
    pub async fn login_with_member_id(
        &self,
        raw_number: &str,
        password: &str,
    ) -> Result<LoginOutcome, BootstrapError> {
        let member =
            resolve_member(self.ports.directory.as_ref(), raw_number, self.timeout).await?;

        self.sign_out_current().await;

        if member.first_time_login {
            tracing::info!(member_number = %member.member_number, "routing to first-time login");
            return self.bootstrap.run(raw_number, password).await.map(Into::into);
        }

        let address = member.login_address(&self.placeholder_domain);
        let signed_in = match self.provider(self.ports.provider.sign_in(&address, password)).await {
            Ok(signed_in) => signed_in,
            Err(ProviderError::InvalidCredentials) => {
                tracing::info!(member_number = %member.member_number, "member-id login rejected");
                return Err(BootstrapError::invalid(CredentialFailure::Rejected));
            }
            Err(e) => return Err(BootstrapError::from_provider(e)),
        };

        let member = self.backfill_if_unlinked(member, &signed_in).await;
        let session = signed_in
            .session
            .with_member_number(member.member_number.as_str());
        self.sessions.set_signed_in(session.clone());

        Ok(LoginOutcome {
            must_change_password: !member.password_changed,
            member,
            session,
            first_login: false,
        })
    }

    /// Log in with the member's real email address
    pub async fn login_with_email(
        &self,
        email: &str,
        password: &str,
    ) -> Result<LoginOutcome, BootstrapError> {
        let member =
            resolve_member_by_email(self.ports.directory.as_ref(), email, self.timeout).await?;

        if member.first_time_login {
            tracing::info!(member_number = %member.member_number, "email login before first-time login");
            return Err(BootstrapError::invalid(CredentialFailure::FirstLoginRequired));
        }

        self.sign_out_current().await;

        let email = email.trim().to_lowercase();
        let signed_in = match self.provider(self.ports.provider.sign_in(&email, password)).await {
            Ok(signed_in) => signed_in,
            Err(ProviderError::InvalidCredentials) => {
                return Err(BootstrapError::invalid(CredentialFailure::EmailRejected));
            }
            Err(e) => return Err(BootstrapError::from_provider(e)),
        };

        let account_id = signed_in.account.account_id.as_str();
        match timed(
            self.timeout,
            self.ports.directory.ensure_profile(account_id, &email),
        )
        .await
        {
            Ok(()) => {}
            Err(Timed::Elapsed) => {
                tracing::warn!(account_id = %account_id, "profile check timed out");
            }
            Err(Timed::Failed(e)) => {
                tracing::error!(account_id = %account_id, error = %e, support_followup = true, "profile creation failed");
            }
        }

        let member = self.backfill_if_unlinked(member, &signed_in).await;
        let session = signed_in
            .session
            .with_member_number(member.member_number.as_str());
        self.sessions.set_signed_in(session.clone());

        Ok(LoginOutcome {
            must_change_password: !member.password_changed,
            member,
            session,
            first_login: false,
        })
    }

    /// Exchange the current refresh token for a new session
    pub async fn refresh_session(&self) -> Result<Session, BootstrapError> {
        let Some(current) = self.sessions.current_session() else {
            return Err(BootstrapError::invalid(CredentialFailure::Rejected));
        };
        let Some(refresh_token) = current.refresh_token.as_deref() else {
            return Err(BootstrapError::invalid(CredentialFailure::Rejected));
        };

        match self.provider(self.ports.provider.refresh(refresh_token)).await {
            Ok(refreshed) => {
                let mut session = refreshed.session;
                session.member_number = current.member_number.clone();
                if session.email.is_empty() {
                    session.email = current.email.clone();
                }
                self.sessions.set_refreshed(session.clone());
                Ok(session)
            }
            Err(e) if e.is_transient() => Err(BootstrapError::from_provider(e)),
            Err(e) => {
                tracing::info!(error = %e, "refresh rejected, signing out");
                self.sessions.clear();
                Err(BootstrapError::invalid(CredentialFailure::Rejected))
            }
        }
    }

    /// End the current session locally and at the provider
    pub async fn sign_out(&self) {
        self.sign_out_current().await;
    }

    async fn sign_out_current(&self) {
        let Some(session) = self.sessions.current_session() else {
            return;
        };
        if let Err(e) = self
            .provider(self.ports.provider.sign_out(&session.access_token))
            .await
        {
            tracing::warn!(error = %e, "provider sign-out failed, clearing local session anyway");
        }
        self.sessions.clear();
    }

    /// Regular logins must not fail after a successful sign-in
    async fn backfill_if_unlinked(&self, member: Member, signed_in: &SignedIn) -> Member {
        if member.is_linked() {
            if member.auth_account_id.as_deref() != Some(signed_in.account.account_id.as_str()) {
                tracing::warn!(
                    member_id = %member.id,
                    account_id = %signed_in.account.account_id,
                    "signed-in account differs from linked account"
                );
            }
            return member;
        }
        match self
            .bootstrap
            .linker()
            .backfill(&member, &signed_in.account.account_id)
            .await
        {
            Ok(updated) => updated,
            Err(e) => {
                tracing::warn!(member_id = %member.id, error = %e, "account id backfill failed");
                member
            }
        }
    }

    async fn provider<T, F>(&self, fut: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        with_deadline(self.timeout, fut).await
    }
}
