//! Identity bootstrap
//!
//! Turns a member number into a linked, signed-in auth account on first
//! login. A run walks `NeedsLookup -> NeedsValidation ->
//! NeedsAccountResolution -> Linking -> Done` and stops in `Error` on the
//! first failure. Runs for the same member are serialised, and a run for an
//! already bootstrapped member stops before any provider call.

mod guard;
mod linker;
mod state;

pub use guard::{InFlightGuard, InFlightRegistry};
pub use linker::{AccountLinker, PendingLink};
pub use state::{BootstrapState, StateTrace};

use shared::models::{AuthAccount, Member, MemberNumber, Session};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::confirm::ConfirmError;
use crate::credential;
use crate::directory::{find_member, parse_member_number};
use crate::error::{BootstrapError, CredentialFailure};
use crate::identity::{ProviderError, SignUpMetadata, SignedIn, SignedUp, with_deadline};
use crate::ports::AuthPorts;
use crate::retry::{RetryPolicy, Timed, timed};
use crate::session::SessionHub;
use crate::ClientConfig;

/// A completed first-time login
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapOutcome {
    /// Member row as written by the link
    pub member: Member,
    pub account: AuthAccount,
    pub session: Session,
    /// Whether this run created the auth account
    pub created_account: bool,
    pub trace: Vec<BootstrapState>,
}

impl BootstrapOutcome {
    /// The bootstrap password is the member number, so it has to be replaced
    pub fn must_change_password(&self) -> bool {
        !self.member.password_changed
    }
}

/// Side effects earlier attempts of the same run already caused
#[derive(Debug, Default)]
struct RunProgress {
    created_account: AtomicBool,
    email_confirmed: AtomicBool,
}

impl RunProgress {
    fn mark_created(&self) {
        self.created_account.store(true, Ordering::SeqCst);
    }

    fn created_account(&self) -> bool {
        self.created_account.load(Ordering::SeqCst)
    }

    fn mark_confirmed(&self) {
        self.email_confirmed.store(true, Ordering::SeqCst);
    }

    fn email_confirmed(&self) -> bool {
        self.email_confirmed.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct IdentityBootstrap {
    ports: AuthPorts,
    linker: AccountLinker,
    sessions: SessionHub,
    in_flight: InFlightRegistry,
    placeholder_domain: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl IdentityBootstrap {
    pub fn new(ports: AuthPorts, config: &ClientConfig, sessions: SessionHub) -> Self {
        let timeout = config.request_timeout();
        let linker = AccountLinker::new(
            ports.directory.clone(),
            config.placeholder_domain.clone(),
            timeout,
        );
        Self {
            ports,
            linker,
            sessions,
            in_flight: InFlightRegistry::new(),
            placeholder_domain: config.placeholder_domain.clone(),
            timeout,
            retry: RetryPolicy::new(
                config.transient_attempts,
                Duration::from_millis(config.retry_base_delay_ms),
            )
            .with_jitter(true),
        }
    }

    pub fn linker(&self) -> &AccountLinker {
        &self.linker
    }

    /// Whether a run for this member number is currently executing
    pub fn is_in_flight(&self, raw_number: &str) -> bool {
        MemberNumber::parse(raw_number).is_ok_and(|n| self.in_flight.is_in_flight(&n))
    }

    /// Run the first-time login for `raw_number`
    ///
    /// Transient failures are retried according to the configured policy. A
    /// retry keeps what earlier attempts did: an account they created is still
    /// reported as created, and a confirmation that already succeeded is not
    /// requested again.
    pub async fn run(
        &self,
        raw_number: &str,
        password: &str,
    ) -> Result<BootstrapOutcome, BootstrapError> {
        let progress = RunProgress::default();
        let progress = &progress;
        self.retry
            .run(
                move |attempt| async move {
                    if attempt > 1 {
                        tracing::info!(attempt, "retrying first-time login after transient failure");
                    }
                    self.attempt(raw_number, password, progress).await
                },
                BootstrapError::is_retryable,
            )
            .await
    }

    async fn attempt(
        &self,
        raw_number: &str,
        password: &str,
        progress: &RunProgress,
    ) -> Result<BootstrapOutcome, BootstrapError> {
        let mut trace = StateTrace::start(raw_number.trim());
        match self.drive(raw_number, password, progress, &mut trace).await {
            Ok(mut outcome) => {
                outcome.trace = trace.states().to_vec();
                Ok(outcome)
            }
            Err(e) => {
                let failed_in = trace.current();
                trace.fail();
                if e.needs_support_followup() {
                    tracing::error!(state = %failed_in, error = %e, "first-time login failed");
                } else {
                    tracing::info!(state = %failed_in, error = %e, "first-time login refused");
                }
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        raw_number: &str,
        password: &str,
        progress: &RunProgress,
        trace: &mut StateTrace,
    ) -> Result<BootstrapOutcome, BootstrapError> {
        let number = parse_member_number(raw_number)?;
        trace.set_member_number(number.as_str());

        let _guard = self.in_flight.acquire(&number).await;

        let member = find_member(self.ports.directory.as_ref(), &number, self.timeout).await?;
        if !member.first_time_login {
            return Err(BootstrapError::AlreadyBootstrapped {
                member_number: number.to_string(),
            });
        }

        trace.advance(BootstrapState::NeedsValidation);
        credential::validate_first_login(&number, password)?;

        trace.advance(BootstrapState::NeedsAccountResolution);
        let address = member.login_address(&self.placeholder_domain);
        let secret = credential::bootstrap_secret(&number);
        let signed_in = self
            .resolve_account(&member, &address, secret, progress)
            .await?;
        let created_account = progress.created_account();

        trace.advance(BootstrapState::Linking);
        let linked = self
            .linker
            .link(&member, &signed_in.account.account_id, &address)
            .await?;

        trace.advance(BootstrapState::Done);
        let session = signed_in.session.with_member_number(number.as_str());
        self.sessions.set_signed_in(session.clone());
        tracing::info!(
            member_number = %number,
            account_id = %signed_in.account.account_id,
            created_account,
            "first-time login complete"
        );

        Ok(BootstrapOutcome {
            member: linked,
            account: signed_in.account,
            session,
            created_account,
            trace: Vec::new(),
        })
    }

    /// Find or create the auth account
    async fn resolve_account(
        &self,
        member: &Member,
        address: &str,
        secret: &str,
        progress: &RunProgress,
    ) -> Result<SignedIn, BootstrapError> {
        match self.provider(self.ports.provider.sign_in(address, secret)).await {
            Ok(signed_in) => Ok(signed_in),
            Err(ProviderError::NotConfirmed) => {
                self.confirm_and_retry(address, secret, progress).await
            }
            Err(ProviderError::NotFound) => {
                self.create_account(member, address, secret, progress).await
            }
            // the provider answers a missing account like a wrong password
            Err(ProviderError::InvalidCredentials) if !member.is_linked() => {
                self.create_account(member, address, secret, progress).await
            }
            Err(ProviderError::InvalidCredentials) => {
                tracing::warn!(member_id = %member.id, "linked account rejected bootstrap secret");
                Err(BootstrapError::invalid(CredentialFailure::Rejected))
            }
            Err(e) => Err(BootstrapError::from_provider(e)),
        }
    }

    async fn create_account(
        &self,
        member: &Member,
        address: &str,
        secret: &str,
        progress: &RunProgress,
    ) -> Result<SignedIn, BootstrapError> {
        let metadata = SignUpMetadata {
            member_number: member.member_number.to_string(),
            member_id: member.id.clone(),
        };
        let created = self
            .provider(self.ports.provider.sign_up(address, secret, &metadata))
            .await;

        match created {
            Ok(SignedUp {
                account,
                session: Some(session),
            }) => {
                tracing::info!(account_id = %account.account_id, "auth account created");
                progress.mark_created();
                Ok(SignedIn { account, session })
            }
            Ok(SignedUp {
                account,
                session: None,
            }) => {
                tracing::info!(account_id = %account.account_id, "auth account created without session");
                progress.mark_created();
                self.sign_in_existing(address, secret, progress).await
            }
            Err(ProviderError::AlreadyExists) => {
                tracing::info!(email = %address, "auth account already registered, signing in");
                self.sign_in_existing(address, secret, progress).await
            }
            Err(e) => Err(BootstrapError::from_provider(e)),
        }
    }

    /// Sign in to an account known to exist
    async fn sign_in_existing(
        &self,
        address: &str,
        secret: &str,
        progress: &RunProgress,
    ) -> Result<SignedIn, BootstrapError> {
        match self.provider(self.ports.provider.sign_in(address, secret)).await {
            Ok(signed_in) => Ok(signed_in),
            Err(ProviderError::NotConfirmed) => {
                self.confirm_and_retry(address, secret, progress).await
            }
            Err(ProviderError::InvalidCredentials) => {
                Err(BootstrapError::invalid(CredentialFailure::Rejected))
            }
            Err(e) => Err(BootstrapError::from_provider(e)),
        }
    }

    /// At most one confirmation call per run, then one sign-in
    async fn confirm_and_retry(
        &self,
        address: &str,
        secret: &str,
        progress: &RunProgress,
    ) -> Result<SignedIn, BootstrapError> {
        if progress.email_confirmed() {
            tracing::info!(email = %address, "confirmation already requested in this run");
        } else {
            tracing::info!(email = %address, "email not confirmed, requesting confirmation");
            match timed(self.timeout, self.ports.confirmer.confirm_email(address)).await {
                Ok(()) => progress.mark_confirmed(),
                Err(Timed::Elapsed) => {
                    return Err(BootstrapError::timed_out("email confirmation"));
                }
                Err(Timed::Failed(source)) => {
                    return Err(self.confirmation_failed(address, source));
                }
            }
        }

        match self.provider(self.ports.provider.sign_in(address, secret)).await {
            Ok(signed_in) => Ok(signed_in),
            Err(ProviderError::InvalidCredentials) => {
                Err(BootstrapError::invalid(CredentialFailure::Rejected))
            }
            Err(e) if e.is_transient() => Err(BootstrapError::from_provider(e)),
            Err(ProviderError::NotConfirmed) => {
                Err(self.confirmation_failed(address, ConfirmError::StillUnconfirmed))
            }
            Err(e) => Err(self.confirmation_failed(
                address,
                ConfirmError::UpdateFailed(e.to_string()),
            )),
        }
    }

    fn confirmation_failed(&self, address: &str, source: ConfirmError) -> BootstrapError {
        tracing::error!(email = %address, error = %source, support_followup = true, "email confirmation failed");
        BootstrapError::Confirmation {
            email: address.to_string(),
            source,
        }
    }

    /// Provider call under the request deadline
    async fn provider<T, F>(&self, fut: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        with_deadline(self.timeout, fut).await
    }
}
