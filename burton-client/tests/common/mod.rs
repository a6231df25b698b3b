// burton-client/tests/common/mod.rs
// In-memory backends for the login flow tests

#![allow(dead_code)]

use async_trait::async_trait;
use burton_client::confirm::{ConfirmError, EmailConfirmer};
use burton_client::directory::{DirectoryError, DirectoryResult, LinkOutcome, MemberDirectory};
use burton_client::identity::{IdentityProvider, ProviderError, SignUpMetadata, SignedIn, SignedUp};
use burton_client::{AuthPorts, ClientConfig, LoginService, SessionHub};
use shared::models::{AuthAccount, Member, MemberLinkUpdate, MemberNumber, Session};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn member(id: &str, number: &str, email: Option<&str>) -> Member {
    Member {
        id: id.to_string(),
        member_number: MemberNumber::parse(number).unwrap(),
        full_name: None,
        email: email.map(str::to_string),
        auth_account_id: None,
        first_time_login: true,
        password_changed: false,
        email_verified: false,
        profile_completed: false,
        registration_completed: false,
    }
}

pub fn config() -> ClientConfig {
    ClientConfig::new("http://backend.test", "anon-key")
        .with_timeout(1)
        .with_transient_retry(2, 1)
}

// ========== Directory ==========

#[derive(Default)]
pub struct FakeDirectory {
    members: Mutex<HashMap<String, Member>>,
    profiles: Mutex<HashSet<String>>,
    pub lookups: AtomicU32,
    pub link_calls: AtomicU32,
    pub profile_calls: AtomicU32,
    /// Upcoming link writes that fail as unavailable
    pub failing_links: AtomicU32,
    lookup_failure: Mutex<Option<DirectoryError>>,
}

impl FakeDirectory {
    pub fn with_members(members: Vec<Member>) -> Self {
        let dir = Self::default();
        {
            let mut map = dir.members.lock().unwrap();
            for m in members {
                map.insert(m.id.clone(), m);
            }
        }
        dir
    }

    pub fn get(&self, id: &str) -> Member {
        self.members.lock().unwrap()[id].clone()
    }

    pub fn update(&self, id: &str, f: impl FnOnce(&mut Member)) {
        f(self.members.lock().unwrap().get_mut(id).unwrap());
    }

    pub fn has_profile(&self, account_id: &str) -> bool {
        self.profiles.lock().unwrap().contains(account_id)
    }

    pub fn fail_next_links(&self, n: u32) {
        self.failing_links.store(n, Ordering::SeqCst);
    }

    /// Every lookup fails with `err` from now on
    pub fn fail_lookups_with(&self, err: DirectoryError) {
        *self.lookup_failure.lock().unwrap() = Some(err);
    }

    fn injected_lookup_failure(&self) -> DirectoryResult<()> {
        match self.lookup_failure.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MemberDirectory for FakeDirectory {
    async fn lookup_by_number(&self, number: &MemberNumber) -> DirectoryResult<Option<Member>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.injected_lookup_failure()?;
        let members = self.members.lock().unwrap();
        Ok(members
            .values()
            .find(|m| &m.member_number == number)
            .cloned())
    }

    async fn lookup_by_email(&self, email: &str) -> DirectoryResult<Option<Member>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.injected_lookup_failure()?;
        let members = self.members.lock().unwrap();
        Ok(members
            .values()
            .find(|m| m.email.as_deref().map(str::to_lowercase).as_deref() == Some(email))
            .cloned())
    }

    async fn link_account(
        &self,
        member_id: &str,
        update: &MemberLinkUpdate,
    ) -> DirectoryResult<LinkOutcome> {
        self.link_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .failing_links
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(DirectoryError::Unavailable("injected outage".into()));
        }

        let mut members = self.members.lock().unwrap();
        let Some(m) = members.get_mut(member_id) else {
            return Err(DirectoryError::Missing(member_id.to_string()));
        };
        match &m.auth_account_id {
            Some(existing) if existing != &update.auth_account_id => {
                return Ok(LinkOutcome::LinkedToOther(existing.clone()));
            }
            _ => {}
        }
        m.auth_account_id = Some(update.auth_account_id.clone());
        if let Some(v) = update.first_time_login {
            m.first_time_login = v;
        }
        if let Some(v) = update.password_changed {
            m.password_changed = v;
        }
        if let Some(email) = &update.email {
            m.email = Some(email.clone());
        }
        Ok(LinkOutcome::Linked(m.clone()))
    }

    async fn ensure_profile(&self, account_id: &str, _email: &str) -> DirectoryResult<()> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        self.profiles.lock().unwrap().insert(account_id.to_string());
        Ok(())
    }
}

// ========== Identity provider ==========

#[derive(Debug, Clone)]
pub struct FakeAccount {
    pub id: String,
    pub password: String,
    pub confirmed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    SignIn,
    SignUp,
    Refresh,
}

pub struct FakeProvider {
    accounts: Mutex<HashMap<String, FakeAccount>>,
    scripted: Mutex<VecDeque<(Op, ProviderError)>>,
    /// Sign-in failures keyed by call number, counted from 1
    failing_sign_ins: Mutex<HashMap<u32, ProviderError>>,
    /// New accounts are confirmed and get a session straight away
    pub auto_confirm: bool,
    pub sign_in_delay: Mutex<Option<Duration>>,
    pub sign_in_calls: AtomicU32,
    pub sign_up_calls: AtomicU32,
    pub sign_out_calls: AtomicU32,
    pub refresh_calls: AtomicU32,
    next_id: AtomicU32,
}

impl FakeProvider {
    pub fn new(auto_confirm: bool) -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            scripted: Mutex::new(VecDeque::new()),
            failing_sign_ins: Mutex::new(HashMap::new()),
            auto_confirm,
            sign_in_delay: Mutex::new(None),
            sign_in_calls: AtomicU32::new(0),
            sign_up_calls: AtomicU32::new(0),
            sign_out_calls: AtomicU32::new(0),
            refresh_calls: AtomicU32::new(0),
            next_id: AtomicU32::new(1),
        }
    }

    pub fn add_account(&self, email: &str, password: &str, confirmed: bool) -> String {
        let id = format!("acct-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.accounts.lock().unwrap().insert(
            email.to_string(),
            FakeAccount {
                id: id.clone(),
                password: password.to_string(),
                confirmed,
            },
        );
        id
    }

    pub fn account(&self, email: &str) -> Option<FakeAccount> {
        self.accounts.lock().unwrap().get(email).cloned()
    }

    pub fn set_password(&self, email: &str, password: &str) {
        if let Some(a) = self.accounts.lock().unwrap().get_mut(email) {
            a.password = password.to_string();
        }
    }

    /// Mark confirmed; false when no such account
    pub fn confirm(&self, email: &str) -> bool {
        match self.accounts.lock().unwrap().get_mut(email) {
            Some(a) => {
                a.confirmed = true;
                true
            }
            None => false,
        }
    }

    /// Fail the next call of `op` with `err`
    pub fn script(&self, op: Op, err: ProviderError) {
        self.scripted.lock().unwrap().push_back((op, err));
    }

    /// Fail the `call`-th sign-in with `err`
    pub fn fail_sign_in_call(&self, call: u32, err: ProviderError) {
        self.failing_sign_ins.lock().unwrap().insert(call, err);
    }

    pub fn set_sign_in_delay(&self, delay: Duration) {
        *self.sign_in_delay.lock().unwrap() = Some(delay);
    }

    pub fn provider_calls(&self) -> u32 {
        self.sign_in_calls.load(Ordering::SeqCst) + self.sign_up_calls.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.sign_in_calls.store(0, Ordering::SeqCst);
        self.sign_up_calls.store(0, Ordering::SeqCst);
        self.sign_out_calls.store(0, Ordering::SeqCst);
        self.refresh_calls.store(0, Ordering::SeqCst);
    }

    fn take_scripted(&self, op: Op) -> Option<ProviderError> {
        let mut queue = self.scripted.lock().unwrap();
        let pos = queue.iter().position(|(o, _)| *o == op)?;
        queue.remove(pos).map(|(_, e)| e)
    }

    fn signed_in(&self, email: &str, account: &FakeAccount) -> SignedIn {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        SignedIn {
            account: AuthAccount {
                account_id: account.id.clone(),
                email: email.to_string(),
                confirmed: account.confirmed,
            },
            session: Session {
                account_id: account.id.clone(),
                email: email.to_string(),
                access_token: format!("access-{n}"),
                refresh_token: Some(format!("refresh-{n}")),
                expires_at: Some(shared::util::now_secs() + 3600),
                member_number: None,
            },
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, ProviderError> {
        let call = self.sign_in_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let failing = self.failing_sign_ins.lock().unwrap().remove(&call);
        if let Some(err) = failing {
            return Err(err);
        }
        let delay = *self.sign_in_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.take_scripted(Op::SignIn) {
            return Err(err);
        }
        // a missing account looks like a wrong password, as with the real service
        let account = self
            .account(email)
            .ok_or(ProviderError::InvalidCredentials)?;
        if account.password != password {
            return Err(ProviderError::InvalidCredentials);
        }
        if !account.confirmed {
            return Err(ProviderError::NotConfirmed);
        }
        Ok(self.signed_in(email, &account))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _metadata: &SignUpMetadata,
    ) -> Result<SignedUp, ProviderError> {
        self.sign_up_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.take_scripted(Op::SignUp) {
            return Err(err);
        }
        if self.account(email).is_some() {
            return Err(ProviderError::AlreadyExists);
        }
        self.add_account(email, password, self.auto_confirm);
        let account = self
            .account(email)
            .ok_or(ProviderError::Network("vanished".into()))?;
        if self.auto_confirm {
            let signed_in = self.signed_in(email, &account);
            Ok(SignedUp {
                account: signed_in.account,
                session: Some(signed_in.session),
            })
        } else {
            Ok(SignedUp {
                account: AuthAccount {
                    account_id: account.id,
                    email: email.to_string(),
                    confirmed: false,
                },
                session: None,
            })
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<SignedIn, ProviderError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.take_scripted(Op::Refresh) {
            return Err(err);
        }
        if !refresh_token.starts_with("refresh-") {
            return Err(ProviderError::InvalidCredentials);
        }
        let accounts = self.accounts.lock().unwrap().clone();
        let (email, account) = accounts
            .iter()
            .next()
            .ok_or(ProviderError::InvalidCredentials)?;
        Ok(self.signed_in(email, account))
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), ProviderError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ========== Confirmer ==========

pub struct FakeConfirmer {
    provider: Arc<FakeProvider>,
    pub calls: AtomicU32,
    failure: Mutex<Option<ConfirmError>>,
    /// Report success without confirming anything
    pub noop: Mutex<bool>,
}

impl FakeConfirmer {
    pub fn new(provider: Arc<FakeProvider>) -> Self {
        Self {
            provider,
            calls: AtomicU32::new(0),
            failure: Mutex::new(None),
            noop: Mutex::new(false),
        }
    }

    pub fn fail_with(&self, err: ConfirmError) {
        *self.failure.lock().unwrap() = Some(err);
    }

    pub fn set_noop(&self) {
        *self.noop.lock().unwrap() = true;
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmailConfirmer for FakeConfirmer {
    async fn confirm_email(&self, email: &str) -> Result<(), ConfirmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }
        if *self.noop.lock().unwrap() || self.provider.confirm(email) {
            Ok(())
        } else {
            Err(ConfirmError::NotFound(email.to_string()))
        }
    }
}

// ========== Harness ==========

pub struct Harness {
    pub directory: Arc<FakeDirectory>,
    pub provider: Arc<FakeProvider>,
    pub confirmer: Arc<FakeConfirmer>,
    pub service: LoginService,
}

impl Harness {
    pub fn new(members: Vec<Member>) -> Self {
        Self::build(members, false, config(), SessionHub::new(None))
    }

    pub fn build(
        members: Vec<Member>,
        auto_confirm: bool,
        config: ClientConfig,
        sessions: SessionHub,
    ) -> Self {
        let directory = Arc::new(FakeDirectory::with_members(members));
        let provider = Arc::new(FakeProvider::new(auto_confirm));
        let confirmer = Arc::new(FakeConfirmer::new(provider.clone()));
        let ports = AuthPorts::new(directory.clone(), provider.clone(), confirmer.clone());
        sessions.init();
        let service = LoginService::new(ports, &config, sessions);
        Self {
            directory,
            provider,
            confirmer,
            service,
        }
    }
}
