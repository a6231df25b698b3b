//! The three backends a login flow talks to

use std::sync::Arc;

use crate::confirm::{EmailConfirmer, FunctionEmailConfirmer};
use crate::directory::{MemberDirectory, RestMemberDirectory};
use crate::http::RestClient;
use crate::identity::{GoTrueProvider, IdentityProvider};
use crate::{ClientConfig, ClientResult};

#[derive(Clone)]
pub struct AuthPorts {
    pub directory: Arc<dyn MemberDirectory>,
    pub provider: Arc<dyn IdentityProvider>,
    pub confirmer: Arc<dyn EmailConfirmer>,
}

impl AuthPorts {
    pub fn new(
        directory: Arc<dyn MemberDirectory>,
        provider: Arc<dyn IdentityProvider>,
        confirmer: Arc<dyn EmailConfirmer>,
    ) -> Self {
        Self {
            directory,
            provider,
            confirmer,
        }
    }

    /// REST implementations sharing one connection pool
    pub fn rest(config: &ClientConfig) -> ClientResult<Self> {
        let rest = RestClient::new(config)?;
        Ok(Self::new(
            Arc::new(RestMemberDirectory::with_client(rest.clone())),
            Arc::new(GoTrueProvider::with_client(rest.clone())),
            Arc::new(FunctionEmailConfirmer::with_client(
                rest,
                &config.confirm_function,
            )),
        ))
    }
}
