use std::sync::Arc;

use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::session::{CloseOutcome, SessionRegistry};
use crate::{
    account::{
        resolver::{ActiveAccountResolver, ResolutionState},
        view::{AccountSwitcherView, AccountView, BalanceView, MountedView, TradingIdView},
    },
    auth::{SessionIdentity, SessionSource, resolve_identity},
    constants::{
        BAD_REQUEST, CONFLICT, INTERNAL_ERROR, NO_CONTENT, OK_RESPONSE, SESSION_HEADER,
        SESSION_RECORD_HEADER, UNAUTHORIZED,
    },
    error::ResolveError,
    req::Request,
    utils::{Locale, des_from_str, extract_token, ser_to_str},
};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SelectRequest {
    account_id: String,
}

#[derive(Serialize, Debug)]
struct ErrorBody<'a> {
    error: &'a str,
}

pub struct DashboardService {
    registry: SessionRegistry,
    key: DecodingKey,
    locale: Locale,
    accept_session_records: bool,
}

impl DashboardService {
    pub fn new(registry: SessionRegistry, key: DecodingKey, locale: Locale) -> Self {
        DashboardService {
            registry,
            key,
            locale,
            accept_session_records: false,
        }
    }

    /// Also accept the unsigned session record kept by legacy clients.
    pub fn with_session_records(mut self, accept: bool) -> Self {
        self.accept_session_records = accept;
        self
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub async fn balance(&self, request: &Request) -> (String, String) {
        self.show(request, BalanceView).await
    }

    pub async fn accounts(&self, request: &Request) -> (String, String) {
        self.show(request, AccountSwitcherView).await
    }

    pub async fn trading_id(&self, request: &Request) -> (String, String) {
        self.show(request, TradingIdView).await
    }

    pub async fn refresh(&self, request: &Request) -> (String, String) {
        let resolver = match self.session(request) {
            Ok(resolver) => resolver,
            Err(response) => return response,
        };
        resolver.refresh().await;
        self.render(AccountSwitcherView, resolver)
    }

    pub async fn select(&self, request: &Request) -> (String, String) {
        let resolver = match self.mounted_session(request).await {
            Ok(resolver) => resolver,
            Err(response) => return response,
        };
        let body: SelectRequest = match des_from_str(&request.body) {
            Ok(body) => body,
            Err(_) => return (BAD_REQUEST.to_string(), "invalid body".to_string()),
        };

        match resolver.select(&body.account_id) {
            Ok(_) => self.render(AccountSwitcherView, resolver),
            Err(ResolveError::InvalidSelection(account_id)) => {
                warn!(
                    identity = %resolver.identity().id,
                    account_id = %account_id,
                    "switch to unknown account rejected"
                );
                let body = ser_to_str(&ErrorBody {
                    error: "Account is not available, reload the account list.",
                })
                .unwrap_or_default();
                (CONFLICT.to_string(), body)
            }
        }
    }

    pub fn logout(&self, request: &Request) -> (String, String) {
        let (session, session_id) = match self.authenticate(request) {
            Ok(authenticated) => authenticated,
            Err(response) => return response,
        };
        match self.registry.close(session_id, &session.identity) {
            CloseOutcome::Closed | CloseOutcome::Unknown => (NO_CONTENT.to_string(), "".to_string()),
            CloseOutcome::NotOwner => {
                warn!(
                    session = %session_id,
                    identity = %session.identity.id,
                    "sign-out for another identity's session rejected"
                );
                (UNAUTHORIZED.to_string(), "".to_string())
            }
        }
    }

    async fn show<V: AccountView>(&self, request: &Request, view: V) -> (String, String) {
        match self.mounted_session(request).await {
            Ok(resolver) => self.render(view, resolver),
            Err(response) => response,
        }
    }

    fn render<V: AccountView>(
        &self,
        view: V,
        resolver: Arc<ActiveAccountResolver>,
    ) -> (String, String) {
        let mounted = MountedView::mount(view, resolver, self.locale);
        match ser_to_str(&mounted.render()) {
            Ok(json) => (OK_RESPONSE.to_string(), json),
            Err(e) => {
                error!("serde error: {}", e);
                (INTERNAL_ERROR.to_string(), "".to_string())
            }
        }
    }

    /// Session resolver, resolved once before its first use.
    async fn mounted_session(
        &self,
        request: &Request,
    ) -> Result<Arc<ActiveAccountResolver>, (String, String)> {
        let resolver = self.session(request)?;
        if resolver.state() == ResolutionState::Uninitialized {
            resolver.refresh().await;
        }
        Ok(resolver)
    }

    fn session(&self, request: &Request) -> Result<Arc<ActiveAccountResolver>, (String, String)> {
        let (session, session_id) = self.authenticate(request)?;
        Ok(self
            .registry
            .open(session_id, session.identity, session.expires_at))
    }

    fn authenticate<'r>(
        &self,
        request: &'r Request,
    ) -> Result<(SessionIdentity, &'r str), (String, String)> {
        let token = extract_token(&request.headers);
        let record = request
            .header(SESSION_RECORD_HEADER)
            .filter(|_| self.accept_session_records);
        let source = match (&token, record) {
            (Some(token), _) => SessionSource::Token(token),
            (None, Some(record)) => SessionSource::Record(record),
            (None, None) => {
                info!("Missing Header");
                return Err((UNAUTHORIZED.to_string(), "".to_string()));
            }
        };
        let Some(session_id) = request.header(SESSION_HEADER) else {
            return Err((BAD_REQUEST.to_string(), "missing session".to_string()));
        };
        let session = resolve_identity(source, &self.key).map_err(|e| {
            info!("Verification failed: {:?}", e);
            (UNAUTHORIZED.to_string(), "".to_string())
        })?;
        Ok((session, session_id))
    }
}
