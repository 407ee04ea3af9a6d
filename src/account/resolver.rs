//! Active account resolution.
//!
//! The resolver owns the last fetched account list and decides which account
//! is active for one session:
//!
//! 1. a refresh fetches the identity's accounts (newest first);
//! 2. a failed fetch settles in [`ResolutionState::Error`];
//! 3. no accounts settles in [`ResolutionState::Empty`] and clears the
//!    persisted selection;
//! 4. a persisted selection that is still in the list wins;
//! 5. otherwise the newest account wins and is persisted.
//!
//! Every refresh takes a generation number. Only the completion carrying the
//! latest generation may change state; older completions are dropped.
//!
//! Change events fire when the active account id differs from the last one
//! this resolver settled on. A failed fetch in between does not count as a
//! change, so a retry landing on the same account stays quiet.
//!
//! [`ActiveAccountResolver::on_selection_changed_elsewhere`] is the hook for a
//! storage-change notification from another tab or window sharing the same
//! session storage. It only re-resolves; delivery of that notification is up
//! to whoever owns the storage and is best-effort.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use super::{
    broadcast::{AccountChanged, ChangeBroadcaster, Subscription},
    model::{Identity, TradingAccount},
    repo::AccountSource,
    selection::SelectionStore,
};
use crate::error::{FetchFailure, ResolveError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionState {
    Uninitialized,
    Loading,
    Resolved(TradingAccount),
    Empty,
    Error,
}

impl ResolutionState {
    pub fn account(&self) -> Option<&TradingAccount> {
        match self {
            ResolutionState::Resolved(account) => Some(account),
            _ => None,
        }
    }
}

/// State and account list read under one lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub state: ResolutionState,
    pub accounts: Vec<TradingAccount>,
}

#[derive(Debug)]
pub struct RefreshTicket {
    generation: u64,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied(ResolutionState),
    Stale,
}

struct Inner {
    // last completed resolution, never Loading
    settled: ResolutionState,
    accounts: Vec<TradingAccount>,
    // survives Error so a retry on the same account is not a change
    last_resolved: Option<String>,
    generation: u64,
    in_flight: bool,
}

pub struct ActiveAccountResolver {
    identity: Identity,
    source: Arc<dyn AccountSource>,
    selection: Arc<dyn SelectionStore>,
    broadcaster: ChangeBroadcaster,
    inner: Mutex<Inner>,
}

impl ActiveAccountResolver {
    pub fn new(
        identity: Identity,
        source: Arc<dyn AccountSource>,
        selection: Arc<dyn SelectionStore>,
    ) -> Self {
        Self {
            identity,
            source,
            selection,
            broadcaster: ChangeBroadcaster::new(),
            inner: Mutex::new(Inner {
                settled: ResolutionState::Uninitialized,
                accounts: Vec::new(),
                last_resolved: None,
                generation: 0,
                in_flight: false,
            }),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The state consumers should render. While a refresh is running the
    /// previously settled value stays visible; `Loading` only shows up when
    /// nothing has settled yet.
    pub fn state(&self) -> ResolutionState {
        Self::visible(&self.lock())
    }

    pub fn snapshot(&self) -> Snapshot {
        let inner = self.lock();
        Snapshot {
            state: Self::visible(&inner),
            accounts: inner.accounts.clone(),
        }
    }

    fn visible(inner: &Inner) -> ResolutionState {
        match (&inner.settled, inner.in_flight) {
            (ResolutionState::Uninitialized, true) => ResolutionState::Loading,
            (settled, _) => settled.clone(),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().in_flight
    }

    pub fn active_account(&self) -> Option<TradingAccount> {
        self.lock().settled.account().cloned()
    }

    pub fn accounts(&self) -> Vec<TradingAccount> {
        self.lock().accounts.clone()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AccountChanged) + Send + Sync + 'static,
    {
        self.broadcaster.subscribe(listener)
    }

    pub fn broadcaster(&self) -> &ChangeBroadcaster {
        &self.broadcaster
    }

    pub async fn refresh(&self) -> ResolutionState {
        let ticket = self.begin_refresh();
        let fetched = self.source.fetch_accounts(Some(&self.identity)).await;
        match self.complete_refresh(ticket, fetched) {
            RefreshOutcome::Applied(state) => state,
            RefreshOutcome::Stale => self.state(),
        }
    }

    /// Advisory signal that another session wrote the persisted selection.
    pub async fn on_selection_changed_elsewhere(&self) -> ResolutionState {
        debug!(identity = %self.identity.id, "selection changed elsewhere, re-resolving");
        self.refresh().await
    }

    pub fn begin_refresh(&self) -> RefreshTicket {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.in_flight = true;
        RefreshTicket {
            generation: inner.generation,
        }
    }

    pub fn complete_refresh(
        &self,
        ticket: RefreshTicket,
        fetched: Result<Vec<TradingAccount>, FetchFailure>,
    ) -> RefreshOutcome {
        let (state, changed) = {
            let mut inner = self.lock();
            if ticket.generation != inner.generation {
                debug!(
                    identity = %self.identity.id,
                    ticket = ticket.generation,
                    latest = inner.generation,
                    "dropping stale account fetch"
                );
                return RefreshOutcome::Stale;
            }
            inner.in_flight = false;

            let next = match fetched {
                Err(e) => {
                    warn!(identity = %self.identity.id, "account resolution failed: {}", e);
                    ResolutionState::Error
                }
                Ok(accounts) if accounts.is_empty() => {
                    inner.accounts.clear();
                    inner.last_resolved = None;
                    self.selection.clear();
                    ResolutionState::Empty
                }
                Ok(accounts) => {
                    let active = self.pick(&accounts);
                    inner.accounts = accounts;
                    ResolutionState::Resolved(active)
                }
            };
            inner.settled = next.clone();

            let changed = next
                .account()
                .and_then(|account| Self::mark_resolved(&mut inner, account));
            (next, changed)
        };

        if let Some(event) = changed {
            info!(identity = %self.identity.id, account_id = %event.account_identifier, "active account resolved");
            self.broadcaster.publish(&event);
        }
        RefreshOutcome::Applied(state)
    }

    /// Explicit switch against the last fetched list, without refetching.
    pub fn select(&self, account_id: &str) -> Result<TradingAccount, ResolveError> {
        let (account, changed) = {
            let mut inner = self.lock();
            if !matches!(
                inner.settled,
                ResolutionState::Resolved(_) | ResolutionState::Empty
            ) {
                return Err(ResolveError::InvalidSelection(account_id.to_string()));
            }
            let account = inner
                .accounts
                .iter()
                .find(|a| a.account_id == account_id)
                .cloned()
                .ok_or_else(|| ResolveError::InvalidSelection(account_id.to_string()))?;

            inner.settled = ResolutionState::Resolved(account.clone());
            self.selection.write(&account.account_id);
            let changed = Self::mark_resolved(&mut inner, &account);
            (account, changed)
        };

        if let Some(event) = changed {
            info!(identity = %self.identity.id, account_id = %event.account_identifier, "active account switched");
            self.broadcaster.publish(&event);
        }
        Ok(account)
    }

    /// Sign-out: forget everything and invalidate fetches still in flight.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.in_flight = false;
        inner.settled = ResolutionState::Uninitialized;
        inner.accounts.clear();
        inner.last_resolved = None;
        self.selection.clear();
        debug!(identity = %self.identity.id, "resolver cleared");
    }

    fn mark_resolved(inner: &mut Inner, account: &TradingAccount) -> Option<AccountChanged> {
        if inner.last_resolved.as_deref() == Some(account.account_id.as_str()) {
            return None;
        }
        inner.last_resolved = Some(account.account_id.clone());
        Some(AccountChanged {
            account_identifier: account.account_id.clone(),
        })
    }

    fn pick(&self, accounts: &[TradingAccount]) -> TradingAccount {
        let persisted = self.selection.read();
        if let Some(id) = persisted.as_deref() {
            if let Some(account) = accounts.iter().find(|a| a.account_id == id) {
                return account.clone();
            }
            debug!(identity = %self.identity.id, stale = %id, "persisted selection no longer exists");
        }
        let newest = accounts[0].clone();
        self.selection.write(&newest.account_id);
        newest
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
