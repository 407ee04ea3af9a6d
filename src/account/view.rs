use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use serde::Serialize;

use super::{
    broadcast::Subscription,
    model::{AccountStatus, TradingAccount},
    resolver::{ActiveAccountResolver, ResolutionState},
};
use crate::{
    constants::{LOAD_ACCOUNTS_FAILED, LOADING, NO_ACCOUNTS},
    utils::{Locale, format_money, format_percent},
};

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Rendered<T> {
    Loading { message: &'static str },
    Empty { message: &'static str },
    Error { message: &'static str, retry: bool },
    Ready { data: T },
}

/// A widget drawn from the active account.
pub trait AccountView: Send + Sync {
    type Output: Serialize;

    fn render_account(
        &self,
        active: &TradingAccount,
        accounts: &[TradingAccount],
        locale: Locale,
    ) -> Self::Output;
}

/// A view bound to one resolver for as long as it is mounted.
pub struct MountedView<V: AccountView> {
    view: V,
    resolver: Arc<ActiveAccountResolver>,
    locale: Locale,
    dirty: Arc<AtomicBool>,
    last_change: Arc<Mutex<Option<String>>>,
    _subscription: Subscription,
}

impl<V: AccountView> MountedView<V> {
    pub fn mount(view: V, resolver: Arc<ActiveAccountResolver>, locale: Locale) -> Self {
        let dirty = Arc::new(AtomicBool::new(true));
        let last_change = Arc::new(Mutex::new(
            resolver.active_account().map(|a| a.account_id),
        ));
        let subscription = {
            let dirty = Arc::clone(&dirty);
            let last_change = Arc::clone(&last_change);
            resolver.subscribe(move |event| {
                *last_change.lock().unwrap_or_else(|e| e.into_inner()) =
                    Some(event.account_identifier.clone());
                dirty.store(true, Ordering::Release);
            })
        };
        Self {
            view,
            resolver,
            locale,
            dirty,
            last_change,
            _subscription: subscription,
        }
    }

    /// True when the active account changed since the last render.
    pub fn needs_render(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn last_change(&self) -> Option<String> {
        self.last_change
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn render(&self) -> Rendered<V::Output> {
        self.dirty.store(false, Ordering::Release);
        let snapshot = self.resolver.snapshot();
        match snapshot.state {
            ResolutionState::Uninitialized | ResolutionState::Loading => {
                Rendered::Loading { message: LOADING }
            }
            ResolutionState::Empty => Rendered::Empty {
                message: NO_ACCOUNTS,
            },
            ResolutionState::Error => Rendered::Error {
                message: LOAD_ACCOUNTS_FAILED,
                retry: true,
            },
            ResolutionState::Resolved(active) => Rendered::Ready {
                data: self
                    .view
                    .render_account(&active, &snapshot.accounts, self.locale),
            },
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSummary {
    pub account_id: String,
    pub account_type: String,
    pub is_demo: bool,
    pub currency: String,
    pub balance: String,
    pub equity: String,
    pub margin: String,
    pub free_margin: String,
    pub margin_level: Option<String>,
    pub leverage: String,
}

pub struct BalanceView;

impl AccountView for BalanceView {
    type Output = BalanceSummary;

    fn render_account(
        &self,
        active: &TradingAccount,
        _accounts: &[TradingAccount],
        locale: Locale,
    ) -> BalanceSummary {
        let money = |amount| format_money(amount, &active.currency, locale);
        let margin_level = (active.margin > 0)
            .then(|| format_percent(active.equity as f64 / active.margin as f64 * 100.0, locale));
        BalanceSummary {
            account_id: active.account_id.clone(),
            account_type: active.account_type.to_string(),
            is_demo: active.account_type.is_demo(),
            currency: active.currency.clone(),
            balance: money(active.balance),
            equity: money(active.equity),
            margin: money(active.margin),
            free_margin: money(active.free_margin),
            margin_level,
            leverage: format!("1:{}", active.leverage),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TradingId {
    pub trading_id: String,
    pub account_type: String,
}

pub struct TradingIdView;

impl AccountView for TradingIdView {
    type Output = TradingId;

    fn render_account(&self, active: &TradingAccount, _: &[TradingAccount], _: Locale) -> TradingId {
        TradingId {
            trading_id: active.account_id.clone(),
            account_type: active.account_type.to_string(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SwitcherEntry {
    pub account_id: String,
    pub label: String,
    pub balance: String,
    pub status: AccountStatus,
    pub active: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountSwitcher {
    pub active_account_id: String,
    pub accounts: Vec<SwitcherEntry>,
}

pub struct AccountSwitcherView;

impl AccountView for AccountSwitcherView {
    type Output = AccountSwitcher;

    fn render_account(
        &self,
        active: &TradingAccount,
        accounts: &[TradingAccount],
        locale: Locale,
    ) -> AccountSwitcher {
        AccountSwitcher {
            active_account_id: active.account_id.clone(),
            accounts: accounts
                .iter()
                .map(|account| SwitcherEntry {
                    account_id: account.account_id.clone(),
                    label: format!("{} · {}", account.account_type, account.account_id),
                    balance: format_money(account.balance, &account.currency, locale),
                    status: account.status,
                    active: account.account_id == active.account_id,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{
        account::{
            model::{AccountType, Identity},
            repo::AccountSource,
            selection::{PersistedSelection, SessionStorage},
        },
        error::FetchFailure,
    };

    struct FixedSource(Mutex<Option<Result<Vec<TradingAccount>, FetchFailure>>>);

    #[async_trait]
    impl AccountSource for FixedSource {
        async fn fetch_accounts(
            &self,
            _identity: Option<&Identity>,
        ) -> Result<Vec<TradingAccount>, FetchFailure> {
            self.0.lock().unwrap().take().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn account(id: &str, account_type: AccountType, balance: i64) -> TradingAccount {
        TradingAccount {
            account_id: id.to_string(),
            user_id: "u1".to_string(),
            balance,
            currency: "USD".to_string(),
            equity: balance + 2_550,
            margin: 50_000,
            free_margin: balance - 47_450,
            leverage: 200,
            status: AccountStatus::Active,
            account_type,
            created_at: Utc.timestamp_opt(0, 0).unwrap(),
            watchlist: None,
        }
    }

    fn resolver(fetched: Result<Vec<TradingAccount>, FetchFailure>) -> Arc<ActiveAccountResolver> {
        Arc::new(ActiveAccountResolver::new(
            Identity::new("u1", None),
            Arc::new(FixedSource(Mutex::new(Some(fetched)))),
            Arc::new(PersistedSelection::new(SessionStorage::new())),
        ))
    }

    #[tokio::test]
    async fn balance_view_formats_money() {
        let resolver = resolver(Ok(vec![account("acc-3", AccountType::Premium, 1_234_567)]));
        let view = MountedView::mount(BalanceView, Arc::clone(&resolver), Locale::EnUs);
        assert_eq!(view.render(), Rendered::Loading { message: LOADING });

        resolver.refresh().await;

        let Rendered::Ready { data } = view.render() else {
            panic!("balance view not ready");
        };
        assert_eq!(data.balance, "$12,345.67");
        assert_eq!(data.equity, "$12,371.17");
        assert_eq!(data.margin_level.as_deref(), Some("2,474.23%"));
        assert_eq!(data.leverage, "1:200");
        assert!(!data.is_demo);
    }

    #[tokio::test]
    async fn switcher_marks_active_and_tracks_switches() {
        let resolver = resolver(Ok(vec![
            account("acc-3", AccountType::Standard, 100_000),
            account("acc-1", AccountType::Demo, 5_000_000),
        ]));
        let view = MountedView::mount(AccountSwitcherView, Arc::clone(&resolver), Locale::DeDe);
        resolver.refresh().await;
        view.render();
        assert!(!view.needs_render());

        resolver.select("acc-1").unwrap();

        assert!(view.needs_render());
        assert_eq!(view.last_change().as_deref(), Some("acc-1"));
        let Rendered::Ready { data } = view.render() else {
            panic!("switcher not ready");
        };
        assert_eq!(data.active_account_id, "acc-1");
        let flags: Vec<bool> = data.accounts.iter().map(|e| e.active).collect();
        assert_eq!(flags, vec![false, true]);
        assert_eq!(data.accounts[1].label, "Demo · acc-1");
        assert_eq!(data.accounts[1].balance, "50.000,00\u{a0}$");
    }

    #[tokio::test]
    async fn non_resolved_states_render_messages() {
        let empty = resolver(Ok(Vec::new()));
        empty.refresh().await;
        let view = MountedView::mount(TradingIdView, empty, Locale::EnUs);
        assert_eq!(view.render(), Rendered::Empty { message: NO_ACCOUNTS });

        let failing = resolver(Err(FetchFailure::DBQueryError(sqlx::Error::PoolTimedOut)));
        failing.refresh().await;
        let view = MountedView::mount(TradingIdView, failing, Locale::EnUs);
        assert_eq!(
            view.render(),
            Rendered::Error {
                message: LOAD_ACCOUNTS_FAILED,
                retry: true
            }
        );
    }

    #[test]
    fn rendered_is_tagged_json() {
        let rendered: Rendered<TradingId> = Rendered::Ready {
            data: TradingId {
                trading_id: "acc-3".to_string(),
                account_type: "VIP".to_string(),
            },
        };
        assert_eq!(
            serde_json::to_string(&rendered).unwrap(),
            r#"{"status":"ready","data":{"tradingId":"acc-3","accountType":"VIP"}}"#
        );
    }
}
