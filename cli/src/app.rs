//! Presentation state and the handlers that drive it.
//!
//! State moves `Disconnected` -> `Uninitialized` -> `Ready` and never back:
//! once a wallet is connected the session is kept for the rest of the run.
//! Remote failures are caught here, logged, and never escape to the caller;
//! the rendered view is derived purely from what has been fetched.

use anchor_client::solana_sdk::pubkey::Pubkey;
use tracing::{debug, error, info, warn};

use crate::portal::{FetchError, GifItem, PortalOps};
use crate::view::View;

/// Monotonically increasing fetch tokens. Completions may only be applied
/// while their token is still the most recently dispatched one, so a slow
/// fetch can never overwrite the result of a newer one.
#[derive(Debug, Default)]
pub struct FetchTracker {
    dispatched: u64,
}

impl FetchTracker {
    pub fn begin(&mut self) -> u64 {
        self.dispatched += 1;
        self.dispatched
    }

    pub fn is_current(&self, token: u64) -> bool {
        token == self.dispatched
    }
}

pub struct App<P> {
    portal: Option<P>,
    wallet: Option<Pubkey>,
    provider_detected: bool,
    /// `None` is the sentinel for "base account not initialized"; an empty
    /// list is a real, fetched state.
    list: Option<Vec<GifItem>>,
    fetches: FetchTracker,
}

impl<P: PortalOps> App<P> {
    pub fn new(provider_detected: bool) -> Self {
        Self {
            portal: None,
            wallet: None,
            provider_detected,
            list: None,
            fetches: FetchTracker::default(),
        }
    }

    /// Disconnected -> connected. Performs the initial fetch so the grid is
    /// never rendered before a successful read.
    pub async fn connect(&mut self, address: Pubkey, portal: P) {
        info!(%address, "fetching ambigram list");
        self.wallet = Some(address);
        self.portal = Some(portal);
        self.list = None;
        self.refresh().await;
    }

    pub fn is_connected(&self) -> bool {
        self.wallet.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.list.is_some()
    }

    /// One-time base account creation. Requires a connected wallet and an
    /// uninitialized account; success is followed by a full re-fetch.
    pub async fn initialize(&mut self) {
        let Some(portal) = self.portal.as_ref() else {
            warn!("initialize requested without a connected wallet");
            return;
        };
        if self.list.is_some() {
            info!("base account already initialized");
            return;
        }
        match portal.initialize_account().await {
            Ok(()) => self.refresh().await,
            Err(err) => error!(%err, "error creating base account"),
        }
    }

    /// Submit one request. Empty input is rejected locally without touching
    /// the network; a remote failure is logged and leaves state unchanged.
    pub async fn submit(&mut self, text: &str) {
        if text.is_empty() {
            warn!("no ambigram request given");
            return;
        }
        let Some(portal) = self.portal.as_ref() else {
            warn!("submit requested without a connected wallet");
            return;
        };
        match portal.submit_request(text).await {
            Ok(()) => self.refresh().await,
            Err(err) => error!(%err, "error sending ambigram request"),
        }
    }

    /// Re-fetch the whole list. A fetch that is no longer the most recently
    /// dispatched one is discarded instead of applied. Failures collapse to
    /// the null sentinel; a missing account and an RPC failure are logged
    /// apart but render the same.
    pub async fn refresh(&mut self) {
        let Some(portal) = self.portal.as_ref() else {
            return;
        };
        let token = self.fetches.begin();
        let result = portal.fetch_list().await;
        if !self.fetches.is_current(token) {
            debug!(token, "discarding stale fetch result");
            return;
        }
        match result {
            Ok(list) => self.list = Some(list),
            Err(FetchError::Missing) => {
                debug!("base account not found; one-time initialization needed");
                self.list = None;
            }
            Err(FetchError::Rpc(err)) => {
                error!(%err, "error fetching ambigram list");
                self.list = None;
            }
        }
    }

    pub fn view(&self) -> View<'_> {
        match (&self.wallet, &self.list) {
            (None, _) => View::Disconnected { provider_detected: self.provider_detected },
            (Some(_), None) => View::Uninitialized,
            (Some(_), Some(list)) => View::Ready(list),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_client::ClientError;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MockPortal(Arc<MockState>);

    #[derive(Default)]
    struct MockState {
        calls: Mutex<Vec<String>>,
        list: Mutex<Option<Vec<GifItem>>>,
        fail_submit: AtomicBool,
        rpc_down: AtomicBool,
    }

    impl MockPortal {
        fn with_list(links: &[&str]) -> Self {
            let mock = Self::default();
            *mock.0.list.lock().unwrap() = Some(
                links
                    .iter()
                    .map(|link| GifItem { link: link.to_string(), submitted_by: Pubkey::default() })
                    .collect(),
            );
            mock
        }

        fn calls(&self) -> Vec<String> {
            self.0.calls.lock().unwrap().clone()
        }

        fn clear_calls(&self) {
            self.0.calls.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl PortalOps for MockPortal {
        async fn initialize_account(&self) -> anyhow::Result<()> {
            self.0.calls.lock().unwrap().push("initialize".to_string());
            *self.0.list.lock().unwrap() = Some(Vec::new());
            Ok(())
        }

        async fn submit_request(&self, text: &str) -> anyhow::Result<()> {
            self.0.calls.lock().unwrap().push(format!("submit:{text}"));
            if self.0.fail_submit.load(Ordering::SeqCst) {
                return Err(anyhow!("transaction rejected"));
            }
            let mut list = self.0.list.lock().unwrap();
            list.get_or_insert_with(Vec::new).push(GifItem {
                link: text.to_string(),
                submitted_by: Pubkey::default(),
            });
            Ok(())
        }

        async fn fetch_list(&self) -> Result<Vec<GifItem>, FetchError> {
            self.0.calls.lock().unwrap().push("fetch".to_string());
            if self.0.rpc_down.load(Ordering::SeqCst) {
                return Err(FetchError::Rpc(ClientError::LogParseError("rpc down".to_string())));
            }
            match &*self.0.list.lock().unwrap() {
                Some(list) => Ok(list.clone()),
                None => Err(FetchError::Missing),
            }
        }
    }

    fn address() -> Pubkey {
        Pubkey::new_unique()
    }

    #[tokio::test]
    async fn disconnected_issues_no_remote_calls() {
        let mock = MockPortal::default();
        let mut app: App<MockPortal> = App::new(false);
        app.submit("hello").await;
        app.initialize().await;
        app.refresh().await;
        assert!(mock.calls().is_empty());
        assert!(matches!(app.view(), View::Disconnected { provider_detected: false }));
    }

    #[tokio::test]
    async fn connect_fetches_before_rendering_ready() {
        let mock = MockPortal::with_list(&["a", "b"]);
        let mut app = App::new(true);
        app.connect(address(), mock.clone()).await;
        assert_eq!(mock.calls(), vec!["fetch"]);
        let View::Ready(items) = app.view() else {
            panic!("expected ready view");
        };
        let links: Vec<&str> = items.iter().map(|item| item.link.as_str()).collect();
        assert_eq!(links, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn missing_account_renders_initialize_prompt() {
        let mock = MockPortal::default();
        let mut app = App::new(true);
        app.connect(address(), mock.clone()).await;
        assert_eq!(mock.calls(), vec!["fetch"]);
        assert!(matches!(app.view(), View::Uninitialized));
    }

    #[tokio::test]
    async fn empty_list_still_renders_ready() {
        let mock = MockPortal::with_list(&[]);
        let mut app = App::new(true);
        app.connect(address(), mock.clone()).await;
        let View::Ready(items) = app.view() else {
            panic!("expected ready view");
        };
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn empty_submit_issues_no_remote_calls() {
        let mock = MockPortal::with_list(&[]);
        let mut app = App::new(true);
        app.connect(address(), mock.clone()).await;
        mock.clear_calls();
        app.submit("").await;
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn submit_sends_exact_text_then_refetches_once() {
        let mock = MockPortal::with_list(&[]);
        let mut app = App::new(true);
        app.connect(address(), mock.clone()).await;
        mock.clear_calls();
        app.submit("https://i.example/ambigram.gif").await;
        assert_eq!(mock.calls(), vec!["submit:https://i.example/ambigram.gif", "fetch"]);
        let View::Ready(items) = app.view() else {
            panic!("expected ready view");
        };
        assert_eq!(items[0].link, "https://i.example/ambigram.gif");
    }

    #[tokio::test]
    async fn failed_submit_skips_refetch_and_keeps_state() {
        let mock = MockPortal::with_list(&["kept"]);
        let mut app = App::new(true);
        app.connect(address(), mock.clone()).await;
        mock.clear_calls();
        mock.0.fail_submit.store(true, Ordering::SeqCst);
        app.submit("dropped").await;
        assert_eq!(mock.calls(), vec!["submit:dropped"]);
        let View::Ready(items) = app.view() else {
            panic!("expected ready view");
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "kept");
    }

    #[tokio::test]
    async fn initialize_refetches_before_ready() {
        let mock = MockPortal::default();
        let mut app = App::new(true);
        app.connect(address(), mock.clone()).await;
        mock.clear_calls();
        app.initialize().await;
        assert_eq!(mock.calls(), vec!["initialize", "fetch"]);
        assert!(app.is_ready());
    }

    #[tokio::test]
    async fn initialize_is_a_noop_when_already_ready() {
        let mock = MockPortal::with_list(&[]);
        let mut app = App::new(true);
        app.connect(address(), mock.clone()).await;
        mock.clear_calls();
        app.initialize().await;
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn fetch_rpc_failure_collapses_to_null_sentinel() {
        let mock = MockPortal::with_list(&["old"]);
        let mut app = App::new(true);
        app.connect(address(), mock.clone()).await;
        assert!(app.is_ready());
        mock.0.rpc_down.store(true, Ordering::SeqCst);
        app.refresh().await;
        assert!(!app.is_ready());
        assert!(matches!(app.view(), View::Uninitialized));
    }

    #[test]
    fn stale_fetch_tokens_are_rejected() {
        let mut fetches = FetchTracker::default();
        let first = fetches.begin();
        let second = fetches.begin();
        assert!(!fetches.is_current(first));
        assert!(fetches.is_current(second));
        let third = fetches.begin();
        assert!(!fetches.is_current(second));
        assert!(fetches.is_current(third));
    }
}
