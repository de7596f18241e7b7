//! A mounted feed together with its data, routes and persisted scroll state.
//!
//! [`FeedSession`] wires the pieces into the list/detail flow: opening an item
//! saves a snapshot and hides the feed without unmounting it, going back shows
//! the feed again and restores the snapshot before the next frame. Loaded
//! pages and measured sizes survive the round trip, so nothing is refetched.

use tracing::{debug, info};

use crate::{
    config::VirtualizerConfig,
    controller::ViewportController,
    error::{ConfigurationError, FeedError, SnapshotError},
    feed::{FeedLoader, FeedStatus, FetchOutcome, FetchTicket, Page, PageSource},
    navigation::{Navigator, Route},
    snapshot::{RestoreOutcome, SessionPersistence, SessionStore},
};

/// Feed state for one mounted list/detail flow.
pub struct FeedSession<T, S> {
    controller: ViewportController,
    loader: FeedLoader<T>,
    navigator: Navigator,
    persistence: SessionPersistence<S>,
    mounted: bool,
}

impl<T, S: SessionStore> FeedSession<T, S> {
    /// Mounts a feed.
    ///
    /// A snapshot left in `persistence` by an earlier mount of the same feed
    /// is applied right away.
    pub fn mount(
        config: VirtualizerConfig,
        page_size: usize,
        persistence: SessionPersistence<S>,
    ) -> Result<Self, ConfigurationError> {
        let mut controller = ViewportController::new(config)?;
        let loader = FeedLoader::new(page_size)?;
        if let RestoreOutcome::Restored { offset } = persistence.restore(&mut controller) {
            info!(%offset, "resuming feed from saved scroll position");
        }
        Ok(Self {
            controller,
            loader,
            navigator: Navigator::new(),
            persistence,
            mounted: true,
        })
    }

    /// The viewport controller.
    pub fn controller(&self) -> &ViewportController {
        &self.controller
    }

    /// Mutable access to the viewport controller, for scroll, resize and
    /// measurement events.
    pub fn controller_mut(&mut self) -> &mut ViewportController {
        &mut self.controller
    }

    /// Page cache.
    pub fn loader(&self) -> &FeedLoader<T> {
        &self.loader
    }

    /// Loading state of the feed.
    pub fn feed_status(&self) -> &FeedStatus {
        self.loader.status()
    }

    /// Route stack.
    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Snapshot persistence.
    pub fn persistence(&self) -> &SessionPersistence<S> {
        &self.persistence
    }

    /// Whether the feed is still mounted.
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Item at `index`, if loaded.
    pub fn item(&self, index: usize) -> Option<&T> {
        self.loader.item(index)
    }

    /// Item shown by the detail route, if one is open.
    pub fn detail_item(&self) -> Option<&T> {
        match self.navigator.current() {
            Route::Detail { index } => self.item(index),
            Route::Feed => None,
        }
    }

    /// Opens the detail view of `index`.
    ///
    /// From the feed this saves a snapshot, detaches the controller and pushes
    /// the detail route. From another detail view only the route changes.
    pub fn open_detail(&mut self, index: usize) -> Result<(), SnapshotError> {
        let route = Route::Detail { index };
        if !self.navigator.is_on_feed() {
            self.navigator.replace(route);
            return Ok(());
        }
        self.persistence.save(&self.controller)?;
        self.controller.detach();
        self.navigator.push(route);
        debug!(index, "detail opened");
        Ok(())
    }

    /// Handles a back signal.
    ///
    /// Returns `None` when already on the feed. Otherwise the feed is shown
    /// again and the saved snapshot has been applied by the time this returns.
    /// If the snapshot has gone missing or is unusable, the feed keeps the
    /// measurements and offset it held while hidden.
    pub fn back(&mut self) -> Option<RestoreOutcome> {
        let closed = self.navigator.pop()?;
        if !self.navigator.is_on_feed() {
            return None;
        }
        self.controller.reattach();
        let outcome = self.persistence.resume(&mut self.controller);
        debug!(?closed, ?outcome, "back to feed");
        Some(outcome)
    }

    /// Starts loading the next page.
    ///
    /// Returns `None` when unmounted, when a page is in flight, or when the
    /// feed is exhausted.
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        if !self.mounted {
            return None;
        }
        let page = self.loader.next_page()?;
        self.loader.begin(page)
    }

    /// Hands a page response to the session and grows the feed on success.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Page<T>, FeedError>,
    ) -> FetchOutcome {
        let outcome = self.loader.complete(ticket, result);
        if let FetchOutcome::Applied { loaded, .. } = outcome {
            self.controller.set_item_count(loaded);
        }
        outcome
    }

    /// Loads the next page from `source`.
    pub async fn fetch_next<P>(&mut self, source: &P) -> Option<FetchOutcome>
    where
        P: PageSource<Item = T>,
    {
        let ticket = self.begin_fetch()?;
        let result = source.fetch_page(ticket.page(), ticket.page_size()).await;
        Some(self.complete_fetch(ticket, result))
    }

    /// Unmounts the feed. Responses to fetches still in flight are discarded.
    pub fn unmount(&mut self) {
        if self.mounted {
            self.mounted = false;
            self.loader.cancel();
            self.controller.detach();
            debug!("feed unmounted");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, sync::Arc, time::Duration};

    use super::*;
    use crate::{
        controller::ViewportPhase,
        observer::HeadlessObserver,
        px::Px,
        snapshot::{DEFAULT_SNAPSHOT_KEY, MemorySessionStore},
    };

    struct Posts {
        total: usize,
        calls: Cell<usize>,
    }

    impl Posts {
        fn new(total: usize) -> Self {
            Self {
                total,
                calls: Cell::new(0),
            }
        }
    }

    impl PageSource for Posts {
        type Item = String;

        async fn fetch_page(&self, page: usize, page_size: usize) -> Result<Page<String>, FeedError> {
            self.calls.set(self.calls.get() + 1);
            tokio::time::sleep(Duration::from_millis(2)).await;
            let start = page * page_size;
            let end = (start + page_size).min(self.total);
            Ok(Page {
                items: (start..end).map(|index| format!("post #{index}")).collect(),
                total: self.total,
            })
        }
    }

    fn session(store: Arc<MemorySessionStore>) -> FeedSession<String, Arc<MemorySessionStore>> {
        match FeedSession::mount(VirtualizerConfig::default(), 50, SessionPersistence::new(store)) {
            Ok(session) => session,
            Err(err) => panic!("mount failed: {err}"),
        }
    }

    fn measure_materialized(session: &mut FeedSession<String, Arc<MemorySessionStore>>) {
        let controller = session.controller_mut();
        for index in controller.range().indices() {
            let size = Px(150 + (index % 4) as i32 * 70);
            let _ = controller.report_measurement(index, size);
        }
        controller.refresh();
    }

    #[tokio::test]
    async fn back_restores_offset_without_refetch() {
        let store = Arc::new(MemorySessionStore::new());
        let source = Posts::new(1000);
        let mut session = session(Arc::clone(&store));
        session.controller_mut().set_viewport_size(Px(800));

        for _ in 0..4 {
            let outcome = session.fetch_next(&source).await;
            assert!(matches!(outcome, Some(FetchOutcome::Applied { .. })));
        }
        assert_eq!(session.controller().item_count(), 200);
        measure_materialized(&mut session);
        session.controller_mut().on_scroll(Px(9000));
        measure_materialized(&mut session);
        let before = session.controller_mut().range();
        let measured = session.controller().measurements().cache();

        let Some(index) = before.visible.clone().next() else {
            panic!("nothing visible");
        };
        if let Err(err) = session.open_detail(index) {
            panic!("open_detail failed: {err}");
        }
        assert!(store.get(DEFAULT_SNAPSHOT_KEY).is_some());
        assert!(!session.controller().is_attached());
        assert_eq!(session.detail_item(), Some(&format!("post #{index}")));

        // The detail view scrolls the shared container back to the top.
        session.controller_mut().on_scroll(Px(0));

        assert_eq!(
            session.back(),
            Some(RestoreOutcome::Restored { offset: Px(9000) })
        );
        assert!(session.controller().is_attached());
        assert_eq!(session.controller().scroll_offset(), Px(9000));
        assert_eq!(session.controller().measurements().cache(), measured);
        assert_eq!(session.controller_mut().range(), before);
        assert_eq!(source.calls.get(), 4);
        assert_eq!(session.navigator().current(), Route::Feed);
        assert_eq!(session.back(), None);
    }

    #[tokio::test]
    async fn late_page_after_unmount_is_discarded() {
        let source = Posts::new(1000);
        let mut session = session(Arc::new(MemorySessionStore::new()));

        let Some(ticket) = session.begin_fetch() else {
            panic!("fetch refused");
        };
        session.unmount();
        let response = source.fetch_page(ticket.page(), ticket.page_size()).await;

        assert_eq!(session.complete_fetch(ticket, response), FetchOutcome::Discarded);
        assert_eq!(session.controller().item_count(), 0);
        assert!(session.loader().items().next().is_none());
        assert_eq!(session.begin_fetch(), None);
        assert_eq!(session.fetch_next(&source).await, None);
    }

    #[tokio::test]
    async fn failed_page_is_a_distinct_state() {
        struct Offline;

        impl PageSource for Offline {
            type Item = String;

            async fn fetch_page(&self, page: usize, _: usize) -> Result<Page<String>, FeedError> {
                Err(FeedError::Source {
                    page,
                    message: "offline".into(),
                })
            }
        }

        let mut session = session(Arc::new(MemorySessionStore::new()));
        let outcome = session.fetch_next(&Offline).await;
        assert!(matches!(outcome, Some(FetchOutcome::Failed(_))));
        assert!(matches!(session.feed_status(), FeedStatus::Failed(_)));
        assert_eq!(session.controller().item_count(), 0);
    }

    #[tokio::test]
    async fn back_without_snapshot_keeps_live_feed() {
        let store = Arc::new(MemorySessionStore::new());
        let source = Posts::new(1000);
        let mut session = session(Arc::clone(&store));
        session.controller_mut().set_viewport_size(Px(800));
        for _ in 0..4 {
            let _ = session.fetch_next(&source).await;
        }
        session.controller_mut().on_scroll(Px(3000));
        measure_materialized(&mut session);
        let measured = session.controller().measurements().cache();
        assert!(!measured.entries.is_empty());

        if let Err(err) = session.open_detail(12) {
            panic!("open_detail failed: {err}");
        }
        store.remove(DEFAULT_SNAPSHOT_KEY);
        assert_eq!(session.back(), Some(RestoreOutcome::Missing));
        assert_eq!(session.controller().scroll_offset(), Px(3000));
        assert_eq!(session.controller().measurements().cache(), measured);

        if let Err(err) = session.open_detail(12) {
            panic!("open_detail failed: {err}");
        }
        store.set(DEFAULT_SNAPSHOT_KEY, b"not json".to_vec());
        assert_eq!(session.back(), Some(RestoreOutcome::Discarded));
        assert_eq!(session.controller().scroll_offset(), Px(3000));
        assert_eq!(session.controller().measurements().cache(), measured);
    }

    #[tokio::test]
    async fn page_landing_during_detail_is_measured_after_back() {
        let source = Posts::new(1000);
        let mut session = session(Arc::new(MemorySessionStore::new()));
        session.controller_mut().set_viewport_size(Px(800));
        session
            .controller_mut()
            .set_observer(Box::new(HeadlessObserver::new(|index| {
                Px(150 + (index % 4) as i32 * 70)
            })));
        let _ = session.fetch_next(&source).await;
        session.controller_mut().on_scroll(Px(5000));
        assert!(session.controller_mut().settle());

        if let Err(err) = session.open_detail(20) {
            panic!("open_detail failed: {err}");
        }
        let outcome = session.fetch_next(&source).await;
        assert!(matches!(outcome, Some(FetchOutcome::Applied { loaded: 100, .. })));
        let _ = session.controller_mut().range();

        assert!(matches!(session.back(), Some(RestoreOutcome::Restored { .. })));
        assert!(session.controller_mut().settle());
        let range = session.controller_mut().range();
        assert!(range.materialized.end > 50);
        assert!(
            range
                .indices()
                .all(|index| session.controller().measurements().is_measured(index))
        );
    }

    #[test]
    fn remount_resumes_from_saved_snapshot() {
        let store = Arc::new(MemorySessionStore::new());
        {
            let mut first = session(Arc::clone(&store));
            first.controller_mut().set_item_count(100);
            first.controller_mut().set_viewport_size(Px(800));
            first.controller_mut().on_scroll(Px(2400));
            if let Err(err) = first.open_detail(10) {
                panic!("open_detail failed: {err}");
            }
            first.unmount();
        }

        let mut second = session(Arc::clone(&store));
        assert_eq!(second.controller().scroll_offset(), Px(2400));
        assert_eq!(second.controller().phase(), ViewportPhase::Uninitialized);
        assert!(second.is_mounted());
        assert_eq!(second.back(), None);
    }

    #[test]
    fn opening_another_detail_replaces_route() {
        let mut session = session(Arc::new(MemorySessionStore::new()));
        session.controller_mut().set_item_count(10);
        for index in [1, 2] {
            if let Err(err) = session.open_detail(index) {
                panic!("open_detail failed: {err}");
            }
        }
        assert_eq!(session.navigator().len(), 2);
        assert_eq!(session.navigator().current(), Route::Detail { index: 2 });
        assert!(matches!(session.back(), Some(RestoreOutcome::Restored { .. })));
    }
}
