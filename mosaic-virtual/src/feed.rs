//! Paged loading of feed items.
//!
//! [`FeedLoader`] keeps the pages fetched so far and hands out a
//! [`FetchTicket`] for every request. A ticket remembers the loader's
//! generation when it was issued; [`FeedLoader::cancel`] bumps the generation,
//! so a response that arrives after the feed was unmounted is discarded
//! instead of being applied.

use std::{collections::BTreeMap, future::Future};

use tracing::{debug, warn};

use crate::error::{ConfigurationError, FeedError};

/// One page of items returned by a [`PageSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items of the page, in feed order.
    pub items: Vec<T>,
    /// Total number of items in the feed.
    pub total: usize,
}

/// Asynchronous provider of feed pages.
pub trait PageSource {
    /// Item type.
    type Item;

    /// Fetches page `page` (zero-based) of `page_size` items.
    fn fetch_page(
        &self,
        page: usize,
        page_size: usize,
    ) -> impl Future<Output = Result<Page<Self::Item>, FeedError>>;
}

/// Handle for one outstanding page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    page: usize,
    page_size: usize,
    generation: u64,
}

impl FetchTicket {
    /// Requested page.
    pub fn page(&self) -> usize {
        self.page
    }

    /// Requested page size.
    pub fn page_size(&self) -> usize {
        self.page_size
    }
}

/// Loading state of a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedStatus {
    /// Nothing requested yet.
    Idle,
    /// A page is in flight.
    Loading {
        /// Requested page.
        page: usize,
    },
    /// The last request succeeded.
    Ready,
    /// The last request failed.
    Failed(FeedError),
}

/// Result of handing a response to [`FeedLoader::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page was stored.
    Applied {
        /// Stored page.
        page: usize,
        /// Items now available without gaps from index 0.
        loaded: usize,
    },
    /// The ticket was cancelled; nothing changed.
    Discarded,
    /// The source failed.
    Failed(FeedError),
}

/// Page cache of one feed.
#[derive(Debug)]
pub struct FeedLoader<T> {
    page_size: usize,
    pages: BTreeMap<usize, Vec<T>>,
    total: Option<usize>,
    generation: u64,
    in_flight: Option<FetchTicket>,
    status: FeedStatus,
}

impl<T> FeedLoader<T> {
    /// Creates a loader requesting `page_size` items at a time.
    pub fn new(page_size: usize) -> Result<Self, ConfigurationError> {
        if page_size == 0 {
            return Err(ConfigurationError::EmptyPageSize);
        }
        Ok(Self {
            page_size,
            pages: BTreeMap::new(),
            total: None,
            generation: 0,
            in_flight: None,
            status: FeedStatus::Idle,
        })
    }

    /// Items per page.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Total item count reported by the source, once known.
    pub fn total(&self) -> Option<usize> {
        self.total
    }

    /// Current loading state.
    pub fn status(&self) -> &FeedStatus {
        &self.status
    }

    /// Whether a request is outstanding.
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether every item has been loaded.
    pub fn is_exhausted(&self) -> bool {
        self.total.is_some_and(|total| self.loaded_len() >= total)
    }

    /// Number of items available without gaps from index 0.
    pub fn loaded_len(&self) -> usize {
        self.contiguous().map(Vec::len).sum()
    }

    /// First page not loaded yet, unless the feed is exhausted.
    pub fn next_page(&self) -> Option<usize> {
        if self.is_exhausted() {
            return None;
        }
        let loaded = self.contiguous().count();
        // A short page means the source ran out.
        if self.contiguous().last().is_some_and(|page| page.len() < self.page_size) {
            return None;
        }
        Some(loaded)
    }

    /// Item at `index`, if its page is loaded.
    pub fn item(&self, index: usize) -> Option<&T> {
        self.pages
            .get(&(index / self.page_size))?
            .get(index % self.page_size)
    }

    /// Loaded items in feed order, up to the first missing page.
    pub fn items(&self) -> impl Iterator<Item = &T> + '_ {
        self.contiguous().flatten()
    }

    /// Starts a request for `page`.
    ///
    /// Returns `None` while another request is outstanding, or when the page
    /// is already loaded or lies past the end of the feed.
    pub fn begin(&mut self, page: usize) -> Option<FetchTicket> {
        if self.in_flight.is_some() || self.pages.contains_key(&page) {
            return None;
        }
        if self
            .total
            .is_some_and(|total| page.saturating_mul(self.page_size) >= total)
        {
            return None;
        }
        let ticket = FetchTicket {
            page,
            page_size: self.page_size,
            generation: self.generation,
        };
        debug!(page, "fetching feed page");
        self.in_flight = Some(ticket);
        self.status = FeedStatus::Loading { page };
        Some(ticket)
    }

    /// Hands the response for `ticket` to the loader.
    pub fn complete(
        &mut self,
        ticket: FetchTicket,
        result: Result<Page<T>, FeedError>,
    ) -> FetchOutcome {
        if ticket.generation != self.generation {
            debug!(page = ticket.page, "discarding response of cancelled fetch");
            return FetchOutcome::Discarded;
        }
        if self.in_flight == Some(ticket) {
            self.in_flight = None;
        }

        let page = match result.and_then(|page| self.check(ticket, page)) {
            Ok(page) => page,
            Err(err) => {
                warn!("feed page {} failed: {err}", ticket.page);
                self.status = FeedStatus::Failed(err.clone());
                return FetchOutcome::Failed(err);
            }
        };

        self.total = Some(page.total);
        self.pages.insert(ticket.page, page.items);
        self.status = FeedStatus::Ready;
        let loaded = self.loaded_len();
        debug!(page = ticket.page, loaded, total = page.total, "feed page stored");
        FetchOutcome::Applied {
            page: ticket.page,
            loaded,
        }
    }

    /// Invalidates every outstanding ticket.
    pub fn cancel(&mut self) {
        self.generation += 1;
        if let Some(ticket) = self.in_flight.take() {
            debug!(page = ticket.page, "feed fetch cancelled");
            self.status = if self.pages.is_empty() {
                FeedStatus::Idle
            } else {
                FeedStatus::Ready
            };
        }
    }

    /// Requests `page` from `source` and stores the response.
    ///
    /// Returns `None` when [`Self::begin`] refused the request.
    pub async fn fetch<S>(&mut self, source: &S, page: usize) -> Option<FetchOutcome>
    where
        S: PageSource<Item = T>,
    {
        let ticket = self.begin(page)?;
        let result = source.fetch_page(ticket.page, ticket.page_size).await;
        Some(self.complete(ticket, result))
    }

    fn check(&self, ticket: FetchTicket, page: Page<T>) -> Result<Page<T>, FeedError> {
        if page.items.len() > ticket.page_size
            || (!page.items.is_empty() && ticket.page.saturating_mul(ticket.page_size) >= page.total)
        {
            return Err(FeedError::OutOfRange {
                page: ticket.page,
                total: page.total,
            });
        }
        Ok(page)
    }

    fn contiguous(&self) -> impl Iterator<Item = &Vec<T>> + '_ {
        let mut expected = 0;
        self.pages
            .iter()
            .take_while(move |(page, _)| {
                let contiguous = **page == expected;
                expected += 1;
                contiguous
            })
            .map(|(_, items)| items)
    }
}
