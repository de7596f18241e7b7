//! Stack-based navigation between the feed and item details.
//!
//! The feed is always at the bottom of the stack. Opening an item pushes a
//! detail route on top; going back pops it and reveals the feed again.

/// A screen the user can be on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// The masonry feed.
    Feed,
    /// Detail view of one feed item.
    Detail {
        /// Index of the item in the feed.
        index: usize,
    },
}

/// Route stack rooted at [`Route::Feed`].
#[derive(Debug, Clone)]
pub struct Navigator {
    route_stack: Vec<Route>,
    version: u64,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    /// Creates a navigator showing the feed.
    pub fn new() -> Self {
        Self {
            route_stack: vec![Route::Feed],
            version: 0,
        }
    }

    /// Monotonic routing version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Push a route onto the stack.
    pub fn push(&mut self, route: Route) {
        self.route_stack.push(route);
        self.bump_version();
    }

    /// Pop the top route.
    ///
    /// Returns `None` when only the feed is left; the root is never popped.
    pub fn pop(&mut self) -> Option<Route> {
        if self.route_stack.len() <= 1 {
            return None;
        }
        let removed = self.route_stack.pop()?;
        self.bump_version();
        Some(removed)
    }

    /// Replace the top route, keeping the feed at the root.
    pub fn replace(&mut self, route: Route) -> Option<Route> {
        let previous = self.pop();
        self.push(route);
        previous
    }

    /// Number of routes in the stack, the feed included.
    pub fn len(&self) -> usize {
        self.route_stack.len()
    }

    /// Always false: the feed stays at the root.
    pub fn is_empty(&self) -> bool {
        self.route_stack.is_empty()
    }

    /// Top route.
    pub fn current(&self) -> Route {
        self.route_stack.last().copied().unwrap_or(Route::Feed)
    }

    /// Whether the feed is the visible route.
    pub fn is_on_feed(&self) -> bool {
        self.current() == Route::Feed
    }

    fn bump_version(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}
