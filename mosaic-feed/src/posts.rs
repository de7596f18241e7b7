//! Simulated post backend.

use std::{
    hash::{DefaultHasher, Hash, Hasher},
    time::Duration,
};

use mosaic_virtual::{FeedError, Page, PageSource, px::Px};

/// Padding around each post card, on each side.
pub const CARD_PADDING: Px = Px(16);

/// One post of the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Post id, equal to its index in the feed.
    pub id: usize,
    /// Display title.
    pub title: String,
    /// Height of the post body.
    pub height: Px,
    /// Background colour as `rgb(r, g, b)`.
    pub background: String,
}

impl Post {
    fn new(id: usize) -> Self {
        let [r, g, b, ..] = hash_of(id, "background").to_le_bytes();
        Self {
            id,
            title: format!("Post {id}"),
            height: post_height(id),
            background: format!("rgb({r}, {g}, {b})"),
        }
    }
}

/// Body height of post `id`, between 100 and 399 pixels.
pub fn post_height(id: usize) -> Px {
    Px(100 + (hash_of(id, "height") % 300) as i32)
}

/// Rendered size of post `id` along the scroll axis, padding included.
pub fn card_size(id: usize) -> Px {
    post_height(id) + CARD_PADDING * 2
}

fn hash_of(id: usize, salt: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    salt.hash(&mut hasher);
    id.hash(&mut hasher);
    hasher.finish()
}

/// Serves a fixed number of generated posts after an artificial delay.
#[derive(Debug, Clone)]
pub struct PostSource {
    total: usize,
    delay: Duration,
}

impl PostSource {
    /// Creates a source of `total` posts answering after `delay`.
    pub fn new(total: usize, delay: Duration) -> Self {
        Self { total, delay }
    }

    /// Number of posts served.
    pub fn total(&self) -> usize {
        self.total
    }
}

impl PageSource for PostSource {
    type Item = Post;

    async fn fetch_page(&self, page: usize, page_size: usize) -> Result<Page<Post>, FeedError> {
        let start = page.saturating_mul(page_size);
        if start >= self.total && self.total > 0 {
            return Err(FeedError::OutOfRange {
                page,
                total: self.total,
            });
        }
        let end = start.saturating_add(page_size).min(self.total);
        let items = (start..end).map(Post::new).collect();
        tokio::time::sleep(self.delay).await;
        Ok(Page {
            items,
            total: self.total,
        })
    }
}
