//! Headless masonry feed driven by `mosaic-virtual`.
//!
//! Posts are loaded page by page from a simulated backend, laid out in
//! responsive lanes and "rendered" by a headless observer that reports each
//! card's size. The run scrolls through the feed, opens a post, goes back and
//! checks that the feed comes back where it was without refetching.

pub mod lanes;
pub mod posts;

use std::{sync::Arc, time::Duration};

use anyhow::{Context, bail};
use clap::Parser;
use mosaic_virtual::{
    FeedSession, FetchOutcome, HeadlessObserver, MemorySessionStore, RestoreOutcome,
    SessionPersistence, VirtualizerConfig, px::Px,
};
use tracing::{info, instrument, warn};

use crate::{
    lanes::responsive_lanes,
    posts::{Post, PostSource, card_size},
};

/// Items requested per page.
pub const PAGE_SIZE: usize = 50;

type PostSession = FeedSession<Post, Arc<MemorySessionStore>>;

/// Command-line options of the demo.
#[derive(Debug, Clone, Parser)]
#[command(name = "mosaic-feed")]
#[command(version, about = "Scroll through a virtualized masonry feed", long_about = None)]
pub struct Cli {
    /// Window width in pixels; picks the lane count
    #[arg(long, default_value_t = 1280)]
    pub width: u32,
    /// Window height in pixels
    #[arg(long, default_value_t = 900)]
    pub height: u32,
    /// Width to resize to after returning from the detail view
    #[arg(long)]
    pub resize_to: Option<u32>,
    /// Number of one-screen scroll steps
    #[arg(long, default_value_t = 12)]
    pub steps: usize,
    /// Number of posts served by the simulated backend
    #[arg(long, default_value_t = 1000)]
    pub total: usize,
    /// Simulated backend latency in milliseconds
    #[arg(long, default_value_t = 50)]
    pub delay_ms: u64,
    /// Items rendered beyond the visible range on each side
    #[arg(long, default_value_t = 25)]
    pub overscan: usize,
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the built-in filter.
pub fn init_tracing() {
    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            match tracing_subscriber::EnvFilter::try_new("error,mosaic_virtual=info,mosaic_feed=info")
            {
                Ok(filter) => filter,
                Err(_) => tracing_subscriber::EnvFilter::new("error"),
            }
        }
    };

    let _ = tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .try_init();
}

/// Runs the demo on a current-thread runtime.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("failed to build the tokio runtime")?;
    runtime.block_on(browse(cli))
}

/// Scrolls through the feed, visits a post and comes back.
#[instrument(skip_all, fields(width = cli.width, height = cli.height))]
pub async fn browse(cli: Cli) -> anyhow::Result<()> {
    let source = PostSource::new(cli.total, Duration::from_millis(cli.delay_ms));
    let config = VirtualizerConfig::default()
        .lanes(responsive_lanes(cli.width))
        .overscan(cli.overscan);
    let persistence = SessionPersistence::new(Arc::new(MemorySessionStore::new()));
    let mut session: PostSession = FeedSession::mount(config, PAGE_SIZE, persistence)?;

    let viewport = Px::from(cli.height);
    let controller = session.controller_mut();
    controller.set_viewport_size(viewport);
    controller.set_observer(Box::new(HeadlessObserver::new(card_size)));

    load_until_covered(&mut session, &source).await?;
    report(&mut session, "first screen");

    for step in 1..=cli.steps {
        let controller = session.controller_mut();
        let next = controller.scroll_offset() + viewport;
        if next >= controller.total_extent() {
            info!(step, "reached the end of the feed");
            break;
        }
        controller.on_scroll(next);
        load_until_covered(&mut session, &source).await?;
        report(&mut session, "scrolled");
    }

    let before = session.controller_mut().range();
    let offset = session.controller().scroll_offset();
    let Some(index) = before.visible.clone().next() else {
        bail!("nothing visible at offset {offset}");
    };
    session.open_detail(index)?;
    if let Some(post) = session.detail_item() {
        info!(
            id = post.id,
            title = %post.title,
            height = %post.height,
            background = %post.background,
            "opened post"
        );
    }

    // The detail view scrolls the window to the top.
    session.controller_mut().on_scroll(Px::ZERO);

    let fetched = session.loader().loaded_len();
    match session.back() {
        Some(RestoreOutcome::Restored { offset: restored }) if restored == offset => {
            info!(%restored, "feed restored")
        }
        other => bail!("feed was not restored to {offset}: {other:?}"),
    }
    let after = session.controller_mut().range();
    if after != before || session.loader().loaded_len() != fetched {
        bail!("feed moved while a post was open: {before:?} -> {after:?}");
    }
    report(&mut session, "back on the feed");

    if let Some(width) = cli.resize_to {
        let lanes = responsive_lanes(width);
        session.controller_mut().set_lanes(lanes)?;
        load_until_covered(&mut session, &source).await?;
        report(&mut session, "resized");
    }

    session.unmount();
    Ok(())
}

/// Settles the layout, fetching pages while the materialized range runs past
/// the loaded items.
async fn load_until_covered(session: &mut PostSession, source: &PostSource) -> anyhow::Result<()> {
    loop {
        session.controller_mut().settle();
        if clamp_to_content(session) {
            continue;
        }
        let wanted = session.controller_mut().range().materialized.end;
        let loaded = session.loader().loaded_len();
        if loaded > 0 && (wanted < loaded || session.loader().is_exhausted()) {
            return Ok(());
        }
        match session.fetch_next(source).await {
            Some(FetchOutcome::Applied { page, loaded }) => info!(page, loaded, "page loaded"),
            Some(FetchOutcome::Failed(err)) => return Err(err.into()),
            Some(FetchOutcome::Discarded) => warn!("page response discarded"),
            None => return Ok(()),
        }
    }
}

/// Pulls the offset back when measured sizes shrank the content under it.
fn clamp_to_content(session: &mut PostSession) -> bool {
    let controller = session.controller_mut();
    let max_offset = (controller.total_extent() - controller.viewport_size()).max(Px::ZERO);
    if controller.scroll_offset() <= max_offset {
        return false;
    }
    controller.on_scroll(max_offset);
    true
}

fn report(session: &mut PostSession, label: &str) {
    let controller = session.controller_mut();
    let range = controller.range();
    let extent = controller.total_extent();
    info!(
        offset = %controller.scroll_offset(),
        %extent,
        lanes = controller.lanes(),
        visible = ?range.visible,
        materialized = ?range.materialized,
        phase = ?controller.phase(),
        measured = controller.measurements().measured_len(),
        "{label}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(total: usize, steps: usize) -> Cli {
        Cli {
            width: 1280,
            height: 900,
            resize_to: Some(1600),
            steps,
            total,
            delay_ms: 0,
            overscan: 25,
        }
    }

    #[tokio::test]
    async fn browse_round_trip_succeeds() {
        if let Err(err) = browse(cli(1000, 12)).await {
            panic!("browse failed: {err:#}");
        }
    }

    #[tokio::test]
    async fn browse_stops_at_the_end_of_a_short_feed() {
        if let Err(err) = browse(cli(60, 100)).await {
            panic!("browse failed: {err:#}");
        }
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["mosaic-feed"]);
        assert_eq!(cli.width, 1280);
        assert_eq!(cli.steps, 12);
        assert_eq!(cli.overscan, 25);
        assert_eq!(cli.resize_to, None);
    }
}
