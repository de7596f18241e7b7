use clap::Parser;
use mosaic_feed::Cli;

fn main() -> anyhow::Result<()> {
    mosaic_feed::run(Cli::parse())
}
