use std::time::Instant;

use anyhow::Context;

use catcher::app;
use catcher::logging::init_logging;
use catcher::Config;

fn main() -> anyhow::Result<()> {
    let config = Config::from_env_args().unwrap_or_else(|e| e.exit());
    init_logging();
    log::debug!("{:?}", config);

    let now: Instant = Instant::now();
    let (train, test) = app::run(&config).context("catcher experiment failed")?;
    let elapsed: std::time::Duration = now.elapsed();
    log::info!(
        "done in {:.2?}: {} training wins, {} test wins",
        elapsed,
        train.wins,
        test.wins
    );
    Ok(())
}
