use log::LevelFilter;

/// Info level by default, `RUST_LOG` takes precedence.
pub fn init_logging() {
    env_logger::builder()
        .format_target(false)
        .format_timestamp_secs()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init()
}
