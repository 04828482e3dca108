use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

/// Install the global `fmt` subscriber.
///
/// `log_level` is the base directive (e.g. `info`, `wave_portal_sync=debug`); `RUST_LOG`
/// directives are added on top of it. An invalid level falls back to `info`.
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::builder()
        .parse(log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let filter = std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .into_iter()
        .flat_map(|directives| {
            directives
                .split(',')
                .filter_map(|directive| directive.trim().parse::<Directive>().ok())
                .collect::<Vec<_>>()
        })
        .fold(filter, |filter, directive| filter.add_directive(directive));

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::time())
        .try_init();
}
