use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "archivist=info";
const VERBOSE_LOG_FILTER: &str = "archivist=debug";

pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            VERBOSE_LOG_FILTER
        } else {
            DEFAULT_LOG_FILTER
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
