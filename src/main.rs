//! Slate compiler CLI entry point

fn main() {
    // Structured logging with env-based filter, defaulting to warnings only.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();

    slate::cli::run();
}
