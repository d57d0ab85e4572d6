/// Logging initialization: tracing-subscriber::fmt → stderr.
///
/// Called once at the start of `ChatApp::new()`, before anything else.
/// `RUST_LOG` overrides the default filter; repeated init attempts (several
/// engines in one test binary) are harmless no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "banter_core=debug,info".into()),
        )
        .try_init();
}
