use std::io;

use tracing_subscriber::{fmt, EnvFilter};

/// 初始化日誌輸出至 stderr，保持 stdout 可供機器解析。 / Installs the tracing subscriber on stderr so stdout stays machine-readable.
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects `debug` and the
/// default is `warn`.
pub fn init(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_writer(io::stderr)
        .try_init();
}
