use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "gravure_engine=trace,wgpu_core=warn"). When neither it nor `RUST_LOG` is
/// set, `default_level` applies to gravure crates and the wgpu internals are
/// held at `warn`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub default_level: log::LevelFilter,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            default_level: log::LevelFilter::Info,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// Subsequent calls are ignored. Call early in `main`, before the GPU context
/// is created, so adapter selection is logged.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = config.env_filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(config.default_level);
            // Shader validation chatter drowns out the allocator trace otherwise.
            builder.filter_module("wgpu_core", log::LevelFilter::Warn);
            builder.filter_module("wgpu_hal", log::LevelFilter::Warn);
            builder.filter_module("naga", log::LevelFilter::Warn);
        }

        builder.write_style(config.write_style);
        builder.init();

        log::debug!("logging initialized");
    });
}
