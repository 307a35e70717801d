use tracing::{debug, level_filters::LevelFilter};
use tracing_subscriber::{
    EnvFilter, Layer, layer::SubscriberExt, util::TryInitError, util::SubscriberInitExt,
};

/// Caller-specified options for [TracerEngine].
pub struct TracerOptions {
    /// Level applied to the calling crate when `RUST_LOG` is not set.
    pub default_level: LevelFilter,
    /// Whether the stdout layer should emit ANSI colour codes.
    pub ansi: bool,
}

impl Default for TracerOptions {
    fn default() -> Self {
        Self {
            default_level: LevelFilter::INFO,
            ansi: true,
        }
    }
}

/// This object initialises the stdout tracer, given a [TracerOptions] struct.
pub struct TracerEngine;

impl TracerEngine {
    /// Initialises the stdout tracer for the crate
    /// #Arguments
    /// * `options` - The caller-specified instance of TracerOptions.
    /// * `service_name` - The name of the binary, logged once the tracer is installed.
    /// * `module_name` - The name of the current module, the default filter directive targets it.
    /// #Returns
    /// An instance of TracerEngine, or an error if a global subscriber was already installed.
    pub fn new(
        options: TracerOptions,
        service_name: &str,
        module_name: &str,
    ) -> Result<Self, TryInitError> {
        let stdout_tracer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(options.ansi);

        // `RUST_LOG` wins, otherwise only the calling crate and this workspace's library are enabled.
        let log_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{module_name}={0},nexus_accessor={0}",
                options.default_level
            ))
        });

        tracing_subscriber::Registry::default()
            .with(stdout_tracer.with_filter(log_filter))
            .try_init()?;

        debug!("Tracer initialised for {service_name}");
        Ok(Self)
    }
}
