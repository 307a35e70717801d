mod tracer_engine;

pub use tracer_engine::{TracerEngine, TracerOptions};

/// Should be called at the start of each binary.
/// Expands to [TracerEngine::new] with the binary's name and the calling module's path,
/// so the default filter directive applies to the calling crate.
#[macro_export]
macro_rules! init_tracer {
    ($options:expr) => {{ $crate::tracer::TracerEngine::new($options, env!("CARGO_BIN_NAME"), module_path!()) }};
}
