pub mod env;
pub mod tracing_init;

pub use env::{parse_utc_offset, AppConfig};
pub use tracing_init::init_tracing;
