pub mod components;
pub mod error;
pub mod loader;

pub use components::global::DsfConfig;
pub use loader::read_config;
