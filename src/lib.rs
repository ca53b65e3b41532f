pub mod cli;
pub mod error;
pub mod models;
pub mod server;
pub mod services;
pub mod utils;

pub use cli::{Cli, Commands};
pub use error::{ConfigError, ProviderError, RagError, StoreError};
pub use models::{Config, OutputFormat};
pub use services::RagService;
