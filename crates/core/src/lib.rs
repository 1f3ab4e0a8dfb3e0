pub mod config;
pub mod domain;
pub mod error;
pub mod paths;
pub mod types;

pub use config::{CacheSettings, Config, DomainContextConfig};
pub use domain::{extract_domain, normalize_domain};
pub use error::{Error, Result};
pub use paths::Paths;
