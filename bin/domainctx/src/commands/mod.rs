pub mod config_cmd;
pub mod contexts;
pub mod replay;

use domainctx_core::{Config, Paths};
use domainctx_storage::ContextStore;
use std::sync::Arc;

/// Loads the configuration and opens the context store it points at.
pub(crate) fn open_store() -> anyhow::Result<(Paths, Config, Arc<ContextStore>)> {
    let paths = Paths::new();
    let config = Config::load_or_default(&paths)?;
    let store = Arc::new(ContextStore::from_config(&paths, &config.domain_context));
    Ok((paths, config, store))
}
