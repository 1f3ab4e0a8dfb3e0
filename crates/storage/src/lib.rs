pub mod context_store;

pub use context_store::{ContextStore, DomainContextEntry, DomainContextMap};
