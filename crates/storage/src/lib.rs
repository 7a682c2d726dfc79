pub mod backend;
pub mod error;
mod key;

pub use crate::backend::{ObjectStore, Probe};
pub use crate::key::validate as validate_key;
use std::sync::Arc;

pub type StoreHandle = Arc<dyn ObjectStore + Send + Sync>;
