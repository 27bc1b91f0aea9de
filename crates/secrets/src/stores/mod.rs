//! Local secret store implementations
//!
//! Built-in implementations of the [`SecretStore`](crate::SecretStore) capability:
//!
//! - [`MemoryStore`] - Fixed identifier -> payload mapping
//! - [`FileStore`] - One file per secret under a root directory
//! - [`EnvStore`] - Environment variables with a common prefix

mod env;
mod file;
mod memory;

pub use env::{DEFAULT_ENV_PREFIX, EnvStore};
pub use file::FileStore;
pub use memory::MemoryStore;
