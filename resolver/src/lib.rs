pub mod client;
pub mod config;
pub mod index;
pub mod records;
mod resolver;

pub use client::{DataClient, FetchError};
pub use config::{FetchMode, ResolverConfig, SourcesConfig};
pub use index::ResolvedTariffs;
pub use resolver::{DataSource, ResolveError, TariffResolver};
