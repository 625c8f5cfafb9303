//! docextract core: data model, configuration, error taxonomy.

pub mod config;
pub mod error;
pub mod extractor;
pub mod types;

pub use config::DocExtractConfig;
pub use error::{Error, Result};
pub use extractor::Extractor;
pub use types::*;
