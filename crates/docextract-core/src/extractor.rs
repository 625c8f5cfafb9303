//! The seam between batch orchestration and whatever performs an extraction.

use std::future::Future;

use crate::error::Result;
use crate::types::{Extraction, ExtractionRequest};

/// Performs one extraction per call. Implemented by the upstream gateway and
/// by test doubles.
pub trait Extractor: Send + Sync + 'static {
    fn extract(&self, request: ExtractionRequest) -> impl Future<Output = Result<Extraction>> + Send;
}
