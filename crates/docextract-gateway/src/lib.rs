//! Extraction gateway: forwards one file to the upstream document-AI service.
//!
//! The upstream's authentication scheme is unknown, so each call probes a
//! fixed table of header/body encodings and stops at the first non-401
//! answer. Successful payloads are normalized into text plus entities.

pub mod client;
pub mod normalize;
pub mod probe;

pub use client::{Gateway, UpstreamReply};
pub use normalize::normalize;
pub use probe::{AuthPlacement, BodyShape, ProbeStep, PROBE_SEQUENCE};
