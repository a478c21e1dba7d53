//! Text embedding providers behind a single [`embedder::Embedder`] trait.

pub mod config;
pub mod embedder;
