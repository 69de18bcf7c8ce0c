//! Fork choice over the block DAG
//!
//! Picks the frontier by cumulative difficulty, confirms main blocks behind
//! it, applies the transactions each main block reaches and unwinds all of
//! that when a heavier chain appears.

mod apply;
pub mod engine;
mod reorg;

pub use engine::ForkChoice;
