//! Rewrite engine: bounded loop normalization and probe instrumentation
//!
//! A method body goes through two stages:
//! - [`RewritePipeline::normalize`] lowers `for`/`do` loops and compound
//!   assignments, then unrolls every loop `k` times, repeating until a
//!   round changes nothing
//! - [`instrument`] wraps parameter-dependent conditions and arithmetic in
//!   probe intrinsics the harvester can observe

#![warn(missing_docs)]

pub mod analysis;
pub mod error;
pub mod instrument;
pub mod passes;
pub mod pipeline;
pub mod stats;
pub mod visitor;

pub use analysis::{separate_locals, ParamDependence, ReferencedTypes};
pub use error::{Result, RewriteError};
pub use instrument::{instrument, InstrumentedBody, ProbeSite};
pub use passes::{RewriteContext, RewritePass};
pub use pipeline::{normalize_step, NormalizedBody, RewriteConfig, RewritePipeline};
pub use stats::RewriteStats;
