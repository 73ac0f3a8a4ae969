//! Input harvesting for instrumented methods
//!
//! Given a method compiled through the build bridge, the harvester
//! explores its paths concolically: it executes the method, reads the
//! symbolic branch conditions recorded by the probes, and solves for
//! inputs that flip them with an alternating variable search. The result
//! is one concrete [`InputTuple`] per distinct path that returns normally.

pub mod config;
pub mod distance;
pub mod error;
pub mod explorer;
pub mod sample;
pub mod solver;
pub mod tuple;

pub use config::HarvestConfig;
pub use error::{HarvestError, HarvestFailure, Result, SolverError};
pub use explorer::{generate_inputs, harvest, Harvest, HarvestStats};
pub use solver::{Constraint, Solution, Solver};
pub use tuple::{InputTuple, PathSignature};
