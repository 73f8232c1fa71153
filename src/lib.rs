pub mod error;
pub mod guillotine;
pub mod solver;
pub mod types;

pub use error::PlannerError;
pub use solver::{Solver, optimize};
