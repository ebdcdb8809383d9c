//! Client for the rolling stock scheduling solver.
//!
//! The solver exposes a single endpoint, `POST /solve`, taking a request
//! document and answering with the computed schedule once solving is done.

mod client;
mod error;

pub use client::{SolverClient, SolverConfig};
pub use error::SolverError;
