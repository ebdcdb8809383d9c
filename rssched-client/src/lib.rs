//! Rolling stock scheduling request client.
//!
//! Turns a simulated transit scenario and its passenger events into a
//! validated scheduling request for the rolling stock solver, and reads the
//! solver's response back.

pub mod composer;
pub mod export;
pub mod passenger;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod router;
pub mod scenario;
pub mod solver;
