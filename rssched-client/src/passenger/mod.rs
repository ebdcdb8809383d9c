//! Passenger flow analysis of simulation events.

mod analysis;
mod counts;
mod csv_writer;
mod events;

pub use analysis::{AnalysisError, Entry, PassengerAnalysis};
pub use counts::{PassengerCount, PassengerCounts};
pub use csv_writer::{format_time, write_entries};
pub use events::Event;
