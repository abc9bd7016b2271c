//! Deterministic integration of the compartment model.
//!
//! [`Stepper`] advances a single state by one explicit Euler step; [`run`]
//! drives it from day 0 to the horizon and collects a
//! [`SimulationTimeSeries`]. Independent scenarios can be swept in parallel
//! with [`run_sweep`].
mod driver;
mod stepper;
mod timeseries;

pub use driver::*;
pub use stepper::{StepOutcome, Stepper, Timestep, DRIFT_TOLERANCE};
pub use timeseries::*;
