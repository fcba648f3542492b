//! Tracking submitted transactions to a target commitment

pub mod state;
pub mod tracker;

pub use state::{ConfirmationState, ConfirmationStatus, Observation, Outcome};
pub use tracker::{ConfirmationConfig, ConfirmationTracker, PendingConfirmation};
