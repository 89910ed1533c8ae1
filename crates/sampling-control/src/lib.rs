//! Adaptive GPS Sampling
//!
//! Trades battery for responsiveness: short burst probes classify the motion
//! regime (vehicle vs. stationary) while the surface is backgrounded, and the
//! fix interval follows the rule "1 Hz whenever in a vehicle or foregrounded,
//! otherwise suspended".

mod controller;

pub use controller::{collect_burst_speeds, SamplingConfig, SamplingController, SamplingMode};
