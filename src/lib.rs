//! City Traffic Simulation Library
//!
//! A grid-based city traffic simulation: cars drive between parking lots
//! using local greedy navigation while paired traffic lights arbitrate
//! right-of-way from sensed congestion.

pub mod simulation;
