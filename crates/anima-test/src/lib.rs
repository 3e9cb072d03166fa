//! Anima Test Harness - frame-stepped avatar simulation
//!
//! This crate provides:
//! - Jittered frame timing
//! - A compositor driving an in-memory humanoid, sampled every frame
//! - End-to-end scenarios over whole trajectories

pub mod simulation;

pub use simulation::*;

#[cfg(test)]
mod scenarios;
