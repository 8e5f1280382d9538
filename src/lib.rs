//! Deterministic SLURM cluster layout on EC2.
//!
//! Resolves controller and compute node addresses from a VPC's subnets,
//! persists the result as an INI configuration file, and renders
//! `slurm.conf`, hosts files and node launch descriptions from it.

pub mod artifacts;
pub mod cli;
pub mod config;
pub mod context;
pub mod inventory;
pub mod topology;
