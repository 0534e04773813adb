//! Stats operator wiring: configuration, manifests, startup and controller loop

#![deny(missing_docs)]

pub mod config;
pub mod controller_runner;
pub mod rbac;
pub mod startup;
