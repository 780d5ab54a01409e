//! Test modules for the shared crate
