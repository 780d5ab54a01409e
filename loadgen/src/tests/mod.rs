//! Test modules for the loadgen crate

mod config_tests;
mod fakes;
