//! Cost-computation engine for battery-electric vehicle (BEV) fleet TCO analysis.
#![warn(missing_docs)]
pub mod business;
pub mod digital;
pub mod entity;
pub mod evse;
pub mod finance;
pub mod fleet;
pub mod id;
pub mod infrastructure;
pub mod log;
pub mod maintenance;
pub mod registry;
pub mod schedule;
pub mod summary;
pub mod timeline;
pub mod units;
pub mod utils;
pub mod workforce;

#[cfg(test)]
mod fixture;
