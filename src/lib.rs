//! Satellite pass prediction: scans SGP4 look angles from a ground site for
//! horizon crossings and publishes the passes as JSON for plotting.

pub mod predict;
pub mod report;
pub mod web;
