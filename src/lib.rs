//! MDR Lifecycle - Versioned library item engine
//!
//! This crate implements the Draft/Final/Retired lifecycle shared by every
//! editable clinical metadata library item (compounds, syntax templates,
//! syntax instances), including the temporal index, audit trail and
//! template-to-instance cascade propagation.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
