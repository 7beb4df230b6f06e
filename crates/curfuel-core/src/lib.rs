//! # curfuel Core Library
//!
//! Core functionality for the curfuel tank level daemon.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Tank geometry (liquid volume from fill depth)
//! - Volume unit conversion
//! - The sender's line protocol and a fault tolerant serial channel
//! - The reading pipeline (calibration and run modes)
//! - The append-only event log
//! - Daemon lifecycle management
//! - A simulated sender for running without hardware
//!
//! ## Example
//!
//! ```rust,ignore
//! use curfuel_core::{daemon::{DaemonController, Mode}, shutdown::Shutdown};
//!
//! let shutdown = Shutdown::new();
//! let mut daemon = DaemonController::load("curfuel.ini", shutdown.clone())?;
//! daemon.execute(Mode::Run, |_| {})?;
//! ```

pub mod config;
pub mod daemon;
pub mod demo;
pub mod eventlog;
pub mod pipeline;
pub mod protocol;
pub mod shutdown;
pub mod tank;
pub mod unit_conversion;
