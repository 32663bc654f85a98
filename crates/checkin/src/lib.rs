//! `checkin` - a QR check-in kiosk
//!
//! This library drives the scan, query, display and resume lifecycle of a
//! check-in kiosk: a decoding capability produces codes, each new code is
//! checked in against a remote endpoint exactly once, and the outcome is
//! shown for a fixed window before scanning resumes.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod capability;
pub mod cli;
pub mod config;
pub mod error;
pub mod kiosk;
pub mod logging;
pub mod outcome;
pub mod query;
pub mod scan;
pub mod wedge;

#[cfg(test)]
mod testing;

pub use capability::{CapabilityError, DecodedValue, DecodingCapability, ScannerState};
pub use config::Config;
pub use error::{Error, Result};
pub use kiosk::{DisposalToken, Kiosk, KioskHandle};
pub use logging::init_logging;
pub use outcome::{CheckinResponse, DisplayState, Outcome, OutcomeKind};
pub use query::{CheckinApi, HttpCheckinApi, QueryCoordinator};
pub use scan::{ScanController, ScanGate};
pub use wedge::LineScanner;
