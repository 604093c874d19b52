//! Core library for the OrionVerse developer collaboration platform.
//!
//! The interesting machinery lives in [`workflows::collaboration`]: a
//! document-store-backed state machine that takes posts from publication
//! through applications to tracked projects. The rest of this crate is the
//! service plumbing around it (configuration, telemetry, application-level
//! errors).

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
