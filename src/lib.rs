//! Attendance punch integrity engine.
//!
//! This crate turns raw clock-in and clock-out punches into judgments about
//! lateness, early leave, absence and suspicious punching, and decides which
//! of several conflicting punches from different devices should be trusted.

#![warn(missing_docs)]

pub mod cache;
pub mod config;
pub mod conflict;
pub mod detection;
pub mod engine;
pub mod error;
pub mod events;
pub mod models;
pub mod store;
