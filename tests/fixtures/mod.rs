//! Test fixtures for transport-analyst.
//!
//! Provides real Sydney locations and simple census zones.

#![allow(dead_code)]

pub mod sydney;

pub use sydney::*;
