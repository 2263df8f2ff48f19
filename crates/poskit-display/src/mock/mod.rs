//! Mock device implementations for testing and development.
//!
//! This module provides a simulated display that can be controlled
//! programmatically without requiring physical hardware.

pub mod display;

pub use display::{MockDisplay, MockDisplayHandle, MockWriteBehavior, WriteRecord};
