//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types shared by the store and the rendering seam
//! - Rigid transform helpers for building overlay transforms
//! - Logging utilities

pub mod math;
pub mod transforms;
pub mod logging;
