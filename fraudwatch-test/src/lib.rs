//! Test support for the fraudwatch workspace: an in-process fake of the fraud-detection API,
//! a scripted [`fraudwatch_core::Backend`], and fixture builders.

pub mod fixtures;
pub mod harness;
pub mod scripted;
