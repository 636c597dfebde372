//! Channel layer for prompt matching on interactive shells.
//!
//! This module handles the shell session I/O, including tail-only
//! prompt detection and ANSI stripping.

mod buffer;
mod pty;

pub use buffer::PatternBuffer;
pub use pty::PtyChannel;
