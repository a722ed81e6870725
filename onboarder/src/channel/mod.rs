//! Channel layer for prompt-driven PTY sessions.
//!
//! Handles output accumulation, ANSI stripping and waiting for a prompt
//! pattern with a deadline.

mod buffer;
mod pty;

pub use buffer::PatternBuffer;
pub use pty::PtyChannel;
