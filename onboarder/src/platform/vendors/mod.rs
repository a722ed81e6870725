//! Built-in vendor platforms.

pub mod juniper;
