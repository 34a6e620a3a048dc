//! Core trait abstractions for the sanctions library.
//!
//! These traits define the interfaces the host platform implements to
//! provide storage, topic content, account standing and notification delivery.

pub mod platform;
pub mod store;
