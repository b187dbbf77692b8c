//! QUIC transport layer for provisioner messages.
//!
//! This module provides [`ProvisionerClient`] and [`ProvisionerServer`] that
//! communicate [`ProvisionerMessage`](crate::message::ProvisionerMessage)
//! values over QUIC bi-directional streams using `quinn`.

pub mod client;
pub mod server;

pub use client::ProvisionerClient;
pub use server::ProvisionerServer;

/// Upper bound on a single serialized message.
pub(crate) const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;
