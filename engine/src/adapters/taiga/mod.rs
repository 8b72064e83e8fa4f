//! Taiga adapter for the tracker port.

mod client;

pub use client::TaigaClient;
