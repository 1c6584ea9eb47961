// src/api.rs

pub mod client;

pub use client::{ApiClient, Auth};
