//! Cloudflare KV access for the ratings worker's storage.

mod client;

pub use client::KvRatingsClient;
