//! Reading-progress sync for the Let's Read catalog.
//!
//! The [`sync`] module holds the core: a synchronizer that turns the content
//! viewer's bursty scroll positions into rate-limited progress writes. The
//! store backends live in [`storage`] and [`supabase_client`]; [`sessions`] and
//! [`reader_api`] wire sessions up for the host binary.

pub mod config;
pub mod domain;
pub mod reader_api;
pub mod sessions;
pub mod storage;
pub mod supabase_client;
pub mod sync;
