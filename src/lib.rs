//! Season statistics for a VEX competition roster, synced into a Google
//! Sheet one team per row.

pub mod auth;
pub mod error;
pub mod event;
pub mod http_client;
pub mod pipeline;
pub mod profile;
pub mod sheet;
pub mod vexdb;
