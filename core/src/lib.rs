//! amlmon-core: transaction screening and suspicious-case pipeline.
//!
//! A transaction event flows through a fixed decision sequence
//! (exemption resolution, limit/threshold evaluation, watchlist
//! matching, risk-profile update) and, when flagged, into exactly one
//! deduplicated suspicious case. The [`screening::ScreeningEngine`] is
//! pure decision logic; [`pipeline::Pipeline`] wraps it with storage,
//! per-account ordering, and bounded retries.

pub mod account_locks;
pub mod case;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod profile;
pub mod reference;
pub mod screening;
pub mod store;
pub mod transaction;
pub mod types;
