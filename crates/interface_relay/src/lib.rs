//! Settlement Relay
//!
//! Batches the dispatcher could not deliver sit in the PostgreSQL
//! dead-letter store. The relay picks them up and resends them to the
//! revenue sharing system, either in a single pass or on an interval.
//!
//! # Example
//!
//! ```rust,ignore
//! let relay = Relay::new(
//!     Arc::new(RevenueSharingAdapter::new(config.settlement.clone())?),
//!     Arc::new(PgDeadLetterStore::new(pool)),
//!     config.replay.clone(),
//! );
//! relay.run(shutdown_signal()).await?;
//! ```

pub mod config;
pub mod error;
pub mod replay;

pub use crate::config::{LogFormat, LogSettings, RelayConfig, ReplayConfig};
pub use crate::error::RelayError;
pub use crate::replay::{Relay, ReplaySummary};
