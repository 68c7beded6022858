//! dvrflow-db: the durable de-duplication ledger.
//!
//! The ledger records every recording identifier that has been scheduled for
//! transcoding so that redelivered notifications, restarts and racing
//! publishers never schedule the same recording twice.
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `ledger` - Ledger reads and writes
//!
//! # Example
//!
//! ```
//! use dvrflow_db::{Ledger, MarkOutcome};
//!
//! let ledger = Ledger::in_memory().unwrap();
//! assert!(!ledger.already_scheduled("0123456789ABCDEF0").unwrap());
//! assert_eq!(ledger.mark_scheduled("0123456789ABCDEF0").unwrap(), MarkOutcome::Inserted);
//! assert!(ledger.already_scheduled("0123456789ABCDEF0").unwrap());
//! ```

pub mod ledger;
pub mod migrations;
pub mod pool;

pub use ledger::{Ledger, LedgerEntry, MarkOutcome};
