//! Task store adapters.
//!
//! The scheduler reads tasks through [`TaskStore`] and writes exactly one
//! thing back: a threshold label added to a task's dedup ledger.
//!
//! - [`InMemoryTaskStore`] keeps tasks in process (development and tests)
//! - [`PgTaskStore`] reads the `tasks` table in PostgreSQL

pub mod error;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use error::StoreError;
pub use memory::InMemoryTaskStore;
pub use postgres::PgTaskStore;
pub use traits::{TaskQuery, TaskStore};
