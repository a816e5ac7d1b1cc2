//! # chat-db
//!
//! PostgreSQL implementations of the `chat-core` repository traits via SQLx.
//!
//! The schema lives in `migrations/`; the unique constraint on
//! `reactions (user_id, message_id, emoji)` is the guard the reaction toggle
//! relies on when two toggles race.
//!
//! ```rust,ignore
//! let pool = chat_db::create_pool(&config.database).await?;
//! chat_db::run_migrations(&pool, &chat_db::migrations_dir(&config.database)).await?;
//! let messages = chat_db::PgMessageRepository::new(pool.clone());
//! ```

pub mod mappers;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use pool::{create_pool, migrations_dir, run_migrations, PgPool, MIGRATIONS_DIR};
pub use repositories::{PgMessageRepository, PgReactionRepository};
