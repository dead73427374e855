pub mod chain_user_provider;
pub mod in_memory_user_provider;
pub mod initial_user_provider;
pub mod memory_attempt_store;
pub mod sqlite_attempt_store;

pub use chain_user_provider::ChainUserProvider;
pub use in_memory_user_provider::InMemoryUserProvider;
pub use initial_user_provider::{InitialUser, InitialUserProvider};
pub use memory_attempt_store::MemoryAttemptStore;
pub use sqlite_attempt_store::SqliteAttemptStore;
