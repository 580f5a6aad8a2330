//! Authentication module

pub mod context;
pub mod error_messages;
pub mod token_store;

// Re-export commonly used items
pub use context::AuthContext;
pub use error_messages::user_friendly_error;
pub use token_store::TokenStore;
