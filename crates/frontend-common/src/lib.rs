pub mod auth;
pub mod client;
pub mod client_wrapper;
pub mod config;
pub mod services;
pub mod storage;
pub mod verification;

pub use auth::context::AuthContext;
pub use auth::token_store::TokenStore;
pub use client::ClientSet;
pub use client_wrapper::WrappedAuthClient;
pub use config::{AuthConfig, ClientConfig};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use verification::{
    CompletionError, FlowError, FlowSnapshot, PhoneVerification, ResendOutcome, Step, VerifiedPhone,
};
