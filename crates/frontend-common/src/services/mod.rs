pub mod api_wrapper;
pub mod auth;
pub mod drafts;
pub mod user;

pub use api_wrapper::{handle_api_error, with_auth_error_handling};
pub use auth::AuthApiService;
pub use drafts::DraftService;
pub use user::UserService;
