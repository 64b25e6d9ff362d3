pub mod app;
mod auth;
pub mod error;
mod handlers;
pub mod state;

pub use app::build_app;
pub use error::ApiError;
pub use state::AppState;
