pub mod config;
pub mod context;
pub mod error;
pub mod routes;
pub mod state;

pub use config::Config;
pub use context::RequestContext;
pub use error::{ApiError, ApiResult, Envelope};
pub use routes::create_app;
pub use state::AppState;
