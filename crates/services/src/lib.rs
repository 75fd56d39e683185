#![forbid(unsafe_code)]

pub mod app_services;
pub mod auth;
pub mod error;
pub mod progress_service;
pub mod session_context;
pub mod sync_gateway;

pub use progress_core::Clock;

pub use app_services::AppServices;
pub use auth::{AuthProvider, InMemoryAuthProvider};
pub use error::AppServicesError;
pub use progress_service::ProgressService;
pub use session_context::SessionContext;
pub use sync_gateway::{SyncGateway, SyncState};
