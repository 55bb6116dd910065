//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware: request ID, trace, panic boundary)
//!     → request.rs (decode JSON bodies and callback headers)
//!     → handlers.rs (submit / poll / callback / admin)
//!     → response.rs (status mapping, fixed notices)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
