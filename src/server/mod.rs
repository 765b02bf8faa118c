//! HTTP surface for the redirect service
//!
//! ```text
//! GET  /redirect                         302 to the current target
//! GET  /api/current                      redirect info
//! POST /api/set  /api/temp  /api/set-default  /api/clear-timer
//! GET  /api/presets                      preset document
//! POST /api/presets/add  /delete  /rename
//! GET  /preset/{name}?key=...            activate preset (NFC tags)
//! POST /api/preset/activate              activate preset (control UI)
//! GET  /api/security/status
//! POST /api/security/toggle  /set-key  /regenerate
//! GET  /api/port                         POST /api/port
//! GET  /api/supabase/config              POST /api/supabase/config
//! POST /api/supabase/test
//! GET  /api/events/scheduled             POST /add  /update  /delete
//! GET  /api/events/manual                POST /add  /delete
//! POST /api/events/create-now
//! GET  /api/health
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use ez_redirect::server::AppServer;
//!
//! let server = AppServer::new(config, service)?;
//! server.start_with_shutdown(shutdown_signal()).await?;
//! ```

pub mod api;
pub mod app;

// Re-export main types
pub use api::{create_router, ApiError, ErrorResponse};
pub use app::{AppServer, AppState, ServerError, ServerInfo};
