//! Authentication state for the mobile app: config resolution, the hosted
//! backend client (or its mock stand-in), profile rows, and the user store
//! the screens read from.
//!
//! ARCHITECTURE
//! ============
//! `config` decides once whether credentials exist. `backend::connect`
//! turns that into a shared client. `store::UserStore` drives login,
//! registration, logout and cold-start restore on top of that client, and
//! `session::SessionMonitor` follows raw auth-state events.

pub mod backend;
pub mod config;
pub mod profile;
pub mod session;
pub mod store;

pub use backend::{AuthBackend, connect};
pub use config::BackendConfig;
pub use store::{AuthState, StoreError, UserProfile, UserStore};
