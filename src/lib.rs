#![forbid(unsafe_code)]

//! Client-side supervisor for a remote autonomous pentest agent.
//!
//! The crate owns the run-session protocol: session creation, run
//! launch, the live server-sent event stream, transcript
//! reconciliation, periodic state polling, and the single-slot
//! human-in-the-loop action rendezvous. Rendering is someone else's
//! job — callers read [`state::RunShared`] and drive the operations
//! on [`supervisor::RunSupervisor`].

pub mod api;
pub mod config;
pub mod errors;
pub mod models;
pub mod poller;
pub mod rendezvous;
pub mod state;
pub mod stream;
pub mod supervisor;
pub mod transcript;

pub use config::ClientConfig;
pub use errors::{AppError, Result};
pub use supervisor::RunSupervisor;
