//! Statement Extractor Library
//!
//! Client side of a PDF bank statement extraction service: authenticate with an
//! API key, upload a statement through a pre-signed URL, then poll until the
//! extracted transactions CSV is available.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod poller;
pub mod preview;
pub mod session;
pub mod workflow;

pub use error::{ValidationError, WorkflowError};
pub use poller::{Outcome, PollPolicy, MAX_POLL_ATTEMPTS, POLL_INTERVAL};
pub use session::Session;
pub use workflow::{Workflow, WorkflowObserver, WorkflowState};
