//! UDP ingest, per-source session tasks and viewer fan-out.

mod error;
pub mod keys;
pub mod publisher;
pub mod registry;
pub mod server;
pub mod task;

pub use error::SessionError;
pub use keys::{ConfigKeyDirectory, OwnerDirectory};
pub use publisher::{BroadcastPublisher, Publisher, encode_payload};
pub use registry::{SessionHandle, SessionRegistry};
pub use server::{Routed, ServerContext, bind, serve};
pub use task::SessionTask;
