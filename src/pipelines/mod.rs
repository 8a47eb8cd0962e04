//! Workflow pipelines orchestrating stateless services.

pub mod digest;
pub mod sign;
pub mod verify;

pub use digest::DigestWorkflow;
pub use sign::{SignOutcome, SignWorkflow};
pub use verify::VerifyWorkflow;
