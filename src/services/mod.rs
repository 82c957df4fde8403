//! Workflows sitting between the HTTP handlers and the repository.
//!
//! Each service owns a handle on the persistence gateway, receives the actor per call,
//! and performs the authorization and existence checks before any write.

pub mod posts;
pub mod reactions;

pub use posts::PostService;
pub use reactions::ReactionService;
