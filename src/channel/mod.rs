// src/channel/mod.rs

//! Result delivery.
//!
//! - [`delivery`] holds [`ResultChannel`], which performs the single delivery
//!   attempt and settles the command's terminal state.
//! - [`callback`] is the table of one-shot callback capabilities.
//! - [`directory`] writes result files; [`policy`] decides where it may.
//! - [`message`] is the versioned, fixed-key result message.

pub mod callback;
pub mod delivery;
pub mod directory;
pub mod message;
pub mod policy;

pub use callback::{CallbackHandle, CallbackRegistry, InboundResult, ResultEndpoint};
pub use delivery::ResultChannel;
pub use message::{OutputLimits, ResultEnvelope, ResultKeys, ResultMessage, MESSAGE_VERSION};
pub use policy::{PathPolicy, ResolvedDestination};
