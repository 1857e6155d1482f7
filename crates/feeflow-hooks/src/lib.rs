//! Hook compensation and execution.
//!
//! A [`Hooker`] holds one versioned list of [`Hook`]s. Keepers run a sorted
//! batch of [`HookInput`]s against it and are paid according to each
//! hook's [`CompensationStrategy`].

mod calldata;
mod compensation;
mod hooker;
mod registry;

pub use compensation::{CompensationStrategy, Cooldown, Schedule, Window};
pub use hooker::{CallDispatcher, HookCall, Hooker, HookerConfig, RecordingDispatcher};
pub use registry::{Hook, HookInput, HookRegistry};
