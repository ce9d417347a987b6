// src/workers/mod.rs

//! Helper threads that run alongside the presentation thread.
//!
//! - AnimationWorker: repaints an animated unit while the presentation thread
//!   is blocked in the wait primitive.
//! - DelayedShowWorker: presents fixed-delay groups at their deadline so the
//!   presentation thread can keep preparing the next update.

pub mod animation;
pub mod cancel;
pub mod delayed_show;

pub use animation::{Animation, AnimationWorker};
pub use cancel::CancelToken;
pub use delayed_show::{DelayedOnset, DelayedShow, DelayedShowTicket, DelayedShowWorker};
