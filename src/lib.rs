// src/lib.rs

//! Stimulus presentation and timing engine.
//!
//! Units ([`unit::Display`]) are compiled into a show-list and shown by the
//! [`orchestrator::PresentationManager`], which preloads upcoming screen
//! updates off-screen and corrects every wait for the time already spent.

pub mod clock;
pub mod color;
pub mod config;
pub mod error;
pub mod geometry;
pub mod orchestrator;
pub mod params;
pub mod renderer;
pub mod stimuli;
pub mod surface;
pub mod timing;
pub mod unit;
pub mod workers;

pub use error::{PresentationError, Result, StructuralFault};
pub use orchestrator::{PresentationManager, PresentationSettings, ShowStatus};
pub use unit::Display;
