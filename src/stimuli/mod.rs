// src/stimuli/mod.rs

//! Concrete stimulus variants.

pub mod blank;
pub mod fixation;
pub mod media_clip;
pub mod moving_dot;
pub mod slide;
pub mod trigger;

pub use blank::Blank;
pub use fixation::FixationCross;
pub use media_clip::{MediaClip, MediaPlayer};
pub use moving_dot::MovingDot;
pub use slide::{ItemShape, Slide, SlideGroup, SlideItem};
pub use trigger::{Trigger, TriggerLog, TriggerSink};
