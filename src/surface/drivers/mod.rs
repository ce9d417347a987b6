// src/surface/drivers/mod.rs

pub mod headless;

pub use headless::{HeadlessDriver, HeadlessProbe};
