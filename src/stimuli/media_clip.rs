// src/stimuli/media_clip.rs

//! A media clip shown through an external player.
//!
//! The clip's duration belongs to the media stream, so every group must use a
//! media-sync timer; the wait ends when the player reports the end of the
//! stream. Anything else is a parameter fault raised at recompute.

use crate::clock::Timestamp;
use crate::geometry::{Point, Size};
use crate::params::{ParamContext, ParamError};
use crate::timing::{TimerKind, TimingSpec};
use crate::unit::{Element, ElementBuilder, Shape, Stimulus};
use log::info;
use std::sync::Arc;
use std::time::Duration;

/// Starts playback of a named clip.
pub trait MediaPlayer: Send + Sync {
    fn start(&self, clip: &str, at: Timestamp);
}

pub struct MediaClip {
    clip: String,
    poster_size: Size,
    poster: Arc<[u8]>,
    timer: TimerKind,
    timeout: Duration,
    player: Arc<dyn MediaPlayer>,
}

impl MediaClip {
    /// `poster` is an RGBA8 still shown centered while the clip plays.
    pub fn new(
        clip: &str,
        poster_size: Size,
        poster: Arc<[u8]>,
        player: Arc<dyn MediaPlayer>,
    ) -> Self {
        MediaClip {
            clip: clip.to_string(),
            poster_size,
            poster,
            timer: TimerKind::MEDIA_SYNC,
            timeout: Duration::ZERO,
            player,
        }
    }

    /// Overrides the timer. Without [`TimerKind::MEDIA_SYNC`] the unit cannot
    /// be shown.
    pub fn with_timer(mut self, timer: TimerKind) -> Self {
        self.timer = timer;
        self
    }

    /// Upper bound on playback when combined with a clock timer.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Stimulus for MediaClip {
    fn build(&mut self, builder: &mut ElementBuilder, _params: &ParamContext) -> Result<(), ParamError> {
        builder.add("poster");
        builder.timing(TimingSpec {
            timer: self.timer,
            intended: self.timeout,
            ..Default::default()
        });
        Ok(())
    }

    fn compute_geometry(
        &mut self,
        elements: &mut [Element],
        area: Size,
        _params: &ParamContext,
    ) -> Result<(), ParamError> {
        elements[0].shape = Shape::Image {
            origin: Point::new(
                (area.width as i32 - self.poster_size.width as i32) / 2,
                (area.height as i32 - self.poster_size.height as i32) / 2,
            ),
            size: self.poster_size,
            data: Arc::clone(&self.poster),
        };
        Ok(())
    }

    fn requires_media_timer(&self) -> bool {
        true
    }

    fn on_present(&mut self, _group: usize, onset: Timestamp) {
        info!("MediaClip: starting '{}' at {:?}", self.clip, onset);
        self.player.start(&self.clip, onset);
    }
}
