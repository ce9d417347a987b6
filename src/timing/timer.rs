// src/timing/timer.rs

//! Timer kinds of a timing group.

use bitflags::bitflags;

bitflags! {
    /// What ends a timing group, and what gets recorded while it is up.
    ///
    /// Kinds combine: `CLOCK | KEY` waits for the intended duration or the
    /// first accepted key, whichever comes first. The empty set is the null
    /// timer: the group is presented and the loop moves on immediately.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
    pub struct TimerKind: u32 {
        /// Terminates when the intended duration has elapsed.
        const CLOCK             = 1 << 0;
        /// Terminates on an accepted keyboard response.
        const KEY               = 1 << 1;
        /// Terminates on an accepted mouse button.
        const MOUSE_BUTTON      = 1 << 2;
        /// Terminates on an accepted wheel movement.
        const WHEEL             = 1 << 3;
        /// Terminates on an accepted joystick/analog axis event.
        const AXIS              = 1 << 4;
        /// Driven by media playback; the duration is the clip length.
        const MEDIA_SYNC        = 1 << 5;
        /// Non-blocking: shown by the delayed-show worker at onset + duration.
        const FIXED_DELAY       = 1 << 6;
        /// Terminates on a voice-key trigger.
        const VOICE_KEY         = 1 << 7;
        /// Record out-of-band events that did not qualify as a response.
        const SPURIOUS          = 1 << 8;
        /// The response interval starts at this group's onset.
        const INTERVAL_START    = 1 << 9;
        /// The response interval started by an earlier group keeps running.
        const INTERVAL_CONTINUE = 1 << 10;
        /// Record the pointer position of polled devices with the stop event.
        const TRACKING          = 1 << 11;
    }
}

impl TimerKind {
    /// The null timer.
    pub const NO_TIMER: TimerKind = TimerKind::empty();

    /// Every kind that terminates on a subject response.
    pub const RESPONSE: TimerKind = TimerKind::KEY
        .union(TimerKind::MOUSE_BUTTON)
        .union(TimerKind::WHEEL)
        .union(TimerKind::AXIS)
        .union(TimerKind::VOICE_KEY);

    /// Kinds whose duration elapses on the presentation clock and is therefore
    /// subject to after-the-fact timing correction.
    pub const CLOCK_DRIVEN: TimerKind = TimerKind::CLOCK.union(TimerKind::FIXED_DELAY);

    pub fn is_null(self) -> bool {
        self.is_empty()
    }

    pub fn watches_response(self) -> bool {
        self.intersects(TimerKind::RESPONSE)
    }

    pub fn is_clock_driven(self) -> bool {
        self.intersects(TimerKind::CLOCK_DRIVEN)
    }

    /// Whether a stop position is meaningful for this timer.
    pub fn records_position(self) -> bool {
        self.intersects(TimerKind::MOUSE_BUTTON | TimerKind::AXIS | TimerKind::TRACKING)
    }

    /// Whether the timing loop must block on the wait primitive at all.
    pub fn blocks(self) -> bool {
        !self.is_null() && !self.contains(TimerKind::FIXED_DELAY)
    }

    /// Parses a `|`-separated list such as `"clock|key"`.
    pub fn parse(text: &str) -> Option<TimerKind> {
        let mut kind = TimerKind::empty();
        for part in text.split('|').map(str::trim).filter(|p| !p.is_empty()) {
            kind |= match part.to_ascii_lowercase().as_str() {
                "none" => TimerKind::empty(),
                "clock" => TimerKind::CLOCK,
                "key" => TimerKind::KEY,
                "mouse" | "mouse_button" => TimerKind::MOUSE_BUTTON,
                "wheel" => TimerKind::WHEEL,
                "axis" => TimerKind::AXIS,
                "media" | "media_sync" => TimerKind::MEDIA_SYNC,
                "fixed_delay" | "delay" => TimerKind::FIXED_DELAY,
                "voice" | "voice_key" => TimerKind::VOICE_KEY,
                "spurious" => TimerKind::SPURIOUS,
                "interval_start" => TimerKind::INTERVAL_START,
                "interval_continue" => TimerKind::INTERVAL_CONTINUE,
                "tracking" => TimerKind::TRACKING,
                _ => return None,
            };
        }
        Some(kind)
    }
}
