// src/unit/mod.rs

//! Presentable units.
//!
//! A [`Display`] is one composable stimulus: an ordered element list, one
//! [`TimingElement`] per timing group, and a cursor used to step through the
//! groups. The concrete look and timing come from its boxed [`Stimulus`].
//!
//! Lifecycle: `create_instance` builds the element list, `recompute` resolves
//! geometry, timing and colors (in that order) against a target surface.
//! Only then can the unit be stepped and painted.

pub mod element;
pub mod stimulus;

pub use element::{Element, GroupMask, Shape, MAX_GROUPS};
pub use stimulus::{ElementBuilder, Stimulus, StimulusKind};

use crate::clock::Timestamp;
use crate::color::Color;
use crate::error::{PresentationError, Result, StructuralFault};
use crate::geometry::{Point, Rect, Size};
use crate::params::ParamContext;
use crate::renderer::{paint_shape, Viewport};
use crate::surface::FrameBuffer;
use crate::timing::{TimerKind, TimingElement, TimingSpec};
use crate::workers::Animation;
use log::{debug, error, trace, warn};
use std::fmt;
use std::time::Duration;

/// How a unit combines with its predecessor in a show-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayKind {
    /// Starts a new screen update.
    #[default]
    None,
    /// Drawn into the same update as the preceding unit.
    Join,
    /// Drawn on top of the preceding update's final frame.
    Transparent,
    /// Drawn into every following update until cleared.
    ListOverlay,
    /// Ends the running list overlay.
    ClearListOverlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DisplayState {
    Uninstantiated,
    Created,
    GeometryReady,
    TimingReady,
    ColorReady,
    Steppable,
}

/// Side-by-side stereo layout: each eye gets half the surface width and the
/// elements are shifted by `disparity` pixels within their half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StereoLayout {
    pub disparity: i32,
}

/// Response measured while the unit was on screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseState {
    /// Measured from the interval start if one is running, else from onset.
    pub rt: Option<Duration>,
    pub code: Option<u32>,
    pub position: Option<Point>,
    pub interval_start: Option<Timestamp>,
}

pub struct Display {
    name: String,
    stimulus: Box<dyn Stimulus>,
    state: DisplayState,

    elements: Vec<Element>,
    specs: Vec<TimingSpec>,
    timing: Vec<TimingElement>,
    orphaned: Vec<FrameBuffer>,
    cursor: GroupMask,
    last_group: usize,
    has_no_timer: bool,

    overlay: OverlayKind,
    background: Option<Color>,
    visible: bool,
    execute: bool,
    can_preload: bool,
    display_list_control: bool,
    compute_late: bool,
    adjustable: Option<String>,

    pub(crate) list_overlay: Option<usize>,
    surface: Size,
    stereo: Option<StereoLayout>,
    bounds: Rect,
    response: ResponseState,
}

impl fmt::Debug for Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Display")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("overlay", &self.overlay)
            .field("groups", &self.group_count())
            .field("cursor", &self.cursor)
            .finish()
    }
}

impl Display {
    pub fn new(name: impl Into<String>, stimulus: Box<dyn Stimulus>) -> Self {
        Display {
            name: name.into(),
            stimulus,
            state: DisplayState::Uninstantiated,
            elements: Vec::new(),
            specs: Vec::new(),
            timing: Vec::new(),
            orphaned: Vec::new(),
            cursor: GroupMask::EMPTY,
            last_group: 0,
            has_no_timer: true,
            overlay: OverlayKind::None,
            background: None,
            visible: true,
            execute: true,
            can_preload: true,
            display_list_control: false,
            compute_late: false,
            adjustable: None,
            list_overlay: None,
            surface: Size::default(),
            stereo: None,
            bounds: Rect::default(),
            response: ResponseState::default(),
        }
    }

    pub fn with_overlay(mut self, overlay: OverlayKind) -> Self {
        self.overlay = overlay;
        self
    }

    /// Paints a full-surface background in the unit's first screen update.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// A unit that does not execute is skipped when its chain is painted.
    pub fn with_execute(mut self, execute: bool) -> Self {
        self.execute = execute;
        self
    }

    pub fn with_can_preload(mut self, can_preload: bool) -> Self {
        self.can_preload = can_preload;
        self
    }

    pub fn with_display_list_control(mut self, control: bool) -> Self {
        self.display_list_control = control;
        self
    }

    /// Defer `recompute` until the unit is about to be shown.
    pub fn with_compute_late(mut self, late: bool) -> Self {
        self.compute_late = late;
        self
    }

    /// Marks the unit as driven by the adjustable parameter `key`.
    pub fn with_adjustable(mut self, key: impl Into<String>) -> Self {
        self.adjustable = Some(key.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> DisplayState {
        self.state
    }

    pub fn overlay(&self) -> OverlayKind {
        self.overlay
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn executes(&self) -> bool {
        self.execute
    }

    pub fn can_preload(&self) -> bool {
        self.can_preload
    }

    pub fn is_display_list_control(&self) -> bool {
        self.display_list_control
    }

    pub fn is_compute_late(&self) -> bool {
        self.compute_late
    }

    pub fn adjustable(&self) -> Option<&str> {
        self.adjustable.as_deref()
    }

    pub fn kind(&self) -> StimulusKind {
        self.stimulus.kind()
    }

    pub fn is_animated(&self) -> bool {
        self.stimulus.is_animated()
    }

    /// True when no group has a timer, so the unit never holds the screen.
    pub fn has_no_timer(&self) -> bool {
        self.has_no_timer
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Per-group timing, including what the last show measured.
    pub fn timing(&self) -> &[TimingElement] {
        &self.timing
    }

    pub(crate) fn timing_mut(&mut self) -> &mut [TimingElement] {
        &mut self.timing
    }

    pub fn response(&self) -> &ResponseState {
        &self.response
    }

    pub(crate) fn response_mut(&mut self) -> &mut ResponseState {
        &mut self.response
    }

    /// Bounding box of what the last paint call drew.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Number of timing groups: one past the highest group any element is
    /// tagged with, and at least one.
    pub fn group_count(&self) -> usize {
        self.last_group + 1
    }

    pub fn last_group_index(&self) -> usize {
        self.last_group
    }

    pub fn active_group(&self) -> Option<usize> {
        self.cursor.single_index()
    }

    fn require(&self, state: DisplayState) -> Result<()> {
        if self.state < state {
            return Err(StructuralFault::NotInstantiated {
                unit: self.name.clone(),
            }
            .into());
        }
        Ok(())
    }

    fn advance(&mut self, state: DisplayState) {
        if self.state < state {
            self.state = state;
        }
    }

    /// Rebuilds the element list from the stimulus. Geometry, timing and
    /// colors stay unresolved until [`recompute`](Self::recompute).
    pub fn create_instance(&mut self, params: &ParamContext) -> Result<()> {
        self.orphaned.extend(self.timing.iter_mut().filter_map(|t| t.reset_show_state()));
        self.elements.clear();
        self.timing.clear();
        self.cursor = GroupMask::EMPTY;
        self.response = ResponseState::default();

        let mut builder = ElementBuilder::new(&self.name);
        self.stimulus
            .build(&mut builder, params)
            .map_err(|e| PresentationError::lookup(&self.name, e))?;
        let (elements, specs) = builder.finish().map_err(|fault| {
            error!("Display: '{}' {}", self.name, fault);
            PresentationError::from(fault)
        })?;

        self.elements.push(Element::background(self.background.unwrap_or(Color::TRANSPARENT)));
        self.elements.extend(elements);
        self.specs = specs;
        self.last_group = self
            .elements
            .iter()
            .filter_map(|e| e.groups.highest_index())
            .max()
            .unwrap_or(0);
        self.state = DisplayState::Created;
        debug!(
            "Display: '{}' created with {} elements, {} timing declarations",
            self.name,
            self.elements.len() - 1,
            self.specs.len()
        );
        Ok(())
    }

    /// Resolves the unit against a target surface: background rectangle,
    /// then geometry, timing and colors, in that order.
    pub fn recompute(
        &mut self,
        surface: Size,
        params: &ParamContext,
        stereo: Option<StereoLayout>,
    ) -> Result<()> {
        self.require(DisplayState::Created)?;
        self.surface = surface;
        self.stereo = stereo;
        if let Some(background) = self.elements.first_mut() {
            background.shape = Shape::Rect {
                rect: Rect::from_size(surface),
                color: self.background.unwrap_or(Color::TRANSPARENT),
                filled: true,
                thickness: 0,
            };
        }
        self.recompute_geometry(params)?;
        self.recompute_timing(params)?;
        self.recompute_colors(params)?;
        self.state = DisplayState::Steppable;
        Ok(())
    }

    /// The area geometry is computed for: the whole surface, or one eye's half
    /// in stereo mode.
    fn drawing_area(&self) -> Size {
        match self.stereo {
            Some(_) => Size::new(self.surface.width / 2, self.surface.height),
            None => self.surface,
        }
    }

    pub fn recompute_geometry(&mut self, params: &ParamContext) -> Result<()> {
        self.require(DisplayState::Created)?;
        let area = self.drawing_area();
        self.stimulus
            .compute_geometry(&mut self.elements[1..], area, params)
            .map_err(|e| PresentationError::lookup(&self.name, e))?;
        self.advance(DisplayState::GeometryReady);
        Ok(())
    }

    /// Fixes every timing group's timer, duration and response filter from the
    /// current parameters and clears the per-show state.
    pub fn recompute_timing(&mut self, params: &ParamContext) -> Result<()> {
        self.require(DisplayState::Created)?;
        let groups = self.group_count();

        let mut timing: Vec<TimingElement> =
            self.specs.iter().map(TimingElement::from_spec).collect();
        if timing.is_empty() {
            trace!("Display: '{}' declares no timing, using {} untimed groups", self.name, groups);
            timing = (0..groups).map(|_| TimingElement::untimed()).collect();
        }
        self.stimulus
            .compute_timing(&mut timing, params)
            .map_err(|e| PresentationError::lookup(&self.name, e))?;

        if timing.len() != groups {
            let fault = StructuralFault::GroupCountMismatch {
                unit: self.name.clone(),
                groups,
                timing_elements: timing.len(),
            };
            error!("Display: {}", fault);
            return Err(fault.into());
        }
        for (index, element) in timing.iter().enumerate() {
            if let Some(reference) = element.reference {
                if reference >= index {
                    let fault = StructuralFault::BadReference {
                        unit: self.name.clone(),
                        index,
                        reference,
                    };
                    error!("Display: {}", fault);
                    return Err(fault.into());
                }
            }
        }
        if self.stimulus.requires_media_timer()
            && !timing.iter().all(|t| t.timer.contains(TimerKind::MEDIA_SYNC))
        {
            error!("Display: '{}' requires a media-sync timer", self.name);
            return Err(PresentationError::parameter(
                &self.name,
                "media playback requires a media-sync timer on every group",
            ));
        }

        let stale = std::mem::replace(&mut self.timing, timing);
        for mut element in stale {
            if let Some(buffer) = element.reset_show_state() {
                warn!("Display: '{}' recomputed with a cached buffer attached", self.name);
                self.orphaned.push(buffer);
            }
        }
        self.has_no_timer = self.timing.iter().all(|t| t.timer.is_null());
        self.response = ResponseState::default();
        self.advance(DisplayState::TimingReady);
        Ok(())
    }

    pub fn recompute_colors(&mut self, params: &ParamContext) -> Result<()> {
        self.require(DisplayState::Created)?;
        self.stimulus
            .compute_colors(&mut self.elements[1..], params)
            .map_err(|e| PresentationError::lookup(&self.name, e))?;
        self.advance(DisplayState::ColorReady);
        Ok(())
    }

    /// Advances the group cursor. Returns false once past the last group, with
    /// the cursor back to empty.
    pub fn next_timing_group(&mut self) -> bool {
        let next = self.cursor.next_step();
        match next.single_index() {
            Some(index) if index <= self.last_group => {
                self.cursor = next;
                true
            }
            _ => {
                self.cursor = GroupMask::EMPTY;
                false
            }
        }
    }

    /// Points the cursor at `index`. Returns false and leaves the cursor
    /// untouched when the unit has no such group.
    pub fn set_timing_group(&mut self, index: usize) -> bool {
        if index > self.last_group {
            return false;
        }
        match GroupMask::group(index) {
            Some(mask) => {
                self.cursor = mask;
                true
            }
            None => false,
        }
    }

    pub fn clear_timing_group(&mut self) {
        self.cursor = GroupMask::EMPTY;
    }

    fn viewports(&self, canvas: &FrameBuffer) -> Vec<Viewport> {
        let full = canvas.bounds();
        match self.stereo {
            None => vec![Viewport { clip: full, dx: 0 }],
            Some(stereo) => {
                let half = full.width / 2;
                vec![
                    Viewport {
                        clip: Rect::new(full.x, full.y, half, full.height),
                        dx: stereo.disparity,
                    },
                    Viewport {
                        clip: Rect::new(full.x + half as i32, full.y, full.width - half, full.height),
                        dx: half as i32 - stereo.disparity,
                    },
                ]
            }
        }
    }

    fn paint<F>(&mut self, canvas: &mut FrameBuffer, with_background: bool, selected: F) -> Rect
    where
        F: Fn(&Element) -> bool,
    {
        let mut bounds = Rect::default();
        if !self.visible {
            self.bounds = bounds;
            return bounds;
        }
        if with_background && self.background.is_some() {
            let full = Viewport::full(canvas);
            bounds = bounds.union(&paint_shape(&self.elements[0].shape, canvas, &full));
        }
        let viewports = self.viewports(canvas);
        for element in self.elements.iter().skip(1) {
            if !element.visible || !selected(element) {
                continue;
            }
            for viewport in &viewports {
                bounds = bounds.union(&paint_shape(&element.shape, canvas, viewport));
            }
        }
        self.bounds = bounds;
        bounds
    }

    /// Paints every element regardless of timing groups.
    pub fn show(&mut self, canvas: &mut FrameBuffer) -> Rect {
        self.paint(canvas, false, |_| true)
    }

    /// Paints the elements of the active group, plus the background if asked.
    pub fn show_group(&mut self, canvas: &mut FrameBuffer, with_background: bool) -> Rect {
        let cursor = self.cursor;
        self.paint(canvas, with_background, move |e| e.groups.intersects(cursor))
    }

    pub(crate) fn take_buffers(&mut self) -> Vec<FrameBuffer> {
        let mut buffers = std::mem::take(&mut self.orphaned);
        buffers.extend(self.timing.iter_mut().filter_map(|t| t.detach()));
        buffers
    }

    /// Clears every group's measurements before a show. Cached buffers come
    /// back to the caller.
    pub(crate) fn reset_show_state(&mut self) -> Vec<FrameBuffer> {
        let mut buffers = std::mem::take(&mut self.orphaned);
        buffers.extend(self.timing.iter_mut().filter_map(|t| t.reset_show_state()));
        self.response = ResponseState::default();
        buffers
    }

    pub(crate) fn animation(&self) -> Option<Box<dyn Animation>> {
        if self.stimulus.is_animated() {
            self.stimulus.animation()
        } else {
            None
        }
    }

    pub(crate) fn on_present(&mut self, group: usize, onset: Timestamp) {
        self.stimulus.on_present(group, onset);
    }
}
