// src/unit/stimulus.rs

//! The capability interface of a concrete stimulus.
//!
//! A [`Display`](crate::unit::Display) owns the generic state machine (element
//! list, timing groups, stepping, painting). What the unit actually looks like
//! and how it is timed comes from its [`Stimulus`]. Every hook except `build`
//! has a no-op default.

use crate::clock::Timestamp;
use crate::error::StructuralFault;
use crate::geometry::Size;
use crate::params::{ParamContext, ParamError};
use crate::timing::{TimingElement, TimingSpec};
use crate::unit::element::{Element, GroupMask, MAX_GROUPS};
use crate::workers::Animation;

/// Whether a unit puts anything on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StimulusKind {
    Graphic,
    /// Audio or device control. Never preloaded, never painted.
    NonGraphic,
}

pub trait Stimulus: Send {
    /// Declares elements and timing groups. No geometry is known yet.
    fn build(&mut self, builder: &mut ElementBuilder, params: &ParamContext)
        -> Result<(), ParamError>;

    /// Positions elements for a drawing area of `area`. Element indices match
    /// the ones handed out by the builder.
    fn compute_geometry(
        &mut self,
        _elements: &mut [Element],
        _area: Size,
        _params: &ParamContext,
    ) -> Result<(), ParamError> {
        Ok(())
    }

    /// Adjusts timing elements from parameters. Called with one element per
    /// declared group.
    fn compute_timing(
        &mut self,
        _timing: &mut [TimingElement],
        _params: &ParamContext,
    ) -> Result<(), ParamError> {
        Ok(())
    }

    fn compute_colors(
        &mut self,
        _elements: &mut [Element],
        _params: &ParamContext,
    ) -> Result<(), ParamError> {
        Ok(())
    }

    fn kind(&self) -> StimulusKind {
        StimulusKind::Graphic
    }

    fn is_animated(&self) -> bool {
        false
    }

    /// Frame source for the animation worker, only asked for when
    /// [`is_animated`](Self::is_animated) is true.
    fn animation(&self) -> Option<Box<dyn Animation>> {
        None
    }

    /// Units whose duration is dictated by a media stream must use a
    /// media-sync timer.
    fn requires_media_timer(&self) -> bool {
        false
    }

    /// Called when `group` went on screen.
    fn on_present(&mut self, _group: usize, _onset: Timestamp) {}
}

/// Collects what a stimulus declares in [`Stimulus::build`].
#[derive(Debug)]
pub struct ElementBuilder {
    unit: String,
    elements: Vec<Element>,
    timing: Vec<TimingSpec>,
    fault: Option<StructuralFault>,
}

impl ElementBuilder {
    pub(crate) fn new(unit: &str) -> Self {
        ElementBuilder {
            unit: unit.to_string(),
            elements: Vec::new(),
            timing: Vec::new(),
            fault: None,
        }
    }

    /// Adds an element in the default group 0.
    pub fn add(&mut self, name: &str) -> usize {
        self.push(Element::new(name, GroupMask::DEFAULT))
    }

    /// Adds an element shown in each of `groups`.
    pub fn add_in(&mut self, name: &str, groups: &[usize]) -> usize {
        if let Some(&bad) = groups.iter().find(|g| **g >= MAX_GROUPS) {
            self.fault.get_or_insert(StructuralFault::TooManyGroups {
                unit: self.unit.clone(),
                index: bad,
                limit: MAX_GROUPS,
            });
        }
        let mask = groups.iter().copied().collect();
        self.push(Element::new(name, mask))
    }

    /// Declares the next timing group.
    pub fn timing(&mut self, spec: TimingSpec) -> &mut Self {
        self.timing.push(spec);
        self
    }

    fn push(&mut self, element: Element) -> usize {
        self.elements.push(element);
        self.elements.len() - 1
    }

    pub(crate) fn finish(self) -> Result<(Vec<Element>, Vec<TimingSpec>), StructuralFault> {
        match self.fault {
            Some(fault) => Err(fault),
            None => Ok((self.elements, self.timing)),
        }
    }
}
