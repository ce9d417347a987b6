// src/orchestrator/compiler.rs

//! Show-list compiler.
//!
//! A single left-to-right pass over the unit list turns units into screen
//! updates. Join units (and units following an untimed one) are appended to
//! the previous entry's chain instead of starting their own entry, list
//! overlays are attached to every unit they cover, and each entry learns
//! whether it may be preloaded.

use crate::error::{Result, StructuralFault};
use crate::geometry::{Rect, Size};
use crate::params::ParamContext;
use crate::unit::{Display, OverlayKind, StereoLayout, StimulusKind};
use crate::workers::CancelToken;
use log::{debug, error, info, trace};

/// One screen update: a chain of units drawn together.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowEntry {
    /// Indices into the unit slice, head first. The tail's timing governs the
    /// update.
    pub chain: Vec<usize>,
    pub preloadable: bool,
    pub adjustable_start: bool,
    /// Drawn over the preceding update's final frame.
    pub transparent: bool,
    /// The next entry is transparent, so this entry's final frame is kept.
    pub transparent_follows: bool,
    pub list_overlay: Option<usize>,
    /// Union of what the chain drew, set when the entry is rendered.
    pub bounds: Rect,
}

impl ShowEntry {
    fn starting_at(index: usize, preloadable: bool) -> Self {
        ShowEntry {
            chain: vec![index],
            preloadable,
            adjustable_start: false,
            transparent: false,
            transparent_follows: false,
            list_overlay: None,
            bounds: Rect::default(),
        }
    }

    pub fn head(&self) -> usize {
        self.chain[0]
    }

    pub fn tail(&self) -> usize {
        self.chain[self.chain.len() - 1]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShowList {
    pub entries: Vec<ShowEntry>,
}

impl ShowList {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Surface the units are computed against.
#[derive(Debug, Clone, Copy)]
pub struct CompileTarget {
    pub size: Size,
    pub stereo: Option<StereoLayout>,
}

fn fault(f: StructuralFault) -> crate::error::PresentationError {
    error!("Compiler: {}", f);
    f.into()
}

/// Whether a unit may be rendered ahead of time on its own merits.
fn unit_preloadable(unit: &Display) -> bool {
    unit.can_preload()
        && !unit.is_display_list_control()
        && !unit.is_compute_late()
        && !unit.is_animated()
        && unit.kind() == StimulusKind::Graphic
        && unit.adjustable().is_none()
}

/// Compiles `units` into a show-list. Returns `Ok(None)` when `stop` was
/// raised during compilation.
pub fn compile(
    units: &mut [Display],
    params: &ParamContext,
    target: &CompileTarget,
    stop: &CancelToken,
) -> Result<Option<ShowList>> {
    let mut list = ShowList::default();
    let mut current_overlay: Option<usize> = None;

    for index in 0..units.len() {
        if stop.is_cancelled() {
            info!("Compiler: stop requested at unit {}", index);
            return Ok(None);
        }
        let unit = &mut units[index];
        unit.list_overlay = None;
        let overlay = unit.overlay();

        if index == 0 && matches!(overlay, OverlayKind::Join | OverlayKind::Transparent) {
            return Err(fault(StructuralFault::OverlayFirst {
                unit: unit.name().to_string(),
                kind: overlay,
            }));
        }
        if overlay == OverlayKind::ListOverlay && unit.is_compute_late() {
            return Err(fault(StructuralFault::LateListOverlay {
                unit: unit.name().to_string(),
            }));
        }

        let preloadable = unit_preloadable(unit);
        if !unit.is_compute_late() {
            unit.recompute(target.size, params, target.stereo)?;
        }

        match overlay {
            OverlayKind::ListOverlay => {
                current_overlay = match current_overlay {
                    Some(_) => None,
                    None => Some(index),
                };
                trace!("Compiler: list overlay now {:?}", current_overlay);
                continue;
            }
            OverlayKind::ClearListOverlay => {
                current_overlay = None;
                continue;
            }
            _ => {}
        }
        unit.list_overlay = current_overlay;
        let adjustable = unit.adjustable().is_some();

        let fuse_with_previous = match overlay {
            OverlayKind::Join => true,
            OverlayKind::None => list.entries.last().is_some_and(|entry| {
                let tail = &units[entry.tail()];
                !tail.is_compute_late() && tail.has_no_timer()
            }),
            _ => false,
        };

        if fuse_with_previous {
            let Some(entry) = list.entries.last_mut() else {
                return Err(fault(StructuralFault::OverlayFirst {
                    unit: units[index].name().to_string(),
                    kind: overlay,
                }));
            };
            entry.chain.push(index);
            entry.preloadable &= preloadable;
            entry.adjustable_start |= adjustable;
            trace!("Compiler: unit {} joins entry {}", index, list.entries.len() - 1);
            continue;
        }

        let mut entry = ShowEntry::starting_at(index, preloadable);
        entry.adjustable_start = adjustable;
        if overlay == OverlayKind::Transparent {
            let Some(previous) = list.entries.last_mut() else {
                return Err(fault(StructuralFault::OverlayFirst {
                    unit: units[index].name().to_string(),
                    kind: overlay,
                }));
            };
            previous.transparent_follows = true;
            entry.transparent = true;
        }
        list.entries.push(entry);
    }

    for entry in &mut list.entries {
        entry.list_overlay = units[entry.tail()].list_overlay;
    }
    debug!(
        "Compiler: {} units -> {} entries",
        units.len(),
        list.entries.len()
    );
    Ok(Some(list))
}
