// src/orchestrator/preload.rs

//! Rendering of show-list entries into frame buffers, ahead of time
//! (preload) or at show time (live paint).

use crate::color::Color;
use crate::geometry::Rect;
use crate::orchestrator::compiler::ShowEntry;
use crate::surface::FrameBuffer;
use crate::unit::{Display, StimulusKind};

/// Renders timing group `group` of `entry` into `canvas`.
///
/// Each executing link paints its own group `min(group, last)`, so a short
/// unit joined to a longer one stays on screen. The first graphic link paints
/// its background unless the entry is transparent, in which case the canvas
/// starts from `carry`, the preceding update's final frame. The list overlay,
/// if any, goes on top.
pub(crate) fn compose(
    units: &mut [Display],
    entry: &ShowEntry,
    group: usize,
    canvas: &mut FrameBuffer,
    carry: Option<&FrameBuffer>,
    background: Color,
) -> Rect {
    match (entry.transparent, carry) {
        (true, Some(previous)) if canvas.copy_from(previous) => {}
        _ => canvas.clear(background),
    }

    let mut bounds = Rect::default();
    let mut background_pending = !entry.transparent;
    for &index in &entry.chain {
        let unit = &mut units[index];
        if !unit.executes() || unit.kind() == StimulusKind::NonGraphic {
            continue;
        }
        unit.set_timing_group(group.min(unit.last_group_index()));
        bounds = bounds.union(&unit.show_group(canvas, background_pending));
        unit.clear_timing_group();
        background_pending = false;
    }
    if let Some(overlay) = entry.list_overlay {
        bounds = bounds.union(&units[overlay].show(canvas));
    }
    bounds
}

/// Whether the entry draws anything at all.
pub(crate) fn is_graphic(units: &[Display], entry: &ShowEntry) -> bool {
    entry.list_overlay.is_some()
        || entry
            .chain
            .iter()
            .any(|&i| units[i].executes() && units[i].kind() == StimulusKind::Graphic)
}

/// Whether group `group` of `entry` may be rendered ahead of time.
pub(crate) fn can_preload(units: &[Display], entry: &ShowEntry, group: usize) -> bool {
    let head = &units[entry.head()];
    let tail = &units[entry.tail()];
    entry.preloadable
        && head.is_visible()
        && group < tail.timing().len()
        && tail.timing()[group].buffer().is_none()
        && is_graphic(units, entry)
}
