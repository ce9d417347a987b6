// src/main.rs

//! Demo trial on the headless surface: fixation, a moving target with a
//! trigger, then feedback. Optionally takes a JSON config path.

use stimulus_engine::{
    clock::{Clock, SystemClock},
    config::Config,
    params::{ParamContext, ParamRef},
    stimuli::{FixationCross, ItemShape, MovingDot, Slide, SlideGroup, SlideItem, Trigger, TriggerLog},
    surface::{drivers::HeadlessDriver, SurfaceManager},
    timing::ClockWait,
    unit::Display,
    workers::CancelToken,
    PresentationManager,
};

use anyhow::Context;
use log::info;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(Path::new(&path))?,
        None => Config::default(),
    };
    info!("Starting stimulus-demo with {:?}", config.surface.size());

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(config.timing.spin_threshold()));
    let driver = HeadlessDriver::new(config.surface.size()).with_swap(config.surface.page_flip);
    let probe = driver.probe();
    let surface = SurfaceManager::new(
        Box::new(driver),
        Arc::clone(&clock),
        config.surface.background,
        config.preload.max_buffers,
    )
    .context("Failed to set up the presentation surface")?
    .into_shared();

    let wait = ClockWait::new(Arc::clone(&clock));
    let mut manager = PresentationManager::new(surface, Box::new(wait), CancelToken::new())
        .context("Failed to create the presentation manager")?
        .with_settings(config.presentation_settings());

    let mut params = ParamContext::new();
    params.set("target.duration", 400i64);

    let triggers = TriggerLog::new();
    let mut units = vec![
        Display::new("fixation", Box::new(FixationCross::new(Duration::from_millis(500)))),
        Display::new("onset-trigger", Box::new(Trigger::new(vec![1u32], Arc::new(triggers.clone())))),
        Display::new(
            "target",
            Box::new(
                MovingDot::new((0.2, 0.5), (0.8, 0.5), ParamRef::param("target.duration"))
                    .with_frame_interval(config.animation.frame_interval()),
            ),
        ),
        Display::new(
            "feedback",
            Box::new(
                Slide::new()
                    .item(SlideItem::new("frame", ItemShape::Frame { thickness: 2 }, (0.5, 0.5), (0.4, 0.3)))
                    .item(SlideItem::new("mark", ItemShape::Dot, (0.5, 0.5), (0.05, 0.05)).in_groups(&[1]))
                    .group(SlideGroup::clock(Duration::from_millis(200)))
                    .group(SlideGroup::clock(Duration::from_millis(300))),
            ),
        ),
    ];
    for unit in &mut units {
        unit.create_instance(&params)
            .with_context(|| format!("Failed to create unit '{}'", unit.name()))?;
    }

    let status = manager
        .compile_and_show(&mut units, &params)
        .context("Show-list failed")?;
    info!("Show-list finished: {:?}", status);

    for record in manager.last_report() {
        info!(
            "{:>14} group {} onset {:>9.3} ms, intended {:?}, corrected {:?}, {:?}",
            record.unit,
            record.group,
            record.onset.as_secs_f64() * 1e3,
            record.intended,
            record.corrected_wait,
            record.path
        );
    }
    for unit in &units {
        for (group, te) in unit.timing().iter().enumerate() {
            if let Some(deviation) = te.deviation {
                info!("{:>14} group {} deviation {:+.3} ms", unit.name(), group, deviation.error_ms());
            }
        }
    }
    info!(
        "Triggers sent: {:?}, front buffer flips: {}",
        triggers.sent(),
        probe.flips()
    );
    Ok(())
}
