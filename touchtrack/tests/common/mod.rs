use touchtrack::{RawFrame, TouchConfig, TouchFrame, TouchTracker};

// Init logger for tests
#[ctor::ctor]
pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

/// 40 x 60 sensor lines on a 1080 x 1920 screen, everything else default
pub fn test_config() -> TouchConfig {
    let mut config = TouchConfig::default();
    config.drv_num = 40;
    config.sen_num = 60;
    config.drv_num_nokey = 40;
    config.sen_num_nokey = 60;
    config.screen_x_max = 1080;
    config.screen_y_max = 1920;
    config
}

pub fn create_test_tracker(config: TouchConfig) -> TouchTracker {
    let mut tracker = TouchTracker::new();
    tracker.init(config);
    tracker
}

/// Feed `frames` of raw `(x, y)` samples and collect every output frame
pub fn run_frames(tracker: &mut TouchTracker, frames: &[&[(u32, u32)]]) -> Vec<TouchFrame> {
    frames
        .iter()
        .map(|points| tracker.process_frame(&RawFrame::from_points(points)))
        .collect()
}

/// Screen position of a raw sample under [`test_config`]
pub fn mapped(x: u32, y: u32) -> (u16, u16) {
    ((x * 1080 / 2560) as u16, (y * 1920 / 3840) as u16)
}
