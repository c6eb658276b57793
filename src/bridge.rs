//! # Display bridge
//!
//! Wires the framebuffer flush driver and the touch pointer driver to the
//! engine and runs the cooperative tick loop:
//!
//! ```text
//! loop until stop:
//!     engine.tick(elapsed_ms, { display, pointer })
//!     sleep(period)
//! ```
//!
//! Everything runs on the calling thread. Device setup degrades instead of
//! failing: a display that cannot be opened or mapped leaves an inert flush
//! driver, and a touch device that cannot be opened reports a released
//! pointer at the origin.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::BridgeConfig;
use crate::engine::{DisplayDriver, Drivers, Engine};
use crate::framebuffer::{FramebufferDevice, FramebufferDisplay, Surface};
use crate::touch::TouchInput;

/// Engine plus the drivers it runs against
pub struct DisplayBridge<E, S> {
    engine: E,
    display: FramebufferDisplay<S>,
    touch: TouchInput,
    period: Duration,
    last_tick: Instant,
    ticks: u64,
}

impl<E: Engine, S: Surface> DisplayBridge<E, S> {
    /// Attach the drivers to `engine`
    pub fn new(
        mut engine: E,
        display: FramebufferDisplay<S>,
        touch: TouchInput,
        period: Duration,
    ) -> Self {
        engine.attach(display.resolution());

        Self {
            engine,
            display,
            touch,
            period,
            last_tick: Instant::now(),
            ticks: 0,
        }
    }

    /// Service one engine tick
    pub fn run_once(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick).as_millis();
        self.last_tick = now;

        let mut drivers = Drivers {
            display: &mut self.display,
            pointer: &mut self.touch,
        };
        self.engine
            .tick(u32::try_from(elapsed).unwrap_or(u32::MAX), &mut drivers);
        self.ticks += 1;
    }

    /// Tick, sleep, repeat until `stop` is set; returns the tick count
    pub fn run(&mut self, stop: &AtomicBool) -> u64 {
        log::info!("tick loop started ({} ms period)", self.period.as_millis());

        while !stop.load(Ordering::SeqCst) {
            self.run_once();
            thread::sleep(self.period);
        }

        log::info!("tick loop stopped after {} ticks", self.ticks);
        self.ticks
    }

    /// Ticks serviced so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn display(&self) -> &FramebufferDisplay<S> {
        &self.display
    }

    pub fn touch(&self) -> &TouchInput {
        &self.touch
    }

    /// Take the parts back, e.g. to close the devices in order
    pub fn into_parts(self) -> (E, FramebufferDisplay<S>, TouchInput) {
        (self.engine, self.display, self.touch)
    }
}

/// Open, optionally reconfigure, and map the framebuffer
///
/// Any failure is logged; the returned driver is then detached or unmapped
/// and every flush becomes a no-op.
pub fn init_display(config: &BridgeConfig) -> FramebufferDisplay<FramebufferDevice> {
    let mut device = match FramebufferDevice::open(&config.framebuffer) {
        Ok(device) => device,
        Err(e) => {
            log::error!("display disabled: {}", e);
            return FramebufferDisplay::detached();
        }
    };

    if let Some(mode) = config.mode {
        if let Err(e) = device.reconfigure(mode.bits_per_pixel, mode.width, mode.height) {
            log::error!("keeping current display mode: {}", e);
        }
    }

    if let Err(e) = device.geometry().pixel_unit() {
        log::error!("{}: {}; flushes will be ignored", device.path().display(), e);
    }

    if let Err(e) = device.map() {
        log::error!("display output disabled: {}", e);
    }

    FramebufferDisplay::new(device)
}

/// Open and configure the touchscreen, or fall back to a disconnected input
pub fn init_touch(config: &BridgeConfig) -> TouchInput {
    match TouchInput::open(&config.touch_device, config.samples_per_read) {
        Ok(mut touch) => {
            touch.configure(&config.touch_conf_file, &config.calibration_file);
            touch
        }
        Err(e) => {
            log::error!("touch input disabled: {}", e);
            TouchInput::disconnected()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Area, Color, FlushReady, PointerData, PointerState};
    use crate::framebuffer::{DeviceGeometry, MemorySurface};
    use crate::touch::{RawSample, SampleSource, TouchError};
    use std::path::PathBuf;
    use std::sync::Arc;

    #[derive(Default)]
    struct Ready(u32);

    impl FlushReady for Ready {
        fn flush_ready(&mut self) {
            self.0 += 1;
        }
    }

    /// Flushes one fixed area per tick and records what it saw
    struct RecordingEngine {
        area: Area,
        colors: Vec<Color>,
        resolution: Option<Option<(u32, u32)>>,
        flushes_completed: u32,
        pointer: Vec<PointerData>,
        stop_after: Option<(u32, Arc<AtomicBool>)>,
    }

    impl RecordingEngine {
        fn new(area: Area, colors: Vec<Color>) -> Self {
            Self {
                area,
                colors,
                resolution: None,
                flushes_completed: 0,
                pointer: Vec::new(),
                stop_after: None,
            }
        }
    }

    impl Engine for RecordingEngine {
        fn attach(&mut self, resolution: Option<(u32, u32)>) {
            self.resolution = Some(resolution);
        }

        fn tick(&mut self, _elapsed_ms: u32, drivers: &mut Drivers<'_>) {
            let mut ready = Ready::default();
            drivers.display.flush(self.area, &self.colors, &mut ready);
            self.flushes_completed += ready.0;

            let mut data = PointerData::default();
            drivers.pointer.read(&mut data);
            self.pointer.push(data);

            if let Some((limit, stop)) = &self.stop_after {
                if self.pointer.len() as u32 >= *limit {
                    stop.store(true, Ordering::SeqCst);
                }
            }
        }
    }

    struct Repeat(RawSample);

    impl SampleSource for Repeat {
        fn read_sample(&mut self) -> Result<RawSample, TouchError> {
            Ok(self.0)
        }
    }

    fn words(values: &[u32]) -> Vec<Color> {
        values.iter().copied().map(Color::from_full).collect()
    }

    #[test]
    fn test_tick_flushes_into_surface() {
        let geometry = DeviceGeometry::packed(320, 480, 16).with_stride(640);
        let engine = RecordingEngine::new(Area::new(0, 0, 1, 1), words(&[1, 2, 3, 4]));
        let touch = TouchInput::from_source(Repeat(RawSample::new(40, 50, 11)), 1);
        let mut bridge = DisplayBridge::new(
            engine,
            FramebufferDisplay::new(MemorySurface::new(geometry)),
            touch,
            Duration::ZERO,
        );

        bridge.run_once();

        assert_eq!(bridge.engine().resolution, Some(Some((320, 480))));
        assert_eq!(bridge.engine().flushes_completed, 1);
        assert_eq!(
            bridge.engine().pointer,
            vec![PointerData { x: 40, y: 50, state: PointerState::Pressed }]
        );

        let surface = bridge.display().surface().unwrap();
        assert_eq!(surface.pixel(0, 0), Some(1));
        assert_eq!(surface.pixel(1, 1), Some(4));
    }

    #[test]
    fn test_detached_display_keeps_touch_working() {
        let engine = RecordingEngine::new(Area::new(0, 0, 0, 0), words(&[9]));
        let touch = TouchInput::from_source(Repeat(RawSample::new(7, 8, 200)), 1);
        let mut bridge: DisplayBridge<_, MemorySurface> =
            DisplayBridge::new(engine, FramebufferDisplay::detached(), touch, Duration::ZERO);

        bridge.run_once();
        bridge.run_once();

        let engine = bridge.engine();
        assert_eq!(engine.resolution, Some(None));
        assert_eq!(engine.flushes_completed, 2);
        assert!(engine.pointer.iter().all(|p| p.state == PointerState::Pressed));
        assert_eq!(bridge.display().pixels_written(), 0);
    }

    #[test]
    fn test_offscreen_area_still_completes() {
        let geometry = DeviceGeometry::packed(64, 64, 32);
        let engine = RecordingEngine::new(Area::new(-5, -5, -1, -1), vec![Color::default(); 25]);
        let mut bridge = DisplayBridge::new(
            engine,
            FramebufferDisplay::new(MemorySurface::new(geometry)),
            TouchInput::disconnected(),
            Duration::ZERO,
        );

        bridge.run_once();

        assert_eq!(bridge.engine().flushes_completed, 1);
        assert_eq!(bridge.engine().pointer, vec![PointerData::default()]);
        assert_eq!(bridge.display().pixels_written(), 0);
    }

    #[test]
    fn test_run_honors_stop_flag() {
        let stop = Arc::new(AtomicBool::new(false));
        let mut engine = RecordingEngine::new(Area::new(0, 0, 0, 0), words(&[1]));
        engine.stop_after = Some((3, Arc::clone(&stop)));

        let mut bridge: DisplayBridge<_, MemorySurface> = DisplayBridge::new(
            engine,
            FramebufferDisplay::detached(),
            TouchInput::disconnected(),
            Duration::from_millis(1),
        );

        assert_eq!(bridge.run(&stop), 3);
        assert_eq!(bridge.engine().pointer.len(), 3);
    }

    #[test]
    fn test_run_with_stop_already_set() {
        let stop = AtomicBool::new(true);
        let engine = RecordingEngine::new(Area::new(0, 0, 0, 0), words(&[1]));
        let mut bridge: DisplayBridge<_, MemorySurface> = DisplayBridge::new(
            engine,
            FramebufferDisplay::detached(),
            TouchInput::disconnected(),
            Duration::from_millis(5),
        );
        assert_eq!(bridge.run(&stop), 0);
    }

    #[test]
    fn test_init_with_missing_devices_degrades() {
        let config = BridgeConfig {
            framebuffer: PathBuf::from("/nonexistent/fb0"),
            touch_device: PathBuf::from("/nonexistent/event0"),
            ..BridgeConfig::default()
        };

        let display = init_display(&config);
        assert!(display.surface().is_none());

        let mut touch = init_touch(&config);
        assert!(!touch.is_connected());
        assert!(!touch.poll().is_pressed());
    }
}
