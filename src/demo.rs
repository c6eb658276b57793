//! Minimal demo engine: one centered button on a plain background
//!
//! Renders invalidated areas into a band buffer of `BAND_ROWS` rows and
//! flushes them one band at a time. The button fill follows the pointer.

use fbdev_bridge::engine::{Area, Color, Drivers, Engine, FlushReady, PointerData, PointerState};

/// Rows rendered per flush
const BAND_ROWS: usize = 10;

/// Resolution assumed when no display is attached
const FALLBACK_RESOLUTION: (u32, u32) = (480, 320);

const BUTTON_WIDTH: i32 = 120;
const BUTTON_HEIGHT: i32 = 50;
const BORDER: i32 = 2;

#[derive(Default)]
struct FlushFlag(bool);

impl FlushReady for FlushFlag {
    fn flush_ready(&mut self) {
        self.0 = true;
    }
}

struct Palette {
    background: Color,
    border: Color,
    button: Color,
    button_pressed: Color,
}

impl Palette {
    fn for_depth(bits_per_pixel: u32) -> Self {
        let rgb = |r, g, b| Color::rgb_for_depth(bits_per_pixel, r, g, b);
        Self {
            background: rgb(0x20, 0x24, 0x2c),
            border: rgb(0xe0, 0xe0, 0xe0),
            button: rgb(0x00, 0x78, 0xd4),
            button_pressed: rgb(0x00, 0xa6, 0x51),
        }
    }
}

pub struct DemoEngine {
    palette: Palette,
    width: i32,
    height: i32,
    button: Area,
    pressed: bool,
    invalid: Vec<Area>,
    band: Vec<Color>,
    uptime_ms: u64,
}

impl DemoEngine {
    pub fn new(bits_per_pixel: u32) -> Self {
        Self {
            palette: Palette::for_depth(bits_per_pixel),
            width: 0,
            height: 0,
            button: Area::new(0, 0, -1, -1),
            pressed: false,
            invalid: Vec::new(),
            band: Vec::new(),
            uptime_ms: 0,
        }
    }

    fn invalidate(&mut self, area: Area) {
        self.invalid.push(area);
    }

    fn contains(area: &Area, x: i32, y: i32) -> bool {
        (area.x1..=area.x2).contains(&x) && (area.y1..=area.y2).contains(&y)
    }

    fn color_at(&self, x: i32, y: i32) -> Color {
        if !Self::contains(&self.button, x, y) {
            return self.palette.background;
        }

        let inner = Area::new(
            self.button.x1 + BORDER,
            self.button.y1 + BORDER,
            self.button.x2 - BORDER,
            self.button.y2 - BORDER,
        );
        if !Self::contains(&inner, x, y) {
            self.palette.border
        } else if self.pressed {
            self.palette.button_pressed
        } else {
            self.palette.button
        }
    }

    fn update_pointer(&mut self, data: PointerData) {
        let pressed =
            data.state == PointerState::Pressed && Self::contains(&self.button, data.x, data.y);
        if pressed != self.pressed {
            log::debug!(
                "button {} at {} ms",
                if pressed { "pressed" } else { "released" },
                self.uptime_ms
            );
            self.pressed = pressed;
            self.invalidate(self.button);
        }
    }

    fn redraw(&mut self, area: Area, drivers: &mut Drivers<'_>) {
        let width = area.width();
        let mut y1 = area.y1;

        while y1 <= area.y2 {
            let y2 = (y1 + BAND_ROWS as i32 - 1).min(area.y2);
            let band = Area::new(area.x1, y1, area.x2, y2);

            let mut buffer = std::mem::take(&mut self.band);
            buffer.clear();
            for y in y1..=y2 {
                buffer.extend((0..width as i32).map(|dx| self.color_at(area.x1 + dx, y)));
            }

            let mut ready = FlushFlag::default();
            drivers.display.flush(band, &buffer, &mut ready);
            if !ready.0 {
                log::warn!("flush of {:?} did not signal completion", band);
            }
            self.band = buffer;

            y1 = y2 + 1;
        }
    }
}

impl Engine for DemoEngine {
    fn attach(&mut self, resolution: Option<(u32, u32)>) {
        let (width, height) = resolution.unwrap_or(FALLBACK_RESOLUTION);
        self.width = width as i32;
        self.height = height as i32;

        let x1 = (self.width - BUTTON_WIDTH) / 2;
        let y1 = (self.height - BUTTON_HEIGHT) / 2;
        self.button = Area::new(x1, y1, x1 + BUTTON_WIDTH - 1, y1 + BUTTON_HEIGHT - 1);
        self.band = Vec::with_capacity(width as usize * BAND_ROWS);

        self.invalid.clear();
        self.invalidate(Area::new(0, 0, self.width - 1, self.height - 1));
    }

    fn tick(&mut self, elapsed_ms: u32, drivers: &mut Drivers<'_>) {
        self.uptime_ms += u64::from(elapsed_ms);

        let mut data = PointerData::default();
        drivers.pointer.read(&mut data);
        self.update_pointer(data);

        for area in std::mem::take(&mut self.invalid) {
            self.redraw(area, drivers);
        }
    }
}
