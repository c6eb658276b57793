//! fbdev-bridge
//!
//! Drives a small demo UI on a Linux framebuffer with touchscreen input.
//! Takes no arguments; configuration comes from the environment:
//!
//! ```bash
//! # Defaults: /dev/fb0, /dev/input/event0, /etc/ts.conf, /etc/pointercal
//! fbdev-bridge
//!
//! # tslib-style overrides
//! TSLIB_FBDEVICE=/dev/fb1 TSLIB_TSDEVICE=/dev/input/event2 fbdev-bridge
//!
//! # Optional TOML file (tick period, forced mode, ...)
//! FBBRIDGE_CONFIG=/etc/fbdev-bridge.toml RUST_LOG=debug fbdev-bridge
//! ```
//!
//! Runs until SIGINT or SIGTERM.

mod demo;

use anyhow::{Context, Result};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use demo::DemoEngine;
use fbdev_bridge::{init_display, init_touch, BridgeConfig, DisplayBridge};

/// Set from the signal handler, checked once per tick
static STOP: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_stop(_: libc::c_int) {
    STOP.store(true, Ordering::SeqCst);
}

/// Install SIGINT/SIGTERM handlers without SA_RESTART, so a blocking touch
/// read returns EINTR and the loop gets to see the stop flag.
fn install_signal_handlers() -> io::Result<()> {
    for signal in [libc::SIGINT, libc::SIGTERM] {
        // SAFETY: zeroed sigaction is a valid "no flags, empty mask" value
        let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
        action.sa_sigaction = handle_stop as extern "C" fn(libc::c_int) as libc::sighandler_t;

        // SAFETY: the handler only stores to an atomic
        let rc = unsafe {
            libc::sigemptyset(&mut action.sa_mask);
            libc::sigaction(signal, &action, std::ptr::null_mut())
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = BridgeConfig::from_env().context("Failed to load configuration")?;
    log::debug!("{:?}", config);

    install_signal_handlers().context("Failed to install signal handlers")?;

    let display = init_display(&config);
    let touch = init_touch(&config);

    let depth = display
        .surface()
        .map(|device| device.geometry().bits_per_pixel)
        .unwrap_or(32);

    let mut bridge = DisplayBridge::new(
        DemoEngine::new(depth),
        display,
        touch,
        config.tick_period(),
    );
    bridge.run(&STOP);

    let (_engine, display, _touch) = bridge.into_parts();
    if let Some(device) = display.into_surface() {
        device.close();
    }

    Ok(())
}
