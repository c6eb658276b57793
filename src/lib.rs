//! Linux framebuffer + touchscreen bridge
//!
//! Connects a retained-mode graphics engine to a memory-mapped fbdev
//! display and an evdev touchscreen.
//!
//! # Architecture
//!
//! ```text
//!              Engine (external)
//!          flush │          ▲ pointer
//!                ▼          │
//! ┌────────────────────┐  ┌──────────────┐
//! │ FramebufferDisplay │  │  TouchInput  │
//! │      (blit)        │  │   (tsconf)   │
//! └─────────┬──────────┘  └──────┬───────┘
//!           ▼                    │
//! ┌────────────────────┐  ┌──────┴───────┐
//! │ FramebufferDevice  │  │ EvdevSource  │
//! │   ioctl + mmap     │  │ input_event  │
//! └─────────┬──────────┘  └──────┬───────┘
//!           ▼                    ▼
//!       /dev/fbN          /dev/input/eventN
//! ```
//!
//! `DisplayBridge` owns both drivers and the engine, and runs the tick loop
//! on a single thread.

pub mod bridge;
pub mod config;
pub mod engine;
pub mod error;
pub mod framebuffer;
pub mod touch;

// Re-export main types
pub use bridge::{init_display, init_touch, DisplayBridge};
pub use config::BridgeConfig;
pub use engine::{Area, Color, DisplayDriver, Drivers, Engine, FlushReady, PointerData, PointerDriver, PointerState};
pub use error::{Error, Result};
pub use framebuffer::{DeviceGeometry, FramebufferDevice, FramebufferDisplay, MemorySurface, Surface};
pub use touch::{TouchInput, TouchSample, TouchState};
