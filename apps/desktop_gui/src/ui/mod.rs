//! UI layer for desktop GUI: app shell, tab panels and the map canvas.

pub mod app;
pub mod canvas;
pub mod panels;

pub use app::{AppPaths, DesktopGuiApp, StartupConfig};
