//! Rendering subsystem: the semantic color scheme, menu renderer, paged
//! content viewer, and the fixed status bar.

pub mod colors;
pub mod menu;
pub mod pager;
pub mod statusbar;

pub use colors::ColorScheme;
pub use menu::{MenuRenderer, MenuView};
pub use pager::Pager;
pub use statusbar::{StatusBar, StatusBarManager};
