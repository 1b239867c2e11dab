// Status-line macros for user-facing output. Logs go through tracing;
// these are the short lines a person running the tool reads.

use owo_colors::OwoColorize;
use std::sync::atomic::{AtomicBool, Ordering};

static USE_COLOR: AtomicBool = AtomicBool::new(false);

pub fn set_color(enabled: bool) {
    USE_COLOR.store(enabled, Ordering::Relaxed);
}

fn paint(icon: &'static str, style: fn(&'static str) -> String) -> String {
    if USE_COLOR.load(Ordering::Relaxed) {
        style(icon)
    } else {
        icon.to_string()
    }
}

pub fn icon_ok() -> String {
    paint("✔", |s| s.green().to_string())
}

pub fn icon_info() -> String {
    paint("ℹ", |s| s.cyan().to_string())
}

pub fn icon_warn() -> String {
    paint("⚠", |s| s.yellow().to_string())
}

#[macro_export]
macro_rules! ui_ok {
    ($($arg:tt)*) => {{
        println!("{} {}", $crate::ui::icon_ok(), format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! ui_info {
    ($($arg:tt)*) => {{
        eprintln!("{} {}", $crate::ui::icon_info(), format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! ui_warn {
    ($($arg:tt)*) => {{
        eprintln!("{} {}", $crate::ui::icon_warn(), format_args!($($arg)*));
    }};
}
