use crate::ui::{theme, Icons, Tone};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    eprintln!("{} {}", Icons::ROCKET, text.style(theme().style(Tone::Header)));
}

pub fn success(label: &str) {
    eprintln!("{} {}", Icons::CHECK, label.style(theme().style(Tone::Success)));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().style(Tone::Error)));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().style(Tone::Warn)));
}

pub fn info(label: &str, value: &str) {
    eprintln!(
        "{} {}: {}",
        Icons::INFO.style(theme().style(Tone::Info)),
        label.style(theme().style(Tone::Dim)),
        value
    );
}
