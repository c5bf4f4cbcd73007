pub mod icons;
pub mod output;
pub mod theme;

pub use icons::Icons;
pub use output::{error, header, info, success, warn};
pub use theme::{theme, Theme, Tone};
