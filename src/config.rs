//! Window and run loop configuration.

/// Initial window settings.
#[derive(Clone, Debug)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: String::from("flow-twodee"),
            width: 800,
            height: 600,
        }
    }
}

/// Settings consumed by [`crate::flow::run`].
///
/// - `window` controls the title and initial inner size
/// - `clear_colour` is used to clear the frame before the layers render
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub clear_colour: wgpu::Color,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            clear_colour: wgpu::Color::BLACK,
        }
    }
}
