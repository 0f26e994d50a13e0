pub mod level_color;
pub mod spectrum;
