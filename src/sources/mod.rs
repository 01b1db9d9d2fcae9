mod weather;
mod web;

pub use weather::{OpenWeatherSource, WeatherSource};
pub use web::{EvidenceSource, WebSearchSource};
