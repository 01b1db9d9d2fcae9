use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

/// Built-in city coordinates used when no gazetteer file is configured.
const BUILTIN_CITIES: &[(&str, f64, f64)] = &[
    ("toronto", 43.6532, -79.3832),
    ("mississauga", 43.5890, -79.6441),
    ("vancouver", 49.2827, -123.1207),
    ("montreal", 45.5017, -73.5673),
    ("calgary", 51.0447, -114.0719),
    ("ottawa", 45.4215, -75.6972),
    ("edmonton", 53.5461, -113.4938),
    ("winnipeg", 49.8951, -97.1384),
    ("quebec city", 46.8139, -71.2080),
    ("hamilton", 43.2557, -79.8711),
];

/// Fixed lookup from location names to coordinates. Loaded once at startup;
/// an optional JSON file named by `PLACES_JSON_PATH` (a `{"city": [lat, lon]}`
/// map) extends or overrides the built-in table.
#[derive(Debug, Clone)]
pub struct Gazetteer {
    cities: BTreeMap<String, (f64, f64)>,
}

impl Gazetteer {
    pub fn builtin() -> Self {
        let cities = BUILTIN_CITIES
            .iter()
            .map(|(name, lat, lon)| (name.to_string(), (*lat, *lon)))
            .collect();
        Gazetteer { cities }
    }

    /// Loads the gazetteer, merging `PLACES_JSON_PATH` over the built-in
    /// table when the variable is set. A missing or malformed file logs a
    /// warning and leaves the built-ins untouched.
    pub fn from_env() -> Self {
        let mut gazetteer = Self::builtin();

        const PLACES_JSON_PATH_ENV: &str = "PLACES_JSON_PATH";
        let json_path = match env::var(PLACES_JSON_PATH_ENV) {
            Ok(path) => path,
            Err(_) => return gazetteer,
        };

        if !Path::new(&json_path).exists() {
            warn!("places file does not exist, using built-in cities: {}", json_path);
            return gazetteer;
        }

        match fs::read_to_string(&json_path)
            .map_err(|e| e.to_string())
            .and_then(|data| serde_json::from_str::<Value>(&data).map_err(|e| e.to_string()))
        {
            Ok(Value::Object(entries)) => {
                for (name, coords) in entries {
                    if let (Some(lat), Some(lon)) = (
                        coords.get(0).and_then(Value::as_f64),
                        coords.get(1).and_then(Value::as_f64),
                    ) {
                        gazetteer.cities.insert(name.to_lowercase(), (lat, lon));
                    }
                }
                info!("loaded {} gazetteer entries from {}", gazetteer.cities.len(), json_path);
            }
            Ok(_) => warn!("places file is not a JSON object: {}", json_path),
            Err(err) => warn!("failed to load places file {}: {}", json_path, err),
        }

        gazetteer
    }

    /// Case-insensitive substring match of known city names against a
    /// free-text location. Returns the first match in name order.
    pub fn resolve(&self, location: &str) -> Option<(f64, f64)> {
        let location = location.to_lowercase();
        self.cities
            .iter()
            .find(|(name, _)| location.contains(name.as_str()))
            .map(|(_, coords)| *coords)
    }

    /// Resolves `location`, falling back to `default_city` (which is expected
    /// to be in the table), then to Toronto as the last resort.
    pub fn resolve_or_default(&self, location: &str, default_city: &str) -> (f64, f64) {
        if let Some(coords) = self.resolve(location) {
            return coords;
        }
        warn!("location '{}' not in gazetteer, defaulting to {}", location, default_city);
        self.resolve(default_city).unwrap_or((43.6532, -79.3832))
    }

    /// Known city names that appear within the given text, lowercase.
    pub fn find_in_text(&self, text: &str) -> Option<&str> {
        let text = text.to_lowercase();
        self.cities
            .keys()
            .find(|name| text.contains(name.as_str()))
            .map(|name| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_city_in_free_text() {
        let gazetteer = Gazetteer::builtin();
        let (lat, lon) = gazetteer.resolve("downtown Toronto core").unwrap();
        assert!((lat - 43.6532).abs() < 1e-6);
        assert!((lon + 79.3832).abs() < 1e-6);
    }

    #[test]
    fn unknown_location_falls_back_to_default() {
        let gazetteer = Gazetteer::builtin();
        let coords = gazetteer.resolve_or_default("Atlantis", "Vancouver");
        assert_eq!(coords, (49.2827, -123.1207));
    }

    #[test]
    fn finds_city_mention_in_question() {
        let gazetteer = Gazetteer::builtin();
        let hit = gazetteer.find_in_text("Was Montreal affected by the storm?");
        assert_eq!(hit, Some("montreal"));
        assert_eq!(gazetteer.find_in_text("nothing here"), None);
    }
}
