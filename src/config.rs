use serde::{Deserialize, Serialize};
use std::fs;
use std::env;
use std::path::Path;
use anyhow::{Result, Context};

pub const DEFAULT_CONFIG_PATH: &str = "data/config.yaml";
pub const CITY_PLACEHOLDER: &str = "{city}";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub cities: Vec<String>,
    #[serde(default = "default_max_price")]
    pub max_price: i64,
    #[serde(default = "default_min_area")]
    pub min_area: i64,
    #[serde(default = "default_require_furnished")]
    pub require_furnished: bool,
    #[serde(default = "default_check_interval_seconds")]
    pub check_interval_seconds: u64,
    pub ntfy_url: String,
    #[serde(default = "default_ntfy_tags")]
    pub ntfy_tags: String,
    /// Seen-set location; defaults by backend, see `seen_store_path`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<String>,
    #[serde(default)]
    pub cache_backend: CacheBackend,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    #[serde(default)]
    pub pararius: ParariusConfig,
    #[serde(default)]
    pub kamernet: KamernetConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Newline-delimited list of links
    #[default]
    File,
    Sqlite,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ParariusConfig {
    pub enabled: bool,
    pub search_url: String,
    pub selectors: ParariusSelectors,
}

impl Default for ParariusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            search_url: "https://www.pararius.com/apartments/{city}/huurperiode-6-600".to_string(),
            selectors: ParariusSelectors::default(),
        }
    }
}

/// CSS selectors for Pararius markup. These track the live site and break
/// whenever it is redesigned, so they can be overridden from the config file.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ParariusSelectors {
    pub candidate: String,
    pub link: String,
    pub title: String,
    pub location: String,
    pub price: String,
    pub area: String,
    pub rooms: String,
    pub interior: String,
    pub utilities_badge: String,
    pub features: String,
}

impl Default for ParariusSelectors {
    fn default() -> Self {
        Self {
            candidate: "ul.search-list > li.search-list__item--listing".to_string(),
            link: "a.listing-search-item__link[href]".to_string(),
            title: "h2.listing-search-item__title".to_string(),
            location: "div.listing-search-item__sub-title".to_string(),
            price: "div.listing-search-item__price".to_string(),
            area: "li.illustrated-features__item--surface-area".to_string(),
            rooms: "li.illustrated-features__item--number-of-rooms".to_string(),
            interior: "li.illustrated-features__item--interior".to_string(),
            utilities_badge: "wc-price-transparency-badge".to_string(),
            features: "ul.listing-features__sub-description".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct KamernetConfig {
    pub enabled: bool,
    pub search_url: String,
    pub selectors: KamernetSelectors,
}

impl Default for KamernetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // radius 4 = 5km, 2 persons
            search_url: "https://kamernet.nl/en/for-rent/properties-{city}?radius=4&suitableForNumberOfPersons=2".to_string(),
            selectors: KamernetSelectors::default(),
        }
    }
}

/// CSS selectors for Kamernet markup (search cards and listing page)
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct KamernetSelectors {
    pub candidate: String,
    pub name: String,
    pub overview: String,
    pub detail_row: String,
    pub price: String,
    pub utilities: String,
    pub area: String,
    pub interior: String,
    pub location: String,
}

impl Default for KamernetSelectors {
    fn default() -> Self {
        Self {
            candidate: "[class*=\"SearchResultCard_root__\"]".to_string(),
            name: "#page-content > section > h3".to_string(),
            overview: "div[class*=\"ListingFound\"] > section > div[class^=\"Overview\"]".to_string(),
            detail_row: "[class*=\"PropertyDetails_row___\"]".to_string(),
            price: "[class*=\"PropertyDetails_price__\"]".to_string(),
            utilities: "p".to_string(),
            area: "h6".to_string(),
            interior: "p".to_string(),
            location: "#map > p[class*=\"CommonStyles_margin_bottom_2__\"]".to_string(),
        }
    }
}

fn default_max_price() -> i64 {
    1600
}

fn default_min_area() -> i64 {
    25
}

fn default_require_furnished() -> bool {
    true
}

fn default_check_interval_seconds() -> u64 {
    180 // 3 minutes
}

fn default_ntfy_tags() -> String {
    "house".to_string()
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64)".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    30
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        let mut config = Self::from_yaml(&config_str)?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_yaml(config_str: &str) -> Result<Self> {
        serde_yaml::from_str(config_str).context("Failed to parse config YAML")
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(cities) = env::var("CITIES") {
            // Parse comma-separated cities
            self.cities = cities.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(max_price) = env::var("MAX_PRICE") {
            self.max_price = max_price.parse()
                .context("Failed to parse MAX_PRICE environment variable")?;
        }

        if let Ok(min_area) = env::var("MIN_AREA") {
            self.min_area = min_area.parse()
                .context("Failed to parse MIN_AREA environment variable")?;
        }

        if let Ok(require_furnished) = env::var("REQUIRE_FURNISHED") {
            self.require_furnished = require_furnished.parse()
                .context("Failed to parse REQUIRE_FURNISHED environment variable")?;
        }

        if let Ok(check_interval) = env::var("CHECK_INTERVAL_SECONDS") {
            self.check_interval_seconds = check_interval.parse()
                .context("Failed to parse CHECK_INTERVAL_SECONDS environment variable")?;
        }

        if let Ok(ntfy_url) = env::var("NTFY_URL") {
            self.ntfy_url = ntfy_url;
        }

        if let Ok(cache_path) = env::var("CACHE_PATH") {
            self.cache_path = Some(cache_path);
        }

        if let Ok(tracing_level) = env::var("TRACING_LEVEL") {
            self.tracing_level = tracing_level;
        }

        if let Ok(user_agent) = env::var("USER_AGENT") {
            self.user_agent = user_agent;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.cities.is_empty() {
            anyhow::bail!("At least one city is required (set via config file or CITIES env var)");
        }

        if self.ntfy_url.trim().is_empty() {
            anyhow::bail!("ntfy_url is required (set via config file or NTFY_URL env var)");
        }

        if self.check_interval_seconds == 0 {
            anyhow::bail!("check_interval_seconds must be greater than zero");
        }

        if self.request_timeout_seconds == 0 {
            anyhow::bail!("request_timeout_seconds must be greater than zero");
        }

        if self.pararius.enabled && !self.pararius.search_url.contains(CITY_PLACEHOLDER) {
            anyhow::bail!("pararius.search_url must contain the {} placeholder", CITY_PLACEHOLDER);
        }

        if self.kamernet.enabled && !self.kamernet.search_url.contains(CITY_PLACEHOLDER) {
            anyhow::bail!("kamernet.search_url must contain the {} placeholder", CITY_PLACEHOLDER);
        }

        Ok(())
    }

    pub fn is_multi_city(&self) -> bool {
        self.cities.len() > 1
    }

    /// Configured `cache_path`, or the backend's default file.
    pub fn seen_store_path(&self) -> &str {
        match (&self.cache_path, self.cache_backend) {
            (Some(path), _) => path,
            (None, CacheBackend::File) => "data/cache.txt",
            (None, CacheBackend::Sqlite) => "data/seen.db",
        }
    }

    pub fn create_default(path: &str) -> Result<()> {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent)?;
        }

        let default_config = Config {
            cities: vec!["eindhoven".to_string()],
            max_price: default_max_price(),
            min_area: default_min_area(),
            require_furnished: default_require_furnished(),
            check_interval_seconds: default_check_interval_seconds(),
            ntfy_url: "https://ntfy.sh/YOUR_TOPIC".to_string(),
            ntfy_tags: default_ntfy_tags(),
            cache_path: None,
            cache_backend: CacheBackend::File,
            tracing_level: default_tracing_level(),
            user_agent: default_user_agent(),
            request_timeout_seconds: default_request_timeout_seconds(),
            pararius: ParariusConfig::default(),
            kamernet: KamernetConfig::default(),
        };

        let config_str = serde_yaml::to_string(&default_config)?;
        fs::write(path, config_str)?;
        Ok(())
    }
}

/// Fills the `{city}` placeholder of a search URL template.
pub fn search_url_for(template: &str, city: &str) -> String {
    template.replace(CITY_PLACEHOLDER, &urlencoding::encode(city))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
cities: [eindhoven, veldhoven]
ntfy_url: https://ntfy.sh/mytopic
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.cities, vec!["eindhoven", "veldhoven"]);
        assert_eq!(config.max_price, 1600);
        assert_eq!(config.min_area, 25);
        assert!(config.require_furnished);
        assert_eq!(config.check_interval_seconds, 180);
        assert_eq!(config.ntfy_tags, "house");
        assert_eq!(config.cache_backend, CacheBackend::File);
        assert_eq!(config.seen_store_path(), "data/cache.txt");
        assert!(config.pararius.enabled);
        assert!(config.kamernet.search_url.contains("{city}"));
        assert!(config.is_multi_city());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_selector_override_keeps_other_defaults() {
        let yaml = r#"
cities: [eindhoven]
ntfy_url: https://ntfy.sh/mytopic
cache_backend: sqlite
pararius:
  selectors:
    price: span.price
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.cache_backend, CacheBackend::Sqlite);
        assert_eq!(config.seen_store_path(), "data/seen.db");
        assert_eq!(config.pararius.selectors.price, "span.price");
        assert_eq!(config.pararius.selectors.title, "h2.listing-search-item__title");
        assert!(config.pararius.enabled);
        assert!(!config.is_multi_city());
    }

    #[test]
    fn test_validate_rejects_missing_cities() {
        let mut config = Config::from_yaml(MINIMAL).unwrap();
        config.cities.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::from_yaml(MINIMAL).unwrap();
        config.request_timeout_seconds = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("request_timeout_seconds"));
    }

    #[test]
    fn test_explicit_cache_path_wins_over_backend_default() {
        let yaml = r#"
cities: [eindhoven]
ntfy_url: https://ntfy.sh/mytopic
cache_backend: sqlite
cache_path: /var/lib/rentwatch/links.sqlite
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.seen_store_path(), "/var/lib/rentwatch/links.sqlite");
    }

    #[test]
    fn test_validate_rejects_template_without_placeholder() {
        let mut config = Config::from_yaml(MINIMAL).unwrap();
        config.kamernet.search_url = "https://kamernet.nl/en/for-rent/properties-eindhoven".to_string();
        assert!(config.validate().is_err());

        config.kamernet.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_search_url_for_encodes_city() {
        let url = search_url_for("https://www.pararius.com/apartments/{city}/huurperiode-6-600", "den haag");
        assert_eq!(url, "https://www.pararius.com/apartments/den%20haag/huurperiode-6-600");
    }

    #[test]
    fn test_create_default_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("config.yaml");
        let path = path.to_str().unwrap();

        Config::create_default(path).unwrap();
        let config = Config::from_yaml(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(config.cities, vec!["eindhoven"]);
        assert_eq!(config.kamernet.selectors.area, "h6");
        assert_eq!(config.cache_path, None);
    }
}
