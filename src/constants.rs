//! Application-wide defaults, validation limits and exit codes.

// Application metadata
pub const APP_NAME: &str = "duskswitch";
pub const CONFIG_FILE_NAME: &str = "duskswitch.toml";
pub const SETTINGS_FILE_NAME: &str = "settings.toml";
pub const SETTINGS_LOCK_FILE_NAME: &str = "settings.lock";
pub const THEME_STATE_FILE_NAME: &str = "theme_state.json";

// Geocoder defaults
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/search";
pub const DEFAULT_GEOCODE_TIMEOUT: u64 = 10; // seconds
pub const GEOCODER_USER_AGENT: &str = concat!(
    "duskswitch/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/duskswitch/duskswitch)"
);
pub const GEOCODER_MIN_REQUEST_INTERVAL_MS: u64 = 1000;

// Scheduler defaults
pub const DEFAULT_APPLY_TIMEOUT: u64 = 5; // seconds
pub const DEFAULT_RETRY_INTERVAL: u64 = 60; // seconds
pub const DEFAULT_CLOCK_CHECK_INTERVAL: u64 = 30; // seconds
pub const MIN_RECHECK_DELAY_SECS: i64 = 1;

// Validation limits
pub const MINIMUM_GEOCODE_TIMEOUT: u64 = 1;
pub const MAXIMUM_GEOCODE_TIMEOUT: u64 = 60;
pub const MINIMUM_APPLY_TIMEOUT: u64 = 1;
pub const MAXIMUM_APPLY_TIMEOUT: u64 = 60;
pub const MINIMUM_RETRY_INTERVAL: u64 = 5;
pub const MAXIMUM_RETRY_INTERVAL: u64 = 3600;
pub const MINIMUM_CLOCK_CHECK_INTERVAL: u64 = 1;
pub const MAXIMUM_CLOCK_CHECK_INTERVAL: u64 = 600;

// Solar settings limits
pub const MAXIMUM_SUNSET_OFFSET_MINUTES: u32 = 720;

// Solar calculation
pub const SECONDS_PER_DAY: i64 = 86_400;
pub const NEXT_TRANSITION_SEARCH_DAYS: i64 = 400;
pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %:z";

// Exit codes
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

#[cfg(test)]
pub mod test_constants {
    // Shanghai, the reference location for midsummer checks
    pub const TEST_SHANGHAI_LAT: f64 = 31.2304;
    pub const TEST_SHANGHAI_LON: f64 = 121.4737;

    // Tromsø, inside the Arctic circle
    pub const TEST_TROMSO_LAT: f64 = 69.6492;
    pub const TEST_TROMSO_LON: f64 = 18.9553;
}
