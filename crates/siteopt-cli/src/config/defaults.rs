use siteopt::engine::config::Strategy;

/// Values used when neither the command line nor the config file sets them.
/// Engine tuning knobs fall back to the library's own `Default` impls instead.
pub struct DefaultsConfig {
    pub count: usize,
    pub min_distance: f64,
    pub strategy: Strategy,
    pub top_n: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            count: 10,
            min_distance: 100.0,
            strategy: Strategy::PeakSuppression,
            top_n: 10,
        }
    }
}
