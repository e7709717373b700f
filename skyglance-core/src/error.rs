use reqwest::StatusCode;

/// Message shown to the user for any failed weather fetch.
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch weather data. Please try again.";

/// Failure of a single weather fetch.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    /// The provider answered with a non-2xx status (unknown city, bad key, outage).
    #[error("Weather data not found (HTTP {status})")]
    NotFound { status: StatusCode },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to parse weather response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl WeatherError {
    /// All fetch failures collapse to one message at the view boundary.
    pub fn user_message(&self) -> &'static str {
        FETCH_FAILED_MESSAGE
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location capability unavailable")]
    Unavailable,
    #[error("Location permission denied")]
    Denied,
    #[error("Location lookup failed: {0}")]
    Failed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize store: {0}")]
    Serialize(#[from] serde_json::Error),
}
