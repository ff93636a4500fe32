use crate::config::WeatherConfig;
use log::{debug, info};
use serde::Deserialize;
use std::time::Duration;
use ureq::{Agent, AgentBuilder};

/// Something that knows what the weather is. Looking a place up and fetching
/// its weather are separate steps, so a bad city name can be rejected before
/// we commit to it.
pub trait ForecastSource {
    /// Whatever the source needs to find the place again later
    type Place;

    /// Look up a place by name. The name is passed through as-is, so
    /// qualifiers like country codes (`London, CA`) are up to the source.
    fn resolve(&mut self, query: &str) -> Result<Self::Place, ForecastError>;

    /// Get current conditions for a previously resolved place
    fn fetch(&mut self, place: &Self::Place) -> Result<Reading, ForecastError>;
}

/// Everything that can go wrong getting weather. None of these are fatal on
/// their own; the caller decides.
#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    #[error("City not found: {0}")]
    CityNotFound(String),

    #[error("No city selected")]
    NoCity,

    /// The request itself failed, or the response couldn't be parsed
    #[error("Error fetching weather")]
    Http(#[from] Box<ureq::Error>),

    /// The response parsed, but doesn't make sense
    #[error("Error fetching weather: {0}")]
    Fetch(String),
}

/// Raw current conditions, before any formatting
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    pub condition: String,
    pub temp_c: f64,
    pub temp_f: f64,
    pub humidity_pct: f64,
    pub wind_deg: f64,
    pub wind_speed_kmh: f64,
}

/// Current conditions from OpenWeatherMap
/// https://openweathermap.org/current
#[derive(Debug)]
pub struct OpenWeatherMap {
    agent: Agent,
    url: String,
    api_key: String,
}

impl OpenWeatherMap {
    const TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(config: &WeatherConfig) -> Self {
        let agent = AgentBuilder::new()
            .timeout(Self::TIMEOUT)
            .user_agent("weather-bridge")
            .build();
        Self {
            agent,
            url: format!("{}/data/2.5/weather", config.api_host),
            api_key: config.api_key.clone(),
        }
    }

    /// Hit the current weather endpoint with a single lookup param (either
    /// `q` or `id`)
    fn observe(
        &self,
        param: &str,
        value: &str,
    ) -> Result<Observation, ureq::Error> {
        debug!("Requesting weather for {param}={value}");
        let observation = self
            .agent
            .get(&self.url)
            .query(param, value)
            .query("appid", &self.api_key)
            .query("units", "metric")
            .call()?
            .into_json()?;
        Ok(observation)
    }
}

impl ForecastSource for OpenWeatherMap {
    type Place = CityId;

    fn resolve(&mut self, query: &str) -> Result<CityId, ForecastError> {
        match self.observe("q", query) {
            Ok(observation) => {
                info!(
                    "Resolved `{query}` to {} (id {})",
                    observation.name, observation.id
                );
                Ok(CityId(observation.id))
            }
            // 404 for unknown names, 400 for garbage like an empty string
            Err(ureq::Error::Status(400 | 404, _)) => {
                Err(ForecastError::CityNotFound(query.to_owned()))
            }
            Err(err) => Err(Box::new(err).into()),
        }
    }

    fn fetch(&mut self, city: &CityId) -> Result<Reading, ForecastError> {
        let observation =
            self.observe("id", &city.0.to_string()).map_err(Box::new)?;
        observation.try_into()
    }
}

/// OpenWeatherMap's ID for a city. Looking up by ID avoids any ambiguity
/// in the name on later fetches.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CityId(u64);

#[derive(Debug, Deserialize)]
struct Observation {
    id: u64,
    name: String,
    weather: Vec<Condition>,
    main: Main,
    wind: Wind,
}

#[derive(Debug, Deserialize)]
struct Condition {
    main: String,
}

#[derive(Debug, Deserialize)]
struct Main {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct Wind {
    /// m/s, since we ask for metric
    speed: f64,
    /// Left out entirely when it's calm
    #[serde(default)]
    deg: f64,
}

impl TryFrom<Observation> for Reading {
    type Error = ForecastError;

    fn try_from(observation: Observation) -> Result<Self, Self::Error> {
        let condition = observation
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| {
                ForecastError::Fetch("Response has no weather condition".into())
            })?
            .main;
        let temp_c = observation.main.temp;
        Ok(Self {
            condition,
            temp_c,
            temp_f: temp_c * 9.0 / 5.0 + 32.0,
            humidity_pct: observation.main.humidity,
            wind_deg: observation.wind.deg,
            wind_speed_kmh: observation.wind.speed * 3.6,
        })
    }
}
