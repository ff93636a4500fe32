use crate::{
    display::Field,
    weather::{ForecastError, ForecastSource, Reading},
};
use log::{info, warn};

/// Holds the selected city and the last forecast fetched for it
pub struct ForecastStore<S: ForecastSource> {
    source: S,
    city: Option<City<S::Place>>,
    /// `None` until the first refresh after picking a city
    forecast: Option<Forecast>,
}

impl<S: ForecastSource> ForecastStore<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            city: None,
            forecast: None,
        }
    }

    /// The currently selected city, if any
    pub fn city(&self) -> Option<&City<S::Place>> {
        self.city.as_ref()
    }

    /// Look up and select a new city. The old forecast is thrown out, since it
    /// belongs to the old city. If the lookup fails, nothing changes.
    pub fn set_city(&mut self, query: &str) -> Result<(), ForecastError> {
        let place = self.source.resolve(query)?;
        info!("City set to `{query}`");
        self.city = Some(City {
            query: query.to_owned(),
            place,
        });
        self.forecast = None;
        Ok(())
    }

    /// Fetch fresh weather for the current city. A failed fetch doesn't get
    /// reported as an error; instead every field gets replaced with
    /// [Forecast::SENTINEL], so the display never shows stale data. The only
    /// error is not having a city at all.
    pub fn refresh(&mut self) -> Result<&Forecast, ForecastError> {
        let city = self.city.as_ref().ok_or(ForecastError::NoCity)?;
        let forecast = match self.source.fetch(&city.place) {
            Ok(reading) => Forecast::from(&reading),
            Err(err) => {
                let err = anyhow::Error::from(err);
                warn!(
                    "Error refreshing forecast for `{}`: {err:#}",
                    city.query
                );
                Forecast::unavailable()
            }
        };
        Ok(self.forecast.insert(forecast))
    }

    /// Get the display text for a single field
    pub fn current_field(&self, field: Field) -> &str {
        let forecast = self.forecast.as_ref();
        match field {
            Field::City => self
                .city
                .as_ref()
                .map(City::display_name)
                .unwrap_or(Forecast::SENTINEL),
            Field::Condition => forecast.map_or(Forecast::SENTINEL, |f| {
                f.condition.as_str()
            }),
            Field::Temperature => forecast.map_or(Forecast::SENTINEL, |f| {
                f.temperature.as_str()
            }),
            Field::Humidity => forecast
                .map_or(Forecast::SENTINEL, |f| f.humidity.as_str()),
            Field::Wind => {
                forecast.map_or(Forecast::SENTINEL, |f| f.wind.as_str())
            }
        }
    }

    /// Display text for every field, in wire order
    pub fn fields(&self) -> [&str; Field::COUNT] {
        Field::ALL.map(|field| self.current_field(field))
    }
}

/// A resolved city
#[derive(Clone, Debug, PartialEq)]
pub struct City<P> {
    /// The name as the user entered it, qualifiers and all
    pub query: String,
    pub place: P,
}

impl<P> City<P> {
    /// Name to show on the LCD. Everything after the first comma (usually a
    /// country code) gets dropped to save space.
    pub fn display_name(&self) -> &str {
        self.query.split(',').next().unwrap_or_default()
    }
}

/// Formatted weather, ready to send to the display. The LCD sketch expects
/// these exact formats, so be careful changing them.
#[derive(Clone, Debug, PartialEq)]
pub struct Forecast {
    pub condition: String,
    /// `<C> C / <F> F`
    pub temperature: String,
    /// `<pct> %`
    pub humidity: String,
    /// `<degrees> deg, <speed> kmh`
    pub wind: String,
}

impl Forecast {
    /// Shown in place of any value we couldn't get
    pub const SENTINEL: &'static str = "None";

    /// A forecast with every field blanked out
    pub fn unavailable() -> Self {
        Self {
            condition: Self::SENTINEL.into(),
            temperature: Self::SENTINEL.into(),
            humidity: Self::SENTINEL.into(),
            wind: Self::SENTINEL.into(),
        }
    }
}

// All the `as i64` casts here are intentional: truncate toward zero, don't
// round
impl From<&Reading> for Forecast {
    fn from(reading: &Reading) -> Self {
        // Speed gets chopped to its first 3 digits. The LCD sketch has a fixed
        // width for it.
        let speed = (reading.wind_speed_kmh as i64).to_string();
        let speed = speed.get(..3).unwrap_or(&speed);
        Self {
            condition: reading.condition.clone(),
            temperature: format!(
                "{} C / {} F",
                reading.temp_c as i64, reading.temp_f as i64
            ),
            humidity: format!("{} %", reading.humidity_pct as i64),
            wind: format!("{} deg, {speed} kmh", reading.wind_deg as i64),
        }
    }
}
