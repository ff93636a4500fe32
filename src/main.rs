mod config;
mod dispatch;
mod display;
mod input;
mod store;
#[cfg(test)]
mod util;
mod weather;

use crate::{
    config::{Config, InputConfig},
    dispatch::Dispatcher,
    display::DisplayLink,
    input::{
        console::{ConsoleInput, Prompt},
        controller::{ControllerInput, HidGamepad},
    },
    store::ForecastStore,
    weather::{ForecastError, ForecastSource, OpenWeatherMap},
};
use anyhow::Context;
use log::{warn, LevelFilter};
use std::{
    io::BufRead,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// The controller can't type, so it needs somewhere to start
const DEFAULT_CITY: &str = "Mississauga, CA";

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_module("weather_bridge", LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = Config::load()?;
    let link = DisplayLink::open(&config.serial)?;
    let mut store = ForecastStore::new(OpenWeatherMap::new(&config.weather));

    // Both inputs need the console, and there's only one stdin
    let mut prompt = Prompt::stdin();
    if let Some(city) = startup_city(&config, &mut prompt)? {
        select_city(&mut store, &city)?;
    }

    let mut dispatcher = Dispatcher::new(store, link);
    match &config.input {
        InputConfig::Console => dispatcher.run(&mut ConsoleInput::new(prompt)),
        InputConfig::Controller(controller_config) => {
            // Ctrl-C goes through the normal exit path, so the display gets
            // told we're leaving
            let running = Arc::new(AtomicBool::new(true));
            let handler_running = Arc::clone(&running);
            ctrlc::set_handler(move || {
                handler_running.store(false, Ordering::Relaxed)
            })
            .context("Error setting Ctrl-C handler")?;

            let gamepad = HidGamepad::open(controller_config)?;
            dispatcher.run(&mut ControllerInput::new(
                gamepad,
                prompt,
                controller_config.poll_interval(),
                running,
            ))
        }
    }
}

/// Figure out which city to start on. The config file wins. Otherwise the
/// console asks once (blank or closed input means start without one), and
/// the controller falls back to [DEFAULT_CITY].
fn startup_city<R: BufRead>(
    config: &Config,
    prompt: &mut Prompt<R>,
) -> anyhow::Result<Option<String>> {
    if let Some(city) = &config.city {
        return Ok(Some(city.clone()));
    }
    match config.input {
        InputConfig::Console => {
            let city = prompt.ask("Enter a new city: ")?;
            Ok(city.filter(|city| !city.is_empty()))
        }
        InputConfig::Controller(_) => Ok(Some(DEFAULT_CITY.to_owned())),
    }
}

/// Select the startup city. A typo in the city name shouldn't kill us, but
/// not being able to reach the weather service at all should.
fn select_city<S: ForecastSource>(
    store: &mut ForecastStore<S>,
    city: &str,
) -> anyhow::Result<()> {
    match store.set_city(city) {
        Ok(()) => Ok(()),
        Err(err @ ForecastError::CityNotFound(_)) => {
            warn!("{err}");
            Ok(())
        }
        Err(err) => Err(anyhow::Error::from(err)
            .context("Error contacting weather service")),
    }
}
