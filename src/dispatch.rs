use crate::{
    display::{DisplayLink, Field, Opcode},
    input::Input,
    store::ForecastStore,
    weather::{ForecastError, ForecastSource},
};
use itertools::Itertools;
use log::{debug, info, warn};
use std::{ops::ControlFlow, str::FromStr};

/// Something the user wants done
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    ScrollLeft,
    ScrollRight,
    /// Switch cities, but leave the LCD alone until the next update
    NewCity(String),
    /// Switch cities, then update
    Get(String),
    Update,
    /// Jump straight to a field
    Show(Field),
    Exit,
    Help,
}

impl FromStr for Command {
    type Err = CommandError;

    /// Parse a line of console input. Accepts `show <field>`, `get <city>`,
    /// `update`, `exit` and `help`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        let (verb, arg) = match line.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (line, ""),
        };
        match (verb, arg) {
            ("show", field) => field
                .parse()
                .map(Self::Show)
                .map_err(|_| CommandError::Usage(show_usage())),
            ("get", "") => Err(CommandError::Usage("get <city>".into())),
            ("get", city) => Ok(Self::Get(city.to_owned())),
            ("update", "") => Ok(Self::Update),
            ("exit", "") => Ok(Self::Exit),
            ("help", "") => Ok(Self::Help),
            _ => Err(CommandError::Invalid),
        }
    }
}

/// A line of input that isn't a command
#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum CommandError {
    #[error("Usage: {0}")]
    Usage(String),
    #[error("Invalid command")]
    Invalid,
}

fn show_usage() -> String {
    format!("show <{}>", Field::ALL.iter().join("|"))
}

/// Turns user commands into weather lookups and LCD updates. Tracks which
/// field the LCD is showing, which is the only state it needs.
pub struct Dispatcher<S: ForecastSource> {
    store: ForecastStore<S>,
    link: DisplayLink,
    field: Field,
}

impl<S: ForecastSource> Dispatcher<S> {
    pub fn new(store: ForecastStore<S>, link: DisplayLink) -> Self {
        Self {
            store,
            link,
            field: Field::default(),
        }
    }

    /// Field the LCD was last scrolled to
    #[cfg(test)]
    pub fn field(&self) -> Field {
        self.field
    }

    #[cfg(test)]
    pub fn store(&self) -> &ForecastStore<S> {
        &self.store
    }

    /// Pull commands from the input until it asks us to exit
    pub fn run(&mut self, input: &mut impl Input) -> anyhow::Result<()> {
        info!("Waiting for commands");
        loop {
            let Some(command) = input.next_command()? else {
                continue;
            };
            if self.dispatch(command)?.is_break() {
                info!("Exiting");
                return Ok(());
            }
        }
    }

    /// Handle a single command. Any error returned here is a serial failure,
    /// and there's no coming back from that. Break means it's time to exit.
    pub fn dispatch(
        &mut self,
        command: Command,
    ) -> anyhow::Result<ControlFlow<()>> {
        debug!("Handling command {command:?}");
        match command {
            // Scrolling always re-sends the field, even if we're already at
            // the end
            Command::ScrollLeft => {
                self.field = self.field.prev();
                self.link.send_opcode(Opcode::Show(self.field))?;
            }
            Command::ScrollRight => {
                self.field = self.field.next();
                self.link.send_opcode(Opcode::Show(self.field))?;
            }
            Command::NewCity(city) => {
                self.set_city(&city);
            }
            Command::Get(city) => {
                if self.set_city(&city) {
                    self.update()?;
                }
            }
            Command::Update => self.update()?,
            Command::Show(field) => {
                if self.store.city().is_some() {
                    self.link.send_opcode(Opcode::Show(field))?;
                } else {
                    println!("No city selected, use `get <city>` first");
                }
            }
            Command::Exit => {
                self.link.send_opcode(Opcode::Terminate)?;
                return Ok(ControlFlow::Break(()));
            }
            Command::Help => print_help(),
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Select a new city. Return whether it worked.
    fn set_city(&mut self, city: &str) -> bool {
        match self.store.set_city(city) {
            Ok(()) => {
                println!("City found");
                true
            }
            Err(err @ ForecastError::CityNotFound(_)) => {
                warn!("{err}");
                println!("City not found");
                false
            }
            Err(err) => {
                let err = anyhow::Error::from(err);
                warn!("Error looking up `{city}`: {err:#}");
                println!("Error looking up city, try again");
                false
            }
        }
    }

    /// Fetch new weather and push all of it to the LCD
    fn update(&mut self) -> anyhow::Result<()> {
        if self.store.city().is_none() {
            println!("No city selected, use `get <city>` first");
            return Ok(());
        }
        println!("Updating...");
        if let Err(err) = self.store.refresh() {
            println!("{err}");
            return Ok(());
        }
        self.link.send_update(self.store.fields())?;
        // The update leaves the LCD showing the city
        self.field = Field::City;
        println!("Update complete");
        Ok(())
    }
}

fn print_help() {
    println!(
        "\nWeather Forecast Commands\n\
        show <field>  show a single value: {}\n\
        get <city>    find a new city and update\n\
        update        update weather information\n\
        exit          quit\n\
        help          show this list\n",
        Field::ALL.iter().join(", "),
    );
}
