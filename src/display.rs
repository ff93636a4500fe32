use crate::config::SerialConfig;
use anyhow::{anyhow, Context};
use log::{info, trace};
use serialport::SerialPort;
use std::{
    fmt::{self, Display, Formatter},
    io::Write,
    str::FromStr,
    thread,
    time::Duration,
};

/// One of the values the LCD can show. The LCD only shows one at a time, and
/// we pick which one by sending its [Opcode::Show].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Field {
    #[default]
    City,
    Condition,
    Temperature,
    Humidity,
    Wind,
}

impl Field {
    pub const COUNT: usize = 5;
    /// Every field, in the order they get sent during an update
    pub const ALL: [Self; Self::COUNT] = [
        Self::City,
        Self::Condition,
        Self::Temperature,
        Self::Humidity,
        Self::Wind,
    ];

    /// The field to the left of this one. Stops at the first field, no
    /// wrapping.
    pub fn prev(self) -> Self {
        let index = self as usize;
        Self::ALL[index.saturating_sub(1)]
    }

    /// The field to the right of this one. Stops at the last field, no
    /// wrapping.
    pub fn next(self) -> Self {
        let index = self as usize;
        Self::ALL[(index + 1).min(Self::COUNT - 1)]
    }

    /// Short name, as used in commands
    pub fn name(self) -> &'static str {
        match self {
            Self::City => "city",
            Self::Condition => "cond",
            Self::Temperature => "temp",
            Self::Humidity => "hum",
            Self::Wind => "wind",
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = UnknownField;

    /// Parse short names, plus the spelled out versions for the ones that
    /// have them
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "city" => Ok(Self::City),
            "cond" | "condition" => Ok(Self::Condition),
            "temp" | "temperature" => Ok(Self::Temperature),
            "hum" | "humidity" => Ok(Self::Humidity),
            "wind" => Ok(Self::Wind),
            _ => Err(UnknownField(s.to_owned())),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("Unknown field `{0}`")]
pub struct UnknownField(String);

/// Single-byte instructions for the LCD. Anything that isn't an opcode is
/// field text, which only shows up during an update.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Opcode {
    /// Host is shutting down
    Terminate,
    /// Five fields of text are about to follow
    UpdateStart,
    /// Switch the LCD to a field
    Show(Field),
}

impl Opcode {
    /// Get the byte that goes on the wire
    pub fn byte(self) -> u8 {
        match self {
            Self::Terminate => 0x00,
            Self::UpdateStart => 0x01,
            // 0x02-0x06
            Self::Show(field) => 0x02 + field as u8,
        }
    }
}

/// Serial connection to the LCD
pub struct DisplayLink {
    port: Box<dyn SerialPort>,
    /// How long to wait after each field during an update. There's no flow
    /// control, so the sketch needs some time to read each one.
    field_delay: Duration,
}

impl DisplayLink {
    pub fn new(port: Box<dyn SerialPort>, field_delay: Duration) -> Self {
        Self { port, field_delay }
    }

    /// Open the configured port, or the first one available if none is
    /// configured
    pub fn open(config: &SerialConfig) -> anyhow::Result<Self> {
        let port_name = match &config.port {
            Some(port_name) => port_name.clone(),
            None => serialport::available_ports()
                .context("Error listing serial ports")?
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("No serial port found"))?
                .port_name,
        };
        let port = serialport::new(&port_name, config.baud_rate)
            .open()
            .with_context(|| {
                format!("Error connecting to display at {port_name}")
            })?;
        info!(
            "Connected to display at {port_name} ({} baud)",
            config.baud_rate
        );
        Ok(Self::new(port, config.field_delay()))
    }

    /// Send a single opcode
    pub fn send_opcode(&mut self, opcode: Opcode) -> anyhow::Result<()> {
        trace!("Sending opcode {opcode:?} ({:#04x})", opcode.byte());
        self.write(&[opcode.byte()])
            .with_context(|| format!("Error sending opcode {opcode:?}"))
    }

    /// Send a field's text, plus a null terminator, as one write
    pub fn send_field(&mut self, text: &str) -> anyhow::Result<()> {
        trace!("Sending field text {text:?}");
        let mut bytes = Vec::with_capacity(text.len() + 1);
        bytes.extend_from_slice(text.as_bytes());
        bytes.push(0);
        self.write(&bytes)
            .with_context(|| format!("Error sending field text {text:?}"))
    }

    /// Push a full set of fields to the LCD, then switch it back to the city.
    /// That's 7 writes total: start, one per field, show city.
    pub fn send_update(
        &mut self,
        fields: [&str; Field::COUNT],
    ) -> anyhow::Result<()> {
        self.send_opcode(Opcode::UpdateStart)?;
        for text in fields {
            self.send_field(text)?;
            if !self.field_delay.is_zero() {
                thread::sleep(self.field_delay);
            }
        }
        self.send_opcode(Opcode::Show(Field::City))
    }

    fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }
}

impl Drop for DisplayLink {
    fn drop(&mut self) {
        info!("Closing display connection")
    }
}
