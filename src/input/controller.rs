use crate::{
    config::ControllerConfig,
    dispatch::Command,
    input::{console::Prompt, Input},
};
use anyhow::Context;
use hidapi::{HidApi, HidDevice};
use log::{info, trace, warn};
use serde::Deserialize;
use std::{
    io::BufRead,
    mem,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

/// The buttons we care about. Order matters: if more than one is pressed at
/// once, the first one wins.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Button {
    Left,
    Right,
    Refresh,
    NewCity,
}

/// Which of the tracked buttons are currently held
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ButtonState {
    pub left: bool,
    pub right: bool,
    pub refresh: bool,
    pub new_city: bool,
}

impl ButtonState {
    pub fn any(&self) -> bool {
        self.left || self.right || self.refresh || self.new_city
    }

    /// Highest priority button that's held, if any
    pub fn first_pressed(&self) -> Option<Button> {
        [
            (self.left, Button::Left),
            (self.right, Button::Right),
            (self.refresh, Button::Refresh),
            (self.new_city, Button::NewCity),
        ]
        .into_iter()
        .find_map(|(pressed, button)| pressed.then_some(button))
    }
}

/// Bit index of each button within the button bitmap. Defaults match a PS3
/// controller (d-pad left/right, circle, square).
#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ButtonMap {
    pub left: u8,
    pub right: u8,
    pub refresh: u8,
    pub new_city: u8,
}

impl ButtonMap {
    /// Pick our buttons out of a bitmap, where bit n is button n
    pub fn state(&self, bitmap: u64) -> ButtonState {
        let pressed = |bit: u8| bit < 64 && bitmap & (1 << bit) != 0;
        ButtonState {
            left: pressed(self.left),
            right: pressed(self.right),
            refresh: pressed(self.refresh),
            new_city: pressed(self.new_city),
        }
    }
}

impl Default for ButtonMap {
    fn default() -> Self {
        Self {
            left: 7,
            right: 5,
            refresh: 13,
            new_city: 15,
        }
    }
}

/// Anything that can tell us which buttons are held right now
pub trait ButtonPoller {
    /// Check button state. Must not block.
    fn poll(&mut self) -> anyhow::Result<ButtonState>;
}

/// A game controller, read as a raw HID device
pub struct HidGamepad {
    device: HidDevice,
    // Declared after the device so it gets dropped after it
    _api: HidApi,
    /// Byte offset of the button bitmap in each report
    offset: usize,
    buttons: ButtonMap,
    /// Devices only report when something changes, so hang onto the last
    /// known state
    state: ButtonState,
}

impl HidGamepad {
    /// Longest report we expect. PS3 reports are 49 bytes
    const REPORT_SIZE: usize = 64;

    pub fn open(config: &ControllerConfig) -> anyhow::Result<Self> {
        let api = HidApi::new().context("Error initializing HID API")?;
        let device = api
            .open(config.vendor_id, config.product_id)
            .with_context(|| {
                format!(
                    "Error opening controller {:04x}:{:04x}",
                    config.vendor_id, config.product_id
                )
            })?;
        device
            .set_blocking_mode(false)
            .context("Error setting controller to non-blocking")?;
        info!(
            "Connected to controller {:04x}:{:04x}",
            config.vendor_id, config.product_id
        );
        Ok(Self {
            device,
            _api: api,
            offset: config.button_offset,
            buttons: config.buttons,
            state: ButtonState::default(),
        })
    }
}

impl ButtonPoller for HidGamepad {
    fn poll(&mut self) -> anyhow::Result<ButtonState> {
        let mut report = [0; Self::REPORT_SIZE];
        // Drain everything that's queued up, only the latest report matters
        loop {
            let len = self
                .device
                .read(&mut report)
                .context("Error reading controller")?;
            if len == 0 {
                break;
            }
            let bitmap = button_bitmap(&report[..len], self.offset);
            trace!("Controller report, buttons {bitmap:#018x}");
            self.state = self.buttons.state(bitmap);
        }
        Ok(self.state)
    }
}

/// Read up to 8 bytes of a report, starting at the offset, as a
/// little-endian bitmap
fn button_bitmap(report: &[u8], offset: usize) -> u64 {
    report
        .iter()
        .skip(offset)
        .take(8)
        .enumerate()
        .fold(0, |bitmap, (i, &byte)| bitmap | (byte as u64) << (i * 8))
}

/// Turns held buttons into presses. An action fires only when going from
/// nothing held to something held, so holding a button down doesn't repeat
/// it, and neither does letting go.
#[derive(Debug)]
pub struct EdgeTrigger {
    /// Was anything held last poll?
    held: bool,
}

impl EdgeTrigger {
    /// Starts out as if something is held, so a button that's already down
    /// at startup won't fire until it's pressed again
    pub fn new() -> Self {
        Self { held: true }
    }

    /// Feed in the latest poll. Returns the button that was just pressed, if
    /// any.
    pub fn update(&mut self, state: ButtonState) -> Option<Button> {
        let was_held = mem::replace(&mut self.held, state.any());
        if was_held {
            None
        } else {
            state.first_pressed()
        }
    }
}

impl Default for EdgeTrigger {
    fn default() -> Self {
        Self::new()
    }
}

/// Commands from a game controller. Left/right scroll, refresh updates, and
/// new city prompts for a name on the console.
pub struct ControllerInput<P, R> {
    poller: P,
    trigger: EdgeTrigger,
    prompt: Prompt<R>,
    interval: Duration,
    /// Cleared on Ctrl-C
    running: Arc<AtomicBool>,
}

impl<P: ButtonPoller, R: BufRead> ControllerInput<P, R> {
    pub fn new(
        poller: P,
        prompt: Prompt<R>,
        interval: Duration,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            poller,
            trigger: EdgeTrigger::new(),
            prompt,
            interval,
            running,
        }
    }

    fn ask_city(&mut self) -> anyhow::Result<Option<Command>> {
        match self.prompt.ask("Enter a new city: ")? {
            Some(city) if !city.is_empty() => Ok(Some(Command::NewCity(city))),
            Some(_) => {
                println!("No city entered");
                Ok(None)
            }
            None => {
                warn!("Can't ask for a city, stdin is closed");
                Ok(None)
            }
        }
    }
}

impl<P: ButtonPoller, R: BufRead> Input for ControllerInput<P, R> {
    fn next_command(&mut self) -> anyhow::Result<Option<Command>> {
        if !self.running.load(Ordering::Relaxed) {
            return Ok(Some(Command::Exit));
        }
        if !self.interval.is_zero() {
            thread::sleep(self.interval);
        }

        let state = self.poller.poll()?;
        match self.trigger.update(state) {
            None => Ok(None),
            Some(Button::Left) => Ok(Some(Command::ScrollLeft)),
            Some(Button::Right) => Ok(Some(Command::ScrollRight)),
            Some(Button::Refresh) => Ok(Some(Command::Update)),
            Some(Button::NewCity) => self.ask_city(),
        }
    }
}
