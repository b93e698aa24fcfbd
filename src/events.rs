use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Why a snapshot was published.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Publish {
    Tick,
    Paused,
    Resumed,
    MultiplierChanged,
    TickRateChanged,
    Reset,
}

impl fmt::Display for Publish {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Publish::Tick => "tick",
            Publish::Paused => "paused",
            Publish::Resumed => "resumed",
            Publish::MultiplierChanged => "multiplier-changed",
            Publish::TickRateChanged => "tick-rate-changed",
            Publish::Reset => "reset",
        };
        f.write_str(label)
    }
}

/// Operation requested by the front end while the simulation runs in real time.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Command {
    TogglePause,
    SetMultiplier(u32),
    StepUp,
    StepDown,
    SetTickRate(u64),
    Reset,
    Quit,
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let mut parts = trimmed.split_whitespace();
        let verb = parts.next().unwrap_or("");
        let arg = parts.next();
        if parts.next().is_some() {
            return Err(Error::InvalidCommand(trimmed.to_string()));
        }

        let command = match (verb, arg) {
            ("p" | "pause", None) => Command::TogglePause,
            ("r" | "reset", None) => Command::Reset,
            ("q" | "quit", None) => Command::Quit,
            ("+" | "up", None) => Command::StepUp,
            ("-" | "down", None) => Command::StepDown,
            ("m" | "multiplier", Some(value)) => Command::SetMultiplier(
                value
                    .parse()
                    .map_err(|_| Error::InvalidCommand(trimmed.to_string()))?,
            ),
            ("rate", Some(value)) => Command::SetTickRate(
                value
                    .parse()
                    .map_err(|_| Error::InvalidCommand(trimmed.to_string()))?,
            ),
            _ => return Err(Error::InvalidCommand(trimmed.to_string())),
        };
        Ok(command)
    }
}
