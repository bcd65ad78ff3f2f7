//! Console command decoding.
//!
//! Input is a whitespace-separated token stream; one command consumes its
//! keyword plus a fixed number of argument tokens. Unknown keywords are
//! skipped. A command with bad arguments still consumes them, so decoding
//! resumes at the next keyword.

use std::str::SplitWhitespace;

use crate::error::{Error, Result};
use crate::planning::NodeKind;

/// A decoded console command.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// `N x y kind`
    SetNode { x: i32, y: i32, kind: NodeKind },
    /// `D x y`; `D -1 -1` cancels
    Destination { x: i32, y: i32 },
    /// `H x y`
    Home { x: i32, y: i32 },
    /// `GO`
    Go,
    /// `S`
    Stop,
    /// `Q`
    Quit,
    /// `M left right`, decimals truncated toward zero
    Manual { left: i32, right: i32 },
    /// `LON`
    LightsOn,
    /// `LOFF`
    LightsOff,
}

impl Command {
    /// `D -1 -1`
    pub fn is_cancel(&self) -> bool {
        matches!(self, Command::Destination { x: -1, y: -1 })
    }
}

/// Iterator over the commands in one chunk of console input.
pub struct CommandParser<'a> {
    tokens: SplitWhitespace<'a>,
}

impl<'a> CommandParser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            tokens: input.split_whitespace(),
        }
    }

    fn arg(&mut self, keyword: &str) -> Result<&'a str> {
        self.tokens
            .next()
            .ok_or_else(|| Error::Protocol(format!("{}: missing argument", keyword)))
    }

    /// Consume exactly `N` argument tokens, then decode them.
    fn ints<const N: usize>(&mut self, keyword: &str) -> Result<[i32; N]> {
        let mut tokens = [""; N];
        for token in tokens.iter_mut() {
            *token = self.arg(keyword)?;
        }
        let mut values = [0; N];
        for (value, token) in values.iter_mut().zip(tokens) {
            *value = parse_int(keyword, token)?;
        }
        Ok(values)
    }

    fn speeds(&mut self, keyword: &str) -> Result<(i32, i32)> {
        let left = self.arg(keyword)?;
        let right = self.arg(keyword)?;
        Ok((parse_speed(keyword, left)?, parse_speed(keyword, right)?))
    }

    fn decode(&mut self, keyword: &str) -> Option<Result<Command>> {
        let command = match keyword {
            "N" => self.ints::<3>(keyword).and_then(|[x, y, code]| {
                NodeKind::from_code(code)
                    .map(|kind| Command::SetNode { x, y, kind })
                    .ok_or_else(|| Error::Protocol(format!("N: unknown node kind {}", code)))
            }),
            "D" => self
                .ints::<2>(keyword)
                .map(|[x, y]| Command::Destination { x, y }),
            "H" => self.ints::<2>(keyword).map(|[x, y]| Command::Home { x, y }),
            "GO" => Ok(Command::Go),
            "S" => Ok(Command::Stop),
            "Q" => Ok(Command::Quit),
            "M" => self
                .speeds(keyword)
                .map(|(left, right)| Command::Manual { left, right }),
            "LON" => Ok(Command::LightsOn),
            "LOFF" => Ok(Command::LightsOff),
            _ => return None,
        };
        Some(command)
    }
}

fn parse_int(keyword: &str, token: &str) -> Result<i32> {
    token
        .parse()
        .map_err(|_| Error::Protocol(format!("{}: expected integer, got {:?}", keyword, token)))
}

/// Manual speeds arrive as integers or decimals.
fn parse_speed(keyword: &str, token: &str) -> Result<i32> {
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v.trunc() as i32),
        _ => Err(Error::Protocol(format!(
            "{}: expected number, got {:?}",
            keyword, token
        ))),
    }
}

impl Iterator for CommandParser<'_> {
    type Item = Result<Command>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let keyword = self.tokens.next()?;
            match self.decode(keyword) {
                Some(result) => return Some(result),
                None => log::debug!("Ignoring unknown token {:?}", keyword),
            }
        }
    }
}
