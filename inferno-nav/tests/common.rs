//! Test utilities for InfernoNav sessions.
//!
//! Starts a server on a loopback port and drives it through a line-oriented
//! console client.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use inferno_nav::drive::{self, DriveCommand, MockDrive};
use inferno_nav::{Config, NavServer, Result};
use parking_lot::Mutex;

pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Config with a fast simulated sensor.
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.network.poll_interval_ms = 10;
    config.sensor.tick_ms = 2;
    config
}

/// A server running on its own thread plus a connected console.
pub struct Session {
    pub console: Console,
    pub history: Arc<Mutex<Vec<DriveCommand>>>,
    pub running: Arc<AtomicBool>,
    server: Option<JoinHandle<Result<()>>>,
}

impl Session {
    pub fn start(config: Config) -> Self {
        let mock = MockDrive::default();
        let history = mock.history();
        let mut server = NavServer::init(config, drive::share(mock)).unwrap();
        let running = server.running_flag();
        server.start_sensor().unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept()?;
            server.run(stream)
        });

        Self {
            console: Console::connect(TcpStream::connect(addr).unwrap()),
            history,
            running,
            server: Some(handle),
        }
    }

    /// Wait for the server thread and return its result.
    pub fn finish(&mut self) -> Result<()> {
        self.server
            .take()
            .expect("session already finished")
            .join()
            .expect("server thread panicked")
    }

    pub fn drive_commands(&self) -> Vec<DriveCommand> {
        self.history.lock().clone()
    }
}

/// Line-oriented console client.
pub struct Console {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    partial: String,
}

impl Console {
    pub fn connect(stream: TcpStream) -> Self {
        stream
            .set_read_timeout(Some(Duration::from_millis(50)))
            .unwrap();
        Self {
            reader: BufReader::new(stream.try_clone().unwrap()),
            writer: stream,
            partial: String::new(),
        }
    }

    pub fn send(&mut self, text: &str) {
        self.writer.write_all(text.as_bytes()).unwrap();
        self.writer.flush().unwrap();
    }

    /// Close both directions, as a console that goes away would.
    pub fn close(&mut self) {
        let _ = self.writer.shutdown(Shutdown::Both);
    }

    /// Next complete line, or `None` once `deadline` passes.
    pub fn next_line(&mut self, deadline: Instant) -> Option<String> {
        while Instant::now() < deadline {
            match self.reader.read_line(&mut self.partial) {
                Ok(0) => return None,
                Ok(_) if self.partial.ends_with('\n') => {
                    let line = self.partial.trim_end().to_string();
                    self.partial.clear();
                    return Some(line);
                }
                Ok(_) => {}
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
                Err(e) => panic!("console read failed: {}", e),
            }
        }
        None
    }

    /// Read lines until one satisfies `done`; returns every line read,
    /// the matching one last. Panics on timeout.
    pub fn read_until(&mut self, done: impl Fn(&str) -> bool) -> Vec<String> {
        let deadline = Instant::now() + TIMEOUT;
        let mut lines = Vec::new();
        while let Some(line) = self.next_line(deadline) {
            let matched = done(&line);
            lines.push(line);
            if matched {
                return lines;
            }
        }
        panic!("timed out; received {:?}", lines);
    }

    /// Every line received until the connection closes.
    pub fn read_to_close(&mut self) -> Vec<String> {
        let deadline = Instant::now() + TIMEOUT;
        let mut lines = Vec::new();
        while let Some(line) = self.next_line(deadline) {
            lines.push(line);
        }
        lines
    }
}

/// Cells of an `FP`/`SP` line.
pub fn path_cells(line: &str) -> Vec<(i32, i32)> {
    let nums: Vec<i32> = line
        .split_whitespace()
        .skip(1)
        .filter_map(|t| t.parse().ok())
        .collect();
    nums.chunks(2).map(|c| (c[0], c[1])).collect()
}
