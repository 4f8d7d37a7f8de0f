//! JTAG bridge to an external debug adapter.
//!
//! [`RemoteBitbang`] speaks OpenOCD's `remote_bitbang` protocol over TCP,
//! so a debugger can be attached with:
//!
//! ```text
//! adapter driver remote_bitbang
//! remote_bitbang host localhost
//! remote_bitbang port 5555
//! ```

use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};

use alioth_common::Tick;

use crate::error::SimError;
use crate::model::TapInputs;

/// Drives and observes the model's TAP pins once per simulation step.
pub trait JtagBridge {
    /// Called once per step with the current TAP inputs, which the bridge may
    /// update, and the model's TDO level.
    fn on_tick(&mut self, tick: Tick, tap: &mut TapInputs, tdo: bool);
}

/// Effect of one protocol command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Set TCK, TMS and TDI.
    Write(TapInputs),
    /// Report TDO.
    Read,
    /// Reset request; `trst` and `srst` are the requested levels.
    Reset {
        /// TAP reset asserted.
        trst: bool,
        /// System reset asserted.
        srst: bool,
    },
    /// LED control, ignored.
    Blink,
    /// Client is done.
    Quit,
}

impl Command {
    /// Decodes a command byte.
    pub fn decode(byte: u8) -> Option<Command> {
        Some(match byte {
            b'0'..=b'7' => {
                let bits = byte - b'0';
                Command::Write(TapInputs {
                    tck: bits & 0b100 != 0,
                    tms: bits & 0b010 != 0,
                    tdi: bits & 0b001 != 0,
                })
            }
            b'R' => Command::Read,
            b'r'..=b'u' => {
                let bits = byte - b'r';
                Command::Reset {
                    trst: bits & 0b10 != 0,
                    srst: bits & 0b01 != 0,
                }
            }
            b'B' | b'b' => Command::Blink,
            b'Q' => Command::Quit,
            _ => return None,
        })
    }
}

/// Non-blocking `remote_bitbang` server.
///
/// At most one command is consumed every `tck_period` calls, so the model
/// sees each TAP level for that many evaluations. Accepting and reading
/// never block the simulation.
#[derive(Debug)]
pub struct RemoteBitbang {
    listener: TcpListener,
    client: Option<TcpStream>,
    tck_period: u32,
    countdown: u32,
    commands: u64,
    pending_reply: Option<u8>,
}

/// Outcome of one attempt to send a reply byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReplyStatus {
    Sent,
    Retry,
    Closed,
}

fn try_send<W: Write>(writer: &mut W, byte: u8) -> ReplyStatus {
    match writer.write(&[byte]) {
        Ok(0) => ReplyStatus::Closed,
        Ok(_) => ReplyStatus::Sent,
        Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {
            ReplyStatus::Retry
        }
        Err(e) => {
            log::warn!("JTAG write failed: {e}");
            ReplyStatus::Closed
        }
    }
}

impl RemoteBitbang {
    /// Listens on the loopback interface.
    pub fn bind(port: u16, tck_period: u32) -> Result<Self, SimError> {
        Self::bind_addr(SocketAddr::from((Ipv4Addr::LOCALHOST, port)), tck_period)
    }

    /// Listens on an explicit address.
    pub fn bind_addr(addr: SocketAddr, tck_period: u32) -> Result<Self, SimError> {
        let bind_err = |source| SimError::JtagBind {
            port: addr.port(),
            source,
        };
        let listener = TcpListener::bind(addr).map_err(bind_err)?;
        listener.set_nonblocking(true).map_err(bind_err)?;
        log::info!(
            "JTAG remote_bitbang listening on {}",
            listener.local_addr().map_err(bind_err)?
        );
        Ok(Self {
            listener,
            client: None,
            tck_period: tck_period.max(1),
            countdown: 0,
            commands: 0,
            pending_reply: None,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Returns `true` while a client is connected.
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Commands executed so far.
    pub fn commands(&self) -> u64 {
        self.commands
    }

    fn accept(&mut self) {
        match self.listener.accept() {
            Ok((stream, peer)) => {
                if let Err(e) = stream.set_nonblocking(true) {
                    log::warn!("dropping JTAG client {peer}: {e}");
                    return;
                }
                let _ = stream.set_nodelay(true);
                log::info!("JTAG client connected from {peer}");
                self.client = Some(stream);
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => log::warn!("JTAG accept failed: {e}"),
        }
    }

    /// Sends the outstanding TDO reply. Returns `false` while it is still
    /// queued in front of further commands.
    fn flush_reply(&mut self) -> bool {
        let Some(byte) = self.pending_reply else {
            return true;
        };
        let Some(client) = self.client.as_mut() else {
            self.pending_reply = None;
            return true;
        };
        match try_send(client, byte) {
            ReplyStatus::Sent => {
                self.pending_reply = None;
                true
            }
            ReplyStatus::Retry => false,
            ReplyStatus::Closed => {
                self.disconnect("write error");
                true
            }
        }
    }

    fn disconnect(&mut self, why: &str) {
        self.pending_reply = None;
        if self.client.take().is_some() {
            log::info!("JTAG client disconnected ({why})");
        }
    }

    fn next_byte(&mut self) -> Option<u8> {
        let client = self.client.as_mut()?;
        let mut buf = [0u8; 1];
        match client.read(&mut buf) {
            Ok(0) => {
                self.disconnect("end of stream");
                None
            }
            Ok(_) => Some(buf[0]),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => None,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => None,
            Err(e) => {
                log::warn!("JTAG read failed: {e}");
                self.disconnect("read error");
                None
            }
        }
    }

    fn execute(&mut self, command: Command, tap: &mut TapInputs, tdo: bool) {
        self.commands += 1;
        match command {
            Command::Write(levels) => *tap = levels,
            Command::Read => {
                self.pending_reply = Some(if tdo { b'1' } else { b'0' });
                self.flush_reply();
            }
            Command::Reset { trst, srst } => {
                log::debug!("JTAG reset request trst={trst} srst={srst}");
            }
            Command::Blink => {}
            Command::Quit => self.disconnect("quit"),
        }
    }
}

impl JtagBridge for RemoteBitbang {
    fn on_tick(&mut self, tick: Tick, tap: &mut TapInputs, tdo: bool) {
        if self.countdown > 0 {
            self.countdown -= 1;
            return;
        }
        self.countdown = self.tck_period - 1;

        if self.client.is_none() {
            self.accept();
        }
        if !self.flush_reply() {
            return;
        }
        let Some(byte) = self.next_byte() else {
            return;
        };
        match Command::decode(byte) {
            Some(command) => {
                log::trace!("JTAG {tick}: {command:?}");
                self.execute(command, tap, tdo);
            }
            None => log::warn!("ignoring unknown remote_bitbang command {byte:#04x}"),
        }
    }
}
