//! Art-Net ArtDmx framing and frame sinks
//!
//! Art-Net is a UDP broadcast protocol for DMX512 over Ethernet. Every frame
//! is an 18-byte header followed by the 512 channel values of one universe.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

use super::universe::{UniverseData, DMX_CHANNELS};

/// Art-Net packet identifier
pub const ARTNET_ID: &[u8; 8] = b"Art-Net\0";

/// OpDmx opcode
pub const OP_DMX: u16 = 0x5000;

/// Art-Net protocol revision
pub const PROTOCOL_VERSION: u16 = 14;

pub const ARTNET_HEADER_LEN: usize = 18;

/// Header plus one full universe
pub const ARTNET_FRAME_LEN: usize = ARTNET_HEADER_LEN + DMX_CHANNELS;

/// Build an ArtDmx frame for a 1-based universe id
///
/// Sequence and physical bytes are always zero; the port-address is the
/// zero-based universe.
pub fn build_artdmx_frame(universe: u16, channels: &UniverseData) -> [u8; ARTNET_FRAME_LEN] {
    let mut packet = [0u8; ARTNET_FRAME_LEN];

    packet[0..8].copy_from_slice(ARTNET_ID);

    // OpCode (little-endian)
    packet[8..10].copy_from_slice(&OP_DMX.to_le_bytes());

    // Protocol version (big-endian)
    packet[10..12].copy_from_slice(&PROTOCOL_VERSION.to_be_bytes());

    // Sequence (0 = disabled)
    packet[12] = 0;

    // Physical port
    packet[13] = 0;

    // Port-Address (little-endian, zero-based)
    packet[14..16].copy_from_slice(&universe.saturating_sub(1).to_le_bytes());

    // Length (big-endian)
    packet[16..18].copy_from_slice(&(DMX_CHANNELS as u16).to_be_bytes());

    packet[ARTNET_HEADER_LEN..].copy_from_slice(channels);

    packet
}

/// Destination for built frames
///
/// Implementations must not block: the transmitter calls `send_frame` from
/// its fixed-rate tick.
pub trait FrameSink: Send + Sync {
    /// Send one frame for a 1-based universe id
    fn send_frame(&self, universe: u16, frame: &[u8]) -> io::Result<()>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Non-blocking UDP broadcast sink
pub struct UdpFrameSink {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpFrameSink {
    /// Bind an ephemeral broadcast-enabled socket aimed at `target`
    pub fn bind(target: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_broadcast(true)?;
        socket.set_nonblocking(true)?;

        info!("Art-Net sender bound to {} -> {}", socket.local_addr()?, target);

        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl FrameSink for UdpFrameSink {
    fn send_frame(&self, _universe: u16, frame: &[u8]) -> io::Result<()> {
        let sent = self.socket.send_to(frame, self.target)?;
        if sent != frame.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short send: {} of {} bytes", sent, frame.len()),
            ));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "artnet-udp"
    }
}

/// Simulation sink: accepts every frame without touching the network
#[derive(Default)]
pub struct SimulationSink {
    frames: AtomicU64,
}

impl SimulationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames accepted so far
    pub fn frame_count(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

impl FrameSink for SimulationSink {
    fn send_frame(&self, _universe: u16, _frame: &[u8]) -> io::Result<()> {
        self.frames.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "simulation"
    }
}
