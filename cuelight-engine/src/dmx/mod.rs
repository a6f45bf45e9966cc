//! DMX output: channel buffer, Art-Net framing and the fixed-rate transmitter

pub mod artnet;
pub mod transmitter;
pub mod universe;

pub use artnet::{build_artdmx_frame, FrameSink, SimulationSink, UdpFrameSink};
pub use transmitter::{Transmitter, TransmitterStats};
pub use universe::{clamp_dmx, ChannelAddress, ChannelTarget, UniverseData, UniverseStore, DMX_CHANNELS};
