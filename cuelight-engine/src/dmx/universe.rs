//! Universe store: the channel buffer every other component writes into
//!
//! Holds the current value of every channel of every configured universe and is
//! the single source of truth for what the transmitter sends. Universe ids and
//! channel numbers are 1-based, as patched on the console; the store maps them
//! onto zero-based slots internally.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Channels per DMX universe
pub const DMX_CHANNELS: usize = 512;

/// Raw channel data for one universe
pub type UniverseData = [u8; DMX_CHANNELS];

/// Absolute channel address (both fields 1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelAddress {
    pub universe: u16,
    pub channel: u16,
}

impl ChannelAddress {
    pub fn new(universe: u16, channel: u16) -> Self {
        Self { universe, channel }
    }
}

impl std::fmt::Display for ChannelAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:03}", self.universe, self.channel)
    }
}

/// A channel and the value it should reach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelTarget {
    pub address: ChannelAddress,
    pub value: u8,
}

impl ChannelTarget {
    pub fn new(universe: u16, channel: u16, value: u8) -> Self {
        Self {
            address: ChannelAddress::new(universe, channel),
            value,
        }
    }
}

/// Clamp an arbitrary integer into the DMX value range
pub fn clamp_dmx(value: i64) -> u8 {
    value.clamp(0, 255) as u8
}

/// Channel buffer for all configured universes
///
/// Every universe is always exactly [`DMX_CHANNELS`] slots. Writes addressed
/// outside the configured range are dropped.
pub struct UniverseStore {
    universes: RwLock<Vec<UniverseData>>,
}

impl UniverseStore {
    /// Create `universe_count` all-zero universes, numbered from 1
    pub fn new(universe_count: u16) -> Self {
        Self {
            universes: RwLock::new(vec![[0u8; DMX_CHANNELS]; universe_count as usize]),
        }
    }

    pub fn universe_count(&self) -> u16 {
        self.universes.read().len() as u16
    }

    /// Whether `address` names a configured slot
    pub fn contains(&self, address: ChannelAddress) -> bool {
        Self::slot(address, self.universes.read().len()).is_some()
    }

    fn slot(address: ChannelAddress, universe_count: usize) -> Option<(usize, usize)> {
        let universe = (address.universe as usize).checked_sub(1)?;
        let channel = (address.channel as usize).checked_sub(1)?;
        if universe < universe_count && channel < DMX_CHANNELS {
            Some((universe, channel))
        } else {
            None
        }
    }

    /// Set one channel immediately, clamping `value` to 0-255
    ///
    /// Returns false when the address is outside the configured range.
    pub fn set_channel(&self, universe: u16, channel: u16, value: i64) -> bool {
        self.write(ChannelAddress::new(universe, channel), clamp_dmx(value))
    }

    /// Write one already-clamped value
    pub fn write(&self, address: ChannelAddress, value: u8) -> bool {
        let mut universes = self.universes.write();
        match Self::slot(address, universes.len()) {
            Some((u, c)) => {
                universes[u][c] = value;
                true
            }
            None => {
                trace!("Dropping write to unpatched channel {}", address);
                false
            }
        }
    }

    /// Apply a batch of writes under one lock
    ///
    /// A frame snapshot taken concurrently sees either none or all of the
    /// batch. Returns the number of writes applied.
    pub fn write_batch<I>(&self, writes: I) -> usize
    where
        I: IntoIterator<Item = (ChannelAddress, u8)>,
    {
        let mut universes = self.universes.write();
        let count = universes.len();
        let mut applied = 0;
        for (address, value) in writes {
            if let Some((u, c)) = Self::slot(address, count) {
                universes[u][c] = value;
                applied += 1;
            }
        }
        applied
    }

    pub fn get_channel(&self, universe: u16, channel: u16) -> Option<u8> {
        let universes = self.universes.read();
        Self::slot(ChannelAddress::new(universe, channel), universes.len())
            .map(|(u, c)| universes[u][c])
    }

    pub fn get(&self, address: ChannelAddress) -> Option<u8> {
        self.get_channel(address.universe, address.channel)
    }

    /// Copy of one universe's 512 values
    pub fn get_universe(&self, universe: u16) -> Option<UniverseData> {
        let index = (universe as usize).checked_sub(1)?;
        self.universes.read().get(index).copied()
    }

    /// Copy of every universe, paired with its 1-based id
    pub fn snapshot(&self) -> Vec<(u16, UniverseData)> {
        self.universes
            .read()
            .iter()
            .enumerate()
            .map(|(i, data)| (i as u16 + 1, *data))
            .collect()
    }

    /// Every configured channel address, in universe/channel order
    pub fn addresses(&self) -> Vec<ChannelAddress> {
        let count = self.universe_count();
        (1..=count)
            .flat_map(|u| (1..=DMX_CHANNELS as u16).map(move |c| ChannelAddress::new(u, c)))
            .collect()
    }

    /// Zero every channel of every universe
    pub fn blackout(&self) {
        for data in self.universes.write().iter_mut() {
            data.fill(0);
        }
    }
}
