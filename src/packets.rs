//! This module defines the literal frames we send to the inverter.
//!
//! The frames are opaque to us. We never build, parse or checksum them, they are
//! written to the bus exactly as listed here.
use hex_literal::hex;
use strum_macros::{EnumIter, IntoStaticStr};

/// Maximum number of distinct frames a [`Catalog`] can hold.
pub const CATALOG_CAPACITY: usize = 8;

/// __Off-line Query__ - asks unregistered inverters on the bus to announce themselves.
pub const OFFLINE_QUERY: [u8; 9] = hex!("aa55807f00000001fe");
/// __Remove Register__ - drops any address the inverter was previously allocated.
pub const REMOVE_REGISTER: [u8; 9] = hex!("aa55807f0002000200");
/// __Allocate Register Address__ - carries the inverter serial number and the address to assign.
pub const ALLOCATE_REGISTER_ADDRESS: [u8; 26] =
    hex!("aa55807f000011313330303053535531323530303039381105a9");
/// __Read Data__ - requests running data from the allocated address.
pub const READ_DATA: [u8; 9] = hex!("aa5580110101000192");

/// The distinct frame types known to the probe.
#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, IntoStaticStr)]
pub enum PacketKind {
    #[strum(serialize = "Off-line Query")]
    OfflineQuery,
    #[strum(serialize = "Remove Register")]
    RemoveRegister,
    #[strum(serialize = "Allocate Register Address")]
    AllocateRegisterAddress,
    #[strum(serialize = "Read Data")]
    ReadData,
}

impl PacketKind {
    /// Human readable name, as used in the log output.
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// A named, immutable frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Packet<'a> {
    pub kind: PacketKind,
    pub bytes: &'a [u8],
}

impl Packet<'_> {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lowercase hex rendering of the frame.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

/// Read-only lookup from [`PacketKind`] to the bytes we send for it.
///
/// Built once before a run and never mutated afterwards. Use [`Catalog::goodwe`] for the
/// GW3000SS frames, or [`Catalog::builder`] to swap in other frames.
#[derive(Debug, Clone)]
pub struct Catalog<'a> {
    entries: heapless::Vec<Packet<'a>, CATALOG_CAPACITY>,
}

impl<'a> Catalog<'a> {
    /// The frames used for the Goodwe GW3000SS.
    pub fn goodwe() -> Self {
        Catalog::builder()
            .with(PacketKind::OfflineQuery, &OFFLINE_QUERY)
            .with(PacketKind::RemoveRegister, &REMOVE_REGISTER)
            .with(PacketKind::AllocateRegisterAddress, &ALLOCATE_REGISTER_ADDRESS)
            .with(PacketKind::ReadData, &READ_DATA)
            .build()
    }

    pub fn builder() -> CatalogBuilder<'a> {
        CatalogBuilder {
            entries: heapless::Vec::new(),
        }
    }

    /// Look up the frame for `kind`.
    pub fn get(&self, kind: PacketKind) -> Option<Packet<'a>> {
        self.entries.iter().find(|p| p.kind == kind).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collects frames for a [`Catalog`]. Registering a kind twice keeps the last frame.
pub struct CatalogBuilder<'a> {
    entries: heapless::Vec<Packet<'a>, CATALOG_CAPACITY>,
}

impl<'a> CatalogBuilder<'a> {
    /// Register `bytes` for `kind`.
    ///
    /// Empty frames are ignored, there is nothing to put on the bus.
    pub fn with(mut self, kind: PacketKind, bytes: &'a [u8]) -> Self {
        if bytes.is_empty() {
            return self;
        }
        let packet = Packet { kind, bytes };
        match self.entries.iter_mut().find(|p| p.kind == kind) {
            Some(existing) => *existing = packet,
            // One slot per kind, so capacity cannot run out.
            None => {
                let _ = self.entries.push(packet);
            }
        }
        self
    }

    pub fn build(self) -> Catalog<'a> {
        Catalog {
            entries: self.entries,
        }
    }
}
