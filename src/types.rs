//! This module contains the types describing a probe run and its outcome.

use fugit::MillisDurationU32;

use crate::packets::PacketKind;

/// Maximum number of phases in a [RunPlan].
pub const MAX_PHASES: usize = 8;

pub const DEFAULT_ATTEMPTS: u32 = 5;
/// Quiet time between two sends of the same phase.
pub const DEFAULT_INTERVAL: MillisDurationU32 = MillisDurationU32::secs(2);
/// Quiet time between two phases.
pub const DEFAULT_PHASE_GAP: MillisDurationU32 = MillisDurationU32::secs(2);
/// How long we give the inverter to answer before looking at the receive buffer.
pub const DEFAULT_SETTLE: MillisDurationU32 = MillisDurationU32::millis(500);

/// One named block of identical sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phase {
    pub name: &'static str,
    pub packet: PacketKind,
}

impl Phase {
    pub const fn new(name: &'static str, packet: PacketKind) -> Self {
        Self { name, packet }
    }
}

/// The phases of a run and the timing between them.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub phases: heapless::Vec<Phase, MAX_PHASES>,
    /// Sends per phase.
    pub attempts: u32,
    pub interval: MillisDurationU32,
    pub phase_gap: MillisDurationU32,
    pub settle: MillisDurationU32,
}

impl Default for RunPlan {
    /// The GW3000SS registration sequence.
    ///
    /// The off-line query is sent a second time after the register removal to see whether
    /// the inverter behaves differently once deregistered.
    fn default() -> Self {
        let phases = [
            Phase::new("Off-line Query", PacketKind::OfflineQuery),
            Phase::new("Remove Register", PacketKind::RemoveRegister),
            Phase::new("Off-line Query (Repeated)", PacketKind::OfflineQuery),
            Phase::new("Allocate Register Address", PacketKind::AllocateRegisterAddress),
            Phase::new("Read Data", PacketKind::ReadData),
        ];
        Self {
            phases: phases.into_iter().collect(),
            attempts: DEFAULT_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
            phase_gap: DEFAULT_PHASE_GAP,
            settle: DEFAULT_SETTLE,
        }
    }
}

impl RunPlan {
    /// Total number of sends this plan will make.
    pub fn total_attempts(&self) -> u32 {
        self.attempts * self.phases.len() as u32
    }
}

/// Tally of one finished phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseResult {
    name: &'static str,
    requested: u32,
    successful: u32,
}

impl PhaseResult {
    /// Create a result, clamping `successful` so it never exceeds `requested`.
    pub fn new(name: &'static str, requested: u32, successful: u32) -> Self {
        Self {
            name,
            requested,
            successful: successful.min(requested),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn requested(&self) -> u32 {
        self.requested
    }

    pub fn successful(&self) -> u32 {
        self.successful
    }

    pub fn failed(&self) -> u32 {
        self.requested - self.successful
    }
}

/// Every phase result of a completed run, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    phases: heapless::Vec<PhaseResult, MAX_PHASES>,
}

impl RunReport {
    pub(crate) fn push(&mut self, result: PhaseResult) {
        // A report never holds more phases than the plan it came from.
        let _ = self.phases.push(result);
    }

    pub fn phases(&self) -> &[PhaseResult] {
        &self.phases
    }

    pub fn total_requested(&self) -> u32 {
        self.phases.iter().map(PhaseResult::requested).sum()
    }

    pub fn total_successful(&self) -> u32 {
        self.phases.iter().map(PhaseResult::successful).sum()
    }
}
