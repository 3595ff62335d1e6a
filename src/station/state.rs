//! Process state and status flags

use serde::{Deserialize, Serialize};

/// Cooldown applied when a handler finds nothing to do
pub const RETRY_COOLDOWN: i32 = -40;

/// Station status bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationFlags(u16);

impl StationFlags {
    /// Receiving redstone power; blocks the start of new cycles
    pub const POWERED: StationFlags = StationFlags(1 << 0);
    pub const SUGARED: StationFlags = StationFlags(1 << 1);
    pub const NO_FUEL: StationFlags = StationFlags(1 << 2);
    pub const NO_RECIPE: StationFlags = StationFlags(1 << 3);
    pub const NO_INGREDIENTS: StationFlags = StationFlags(1 << 4);
    /// Passthrough disabled by the operator
    pub const NO_PASSTHROUGH: StationFlags = StationFlags(1 << 5);
    pub const FILTERED_INSERT: StationFlags = StationFlags(1 << 6);
    pub const NO_ANTS: StationFlags = StationFlags(1 << 7);

    /// Transient failure bits, cleared before every evaluation
    pub const FAILURES: StationFlags =
        StationFlags(Self::NO_FUEL.0 | Self::NO_RECIPE.0 | Self::NO_INGREDIENTS.0);

    pub const fn empty() -> Self {
        StationFlags(0)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Unknown bits are dropped
    pub const fn from_bits_truncate(bits: u16) -> Self {
        StationFlags(bits & 0xff)
    }

    pub const fn contains(self, other: StationFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: StationFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: StationFlags) {
        self.0 &= !other.0;
    }

    pub fn set(&mut self, other: StationFlags, on: bool) {
        if on {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }

    pub fn toggle(&mut self, other: StationFlags) {
        self.0 ^= other.0;
    }
}

/// Processing counters of one station
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessState {
    /// Work done in the current cycle; negative while cooling down
    pub progress: i32,
    /// Work a cycle needs; 0 when idle
    pub max_progress: i32,
    /// Banked fuel
    pub fuel_left: u32,
    /// Recipe of the running (or last) cycle; empty for none
    pub last_recipe_id: String,
    /// Composter fill level, 0-7
    pub compost_level: u8,
    pub flags: StationFlags,
}

/// Coarse phase derived from the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Retrying,
    Accumulating,
    Done,
}

impl ProcessState {
    pub fn phase(&self) -> Phase {
        if self.progress < 0 {
            Phase::Retrying
        } else if self.max_progress == 0 {
            Phase::Idle
        } else if self.progress >= self.max_progress {
            Phase::Done
        } else {
            Phase::Accumulating
        }
    }

    /// Back to idle after a finished or abandoned cycle
    pub fn reset_cycle(&mut self) {
        self.progress = 0;
        self.max_progress = 0;
    }

    /// Enter the short retry cooldown
    pub fn retry(&mut self) {
        self.progress = RETRY_COOLDOWN;
        self.max_progress = 0;
    }

    pub fn has(&self, flag: StationFlags) -> bool {
        self.flags.contains(flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_bits() {
        let mut flags = StationFlags::empty();
        flags.insert(StationFlags::NO_FUEL);
        flags.insert(StationFlags::FILTERED_INSERT);
        assert!(flags.contains(StationFlags::NO_FUEL));
        flags.remove(StationFlags::FAILURES);
        assert!(!flags.contains(StationFlags::NO_FUEL));
        assert!(flags.contains(StationFlags::FILTERED_INSERT));
        assert_eq!(StationFlags::from_bits_truncate(flags.bits()), flags);
    }

    #[test]
    fn test_phases() {
        let mut state = ProcessState::default();
        assert_eq!(state.phase(), Phase::Idle);
        state.max_progress = 100;
        state.progress = 10;
        assert_eq!(state.phase(), Phase::Accumulating);
        state.progress = 100;
        assert_eq!(state.phase(), Phase::Done);
        state.retry();
        assert_eq!(state.phase(), Phase::Retrying);
    }
}
