//! Position Manager
//!
//! Bounded registry of open positions plus the acquisition gate.
//!
//! - Only one buy may be in flight process-wide. The gate is an atomic
//!   compare-exchange handed out as an RAII guard, so it is released on every
//!   exit path of the buy routine.
//! - Capacity is re-checked under the registry lock at registration time.
//! - Sells are gated per mint through the position status, so one mint can
//!   never be liquidated twice concurrently while different mints sell in parallel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use thiserror::Error;

use super::position::{Position, PositionStatus};

#[derive(Debug, Error, PartialEq)]
pub enum PositionManagerError {
    #[error("Max positions reached ({0})")]
    AtCapacity(usize),
    #[error("Position already registered for mint: {0}")]
    Duplicate(String),
}

/// Holds the acquisition gate until dropped
#[derive(Debug)]
pub struct AcquisitionGuard<'a> {
    gate: &'a AtomicBool,
}

impl Drop for AcquisitionGuard<'_> {
    fn drop(&mut self) {
        self.gate.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
pub struct PositionManager {
    max_positions: usize,
    positions: Mutex<HashMap<String, Position>>,
    processing: AtomicBool,
}

impl PositionManager {
    pub fn new(max_positions: usize) -> Self {
        Self {
            max_positions,
            positions: Mutex::new(HashMap::new()),
            processing: AtomicBool::new(false),
        }
    }

    pub fn max_positions(&self) -> usize {
        self.max_positions
    }

    /// True iff the open count is below the configured maximum
    pub fn can_open(&self) -> bool {
        self.positions.lock().len() < self.max_positions
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// Raw gate setter. Prefer `try_begin_acquisition`.
    pub fn set_processing(&self, state: bool) {
        self.processing.store(state, Ordering::Release);
    }

    /// Take the acquisition gate if it is free
    pub fn try_begin_acquisition(&self) -> Option<AcquisitionGuard<'_>> {
        self.processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| AcquisitionGuard {
                gate: &self.processing,
            })
    }

    /// Register a position, re-checking capacity under the lock
    pub fn try_add(&self, position: Position) -> Result<(), PositionManagerError> {
        let mut positions = self.positions.lock();
        if positions.contains_key(&position.mint) {
            return Err(PositionManagerError::Duplicate(position.mint));
        }
        if positions.len() >= self.max_positions {
            return Err(PositionManagerError::AtCapacity(self.max_positions));
        }
        positions.insert(position.mint.clone(), position);
        Ok(())
    }

    /// Remove a position; false if the mint was not registered
    pub fn remove(&self, mint: &str) -> bool {
        self.positions.lock().remove(mint).is_some()
    }

    pub fn count(&self) -> usize {
        self.positions.lock().len()
    }

    pub fn contains(&self, mint: &str) -> bool {
        self.positions.lock().contains_key(mint)
    }

    pub fn get(&self, mint: &str) -> Option<Position> {
        self.positions.lock().get(mint).cloned()
    }

    pub fn snapshot(&self) -> Vec<Position> {
        self.positions.lock().values().cloned().collect()
    }

    /// Claim the sell phase for a mint. False if it is unknown, already
    /// liquidating, or stuck.
    pub fn begin_liquidation(&self, mint: &str) -> bool {
        let mut positions = self.positions.lock();
        match positions.get_mut(mint) {
            Some(pos) if pos.status == PositionStatus::Open => {
                pos.status = PositionStatus::Liquidating;
                true
            }
            _ => false,
        }
    }

    /// Freeze a position whose sells all failed; it keeps its slot
    pub fn mark_stuck(&self, mint: &str) -> bool {
        let mut positions = self.positions.lock();
        match positions.get_mut(mint) {
            Some(pos) => {
                pos.status = PositionStatus::Stuck;
                true
            }
            None => false,
        }
    }

    pub fn stuck_count(&self) -> usize {
        self.positions
            .lock()
            .values()
            .filter(|p| p.status == PositionStatus::Stuck)
            .count()
    }
}
