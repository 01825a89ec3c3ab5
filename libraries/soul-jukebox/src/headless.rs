//! In-memory audio backend
//!
//! Produces no sound. Every handle the controller opens is recorded on a
//! shared [`HeadlessDeck`], which a host (a simulator, a test) inspects to
//! see what the controller asked for, and uses to build the
//! [`MediaSignal`]s a real platform would deliver.

use crate::backend::{AudioBackend, AudioHandle, HandleId, MediaSignal, StartOutcome};
use crate::error::{JukeboxError, Result};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use tracing::trace;

/// How headless handles answer a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartPolicy {
    /// Start succeeds synchronously
    #[default]
    Immediate,

    /// Start stays pending until the host calls [`HeadlessDeck::settle_start`]
    Deferred,
}

/// Lifecycle of a recorded handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleStatus {
    /// Opened, never started
    Loaded,
    /// Start pending
    Starting,
    Playing,
    Paused,
    /// Dropped by the controller
    Released,
}

/// What the deck knows about one handle
#[derive(Debug, Clone, PartialEq)]
pub struct HandleRecord {
    pub id: HandleId,
    pub locator: String,
    pub status: HandleStatus,
    /// Last output level applied
    pub level: f32,
    /// Number of rewind-to-start requests
    pub rewinds: u32,
}

#[derive(Debug, Default)]
struct DeckState {
    records: Vec<HandleRecord>,
    policy: StartPolicy,
    refuse_open: HashSet<String>,
    refuse_start: HashSet<String>,
}

impl DeckState {
    fn record_mut(&mut self, id: HandleId) -> Option<&mut HandleRecord> {
        self.records.iter_mut().find(|r| r.id == id)
    }
}

/// Shared view of every handle a [`HeadlessBackend`] has opened
#[derive(Debug, Clone, Default)]
pub struct HeadlessDeck {
    state: Rc<RefCell<DeckState>>,
}

impl HeadlessDeck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend writing to this deck, to hand to the controller
    pub fn backend(&self) -> HeadlessBackend {
        HeadlessBackend { deck: self.clone() }
    }

    pub fn set_start_policy(&self, policy: StartPolicy) {
        self.state.borrow_mut().policy = policy;
    }

    /// Make `open` fail for this locator
    pub fn refuse_open(&self, locator: impl Into<String>) {
        self.state.borrow_mut().refuse_open.insert(locator.into());
    }

    /// Make `start` fail for this locator
    pub fn refuse_start(&self, locator: impl Into<String>) {
        self.state.borrow_mut().refuse_start.insert(locator.into());
    }

    /// Record for a handle
    pub fn record(&self, id: HandleId) -> Option<HandleRecord> {
        self.state
            .borrow()
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// All handles ever opened, oldest first
    pub fn records(&self) -> Vec<HandleRecord> {
        self.state.borrow().records.clone()
    }

    /// Most recently opened handle that has not been released
    pub fn live(&self) -> Option<HandleRecord> {
        self.state
            .borrow()
            .records
            .iter()
            .rev()
            .find(|r| r.status != HandleStatus::Released)
            .cloned()
    }

    /// Number of handles not yet released
    pub fn live_count(&self) -> usize {
        self.state
            .borrow()
            .records
            .iter()
            .filter(|r| r.status != HandleStatus::Released)
            .count()
    }

    pub fn opened_count(&self) -> usize {
        self.state.borrow().records.len()
    }

    /// Resolve a pending start and return the signal to deliver
    pub fn settle_start(&self, id: HandleId, result: std::result::Result<(), String>) -> MediaSignal {
        if let Some(record) = self.state.borrow_mut().record_mut(id) {
            if record.status == HandleStatus::Starting {
                record.status = if result.is_ok() {
                    HandleStatus::Playing
                } else {
                    HandleStatus::Paused
                };
            }
        }
        MediaSignal::StartSettled { handle: id, result }
    }

    /// Mark the handle finished and return the "ended" signal
    pub fn finish(&self, id: HandleId) -> MediaSignal {
        if let Some(record) = self.state.borrow_mut().record_mut(id) {
            if record.status != HandleStatus::Released {
                record.status = HandleStatus::Paused;
            }
        }
        MediaSignal::Ended(id)
    }

    /// Mark the handle broken and return the "error" signal
    pub fn fail(&self, id: HandleId, detail: impl Into<String>) -> MediaSignal {
        if let Some(record) = self.state.borrow_mut().record_mut(id) {
            if record.status != HandleStatus::Released {
                record.status = HandleStatus::Paused;
            }
        }
        MediaSignal::Failed {
            handle: id,
            detail: Some(detail.into()),
        }
    }
}

/// [`AudioBackend`] recording onto a [`HeadlessDeck`]
#[derive(Debug, Clone)]
pub struct HeadlessBackend {
    deck: HeadlessDeck,
}

impl HeadlessBackend {
    pub fn deck(&self) -> &HeadlessDeck {
        &self.deck
    }
}

impl AudioBackend for HeadlessBackend {
    fn open(&mut self, id: HandleId, locator: &str) -> Result<Box<dyn AudioHandle>> {
        let mut state = self.deck.state.borrow_mut();
        if state.refuse_open.contains(locator) {
            return Err(JukeboxError::Backend(format!("cannot open {locator}")));
        }

        trace!("Headless open {} -> {}", id, locator);
        state.records.push(HandleRecord {
            id,
            locator: locator.to_string(),
            status: HandleStatus::Loaded,
            level: 1.0,
            rewinds: 0,
        });

        Ok(Box::new(HeadlessHandle {
            id,
            locator: locator.to_string(),
            deck: self.deck.clone(),
        }))
    }
}

struct HeadlessHandle {
    id: HandleId,
    locator: String,
    deck: HeadlessDeck,
}

impl HeadlessHandle {
    fn update(&self, f: impl FnOnce(&mut HandleRecord)) {
        if let Some(record) = self.deck.state.borrow_mut().record_mut(self.id) {
            f(record);
        }
    }
}

impl AudioHandle for HeadlessHandle {
    fn id(&self) -> HandleId {
        self.id
    }

    fn start(&mut self) -> StartOutcome {
        let (refused, policy) = {
            let state = self.deck.state.borrow();
            (state.refuse_start.contains(&self.locator), state.policy)
        };

        if refused {
            return StartOutcome::Failed(format!("start refused for {}", self.locator));
        }

        match policy {
            StartPolicy::Immediate => {
                self.update(|r| r.status = HandleStatus::Playing);
                StartOutcome::Started
            }
            StartPolicy::Deferred => {
                self.update(|r| r.status = HandleStatus::Starting);
                StartOutcome::Pending
            }
        }
    }

    fn pause(&mut self) {
        self.update(|r| r.status = HandleStatus::Paused);
    }

    fn rewind(&mut self) {
        self.update(|r| r.rewinds += 1);
    }

    fn set_level(&mut self, level: f32) {
        self.update(|r| r.level = level);
    }
}

impl Drop for HeadlessHandle {
    fn drop(&mut self) {
        self.update(|r| r.status = HandleStatus::Released);
    }
}
