use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::models::{UnitSpec, UnitState};
use crate::domain::ports::{Scheduler, SchedulerError, SubmitOutcome};

#[derive(Debug, Default)]
struct State {
    units: BTreeMap<String, UnitSpec>,
    submissions: Vec<String>,
    pending_rejections: u32,
    scripted: VecDeque<Vec<UnitState>>,
    converge_on_submit: bool,
    polls: u32,
}

/// In-process scheduler.
///
/// By default it reports nothing. Either script the sequence of state
/// reports with [`push_states`](Self::push_states) (the last report
/// repeats), or let submitted units report their target state immediately
/// with [`converging`](Self::converging).
#[derive(Debug, Default)]
pub struct InMemoryScheduler {
    state: Mutex<State>,
}

impl InMemoryScheduler {
    /// Scheduler that reports nothing until scripted
    pub fn new() -> Self {
        Self::default()
    }

    /// A scheduler where every submitted unit is reported in its target state
    pub fn converging() -> Self {
        let scheduler = Self::new();
        scheduler.lock().converge_on_submit = true;
        scheduler
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue one state report
    pub fn push_states(&self, states: Vec<UnitState>) {
        self.lock().scripted.push_back(states);
    }

    /// Answer the next `n` submissions with a non-accepted status
    pub fn reject_next(&self, n: u32) {
        self.lock().pending_rejections = n;
    }

    /// Names of every submission attempt, in order, including rejected ones
    pub fn submissions(&self) -> Vec<String> {
        self.lock().submissions.clone()
    }

    /// Units the scheduler has accepted
    pub fn units(&self) -> Vec<String> {
        self.lock().units.keys().cloned().collect()
    }

    /// Number of state queries served
    pub fn polls(&self) -> u32 {
        self.lock().polls
    }
}

#[async_trait]
impl Scheduler for InMemoryScheduler {
    async fn submit_unit(&self, unit: &UnitSpec) -> Result<SubmitOutcome, SchedulerError> {
        let mut state = self.lock();
        state.submissions.push(unit.name.clone());

        if state.pending_rejections > 0 {
            state.pending_rejections -= 1;
            return Ok(SubmitOutcome::NotAccepted {
                status: 500,
                body: "injected rejection".to_string(),
            });
        }
        if state.units.contains_key(&unit.name) {
            return Ok(SubmitOutcome::AlreadyExists);
        }
        state.units.insert(unit.name.clone(), unit.clone());
        Ok(SubmitOutcome::Accepted)
    }

    async fn unit_states(&self) -> Result<Vec<UnitState>, SchedulerError> {
        let mut state = self.lock();
        state.polls += 1;

        if state.converge_on_submit {
            return Ok(state
                .units
                .values()
                .map(|unit| UnitState {
                    unit_name: unit.name.clone(),
                    machine_id: unit
                        .name
                        .split_once('@')
                        .and_then(|(_, rest)| rest.split_once('.'))
                        .map(|(id, _)| id.to_string())
                        .unwrap_or_default(),
                    active_state: unit.target_active_state.clone(),
                    sub_state: unit.target_sub_state.clone(),
                    load_state: Some("loaded".to_string()),
                    hash: None,
                })
                .collect());
        }

        let report = if state.scripted.len() > 1 {
            state.scripted.pop_front().unwrap_or_default()
        } else {
            state.scripted.front().cloned().unwrap_or_default()
        };
        Ok(report)
    }
}
