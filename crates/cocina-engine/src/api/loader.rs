//! Dependency-ordered view initialization.
//!
//! Views are registered in groups. A group starts only after every view of
//! the previous group has been initialized, has failed, or has been skipped.
//! A view is initialized as soon as its container is announced ready.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

use super::app::AppState;
use crate::core::chart::ChartError;
use crate::data::DataError;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Chart(#[from] ChartError),
    #[error("{0}")]
    Other(String),
}

/// One visualization on the page.
pub trait View {
    /// Name used in logs and load events.
    fn name(&self) -> &str;

    /// DOM id of the element the view draws into.
    fn container(&self) -> &str;

    /// Build the view once its container exists.
    fn init(&mut self, state: &mut AppState) -> Result<(), ViewError>;

    /// React to a change of the shared state.
    fn update(&mut self, _state: &AppState) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewStatus {
    Pending,
    Ready,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LoadEvent {
    Initialized { view: String },
    Failed { view: String, reason: String },
    Skipped { view: String },
    GroupDone { group: usize },
    Finished,
}

struct Slot<V> {
    view: V,
    status: ViewStatus,
}

pub struct Loader<V> {
    groups: Vec<Vec<Slot<V>>>,
    current: usize,
    ready: HashSet<String>,
    events: Vec<LoadEvent>,
}

impl<V: View> Loader<V> {
    pub fn new(groups: Vec<Vec<V>>) -> Self {
        let groups = groups
            .into_iter()
            .map(|g| g.into_iter().map(|view| Slot { view, status: ViewStatus::Pending }).collect())
            .collect();
        Self {
            groups,
            current: 0,
            ready: HashSet::new(),
            events: Vec::new(),
        }
    }

    /// A container appeared in the DOM. Initializes every view that was
    /// waiting for it, as far as group ordering allows.
    pub fn container_ready(&mut self, container: &str, state: &mut AppState) {
        self.ready.insert(container.to_string());
        self.pump(state);
    }

    /// No more containers will appear. Views still waiting are skipped and
    /// the remaining groups run with whatever is ready.
    pub fn finish(&mut self, state: &mut AppState) {
        while self.current < self.groups.len() {
            self.pump(state);
            let Some(group) = self.groups.get_mut(self.current) else { break };
            for slot in group.iter_mut().filter(|s| s.status == ViewStatus::Pending) {
                log::warn!("view {}: container #{} never appeared", slot.view.name(), slot.view.container());
                slot.status = ViewStatus::Skipped;
                self.events.push(LoadEvent::Skipped { view: slot.view.name().to_string() });
            }
            self.advance_if_done();
        }
    }

    fn pump(&mut self, state: &mut AppState) {
        while let Some(group) = self.groups.get_mut(self.current) {
            for slot in group.iter_mut() {
                if slot.status != ViewStatus::Pending || !self.ready.contains(slot.view.container()) {
                    continue;
                }
                let name = slot.view.name().to_string();
                match slot.view.init(state) {
                    Ok(()) => {
                        log::info!("view {name} initialized");
                        slot.status = ViewStatus::Ready;
                        self.events.push(LoadEvent::Initialized { view: name });
                    }
                    Err(err) => {
                        log::error!("view {name} failed to initialize: {err}");
                        slot.status = ViewStatus::Failed;
                        self.events.push(LoadEvent::Failed { view: name, reason: err.to_string() });
                    }
                }
            }
            if !self.advance_if_done() {
                break;
            }
        }
    }

    fn advance_if_done(&mut self) -> bool {
        let Some(group) = self.groups.get(self.current) else { return false };
        if group.iter().any(|s| s.status == ViewStatus::Pending) {
            return false;
        }
        self.events.push(LoadEvent::GroupDone { group: self.current });
        self.current += 1;
        if self.current == self.groups.len() {
            log::info!("all view groups loaded");
            self.events.push(LoadEvent::Finished);
        }
        true
    }

    pub fn is_finished(&self) -> bool {
        self.current >= self.groups.len()
    }

    pub fn status(&self, name: &str) -> Option<ViewStatus> {
        self.slots().find(|s| s.view.name() == name).map(|s| s.status)
    }

    /// Pass the shared state to every initialized view.
    pub fn update(&mut self, state: &AppState) {
        for slot in self.groups.iter_mut().flatten() {
            if slot.status == ViewStatus::Ready {
                slot.view.update(state);
            }
        }
    }

    /// Initialized views.
    pub fn views_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.groups
            .iter_mut()
            .flatten()
            .filter(|s| s.status == ViewStatus::Ready)
            .map(|s| &mut s.view)
    }

    pub fn drain_events(&mut self) -> Vec<LoadEvent> {
        std::mem::take(&mut self.events)
    }

    fn slots(&self) -> impl Iterator<Item = &Slot<V>> {
        self.groups.iter().flatten()
    }
}
