use std::cell::RefCell;
use std::rc::Rc;

use mapview_session::{EventHub, MapEvent, MapLayer, Sanitize, SubscriptionId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::target::{NameIndex, SnapTarget, LOCAL_SOURCE};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapError {
    #[error("snapping agent rejected {name}: {reason}")]
    Registration { name: String, reason: String },
    #[error("layer selection failed for {name}: {reason}")]
    Selection { name: String, reason: String },
}

/// 外部的幾何吸附子系統。 / The external feature-snapping subsystem.
pub trait SnappingAgent {
    fn add_snapping_target(&mut self, target: &SnapTarget) -> Result<(), SnapError>;
}

/// 外部的圖層選取子系統。 / The external layer-selection subsystem.
pub trait LayerSelection {
    type Record;

    /// Looks up the map's layer record for `target`.
    fn layer_record_for(&self, target: &SnapTarget) -> Option<Self::Record>;

    fn select_layer(&mut self, record: Self::Record) -> Result<(), SnapError>;
}

/// 登錄失敗時的處理策略。 / What happens to a name whose registration failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log, keep the list entry and index the name; no retry this session.
    #[default]
    KeepIndexed,
    /// Log, drop the list entry and leave the name unindexed so the next
    /// notification for the same layer tries again.
    RetryOnNextAdd,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapConfig {
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_source() -> String {
    LOCAL_SOURCE.to_string()
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl Sanitize for SnapConfig {
    fn sanitize(&mut self) {
        if self.source.trim().is_empty() {
            self.source = default_source();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Selected,
    NoRecord,
    Failed(SnapError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerAddedOutcome {
    /// The layer carries no identifying name.
    NotEligible,
    AlreadyRegistered(String),
    Registered {
        target: SnapTarget,
        selection: Selection,
    },
    RegistrationFailed {
        target: SnapTarget,
        error: SnapError,
        will_retry: bool,
    },
}

/// 將新增的地圖圖層同步為吸附目標，每個名稱至多一筆。 / Keeps snap targets in step with added layers, one per name.
#[derive(Debug)]
pub struct SnapTargetSynchronizer<A, L> {
    agent: A,
    selection: L,
    config: SnapConfig,
    targets: Vec<SnapTarget>,
    names: NameIndex,
}

impl<A, L> SnapTargetSynchronizer<A, L>
where
    A: SnappingAgent,
    L: LayerSelection,
{
    pub fn new(agent: A, selection: L) -> Self {
        Self::with_config(agent, selection, SnapConfig::default())
    }

    pub fn with_config(agent: A, selection: L, config: SnapConfig) -> Self {
        Self {
            agent,
            selection,
            config,
            targets: Vec::new(),
            names: NameIndex::new(),
        }
    }

    /// 處理圖層新增通知。 / Handles one layer-added notification.
    ///
    /// Side effects run in a fixed order: list append, agent registration,
    /// index append, layer selection.
    pub fn on_layer_added(&mut self, layer: &MapLayer) -> LayerAddedOutcome {
        let Some(name) = layer.layer_name() else {
            trace!(title = %layer.title, "layer has no name parameter, not snap-eligible");
            return LayerAddedOutcome::NotEligible;
        };
        if self.names.contains(name) {
            trace!(%name, "snap target already registered");
            return LayerAddedOutcome::AlreadyRegistered(name.to_string());
        }

        let target = SnapTarget::new(self.config.source.clone(), name);
        self.targets.push(target.clone());

        if let Err(error) = self.agent.add_snapping_target(&target) {
            let will_retry = self.config.failure_policy == FailurePolicy::RetryOnNextAdd;
            warn!(
                name = %target.name,
                error = %error,
                will_retry,
                "failed to register snap target"
            );
            if will_retry {
                self.targets.pop();
            } else {
                self.names.insert(target.name.clone());
            }
            return LayerAddedOutcome::RegistrationFailed {
                target,
                error,
                will_retry,
            };
        }

        self.names.insert(target.name.clone());
        debug!(source = %target.source, name = %target.name, "registered snap target");
        let selection = self.select(&target);
        LayerAddedOutcome::Registered { target, selection }
    }

    /// Routes `AddLayer` notifications; other map events are ignored.
    pub fn on_map_event(&mut self, event: &MapEvent) -> Option<LayerAddedOutcome> {
        match event {
            MapEvent::AddLayer(layer) => Some(self.on_layer_added(layer)),
            _ => None,
        }
    }

    fn select(&mut self, target: &SnapTarget) -> Selection {
        let Some(record) = self.selection.layer_record_for(target) else {
            debug!(name = %target.name, "no layer record to select");
            return Selection::NoRecord;
        };
        match self.selection.select_layer(record) {
            Ok(()) => Selection::Selected,
            Err(error) => {
                warn!(name = %target.name, error = %error, "failed to select layer");
                Selection::Failed(error)
            }
        }
    }

    pub fn targets(&self) -> &[SnapTarget] {
        &self.targets
    }

    pub fn names(&self) -> &NameIndex {
        &self.names
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn config(&self) -> &SnapConfig {
        &self.config
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut A {
        &mut self.agent
    }

    pub fn selection(&self) -> &L {
        &self.selection
    }
}

/// 訂閱地圖事件中的圖層新增通知。 / Feeds `AddLayer` notifications from `map_events` into `synchronizer`.
pub fn subscribe_synchronizer<A, L>(
    map_events: &mut EventHub<MapEvent>,
    synchronizer: Rc<RefCell<SnapTargetSynchronizer<A, L>>>,
) -> SubscriptionId
where
    A: SnappingAgent + 'static,
    L: LayerSelection + 'static,
{
    map_events.subscribe(move |event| {
        synchronizer.borrow_mut().on_map_event(event);
    })
}
