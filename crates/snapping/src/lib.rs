//! Snap target synchronization: every named layer added to the map becomes
//! exactly one snap target for the feature-snapping subsystem.
//! 吸附目標同步：每個加入地圖的具名圖層只會成為一個吸附目標。

pub mod sync;
pub mod target;

pub use sync::{
    subscribe_synchronizer, FailurePolicy, LayerAddedOutcome, LayerSelection, Selection,
    SnapConfig, SnapError, SnapTargetSynchronizer, SnappingAgent,
};
pub use target::{NameIndex, SnapTarget, LOCAL_SOURCE};
