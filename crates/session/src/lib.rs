//! Session-state persistence for the map viewer: a cookie-style client store,
//! typed codecs for the values kept in it, and the two one-way bindings
//! between the store and the UI.
//! 地圖檢視器的工作階段狀態保存：cookie 形式的客戶端儲存、型別化編解碼與兩個單向綁定。

pub mod binding;
pub mod codec;
pub mod config;
pub mod cookie;
pub mod events;
pub mod restore;
pub mod store;
pub mod ui;

pub use binding::{subscribe_write_back, WriteBack, WriteTrigger};
pub use codec::{
    DecodeError, Language, StateCodec, ViewportCenter, WindowPosition, WindowVisibility,
};
pub use config::{ConfigError, Sanitize, SessionConfig};
pub use events::{EventHub, LayerParams, MapEvent, MapLayer, SubscriptionId, WindowEvent};
pub use restore::{apply, restore, restore_and_apply, RestoredState, WindowState};
pub use store::{
    read, write, Clock, CookieJar, FileStore, FixedClock, StateStore, StoreEntry, StoreError,
    SystemClock,
};
pub use ui::{
    reveal_tools_window, subscribe_fallback, FallbackContainer, Localization, LonLat, ToolsWindow,
    Viewport,
};
