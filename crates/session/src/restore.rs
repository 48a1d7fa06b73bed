//! Startup restore: store → UI.
//! 啟動時由儲存區還原介面狀態（單向）。
//!
//! Every step is best-effort and independent of the others. Malformed or
//! missing values fall back to configured defaults and are only logged.

use serde::Serialize;
use tracing::debug;

use crate::codec::{Language, StateCodec, ViewportCenter, WindowPosition, WindowVisibility};
use crate::config::SessionConfig;
use crate::store::{self, StateStore};
use crate::ui::{FallbackContainer, Localization, ToolsWindow, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowState {
    pub visible: bool,
    pub position: WindowPosition,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestoredState {
    pub language: String,
    pub window: WindowState,
    /// `None` keeps the viewport's configured default.
    pub viewport: Option<ViewportCenter>,
}

/// 讀取並解碼所有啟動狀態。 / Reads and decodes every piece of startup state.
pub fn restore<S: StateStore + ?Sized>(store: &S, config: &SessionConfig) -> RestoredState {
    RestoredState {
        language: resolve_language(store, config),
        window: resolve_window(store, config),
        viewport: resolve_viewport(store),
    }
}

pub fn resolve_language<S: StateStore + ?Sized>(store: &S, config: &SessionConfig) -> String {
    match Language::load(store) {
        Ok(Language(language)) => {
            debug!(%language, "language setting found");
            language
        }
        Err(err) => {
            debug!(error = %err, "using default language");
            config.default_language.clone()
        }
    }
}

pub fn resolve_window<S: StateStore + ?Sized>(store: &S, config: &SessionConfig) -> WindowState {
    let shown = store::read(store, WindowVisibility::KEY);
    let visibility = WindowVisibility::from_stored(shown.as_deref());
    let position = match WindowPosition::load(store) {
        Ok(position) => {
            debug!(x = position.x, y = position.y, "tools window position found");
            position
        }
        Err(err) => {
            debug!(error = %err, "using default tools window position");
            config.default_window_position
        }
    };
    WindowState {
        visible: visibility.visible,
        position,
    }
}

pub fn resolve_viewport<S: StateStore + ?Sized>(store: &S) -> Option<ViewportCenter> {
    match ViewportCenter::load(store) {
        Ok(center) if center.is_set() => {
            debug!(
                lat = center.lat,
                lon = center.lon,
                zoom = center.zoom,
                "map center found"
            );
            Some(center)
        }
        Ok(center) => {
            debug!(
                lat = center.lat,
                lon = center.lon,
                zoom = center.zoom,
                "map center has a zero field, keeping default"
            );
            None
        }
        Err(err) => {
            debug!(error = %err, "keeping default map center");
            None
        }
    }
}

/// 將還原結果套用到介面；視窗與收合容器恰有一個可見。 / Applies restored state; exactly one of window and container ends up visible.
///
/// The language is applied first, then the window, then the viewport.
pub fn apply<L, W, C, V>(
    state: &RestoredState,
    localization: &mut L,
    window: &mut W,
    container: &mut C,
    viewport: &mut V,
) where
    L: Localization + ?Sized,
    W: ToolsWindow + ?Sized,
    C: FallbackContainer + ?Sized,
    V: Viewport + ?Sized,
{
    localization.set_language(&state.language);

    if state.window.visible {
        window.show();
        container.hide();
    } else {
        window.hide();
        container.show();
    }
    window.set_position(state.window.position.x, state.window.position.y);

    if let Some(center) = state.viewport {
        viewport.set_center(center.lon_lat(), center.zoom);
    }
}

/// Restores from `store` and applies the result in one go.
pub fn restore_and_apply<S, L, W, C, V>(
    store: &S,
    config: &SessionConfig,
    localization: &mut L,
    window: &mut W,
    container: &mut C,
    viewport: &mut V,
) -> RestoredState
where
    S: StateStore + ?Sized,
    L: Localization + ?Sized,
    W: ToolsWindow + ?Sized,
    C: FallbackContainer + ?Sized,
    V: Viewport + ?Sized,
{
    let state = restore(store, config);
    apply(&state, localization, window, container, viewport);
    state
}
