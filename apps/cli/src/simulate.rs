//! Headless stand-ins for the viewer's UI collaborators.
//! 無介面環境下模擬檢視器元件。

use mapview_session::{
    FallbackContainer, Localization, LonLat, ToolsWindow, Viewport, ViewportCenter,
};
use mapview_snapping::{LayerSelection, SnapError, SnapTarget, SnappingAgent};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Default, Serialize)]
pub struct HeadlessLocale {
    pub language: Option<String>,
}

impl Localization for HeadlessLocale {
    fn set_language(&mut self, language: &str) {
        debug!(%language, "display language applied");
        self.language = Some(language.to_string());
    }
}

#[derive(Debug, Default, Serialize)]
pub struct HeadlessWindow {
    pub visible: bool,
    pub x: f64,
    pub y: f64,
}

impl ToolsWindow for HeadlessWindow {
    fn show(&mut self) {
        self.visible = true;
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    fn set_position(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }
}

#[derive(Debug, Default, Serialize)]
pub struct HeadlessContainer {
    pub visible: bool,
}

impl FallbackContainer for HeadlessContainer {
    fn show(&mut self) {
        self.visible = true;
    }

    fn hide(&mut self) {
        self.visible = false;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HeadlessViewport {
    center: LonLat,
    zoom: i32,
}

impl HeadlessViewport {
    pub fn at(center: ViewportCenter) -> Self {
        Self {
            center: center.lon_lat(),
            zoom: center.zoom,
        }
    }
}

impl Viewport for HeadlessViewport {
    fn center(&self) -> LonLat {
        self.center
    }

    fn zoom(&self) -> i32 {
        self.zoom
    }

    fn set_center(&mut self, center: LonLat, zoom: i32) {
        self.center = center;
        self.zoom = zoom;
    }
}

/// Accepts every target.
#[derive(Debug, Default)]
pub struct HeadlessAgent;

impl SnappingAgent for HeadlessAgent {
    fn add_snapping_target(&mut self, target: &SnapTarget) -> Result<(), SnapError> {
        debug!(source = %target.source, name = %target.name, "snapping target added");
        Ok(())
    }
}

/// Layer tree keyed by layer name; every added layer has a record.
#[derive(Debug, Default)]
pub struct HeadlessLayerTree {
    pub selected: Option<String>,
}

impl LayerSelection for HeadlessLayerTree {
    type Record = String;

    fn layer_record_for(&self, target: &SnapTarget) -> Option<String> {
        Some(target.name.clone())
    }

    fn select_layer(&mut self, record: String) -> Result<(), SnapError> {
        self.selected = Some(record);
        Ok(())
    }
}
