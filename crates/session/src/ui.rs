use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::codec::ViewportCenter;
use crate::events::{EventHub, SubscriptionId, WindowEvent};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// 地圖視埠。 / The map viewport.
pub trait Viewport {
    fn center(&self) -> LonLat;
    fn zoom(&self) -> i32;
    fn set_center(&mut self, center: LonLat, zoom: i32);
}

/// 可拖曳的工具視窗。 / The floating tools window.
pub trait ToolsWindow {
    fn show(&mut self);
    fn hide(&mut self);
    fn set_position(&mut self, x: f64, y: f64);
}

/// 介面語系切換。 / Switches the UI's display language.
pub trait Localization {
    fn set_language(&mut self, language: &str);
}

/// 視窗隱藏時顯示的收合容器。 / Collapsed container shown while the tools window is hidden.
pub trait FallbackContainer {
    fn show(&mut self);
    fn hide(&mut self);
}

impl ViewportCenter {
    pub fn from_viewport<V: Viewport + ?Sized>(viewport: &V) -> Self {
        let center = viewport.center();
        Self::new(center.lat, center.lon, viewport.zoom())
    }

    pub fn lon_lat(&self) -> LonLat {
        LonLat::new(self.lon, self.lat)
    }
}

/// 點擊收合容器時重新顯示工具視窗。 / Clicking the fallback container brings the window back.
pub fn reveal_tools_window<W, C>(window: &mut W, container: &mut C)
where
    W: ToolsWindow + ?Sized,
    C: FallbackContainer + ?Sized,
{
    window.show();
    container.hide();
}

/// Shows the fallback container just before the window hides.
pub fn subscribe_fallback<C>(
    window_events: &mut EventHub<WindowEvent>,
    container: Rc<RefCell<C>>,
) -> SubscriptionId
where
    C: FallbackContainer + 'static,
{
    window_events.subscribe(move |event| {
        if matches!(event, WindowEvent::BeforeHide) {
            container.borrow_mut().show();
        }
    })
}
