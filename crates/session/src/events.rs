//! Notifications raised by the tools window and the map viewport.
//! 工具視窗與地圖視埠發出的事件。

use std::fmt;

/// WMS request parameters attached to a layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerParams {
    /// The `LAYERS` parameter identifying the published layer.
    pub layers: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapLayer {
    pub title: String,
    pub params: Option<LayerParams>,
}

impl MapLayer {
    /// 具有 `LAYERS` 參數的 WMS 圖層。 / A WMS layer published under `layers`.
    pub fn wms(title: impl Into<String>, layers: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            params: Some(LayerParams {
                layers: Some(layers.into()),
            }),
        }
    }

    /// 沒有請求參數的圖層（例如 OSM 底圖）。 / A layer without request parameters, e.g. a tile basemap.
    pub fn without_params(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            params: None,
        }
    }

    /// 圖層識別名稱；空字串視為不存在。 / Identifying layer name, `None` when absent or blank.
    pub fn layer_name(&self) -> Option<&str> {
        self.params
            .as_ref()?
            .layers
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WindowEvent {
    BeforeHide,
    Hide,
    Show,
    Move { x: f64, y: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    MoveEnd,
    ZoomEnd,
    AddLayer(MapLayer),
    RemoveLayer(MapLayer),
    ChangeLayer(MapLayer),
}

impl MapEvent {
    pub fn layer(&self) -> Option<&MapLayer> {
        match self {
            MapEvent::AddLayer(layer)
            | MapEvent::RemoveLayer(layer)
            | MapEvent::ChangeLayer(layer) => Some(layer),
            MapEvent::MoveEnd | MapEvent::ZoomEnd => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// 單執行緒事件分派器，依訂閱順序呼叫監聽者。 / Single-threaded dispatcher; listeners run in subscription order.
pub struct EventHub<E> {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Box<dyn FnMut(&E)>)>,
}

impl<E> EventHub<E> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&E) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        before != self.listeners.len()
    }

    /// 將事件交給所有監聽者，回傳被通知的數量。 / Delivers `event` to every listener and returns how many ran.
    pub fn emit(&mut self, event: &E) -> usize {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
        self.listeners.len()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<E> Default for EventHub<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventHub<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
