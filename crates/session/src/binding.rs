//! Write-back: UI → store.
//! 介面事件觸發的寫回（單向）。

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{trace, warn};

use crate::codec::{StateCodec, ViewportCenter, WindowPosition, WindowVisibility};
use crate::events::{EventHub, MapEvent, SubscriptionId, WindowEvent};
use crate::store::{StateStore, StoreError};
use crate::ui::Viewport;

/// 觸發寫回的具名事件。 / Named triggers that cause a store write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WriteTrigger {
    WindowHidden,
    WindowShown,
    WindowMoved(WindowPosition),
    ViewportMoved(ViewportCenter),
    ViewportZoomed(ViewportCenter),
    LayersChanged,
}

impl WriteTrigger {
    /// `BeforeHide` only affects the fallback container and writes nothing.
    pub fn from_window_event(event: &WindowEvent) -> Option<Self> {
        match event {
            WindowEvent::BeforeHide => None,
            WindowEvent::Hide => Some(WriteTrigger::WindowHidden),
            WindowEvent::Show => Some(WriteTrigger::WindowShown),
            WindowEvent::Move { x, y } => {
                Some(WriteTrigger::WindowMoved(WindowPosition::new(*x, *y)))
            }
        }
    }

    /// Samples the viewport for move/zoom events.
    pub fn from_map_event<V: Viewport + ?Sized>(event: &MapEvent, viewport: &V) -> Self {
        match event {
            MapEvent::MoveEnd => {
                WriteTrigger::ViewportMoved(ViewportCenter::from_viewport(viewport))
            }
            MapEvent::ZoomEnd => {
                WriteTrigger::ViewportZoomed(ViewportCenter::from_viewport(viewport))
            }
            MapEvent::AddLayer(_) | MapEvent::RemoveLayer(_) | MapEvent::ChangeLayer(_) => {
                WriteTrigger::LayersChanged
            }
        }
    }
}

/// 持有儲存區並依觸發事件寫回。 / Owns the store and serializes state on each trigger.
#[derive(Debug)]
pub struct WriteBack<S> {
    store: S,
    expire_days: Option<u32>,
}

impl<S: StateStore> WriteBack<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            expire_days: None,
        }
    }

    /// Writes expire after `days` whole days; `None` keeps them session-scoped.
    pub fn with_expire_days(mut self, days: Option<u32>) -> Self {
        self.expire_days = days;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn apply(&mut self, trigger: &WriteTrigger) -> Result<(), StoreError> {
        match trigger {
            WriteTrigger::WindowHidden => {
                WindowVisibility { visible: false }.save(&mut self.store, self.expire_days)
            }
            WriteTrigger::WindowShown => {
                WindowVisibility { visible: true }.save(&mut self.store, self.expire_days)
            }
            WriteTrigger::WindowMoved(position) => {
                position.save(&mut self.store, self.expire_days)
            }
            WriteTrigger::ViewportMoved(center) | WriteTrigger::ViewportZoomed(center) => {
                center.save(&mut self.store, self.expire_days)
            }
            WriteTrigger::LayersChanged => {
                self.write_layers();
                Ok(())
            }
        }
    }

    pub fn on_window_event(&mut self, event: &WindowEvent) -> Result<(), StoreError> {
        match WriteTrigger::from_window_event(event) {
            Some(trigger) => self.apply(&trigger),
            None => Ok(()),
        }
    }

    pub fn on_map_event<V: Viewport + ?Sized>(
        &mut self,
        event: &MapEvent,
        viewport: &V,
    ) -> Result<(), StoreError> {
        self.apply(&WriteTrigger::from_map_event(event, viewport))
    }

    // TODO: persist the layer list once layer sources are cached alongside it;
    // restoring names alone cannot re-resolve non-local sources.
    fn write_layers(&mut self) {
        trace!("layer list write-back is not persisted");
    }
}

/// 訂閱視窗與地圖事件以寫回儲存區。 / Subscribes the write-back to window and map events.
///
/// Store failures are logged and never interrupt event delivery.
pub fn subscribe_write_back<S, V>(
    window_events: &mut EventHub<WindowEvent>,
    map_events: &mut EventHub<MapEvent>,
    write_back: Rc<RefCell<WriteBack<S>>>,
    viewport: Rc<RefCell<V>>,
) -> (SubscriptionId, SubscriptionId)
where
    S: StateStore + 'static,
    V: Viewport + 'static,
{
    let window_sink = Rc::clone(&write_back);
    let window_id = window_events.subscribe(move |event| {
        if let Err(err) = window_sink.borrow_mut().on_window_event(event) {
            warn!(error = %err, ?event, "failed to persist tools window state");
        }
    });

    let map_id = map_events.subscribe(move |event| {
        let trigger = WriteTrigger::from_map_event(event, &*viewport.borrow());
        if let Err(err) = write_back.borrow_mut().apply(&trigger) {
            warn!(error = %err, ?trigger, "failed to persist map state");
        }
    });

    (window_id, map_id)
}
