use std::cell::RefCell;
use std::rc::Rc;

use mapview_session::{
    restore, restore_and_apply, subscribe_fallback, subscribe_write_back, CookieJar, EventHub,
    FallbackContainer, FileStore, Localization, LonLat, MapEvent, SessionConfig, StateCodec,
    StateStore, ToolsWindow, Viewport, ViewportCenter, WindowEvent, WindowPosition, WriteBack,
};
use tempfile::tempdir;

#[derive(Debug, Default)]
struct FakeLocale {
    language: Option<String>,
}

impl Localization for FakeLocale {
    fn set_language(&mut self, language: &str) {
        self.language = Some(language.to_string());
    }
}

#[derive(Debug, Default)]
struct FakeWindow {
    visible: Option<bool>,
    position: Option<(f64, f64)>,
}

impl ToolsWindow for FakeWindow {
    fn show(&mut self) {
        self.visible = Some(true);
    }

    fn hide(&mut self) {
        self.visible = Some(false);
    }

    fn set_position(&mut self, x: f64, y: f64) {
        self.position = Some((x, y));
    }
}

#[derive(Debug, Default)]
struct FakeContainer {
    visible: bool,
}

impl FallbackContainer for FakeContainer {
    fn show(&mut self) {
        self.visible = true;
    }

    fn hide(&mut self) {
        self.visible = false;
    }
}

#[derive(Debug)]
struct FakeViewport {
    center: LonLat,
    zoom: i32,
    recentered: bool,
}

impl FakeViewport {
    fn configured_default() -> Self {
        let center = ViewportCenter::default();
        Self {
            center: center.lon_lat(),
            zoom: center.zoom,
            recentered: false,
        }
    }
}

impl Viewport for FakeViewport {
    fn center(&self) -> LonLat {
        self.center
    }

    fn zoom(&self) -> i32 {
        self.zoom
    }

    fn set_center(&mut self, center: LonLat, zoom: i32) {
        self.center = center;
        self.zoom = zoom;
        self.recentered = true;
    }
}

struct Startup {
    locale: FakeLocale,
    window: FakeWindow,
    container: FakeContainer,
    viewport: FakeViewport,
}

fn startup_from<S: StateStore>(store: &S, config: &SessionConfig) -> Startup {
    let mut ui = Startup {
        locale: FakeLocale::default(),
        window: FakeWindow::default(),
        container: FakeContainer::default(),
        viewport: FakeViewport::configured_default(),
    };
    restore_and_apply(
        store,
        config,
        &mut ui.locale,
        &mut ui.window,
        &mut ui.container,
        &mut ui.viewport,
    );
    ui
}

fn startup(header: &str) -> (FakeWindow, FakeContainer, FakeViewport) {
    let ui = startup_from(&CookieJar::from_header(header), &SessionConfig::default());
    (ui.window, ui.container, ui.viewport)
}

#[test]
fn empty_store_uses_defaults() {
    let state = restore(&CookieJar::new(), &SessionConfig::default());
    assert_eq!(state.language, "en");
    assert!(state.window.visible);
    assert_eq!(state.window.position, WindowPosition::new(60.0, 60.0));
    assert_eq!(state.viewport, None);

    let ui = startup_from(&CookieJar::new(), &SessionConfig::default());
    assert_eq!(ui.locale.language.as_deref(), Some("en"));
    let (window, container, viewport) = (ui.window, ui.container, ui.viewport);
    assert_eq!(window.visible, Some(true));
    assert!(!container.visible);
    assert_eq!(window.position, Some((60.0, 60.0)));
    assert!(!viewport.recentered);
}

#[test]
fn hidden_window_shows_fallback_container() {
    let (window, container, _) = startup("toolsWindowShow=false;toolsWindowXY=120|45");
    assert_eq!(window.visible, Some(false));
    assert!(container.visible);
    assert_eq!(window.position, Some((120.0, 45.0)));
}

#[test]
fn stored_map_center_recenters_viewport() {
    let (_, _, viewport) = startup("mapCenter=42.3|-71.1|5");
    assert!(viewport.recentered);
    assert_eq!(viewport.center, LonLat::new(-71.1, 42.3));
    assert_eq!(viewport.zoom, 5);
}

#[test]
fn malformed_values_fall_back_independently() {
    let (window, container, viewport) = startup(
        "language=es; toolsWindowShow=nope; toolsWindowXY=left|top; mapCenter=42.3|-71.1",
    );
    assert_eq!(window.visible, Some(true));
    assert!(!container.visible);
    assert_eq!(window.position, Some((60.0, 60.0)));
    assert!(!viewport.recentered);

    let state = restore(
        &CookieJar::from_header("language=es; toolsWindowXY=left|top"),
        &SessionConfig::default(),
    );
    assert_eq!(state.language, "es");
}

// A zero zoom (or a zero coordinate) is indistinguishable from "unset".
#[test]
fn zero_zoom_is_not_restored() {
    let (_, _, viewport) = startup("mapCenter=42.3|-71.1|0");
    assert!(!viewport.recentered);
    assert_eq!(viewport.zoom, ViewportCenter::default().zoom);
}

#[test]
fn viewport_round_trips_through_write_back_and_restore() {
    for zoom in [1, 5, 12, 19] {
        let viewport = Rc::new(RefCell::new(FakeViewport {
            center: LonLat::new(-71.0589, 42.3601),
            zoom,
            recentered: false,
        }));
        let write_back = Rc::new(RefCell::new(WriteBack::new(CookieJar::new())));
        let mut window_events = EventHub::new();
        let mut map_events = EventHub::new();
        subscribe_write_back(
            &mut window_events,
            &mut map_events,
            Rc::clone(&write_back),
            Rc::clone(&viewport),
        );
        map_events.emit(&MapEvent::ZoomEnd);

        let state = restore(write_back.borrow().store(), &SessionConfig::default());
        assert_eq!(state.viewport, Some(ViewportCenter::new(42.3601, -71.0589, zoom)));
    }
}

#[test]
fn window_events_drive_store_and_fallback_in_subscription_order() {
    let container = Rc::new(RefCell::new(FakeContainer::default()));
    let write_back = Rc::new(RefCell::new(WriteBack::new(CookieJar::new())));
    let viewport = Rc::new(RefCell::new(FakeViewport::configured_default()));
    let mut window_events = EventHub::new();
    let mut map_events = EventHub::new();

    subscribe_fallback(&mut window_events, Rc::clone(&container));
    subscribe_write_back(
        &mut window_events,
        &mut map_events,
        Rc::clone(&write_back),
        viewport,
    );

    window_events.emit(&WindowEvent::Move { x: 300.0, y: 12.5 });
    window_events.emit(&WindowEvent::BeforeHide);
    window_events.emit(&WindowEvent::Hide);
    assert!(container.borrow().visible);

    let state = restore(write_back.borrow().store(), &SessionConfig::default());
    assert!(!state.window.visible);
    assert_eq!(state.window.position, WindowPosition::new(300.0, 12.5));
    assert_eq!(
        WindowPosition::load(write_back.borrow().store()),
        Ok(WindowPosition::new(300.0, 12.5))
    );
}

#[test]
fn configured_defaults_replace_built_in_fallbacks() {
    let config = SessionConfig {
        default_language: "es".into(),
        default_window_position: WindowPosition::new(10.0, 20.0),
        ..SessionConfig::default()
    };
    let state = restore(&CookieJar::new(), &config);
    assert_eq!(state.language, "es");
    assert_eq!(state.window.position, WindowPosition::new(10.0, 20.0));

    let ui = startup_from(&CookieJar::new(), &config);
    assert_eq!(ui.locale.language.as_deref(), Some("es"));
    assert_eq!(ui.window.position, Some((10.0, 20.0)));
}

#[test]
fn stored_language_is_applied() {
    let ui = startup_from(&CookieJar::from_header("language=es"), &SessionConfig::default());
    assert_eq!(ui.locale.language.as_deref(), Some("es"));
}

#[test]
fn file_store_with_a_bad_line_still_restores() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.db");
    std::fs::write(
        &path,
        "toolsWindowShow=false\ngarbage line\nmapCenter=42.3|-71.1|5\n",
    )
    .unwrap();

    let store = FileStore::load(&path).unwrap();
    let ui = startup_from(&store, &SessionConfig::default());
    assert_eq!(ui.window.visible, Some(false));
    assert!(ui.container.visible);
    assert!(ui.viewport.recentered);
    assert_eq!(ui.viewport.zoom, 5);
}
