use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use mapview_session::codec::{MAP_CENTER_KEY, WINDOW_SHOW_KEY, WINDOW_XY_KEY};
use mapview_session::{
    config, read, restore_and_apply, subscribe_fallback, subscribe_write_back, write, EventHub,
    FileStore, MapEvent, MapLayer, RestoredState, Sanitize, SessionConfig, ViewportCenter,
    WindowEvent, WriteBack,
};
use mapview_snapping::{subscribe_synchronizer, SnapConfig, SnapTarget, SnapTargetSynchronizer};
use serde::{Deserialize, Serialize};

mod logging;
mod simulate;

use simulate::{
    HeadlessAgent, HeadlessContainer, HeadlessLayerTree, HeadlessLocale, HeadlessViewport,
    HeadlessWindow,
};

const STATE_DIR: &str = ".mapview";
const STORE_FILE: &str = "session.db";
const CONFIG_FILE: &str = "config.json";

#[derive(Parser)]
#[command(
    name = "mapview-cli",
    about = "Inspect and replay map viewer session state",
    author,
    version
)]
struct Cli {
    /// 指定工作區根目錄；預設為目前目錄。 / Workspace root (defaults to current directory).
    #[arg(long, global = true, value_name = "PATH")]
    workspace: Option<PathBuf>,
    /// 輸出除錯日誌。 / Emit debug logs on stderr.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 直接存取工作階段儲存區。 / Read or write raw store entries.
    #[command(subcommand)]
    Store(StoreCommand),
    /// 還原啟動狀態並以 JSON 輸出。 / Run the startup restore and print the result as JSON.
    Restore,
    /// 重播介面事件以寫回儲存區。 / Replay UI events through the write-back binding.
    #[command(subcommand)]
    Record(RecordCommand),
    /// 重播圖層新增通知並列出吸附目標。 / Replay layer-added notifications and print snap targets.
    Snap(SnapArgs),
    /// 寫出預設設定檔。 / Write the default config file.
    InitConfig,
}

#[derive(Subcommand)]
enum StoreCommand {
    /// 讀取鍵值。 / Print the value stored under KEY.
    Get { key: String },
    /// 寫入鍵值。 / Store VALUE under KEY.
    Set(StoreSetArgs),
    /// 刪除鍵值。 / Delete KEY.
    Remove { key: String },
    /// 以標頭格式列出所有項目。 / Print every live entry as a cookie header.
    List,
    /// 移除工作階段項目（模擬關閉瀏覽器）。 / Drop session-scoped entries.
    EndSession,
}

#[derive(Args)]
struct StoreSetArgs {
    key: String,
    value: String,
    /// 幾天後到期；省略則為工作階段項目。 / Expire after N days; omit for a session-scoped entry.
    #[arg(long, value_name = "DAYS")]
    expire_days: Option<u32>,
}

#[derive(Subcommand)]
enum RecordCommand {
    /// 工具視窗事件。 / Tools window events.
    #[command(subcommand)]
    Window(WindowAction),
    /// 地圖平移結束或縮放結束。 / Map pan-end or zoom-end at the given center.
    Viewport(ViewportArgs),
}

#[derive(Subcommand)]
enum WindowAction {
    Show,
    Hide,
    Move {
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },
}

#[derive(Args)]
struct ViewportArgs {
    #[arg(allow_negative_numbers = true)]
    lat: f64,
    #[arg(allow_negative_numbers = true)]
    lon: f64,
    zoom: i32,
    /// 以縮放結束事件代替平移結束。 / Emit zoom-end instead of move-end.
    #[arg(long)]
    zoom_end: bool,
}

#[derive(Args)]
struct SnapArgs {
    /// 依序加入的 WMS 圖層名稱（LAYERS 參數）。 / WMS layer names (LAYERS parameter), added in order.
    #[arg(value_name = "LAYER")]
    layers: Vec<String>,
    /// 額外加入無參數的底圖圖層。 / Also add basemap layers without request parameters.
    #[arg(long, value_name = "TITLE")]
    basemap: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AppConfig {
    #[serde(default)]
    session: SessionConfig,
    #[serde(default)]
    snapping: SnapConfig,
}

impl Sanitize for AppConfig {
    fn sanitize(&mut self) {
        self.session.sanitize();
        self.snapping.sanitize();
    }
}

#[derive(Serialize)]
struct RestoreReport<'a> {
    restored: &'a RestoredState,
    display_language: Option<&'a str>,
    tools_window: &'a HeadlessWindow,
    fallback_visible: bool,
    map: ViewportCenter,
}

#[derive(Serialize)]
struct SnapReport<'a> {
    targets: &'a [SnapTarget],
    selected: Option<&'a str>,
    skipped: usize,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli {
        workspace,
        verbose,
        command,
    } = Cli::parse();
    logging::init(verbose);

    let workspace_root = resolve_workspace(workspace)?;
    match command {
        Commands::Store(subcommand) => execute_store_command(subcommand, &workspace_root),
        Commands::Restore => execute_restore(&workspace_root),
        Commands::Record(subcommand) => execute_record_command(subcommand, &workspace_root),
        Commands::Snap(args) => execute_snap(args, &workspace_root),
        Commands::InitConfig => init_config(&workspace_root),
    }
}

fn execute_store_command(command: StoreCommand, workspace_root: &Path) -> Result<()> {
    let mut store = load_store(workspace_root)?;
    match command {
        StoreCommand::Get { key } => match read(&store, &key) {
            Some(value) => println!("{value}"),
            None => bail!("no entry named '{key}'"),
        },
        StoreCommand::Set(args) => {
            write(&mut store, &args.key, &args.value, args.expire_days)
                .with_context(|| format!("failed to store '{}'", args.key))?;
            println!("Stored {}={}", args.key, args.value);
        }
        StoreCommand::Remove { key } => {
            if !store.remove(&key)? {
                bail!("no entry named '{key}'");
            }
            println!("Removed {key}");
        }
        StoreCommand::List => println!("{}", store.header()),
        StoreCommand::EndSession => {
            let dropped = store.end_session()?;
            println!("Dropped {dropped} session entries");
        }
    }
    Ok(())
}

fn execute_restore(workspace_root: &Path) -> Result<()> {
    let app_config = load_config(workspace_root)?;
    let store = load_store(workspace_root)?;

    let mut locale = HeadlessLocale::default();
    let mut window = HeadlessWindow::default();
    let mut container = HeadlessContainer::default();
    let mut viewport = HeadlessViewport::at(app_config.session.default_viewport);
    let restored = restore_and_apply(
        &store,
        &app_config.session,
        &mut locale,
        &mut window,
        &mut container,
        &mut viewport,
    );

    let report = RestoreReport {
        restored: &restored,
        display_language: locale.language.as_deref(),
        tools_window: &window,
        fallback_visible: container.visible,
        map: ViewportCenter::from_viewport(&viewport),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn execute_record_command(command: RecordCommand, workspace_root: &Path) -> Result<()> {
    let app_config = load_config(workspace_root)?;
    let store = load_store(workspace_root)?;
    let write_back = Rc::new(RefCell::new(
        WriteBack::new(store).with_expire_days(app_config.session.write_expire_days),
    ));

    let initial_center = match &command {
        RecordCommand::Viewport(args) => ViewportCenter::new(args.lat, args.lon, args.zoom),
        RecordCommand::Window(_) => app_config.session.default_viewport,
    };
    let viewport = Rc::new(RefCell::new(HeadlessViewport::at(initial_center)));
    let container = Rc::new(RefCell::new(HeadlessContainer::default()));

    let mut window_events = EventHub::new();
    let mut map_events = EventHub::new();
    subscribe_fallback(&mut window_events, Rc::clone(&container));
    subscribe_write_back(
        &mut window_events,
        &mut map_events,
        Rc::clone(&write_back),
        viewport,
    );

    let key = match command {
        RecordCommand::Window(WindowAction::Show) => {
            window_events.emit(&WindowEvent::Show);
            WINDOW_SHOW_KEY
        }
        RecordCommand::Window(WindowAction::Hide) => {
            window_events.emit(&WindowEvent::BeforeHide);
            window_events.emit(&WindowEvent::Hide);
            WINDOW_SHOW_KEY
        }
        RecordCommand::Window(WindowAction::Move { x, y }) => {
            window_events.emit(&WindowEvent::Move { x, y });
            WINDOW_XY_KEY
        }
        RecordCommand::Viewport(args) => {
            let event = if args.zoom_end {
                MapEvent::ZoomEnd
            } else {
                MapEvent::MoveEnd
            };
            map_events.emit(&event);
            MAP_CENTER_KEY
        }
    };

    let stored = read(write_back.borrow().store(), key);
    match stored {
        Some(value) => {
            println!("Recorded {key}={value}");
            Ok(())
        }
        None => bail!("'{key}' was not written; rerun with --verbose for details"),
    }
}

fn execute_snap(args: SnapArgs, workspace_root: &Path) -> Result<()> {
    let app_config = load_config(workspace_root)?;
    let synchronizer = Rc::new(RefCell::new(SnapTargetSynchronizer::with_config(
        HeadlessAgent,
        HeadlessLayerTree::default(),
        app_config.snapping,
    )));
    let mut map_events = EventHub::new();
    subscribe_synchronizer(&mut map_events, Rc::clone(&synchronizer));

    let layers = args
        .basemap
        .iter()
        .map(|title| MapLayer::without_params(title.clone()))
        .chain(args.layers.iter().map(|name| MapLayer::wms(name.clone(), name.clone())));
    for layer in layers {
        map_events.emit(&MapEvent::AddLayer(layer));
    }

    let sync = synchronizer.borrow();
    let skipped = args.basemap.len() + args.layers.len() - sync.targets().len();
    let report = SnapReport {
        targets: sync.targets(),
        selected: sync.selection().selected.as_deref(),
        skipped,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn init_config(workspace_root: &Path) -> Result<()> {
    let path = config_path(workspace_root);
    if path.exists() {
        bail!("config already exists at {}", path.display());
    }
    config::save(&path, &AppConfig::default())
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn load_store(workspace_root: &Path) -> Result<FileStore> {
    let path = store_path(workspace_root);
    FileStore::load(&path).with_context(|| format!("failed to load store from {}", path.display()))
}

fn load_config(workspace_root: &Path) -> Result<AppConfig> {
    let path = config_path(workspace_root);
    config::load(&path).with_context(|| format!("failed to load config from {}", path.display()))
}

fn store_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(STATE_DIR).join(STORE_FILE)
}

fn config_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(STATE_DIR).join(CONFIG_FILE)
}

fn resolve_workspace(workspace: Option<PathBuf>) -> Result<PathBuf> {
    match workspace {
        Some(path) => {
            if path.is_absolute() {
                Ok(path)
            } else {
                Ok(std::env::current_dir()
                    .context("determine current directory")?
                    .join(path))
            }
        }
        None => std::env::current_dir().context("determine current directory"),
    }
}

