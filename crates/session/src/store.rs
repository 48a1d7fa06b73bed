use std::cell::Cell;
use std::fs;
use std::io;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::cookie::{self, PAIR_SEPARATOR};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid store key {0:?}")]
    InvalidKey(String),
    #[error("value for {key} contains the reserved pair separator ';'")]
    ReservedSeparator { key: String },
    #[error("entry {key} is {size} bytes, the store accepts at most {limit}")]
    EntryTooLarge {
        key: String,
        size: usize,
        limit: usize,
    },
    #[error("an expiry {days} days from now is out of range")]
    ExpiryOutOfRange { days: u32 },
    #[error("malformed store assignment: {0:?}")]
    MalformedAssignment(String),
    #[error("failed to read store {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write store {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// 扁平字串鍵值儲存的能力介面。 / Capability interface over a flat string key/value store.
pub trait StateStore {
    /// 讀取鍵值；不存在或已過期時回傳 `None`。 / Returns the live value for `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// 寫入或覆寫鍵值與到期時間。 / Inserts or overwrites `key` along with its expiry.
    fn set(
        &mut self,
        key: &str,
        value: &str,
        expires: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    /// Reference time used for expiry calculations.
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 讀取指定鍵；空的儲存區不視為錯誤。 / Reads `key`; an empty store is not an error.
pub fn read<S: StateStore + ?Sized>(store: &S, key: &str) -> Option<String> {
    store.get(key)
}

/// 寫入鍵值，可選擇以天數設定到期。 / Writes `key=value`, expiring `expire_days` days from now.
pub fn write<S: StateStore + ?Sized>(
    store: &mut S,
    key: &str,
    value: &str,
    expire_days: Option<u32>,
) -> Result<(), StoreError> {
    let expires = expire_days
        .map(|days| cookie::expiry_after_days(store.now(), days))
        .transpose()?;
    store.set(key, value, expires)
}

/// Source of "now" for expiry checks.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 可手動推進的時鐘，複製品共享同一時間。 / Manually driven clock; clones share the same instant.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

/// One key/value pair with its optional absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    pub key: String,
    pub value: String,
    pub expires: Option<DateTime<Utc>>,
}

impl StoreEntry {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires.map_or(true, |at| at > now)
    }

    pub fn is_session_scoped(&self) -> bool {
        self.expires.is_none()
    }
}

/// 記憶體中的 cookie 儲存區。 / In-memory cookie jar holding entries in creation order.
#[derive(Debug, Clone, Default)]
pub struct CookieJar<C = SystemClock> {
    entries: Vec<StoreEntry>,
    clock: C,
}

impl CookieJar<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// 由 `a=b; c=d` 形式的標頭建立（皆為工作階段項目）。 / Seeds session-scoped entries from a header blob.
    pub fn from_header(header: &str) -> Self {
        let mut jar = Self::new();
        jar.seed(header);
        jar
    }
}

impl<C: Clock> CookieJar<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            entries: Vec::new(),
            clock,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Adds every well-formed `key=value` pair in `header` as a session entry.
    pub fn seed(&mut self, header: &str) {
        for pair in header.split(PAIR_SEPARATOR) {
            let Some((key, value)) = pair.trim_start().split_once('=') else {
                continue;
            };
            if key.is_empty() {
                continue;
            }
            self.upsert(StoreEntry {
                key: key.to_string(),
                value: value.to_string(),
                expires: None,
            });
        }
    }

    /// 以 `document.cookie` 方式輸出目前有效的項目。 / Renders live entries the way `document.cookie` does.
    pub fn header(&self) -> String {
        let now = self.clock.now();
        self.entries
            .iter()
            .filter(|entry| entry.is_live(now))
            .map(|entry| format!("{}={}", entry.key, entry.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// 套用一筆指派字串；過去的到期時間會刪除該項目。 / Applies one assignment; a past expiry deletes the entry.
    pub fn assign(&mut self, raw: &str) -> Result<(), StoreError> {
        let parsed = cookie::parse_assignment(raw)?;
        let now = self.clock.now();
        if parsed.expires.is_some_and(|at| at <= now) {
            self.remove(&parsed.key);
            return Ok(());
        }
        self.upsert(StoreEntry {
            key: parsed.key,
            value: parsed.value,
            expires: parsed.expires,
        });
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.key != key);
        before != self.entries.len()
    }

    /// 目前有效的項目。 / Entries that have not expired yet.
    pub fn entries(&self) -> impl Iterator<Item = &StoreEntry> {
        let now = self.clock.now();
        self.entries.iter().filter(move |entry| entry.is_live(now))
    }

    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|entry| entry.is_live(now));
        before - self.entries.len()
    }

    /// 丟棄所有工作階段項目。 / Drops every session-scoped entry, keeping dated ones.
    pub fn end_session(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| !entry.is_session_scoped());
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn upsert(&mut self, entry: StoreEntry) {
        match self.entries.iter_mut().find(|existing| existing.key == entry.key) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }
}

impl<C: Clock> StateStore for CookieJar<C> {
    fn get(&self, key: &str) -> Option<String> {
        cookie::find(&self.header(), key).map(str::to_owned)
    }

    fn set(
        &mut self,
        key: &str,
        value: &str,
        expires: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        cookie::validate_pair(key, value)?;
        self.assign(&cookie::serialize(key, value, expires))
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// 以檔案保存的 cookie 儲存區，每次寫入即同步。 / File-backed jar that persists after every write.
///
/// One assignment per line, in the same `key=value;expires=...` form that
/// [`cookie::serialize`] produces.
#[derive(Debug)]
pub struct FileStore<C = SystemClock> {
    path: PathBuf,
    jar: CookieJar<C>,
}

impl FileStore<SystemClock> {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::load_with_clock(path, SystemClock)
    }
}

impl<C: Clock> FileStore<C> {
    /// 從檔案載入；檔案不存在時回傳空的儲存區。 / Loads the store, starting empty when the file is missing.
    pub fn load_with_clock(path: impl AsRef<Path>, clock: C) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut jar = CookieJar::with_clock(clock);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Ok(Self { path, jar });
            }
            Err(source) => return Err(StoreError::Read { path, source }),
        };

        for (index, line) in contents.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if let Err(err) = jar.assign(trimmed) {
                warn!(
                    path = %path.display(),
                    line = index + 1,
                    error = %err,
                    "skipping malformed store line"
                );
            }
        }
        let dropped = jar.purge_expired();
        debug!(path = %path.display(), entries = jar.len(), dropped, "loaded session store");
        Ok(Self { path, jar })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn jar(&self) -> &CookieJar<C> {
        &self.jar
    }

    pub fn header(&self) -> String {
        self.jar.header()
    }

    pub fn remove(&mut self, key: &str) -> Result<bool, StoreError> {
        let removed = self.jar.remove(key);
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    /// 模擬瀏覽器關閉：移除工作階段項目並寫回。 / Simulates closing the browser session.
    pub fn end_session(&mut self) -> Result<usize, StoreError> {
        let dropped = self.jar.end_session();
        self.persist()?;
        Ok(dropped)
    }

    fn persist(&self) -> Result<(), StoreError> {
        let mut payload = String::new();
        for entry in self.jar.entries() {
            payload.push_str(&cookie::serialize(&entry.key, &entry.value, entry.expires));
            payload.push('\n');
        }
        write_atomic(&self.path, payload.as_bytes()).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl<C: Clock> StateStore for FileStore<C> {
    fn get(&self, key: &str) -> Option<String> {
        self.jar.get(key)
    }

    fn set(
        &mut self,
        key: &str,
        value: &str,
        expires: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        self.jar.set(key, value, expires)?;
        self.persist()
    }

    fn now(&self) -> DateTime<Utc> {
        self.jar.now()
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, data)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap())
    }

    #[test]
    fn empty_store_reads_nothing() {
        let jar = CookieJar::new();
        assert_eq!(read(&jar, "language"), None);
        assert_eq!(jar.header(), "");
        assert!(jar.is_empty());
    }

    #[test]
    fn write_then_read_returns_value() {
        let mut jar = CookieJar::new();
        write(&mut jar, "toolsWindowXY", "120|45", None).unwrap();
        assert_eq!(read(&jar, "toolsWindowXY").as_deref(), Some("120|45"));
    }

    #[test]
    fn overwrite_keeps_creation_order() {
        let mut jar = CookieJar::new();
        write(&mut jar, "language", "en", None).unwrap();
        write(&mut jar, "toolsWindowShow", "true", None).unwrap();
        write(&mut jar, "language", "es", None).unwrap();
        assert_eq!(jar.header(), "language=es; toolsWindowShow=true");
    }

    #[test]
    fn expired_entries_disappear() {
        let clock = clock();
        let mut jar = CookieJar::with_clock(clock.clone());
        write(&mut jar, "mapCenter", "42.3|-71.1|5", Some(2)).unwrap();
        write(&mut jar, "language", "en", None).unwrap();

        clock.advance(Duration::days(1));
        assert_eq!(read(&jar, "mapCenter").as_deref(), Some("42.3|-71.1|5"));

        clock.advance(Duration::days(1));
        assert_eq!(read(&jar, "mapCenter"), None);
        assert_eq!(read(&jar, "language").as_deref(), Some("en"));
        assert_eq!(jar.purge_expired(), 1);
    }

    #[test]
    fn write_without_expiry_makes_entry_session_scoped() {
        let mut jar = CookieJar::with_clock(clock());
        write(&mut jar, "mapCenter", "1|2|3", Some(30)).unwrap();
        write(&mut jar, "mapCenter", "4|5|6", None).unwrap();
        assert_eq!(jar.end_session(), 1);
        assert!(jar.is_empty());
    }

    #[test]
    fn assigning_past_expiry_deletes_entry() {
        let mut jar = CookieJar::with_clock(clock());
        write(&mut jar, "language", "en", None).unwrap();
        jar.assign("language=en;expires=Thu, 01 Jan 2026 00:00:00 GMT")
            .unwrap();
        assert_eq!(read(&jar, "language"), None);
    }

    #[test]
    fn set_rejects_values_with_pair_separator() {
        let mut jar = CookieJar::new();
        let err = write(&mut jar, "language", "en;fr", None).unwrap_err();
        assert!(matches!(err, StoreError::ReservedSeparator { .. }));
        assert!(jar.is_empty());
    }

    #[test]
    fn out_of_range_expiry_is_rejected_without_writing() {
        let mut jar = CookieJar::with_clock(clock());
        let err = write(&mut jar, "language", "es", Some(u32::MAX)).unwrap_err();
        assert!(matches!(err, StoreError::ExpiryOutOfRange { days: u32::MAX }));
        assert!(jar.is_empty());
    }

    #[test]
    fn file_store_skips_malformed_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.db");
        fs::write(
            &path,
            "toolsWindowShow=false\ngarbage line\nbad key=1\nmapCenter=42.3|-71.1|5\n",
        )
        .unwrap();

        let store = FileStore::load_with_clock(&path, clock()).unwrap();
        assert_eq!(read(&store, "toolsWindowShow").as_deref(), Some("false"));
        assert_eq!(read(&store, "mapCenter").as_deref(), Some("42.3|-71.1|5"));
        assert_eq!(store.jar().len(), 2);
    }

    #[test]
    fn file_store_survives_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("session.db");

        {
            let mut store = FileStore::load_with_clock(&path, clock()).unwrap();
            write(&mut store, "toolsWindowShow", "false", None).unwrap();
            write(&mut store, "mapCenter", "42.3|-71.1|5", Some(7)).unwrap();
        }

        let mut store = FileStore::load_with_clock(&path, clock()).unwrap();
        assert_eq!(read(&store, "toolsWindowShow").as_deref(), Some("false"));
        assert_eq!(read(&store, "mapCenter").as_deref(), Some("42.3|-71.1|5"));

        assert_eq!(store.end_session().unwrap(), 1);
        let store = FileStore::load_with_clock(&path, clock()).unwrap();
        assert_eq!(store.header(), "mapCenter=42.3|-71.1|5");
    }

    #[test]
    fn file_store_drops_entries_expired_while_closed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.db");
        let clock = clock();

        {
            let mut store = FileStore::load_with_clock(&path, clock.clone()).unwrap();
            write(&mut store, "language", "es", Some(1)).unwrap();
        }

        clock.advance(Duration::days(3));
        let store = FileStore::load_with_clock(&path, clock).unwrap();
        assert!(store.jar().is_empty());
    }
}
