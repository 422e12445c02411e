#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use pkgsearch_core::icon_store::{atomic_write, IconError, IconFetcher};
use pkgsearch_core::model::PackageRow;
use pkgsearch_core::opener::{OpenError, UrlOpener};
use pkgsearch_core::query::{PackageSource, QueryError};
use pkgsearch_core::settings::{Settings, SettingsError, SettingsProvider};
use pkgsearch_core::term_cache::Clock;

pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n', 0, 0, 0, 13];
pub const NOW: u64 = 1_800_000_000;

pub struct FakeClock(AtomicU64);

impl FakeClock {
    pub fn at(secs: u64) -> Arc<Self> {
        Arc::new(Self(AtomicU64::new(secs)))
    }

    pub fn set(&self, secs: u64) {
        self.0.store(secs, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now_secs(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Package source answering from a fixed table and counting calls.
#[derive(Default)]
pub struct FakeSource {
    rows: Mutex<HashMap<String, Vec<PackageRow>>>,
    failing: Mutex<bool>,
    pub calls: AtomicUsize,
    pub seen_terms: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn with(term: &str, rows: Vec<PackageRow>) -> Arc<Self> {
        let source = Self::default();
        source.set_rows(term, rows);
        Arc::new(source)
    }

    pub fn set_rows(&self, term: &str, rows: Vec<PackageRow>) {
        self.rows.lock().unwrap().insert(term.to_string(), rows);
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PackageSource for FakeSource {
    fn source_name(&self) -> &'static str {
        "fake"
    }

    fn search(&self, term: &str) -> Result<Vec<PackageRow>, QueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_terms.lock().unwrap().push(term.to_string());
        if *self.failing.lock().unwrap() {
            return Err(QueryError::Http {
                message: "connection refused".to_string(),
            });
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(term)
            .cloned()
            .unwrap_or_default())
    }
}

/// Icon fetcher writing a tiny PNG, optionally failing for some tokens.
#[derive(Default)]
pub struct FakeFetcher {
    pub calls: AtomicUsize,
    pub urls: Mutex<Vec<String>>,
    failing_tokens: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_for(&self, token: &str) {
        self.failing_tokens.lock().unwrap().push(token.to_string());
    }

    pub fn heal(&self) {
        self.failing_tokens.lock().unwrap().clear();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl IconFetcher for FakeFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), IconError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        let failing = self
            .failing_tokens
            .lock()
            .unwrap()
            .iter()
            .any(|token| url.contains(token.as_str()));
        if failing {
            return Err(IconError::Http {
                message: format!("server returned status 404 for {url}"),
            });
        }
        atomic_write(dest, PNG_BYTES)
    }
}

#[derive(Default)]
pub struct RecordingOpener {
    pub opened: Mutex<Vec<String>>,
}

impl UrlOpener for RecordingOpener {
    fn open(&self, url: &str) -> Result<(), OpenError> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

pub struct FailingOpener;

impl UrlOpener for FailingOpener {
    fn open(&self, url: &str) -> Result<(), OpenError> {
        Err(OpenError::UnsupportedUrl(url.to_string()))
    }
}

pub struct StaticSettings(pub Option<Settings>);

impl StaticSettings {
    pub fn enabled(keyword: &str) -> Arc<Self> {
        Arc::new(Self(Some(Settings {
            enabled: true,
            keyword: keyword.to_string(),
        })))
    }

    pub fn disabled() -> Arc<Self> {
        Arc::new(Self(Some(Settings {
            enabled: false,
            keyword: String::new(),
        })))
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self(None))
    }
}

impl SettingsProvider for StaticSettings {
    fn snapshot(&self) -> Result<Settings, SettingsError> {
        self.0
            .clone()
            .ok_or_else(|| SettingsError::Unavailable("settings daemon gone".to_string()))
    }
}

/// Serves exactly one HTTP response on localhost and returns its base URL
/// together with a handle yielding the raw request line.
pub fn serve_once(
    status: &str,
    content_type: &str,
    body: Vec<u8>,
) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let status = status.to_string();
    let content_type = content_type.to_string();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0_u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let read = stream.read(&mut buf).unwrap();
            if read == 0 {
                break;
            }
            request.extend_from_slice(&buf[..read]);
        }
        let head = format!(
            "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        stream.write_all(head.as_bytes()).unwrap();
        stream.write_all(&body).unwrap();
        stream.flush().unwrap();

        let text = String::from_utf8_lossy(&request).into_owned();
        text.lines().next().unwrap_or_default().to_string()
    });

    (format!("http://{addr}"), handle)
}
