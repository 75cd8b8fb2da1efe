//! Shared fixtures: a scripted browser agent and listing-page builders.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use fatal5_harvest::acquisition::http_client::RetryPolicy;
use fatal5_harvest::config::{HarvestConfig, LoginConfig};
use fatal5_harvest::renderer::{BrowserAgent, BrowserCookie};

// ─────────────────────── scripted agent ───────────────────────

/// How the fake portal behaves.
pub struct Script {
    /// Selectors that exist on every page.
    pub present: HashSet<String>,
    /// Where each navigation to the target URL actually ends up; once empty,
    /// navigation lands on the target itself.
    pub target_redirects: VecDeque<String>,
    pub cookies: Vec<BrowserCookie>,
    /// Number of cookie reads that fail before one succeeds.
    pub cookie_failures: usize,
    pub shutdown_fails: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            present: ["#Email", "#Password", "input[type='submit']", ".dashboard-header"]
                .into_iter()
                .map(String::from)
                .collect(),
            target_redirects: VecDeque::new(),
            cookies: vec![BrowserCookie {
                name: "ASP.NET_SessionId".into(),
                value: "abc123".into(),
                domain: None,
                path: None,
            }],
            cookie_failures: 0,
            shutdown_fails: false,
        }
    }
}

/// What the agent was asked to do.
#[derive(Debug, Default)]
pub struct Journal {
    pub url: String,
    pub visits: Vec<String>,
    pub filled: Vec<(String, String)>,
    pub clicks: Vec<String>,
    pub screenshots: Vec<PathBuf>,
    pub refreshes: usize,
    pub shutdowns: usize,
}

struct Shared {
    script: Script,
    journal: Journal,
}

pub struct FakeAgent {
    target_url: String,
    shared: Arc<Mutex<Shared>>,
}

/// Handle for inspecting the agent after it has been consumed.
#[derive(Clone)]
pub struct JournalHandle(Arc<Mutex<Shared>>);

impl JournalHandle {
    pub fn read<T>(&self, f: impl FnOnce(&Journal) -> T) -> T {
        f(&self.0.lock().unwrap().journal)
    }
}

impl FakeAgent {
    pub fn boxed(script: Script, target_url: &str) -> (Box<dyn BrowserAgent>, JournalHandle) {
        let shared = Arc::new(Mutex::new(Shared {
            script,
            journal: Journal::default(),
        }));
        let agent = FakeAgent {
            target_url: target_url.to_string(),
            shared: shared.clone(),
        };
        (Box::new(agent), JournalHandle(shared))
    }
}

#[async_trait]
impl BrowserAgent for FakeAgent {
    async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<()> {
        let mut s = self.shared.lock().unwrap();
        s.journal.visits.push(url.to_string());
        let landed = if url == self.target_url {
            s.script
                .target_redirects
                .pop_front()
                .unwrap_or_else(|| url.to_string())
        } else {
            url.to_string()
        };
        s.journal.url = landed;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.shared.lock().unwrap().journal.url.clone())
    }

    async fn has_element(&self, selector: &str) -> Result<bool> {
        Ok(self.shared.lock().unwrap().script.present.contains(selector))
    }

    async fn fill(&mut self, selector: &str, text: &str) -> Result<()> {
        let mut s = self.shared.lock().unwrap();
        s.journal.filled.push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        self.shared.lock().unwrap().journal.clicks.push(selector.to_string());
        Ok(())
    }

    async fn refresh(&mut self) -> Result<()> {
        self.shared.lock().unwrap().journal.refreshes += 1;
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<BrowserCookie>> {
        let mut s = self.shared.lock().unwrap();
        if s.script.cookie_failures > 0 {
            s.script.cookie_failures -= 1;
            return Err(anyhow!("target closed"));
        }
        Ok(s.script.cookies.clone())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        self.shared
            .lock()
            .unwrap()
            .journal
            .screenshots
            .push(path.to_path_buf());
        Ok(())
    }

    async fn shutdown(self: Box<Self>) -> Result<()> {
        let mut s = self.shared.lock().unwrap();
        s.journal.shutdowns += 1;
        if s.script.shutdown_fails {
            return Err(anyhow!("browser process already gone"));
        }
        Ok(())
    }
}

// ─────────────────────── configuration ───────────────────────

/// Configuration pointed at `base` with short waits and no delays.
pub fn fast_config(base: &str, dir: &Path) -> HarvestConfig {
    let short = Duration::from_millis(50);
    HarvestConfig {
        login: LoginConfig {
            login_url: format!("{base}/account/login"),
            target_url: format!("{base}/search/index"),
            form_wait: short,
            landing_wait: short,
            verify_wait: short,
            recovery_wait: short,
            poll_interval: Duration::from_millis(5),
            login_snapshot: dir.join("login_error.png"),
            recovery_snapshot: dir.join("recovery_error.png"),
            ..LoginConfig::default()
        },
        retry: RetryPolicy {
            max_retries: 0,
            ..RetryPolicy::default()
        },
        page_delay: Duration::ZERO,
        page_timeout: Duration::from_secs(5),
        download_timeout: Duration::from_secs(5),
        download_dir: dir.join("downloads"),
        output_file: dir.join("learning_packs.json"),
        ..HarvestConfig::default()
    }
}

/// Credential lookup backed by fixed values.
pub fn credentials(identity: Option<&str>, secret: Option<&str>) -> impl Fn(&str) -> Option<String> {
    let identity = identity.map(String::from);
    let secret = secret.map(String::from);
    move |name| match name {
        "USERNAME" => identity.clone(),
        "PASSWORD" => secret.clone(),
        _ => None,
    }
}

// ─────────────────────── listing pages ───────────────────────

/// A well-formed eight-cell row.
pub fn row(name: &str, href: &str) -> String {
    format!(
        "<tr><td><a href=\"{href}\">{name}</a></td>\
         <td>F5 {name}</td><td>Lifting</td><td>Crane</td><td>Hand</td>\
         <td>Crush</td><td>Deck</td><td>NO</td></tr>"
    )
}

/// A listing page holding `rows`, with an optional "Next" link.
pub fn listing(rows: &[String], next: Option<&str>) -> String {
    let pager = next
        .map(|href| format!("<ul class=\"pagination\"><li><a href=\"{href}\">Next &raquo;</a></li></ul>"))
        .unwrap_or_default();
    format!(
        "<html><body>\
         <table class=\"table main table-condensed table-bordered table-hover\">\
         <thead><tr><th>Learning pack</th></tr></thead>\
         <tbody>{}</tbody></table>{pager}</body></html>",
        rows.concat()
    )
}
