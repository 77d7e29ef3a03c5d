//! Installable-web-app state.
//!
//! The browser hands a site two one-shot capabilities: a deferred install
//! prompt and a notification-permission request. Both are modelled as trait
//! objects ([`InstallPrompt`], [`NotificationCenter`]). State that outlives a
//! page (banner dismissed, permission status) lives in a [`PreferenceStore`].
//!
//! Banner and install-button visibility are pure functions of that state.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::Result;

/// How long after start-up the notification prompt may appear.
pub const NOTIFICATION_PROMPT_DELAY: Duration = Duration::from_secs(30);

/// How often an installed service worker is asked to check for updates.
pub const SERVICE_WORKER_UPDATE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Manual install steps shown on iOS, which has no install prompt.
pub const IOS_INSTALL_STEPS: [&str; 3] = [
    "Toque em Compartilhar",
    "Toque em Adicionar à Tela de Início",
    "Toque em Adicionar",
];

// ── Install prompt ─────────────────────────────────────────────────

/// What the user chose when shown the install prompt.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InstallOutcome {
    Accepted,
    Dismissed,
}

/// Future returned by [`InstallPrompt::prompt`].
pub type InstallFuture = Pin<Box<dyn Future<Output = InstallOutcome> + Send>>;

/// A deferred install prompt captured from the platform.
///
/// The prompt can be shown once; `prompt` consumes it.
pub trait InstallPrompt: Send {
    fn prompt(self: Box<Self>) -> InstallFuture;
}

/// Holds at most one deferred install prompt.
#[derive(Default)]
pub struct InstallState {
    deferred: Option<Box<dyn InstallPrompt>>,
    installed: bool,
}

impl InstallState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep a newly offered prompt, replacing any earlier one.
    pub fn capture(&mut self, prompt: Box<dyn InstallPrompt>) {
        if !self.installed {
            self.deferred = Some(prompt);
        }
    }

    /// Whether an install can be offered right now.
    pub fn is_installable(&self) -> bool {
        self.deferred.is_some()
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// Show the deferred prompt. Returns `true` if the user accepted.
    ///
    /// The prompt is consumed either way; without one this returns `false`.
    pub async fn install(&mut self) -> bool {
        let Some(prompt) = self.deferred.take() else {
            return false;
        };
        let outcome = prompt.prompt().await;
        info!("install prompt outcome: {outcome:?}");
        outcome == InstallOutcome::Accepted
    }

    /// The platform reported the app as installed.
    pub fn mark_installed(&mut self) {
        self.deferred = None;
        self.installed = true;
        info!("app installed");
    }
}

// ── Preferences ────────────────────────────────────────────────────

/// Notification permission as reported by the platform.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPermission {
    /// Not asked yet.
    #[default]
    Default,
    Granted,
    Denied,
}

/// State that survives across visits.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PwaPreferences {
    #[serde(default)]
    pub install_banner_dismissed: bool,
    #[serde(default)]
    pub dismissed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notification_permission: NotificationPermission,
}

/// JSON-file-backed [`PwaPreferences`].
///
/// - `open` reads the file; a missing or unreadable file yields defaults.
/// - `get` returns the in-memory copy.
/// - `update` mutates the copy and writes it back atomically.
pub struct PreferenceStore {
    path: PathBuf,
    prefs: PwaPreferences,
}

impl PreferenceStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let prefs = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!("ignoring malformed preferences at {}: {e}", path.display());
                PwaPreferences::default()
            }),
            Err(_) => PwaPreferences::default(),
        };
        Self { path, prefs }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> &PwaPreferences {
        &self.prefs
    }

    /// Apply `f` and persist the result.
    pub fn update(&mut self, f: impl FnOnce(&mut PwaPreferences)) -> Result<()> {
        f(&mut self.prefs);
        self.save()
    }

    /// Record that the install banner was closed.
    pub fn dismiss_install_banner(&mut self) -> Result<()> {
        self.update(|p| {
            p.install_banner_dismissed = true;
            p.dismissed_at = Some(Utc::now());
        })
    }

    pub fn set_notification_permission(&mut self, permission: NotificationPermission) -> Result<()> {
        self.update(|p| p.notification_permission = permission)
    }

    fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(&self.prefs)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

static GLOBAL_PREFERENCES: OnceLock<Mutex<PreferenceStore>> = OnceLock::new();

/// Open the process-wide preference store. Only the first call has an
/// effect; later calls return the already-open store.
pub fn init_preferences(path: impl Into<PathBuf>) -> &'static Mutex<PreferenceStore> {
    GLOBAL_PREFERENCES.get_or_init(|| Mutex::new(PreferenceStore::open(path)))
}

/// The process-wide preference store, if [`init_preferences`] has run.
pub fn preferences() -> Option<&'static Mutex<PreferenceStore>> {
    GLOBAL_PREFERENCES.get()
}

// ── Visibility rules ───────────────────────────────────────────────

/// Client platform traits that change the install flow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Platform {
    pub ios: bool,
    /// Already running as an installed app.
    pub standalone: bool,
}

impl Platform {
    pub fn from_user_agent(user_agent: &str, standalone: bool) -> Self {
        let ios = ["iPad", "iPhone", "iPod"]
            .iter()
            .any(|d| user_agent.contains(d));
        Self { ios, standalone }
    }
}

/// What the bottom banner should show.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Banner {
    Hidden,
    Install,
    EnableNotifications,
}

/// Decide the banner from install availability, stored preferences and time
/// since start-up.
pub fn banner(installable: bool, prefs: &PwaPreferences, since_start: Duration) -> Banner {
    if installable && !prefs.install_banner_dismissed {
        Banner::Install
    } else if !installable
        && prefs.notification_permission == NotificationPermission::Default
        && since_start >= NOTIFICATION_PROMPT_DELAY
    {
        Banner::EnableNotifications
    } else {
        Banner::Hidden
    }
}

/// What the floating install button should do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstallFab {
    Hidden,
    /// Trigger the deferred install prompt.
    Prompt,
    /// Show [`IOS_INSTALL_STEPS`].
    IosInstructions,
}

/// The button appears once the banner has been dismissed, unless the app is
/// already running installed.
pub fn install_fab(prefs: &PwaPreferences, platform: Platform) -> InstallFab {
    if platform.standalone || !prefs.install_banner_dismissed {
        InstallFab::Hidden
    } else if platform.ios {
        InstallFab::IosInstructions
    } else {
        InstallFab::Prompt
    }
}

// ── Service worker ─────────────────────────────────────────────────

/// Script registered at start-up.
pub const SERVICE_WORKER_SCRIPT: &str = "/sw.js";

/// Future returned by [`ServiceWorker::register`]; resolves to the
/// registration scope.
pub type RegisterFuture<'a> = Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

/// Future returned by [`ServiceWorker::update`].
pub type UpdateFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Platform service-worker capability.
pub trait ServiceWorker: Send + Sync {
    fn register<'a>(&'a self, script_url: &'a str) -> RegisterFuture<'a>;
    /// Ask the registered worker to check for a newer script.
    fn update(&self) -> UpdateFuture<'_>;
}

/// Register [`SERVICE_WORKER_SCRIPT`] once, then check for updates every
/// `interval` (normally [`SERVICE_WORKER_UPDATE_INTERVAL`]).
///
/// Returns the update loop's handle; abort it on teardown. A failed
/// registration is logged and yields `None`. Failed update checks are logged
/// and the loop keeps going.
pub async fn register_service_worker(
    worker: Arc<dyn ServiceWorker>,
    interval: Duration,
) -> Option<JoinHandle<()>> {
    match worker.register(SERVICE_WORKER_SCRIPT).await {
        Ok(scope) => info!("service worker registered: {scope}"),
        Err(e) => {
            error!("service worker registration failed: {e}");
            return None;
        }
    }

    // `interval_at` panics on a zero period.
    let interval = interval.max(Duration::from_millis(1));
    Some(tokio::spawn(async move {
        let start = tokio::time::Instant::now() + interval;
        let mut ticks = tokio::time::interval_at(start, interval);
        loop {
            ticks.tick().await;
            if let Err(e) = worker.update().await {
                warn!("service worker update check failed: {e}");
            }
        }
    }))
}

// ── Push notifications ─────────────────────────────────────────────

/// Future returned by [`NotificationCenter::request_permission`].
pub type PermissionFuture<'a> = Pin<Box<dyn Future<Output = NotificationPermission> + Send + 'a>>;

/// Future returned by [`NotificationCenter::subscribe`]; resolves to the push
/// endpoint URL.
pub type SubscribeFuture<'a> = Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

/// Platform notification and push capability.
pub trait NotificationCenter: Send + Sync {
    fn request_permission(&self) -> PermissionFuture<'_>;
    fn subscribe(&self, application_server_key: Vec<u8>) -> SubscribeFuture<'_>;
}

/// Decode a url-safe base64 VAPID public key, with or without padding.
pub fn decode_vapid_key(key: &str) -> Result<Vec<u8>> {
    Ok(URL_SAFE_NO_PAD.decode(key.trim_end_matches('='))?)
}

/// Ask for notification permission, remember the answer and subscribe to
/// push when granted.
///
/// Returns whether permission was granted. A failed subscription is logged
/// and does not change the result.
pub async fn enable_notifications(
    store: &mut PreferenceStore,
    center: &dyn NotificationCenter,
    vapid_public_key: &str,
) -> Result<bool> {
    let permission = center.request_permission().await;
    store.set_notification_permission(permission)?;
    if permission != NotificationPermission::Granted {
        return Ok(false);
    }

    let key = decode_vapid_key(vapid_public_key)?;
    match center.subscribe(key).await {
        Ok(endpoint) => info!("push subscribed: {endpoint}"),
        Err(e) => warn!("push subscribe failed: {e}"),
    }
    Ok(true)
}
