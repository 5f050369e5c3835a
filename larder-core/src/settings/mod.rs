//! 进程级设置管理
//!
//! [`SettingsManager`] owns the current [`AppSettings`] snapshot. Readers get
//! an `Arc` and keep using it even after a newer snapshot is swapped in, so an
//! adapter built from old settings finishes its call against them. Writers go
//! through one persistence lock and every successful change bumps a revision
//! counter that is pushed to subscribers and callbacks.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::broadcast;

use crate::error::CoreResult;
use crate::traits::SettingsStore;
use crate::types::AppSettings;

/// Buffered change events per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 16;

type ChangeCallback = Box<dyn Fn(u64) + Send + Sync>;

/// Process-wide settings holder.
///
/// Share it with `Arc`; there is no global instance.
pub struct SettingsManager {
    store: Arc<dyn SettingsStore>,
    current: RwLock<Option<Arc<AppSettings>>>,
    /// 串行化加载与持久化
    persist_lock: tokio::sync::Mutex<()>,
    durable: AtomicBool,
    revision: AtomicU64,
    events: broadcast::Sender<u64>,
    callbacks: Mutex<Vec<ChangeCallback>>,
}

impl SettingsManager {
    #[must_use]
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            current: RwLock::new(None),
            persist_lock: tokio::sync::Mutex::new(()),
            durable: AtomicBool::new(true),
            revision: AtomicU64::new(0),
            events,
            callbacks: Mutex::new(Vec::new()),
        }
    }

    /// Current settings snapshot, loading from the store on first access.
    ///
    /// A store that has nothing yet, or fails to load, yields
    /// [`AppSettings::default`]. A failed load also clears the durable flag.
    pub async fn instance(&self) -> Arc<AppSettings> {
        if let Some(settings) = self.snapshot() {
            return settings;
        }

        let _guard = self.persist_lock.lock().await;
        // 等锁期间可能已被其他调用者加载
        if let Some(settings) = self.snapshot() {
            return settings;
        }

        let loaded = match self.store.load().await {
            Ok(Some(settings)) => {
                log::info!("Loaded settings (backend: {})", settings.backend_type());
                settings
            }
            Ok(None) => {
                log::info!("No saved settings, using defaults");
                AppSettings::default()
            }
            Err(e) => {
                e.log("Failed to load settings, using defaults");
                self.durable.store(false, Ordering::SeqCst);
                AppSettings::default()
            }
        };

        let settings = Arc::new(loaded);
        self.swap(Arc::clone(&settings));
        settings
    }

    /// Persists the current snapshot.
    ///
    /// # Errors
    /// Returns the store error; [`is_durable`](Self::is_durable) is then `false`.
    pub async fn save(&self) -> CoreResult<()> {
        let loaded = self.instance().await;
        let _guard = self.persist_lock.lock().await;
        let current = self.snapshot().unwrap_or(loaded);
        self.persist(&current).await
    }

    /// Applies `mutate` to a copy of the settings, persists it, then swaps it
    /// in and notifies once.
    ///
    /// # Errors
    /// On a store error nothing is swapped in and nobody is notified.
    pub async fn update<F>(&self, mutate: F) -> CoreResult<Arc<AppSettings>>
    where
        F: FnOnce(&mut AppSettings) + Send,
    {
        let loaded = self.instance().await;
        let _guard = self.persist_lock.lock().await;

        let mut next = self.snapshot().unwrap_or(loaded).as_ref().clone();
        mutate(&mut next);
        self.persist(&next).await?;

        let next = Arc::new(next);
        self.swap(Arc::clone(&next));
        self.notify();
        Ok(next)
    }

    /// Replaces the settings wholesale. Same guarantees as [`update`](Self::update).
    ///
    /// # Errors
    /// Returns the store error.
    pub async fn replace(&self, settings: AppSettings) -> CoreResult<Arc<AppSettings>> {
        self.update(move |current| *current = settings).await
    }

    /// Drops the snapshot, re-reads the store and notifies once.
    ///
    /// # Errors
    /// A load error is returned and the previous snapshot stays in place.
    pub async fn reload_settings(&self) -> CoreResult<Arc<AppSettings>> {
        let _guard = self.persist_lock.lock().await;

        let loaded = self.store.load().await?.unwrap_or_default();
        let settings = Arc::new(loaded);
        self.swap(Arc::clone(&settings));
        log::info!("Settings reloaded (backend: {})", settings.backend_type());
        self.notify();
        Ok(settings)
    }

    /// Receiver for change events. Each event carries the new revision.
    pub fn subscribe(&self) -> SettingsSubscription {
        SettingsSubscription {
            receiver: self.events.subscribe(),
        }
    }

    /// Registers a callback run synchronously after every change.
    ///
    /// Callbacks must not register further callbacks.
    pub fn on_change<F>(&self, callback: F)
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(callback));
    }

    /// Number of changes published so far.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// `false` after a failed save (or failed initial load) until the next
    /// successful save.
    pub fn is_durable(&self) -> bool {
        self.durable.load(Ordering::SeqCst)
    }

    fn snapshot(&self) -> Option<Arc<AppSettings>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn swap(&self, settings: Arc<AppSettings>) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(settings);
    }

    async fn persist(&self, settings: &AppSettings) -> CoreResult<()> {
        match self.store.save(settings).await {
            Ok(()) => {
                self.durable.store(true, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                self.durable.store(false, Ordering::SeqCst);
                e.log("Failed to save settings");
                Err(e)
            }
        }
    }

    fn notify(&self) {
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        // Err 只表示当前没有订阅者
        let _ = self.events.send(revision);
        let callbacks = self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for callback in callbacks.iter() {
            callback(revision);
        }
    }
}

/// Change event receiver returned by [`SettingsManager::subscribe`].
pub struct SettingsSubscription {
    receiver: broadcast::Receiver<u64>,
}

impl SettingsSubscription {
    /// Waits for the next change and returns its revision.
    ///
    /// Missed events are skipped. `None` once the manager is dropped.
    pub async fn changed(&mut self) -> Option<u64> {
        loop {
            match self.receiver.recv().await {
                Ok(revision) => return Some(revision),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::debug!("Settings subscriber lagged, skipped {skipped} events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next pending change without waiting.
    pub fn try_changed(&mut self) -> Option<u64> {
        loop {
            match self.receiver.try_recv() {
                Ok(revision) => return Some(revision),
                Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }
}
