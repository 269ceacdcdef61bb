//! Testing utilities for extkeeper
//!
//! Scripted stand-ins for the collaborator traits:
//! - [`StaticInventory`] returns a fixed inventory (or a scripted error)
//! - [`ScriptedApplier`] succeeds, fails or panics per extension name and
//!   records every call
//! - [`RecordingSink`] collects command replies

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use extkeeper_core::{
    ExtensionRecord, ExtensionStatus, InventoryProvider, ReplySink, Result, UpdateApplier,
    UpdaterError,
};
use parking_lot::Mutex;

/// Shorthand for a named record.
pub fn record(name: &str, status: ExtensionStatus) -> ExtensionRecord {
    ExtensionRecord::new(name, status)
}

/// Inventory provider returning a fixed list.
#[derive(Debug, Default)]
pub struct StaticInventory {
    records: Vec<ExtensionRecord>,
    error: Option<String>,
    calls: AtomicUsize,
    roots: Mutex<Vec<PathBuf>>,
}

impl StaticInventory {
    pub fn new(records: Vec<ExtensionRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    /// Provider whose every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Roots passed to `build_extension_list`, in call order.
    pub fn roots(&self) -> Vec<PathBuf> {
        self.roots.lock().clone()
    }
}

#[async_trait]
impl InventoryProvider for StaticInventory {
    async fn build_extension_list(&self, root: &Path) -> Result<Vec<ExtensionRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.roots.lock().push(root.to_path_buf());
        match &self.error {
            Some(message) => Err(UpdaterError::Inventory(message.clone())),
            None => Ok(self.records.clone()),
        }
    }
}

/// One recorded `update` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplierCall {
    pub name: String,
    pub proxy: Option<String>,
}

/// Applier that follows a script keyed by extension name.
#[derive(Debug, Default)]
pub struct ScriptedApplier {
    fail: HashSet<String>,
    panic: HashSet<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<ApplierCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedApplier {
    /// Applier that succeeds for every name.
    pub fn succeeding() -> Self {
        Self::default()
    }

    /// Fail with an error for each of `names`.
    pub fn failing_for<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fail.extend(names.into_iter().map(Into::into));
        self
    }

    /// Panic inside the update future for each of `names`.
    pub fn panicking_for<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.panic.extend(names.into_iter().map(Into::into));
        self
    }

    /// Sleep this long inside every update.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<ApplierCall> {
        self.calls.lock().clone()
    }

    pub fn called_names(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.name.clone()).collect()
    }

    /// Highest number of updates observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpdateApplier for ScriptedApplier {
    async fn update(&self, name: &str, proxy: Option<&str>) -> Result<()> {
        self.calls.lock().push(ApplierCall {
            name: name.to_string(),
            proxy: proxy.map(str::to_string),
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panic.contains(name) {
            panic!("scripted panic for {}", name);
        }
        if self.fail.contains(name) {
            tracing::debug!(extension = name, "Scripted failure");
            return Err(UpdaterError::apply(name, "scripted failure"));
        }
        Ok(())
    }
}

/// Reply sink that keeps every message.
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn send(&self, text: &str) -> Result<()> {
        self.messages.lock().push(text.to_string());
        Ok(())
    }
}
