//! Data layer handle and push interception

use std::fmt;
use std::sync::Arc;

use contracts::{ContractError, Value};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::error::{EventBusError, Result};

/// Sees every object pushed after interception
///
/// Called synchronously inside `push`, before the value is appended.
/// Implementations must not push onto the same data layer from `observe`.
pub trait PushObserver: Send + Sync {
    fn observe(&self, value: &Value) -> std::result::Result<(), ContractError>;
}

/// Result of draining pre-existing entries at interception time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterceptReport {
    /// Entries present when the observer was installed
    pub existing: usize,
    /// Objects handed to the observer
    pub observed: usize,
    /// Objects the observer failed on
    pub failed: usize,
}

struct Inner {
    name: String,
    entries: RwLock<Vec<Value>>,
    observer: RwLock<Option<Arc<dyn PushObserver>>>,
    /// Serializes pushes so observation order equals append order
    push_lock: Mutex<()>,
}

/// Cloneable handle to a shared data layer
#[derive(Clone)]
pub struct DataLayer {
    inner: Arc<Inner>,
}

impl fmt::Debug for DataLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataLayer")
            .field("name", &self.inner.name)
            .field("len", &self.len())
            .field("intercepted", &self.is_intercepted())
            .finish()
    }
}

impl DataLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_entries(name, Vec::new())
    }

    /// Data layer that already holds entries
    pub fn with_entries(name: impl Into<String>, entries: Vec<Value>) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                entries: RwLock::new(entries),
                observer: RwLock::new(None),
                push_lock: Mutex::new(()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> Vec<Value> {
        self.inner.entries.read().clone()
    }

    pub fn is_intercepted(&self) -> bool {
        self.inner.observer.read().is_some()
    }

    /// Append values in order, returns the new length
    ///
    /// Never fails. Observer errors are logged and dropped.
    pub fn push(&self, values: impl IntoIterator<Item = Value>) -> usize {
        let values: Vec<Value> = values.into_iter().collect();
        let _serial = self.inner.push_lock.lock();

        let observer = self.inner.observer.read().clone();
        if let Some(observer) = observer {
            for value in values.iter().filter(|v| matches!(v, Value::Object(_))) {
                if let Err(e) = observer.observe(value) {
                    warn!(data_layer = %self.inner.name, error = %e, "Observer failed on push");
                }
            }
        }

        let mut entries = self.inner.entries.write();
        entries.extend(values);
        entries.len()
    }

    pub fn push_one(&self, value: Value) -> usize {
        self.push([value])
    }

    /// Install an observer on the push entry point
    ///
    /// Entries already present are passed through the observer once, in
    /// order. Pushes from other threads wait until draining is done.
    #[instrument(name = "data_layer_intercept", skip(self, observer), fields(data_layer = %self.inner.name))]
    pub fn intercept(&self, observer: Arc<dyn PushObserver>) -> Result<InterceptReport> {
        let _serial = self.inner.push_lock.lock();

        {
            let mut slot = self.inner.observer.write();
            if slot.is_some() {
                return Err(EventBusError::AlreadyIntercepted {
                    name: self.inner.name.clone(),
                });
            }
            *slot = Some(observer.clone());
        }

        let existing = self.inner.entries.read().clone();
        let mut report = InterceptReport {
            existing: existing.len(),
            ..InterceptReport::default()
        };

        for (index, value) in existing.iter().enumerate() {
            if !matches!(value, Value::Object(_)) {
                continue;
            }
            report.observed += 1;
            if let Err(e) = observer.observe(value) {
                report.failed += 1;
                debug!(index, error = %e, "Observer failed on existing entry");
            }
        }

        info!(
            existing = report.existing,
            observed = report.observed,
            failed = report.failed,
            "Data layer intercepted"
        );
        Ok(report)
    }
}
