// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Data-source instance management
//!
//! The host configures any number of data-source instances, each with its own
//! settings. One [`DatasourceInstance`] is kept per instance uid and rebuilt
//! when the host reports newer settings.

use super::error::DatasourceError;
use super::types::DataSourceInstanceSettings;
use crate::config::DatasourceSettings;
use crate::coordinator::QueryCoordinator;
use crate::exec::QueryExecutor;
use crate::warehouse::{create_warehouse, Warehouse, WarehouseResult};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds the warehouse for an instance's settings
pub type WarehouseFactory =
    Arc<dyn Fn(&DatasourceSettings) -> WarehouseResult<Arc<dyn Warehouse>> + Send + Sync>;

/// One configured data source: its settings and the coordinator that serves it
pub struct DatasourceInstance {
    uid: String,
    name: String,
    updated: DateTime<Utc>,
    settings: DatasourceSettings,
    coordinator: QueryCoordinator,
}

impl DatasourceInstance {
    fn build(
        host_settings: &DataSourceInstanceSettings,
        factory: &WarehouseFactory,
    ) -> Result<Self, DatasourceError> {
        let settings = DatasourceSettings::from_json_data(&host_settings.json_data)?;
        let warehouse = factory(&settings)?;
        let executor = Arc::new(QueryExecutor::new(warehouse));
        let coordinator =
            QueryCoordinator::new(executor).with_batch_timeout(settings.query_timeout());

        Ok(Self {
            uid: host_settings.uid.clone(),
            name: host_settings.name.clone(),
            updated: host_settings.updated,
            settings,
            coordinator,
        })
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn updated(&self) -> DateTime<Utc> {
        self.updated
    }

    pub fn settings(&self) -> &DatasourceSettings {
        &self.settings
    }

    pub fn coordinator(&self) -> &QueryCoordinator {
        &self.coordinator
    }

    /// Whether timed-out queries get an explicit error entry
    pub fn reports_timeouts(&self) -> bool {
        self.settings.report_timeouts
    }

    /// Release the warehouse; in-flight batches keep their own handle
    pub fn dispose(&self) {
        log::debug!("Disposing data source instance {}", self.uid);
        self.coordinator.executor().warehouse().dispose();
    }
}

/// Cache of data-source instances keyed by uid
pub struct InstanceManager {
    instances: RwLock<HashMap<String, Arc<DatasourceInstance>>>,
    factory: WarehouseFactory,
}

impl InstanceManager {
    /// Create a manager that builds warehouses from settings
    pub fn new() -> Self {
        Self::with_factory(create_warehouse)
    }

    /// Create a manager with a custom warehouse factory
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn(&DatasourceSettings) -> WarehouseResult<Arc<dyn Warehouse>> + Send + Sync + 'static,
    {
        Self {
            instances: RwLock::new(HashMap::new()),
            factory: Arc::new(factory),
        }
    }

    /// Get the instance for these settings, building or rebuilding it as needed
    ///
    /// A cached instance is reused while its `updated` stamp matches. On a
    /// mismatch the old instance is disposed and replaced.
    pub fn get(
        &self,
        settings: &DataSourceInstanceSettings,
    ) -> Result<Arc<DatasourceInstance>, DatasourceError> {
        if let Some(instance) = self.instances.read().get(&settings.uid) {
            if instance.updated() == settings.updated {
                return Ok(instance.clone());
            }
        }

        let mut instances = self.instances.write();
        // Another caller may have rebuilt it while we waited for the lock
        if let Some(instance) = instances.get(&settings.uid) {
            if instance.updated() == settings.updated {
                return Ok(instance.clone());
            }
        }

        let instance = Arc::new(DatasourceInstance::build(settings, &self.factory)?);
        if let Some(old) = instances.insert(settings.uid.clone(), instance.clone()) {
            log::info!(
                "Settings for data source {} changed, replacing instance",
                settings.uid
            );
            old.dispose();
        } else {
            log::info!("Created data source instance {}", settings.uid);
        }
        Ok(instance)
    }

    /// Drop and dispose the instance for `uid`
    pub fn remove(&self, uid: &str) -> bool {
        match self.instances.write().remove(uid) {
            Some(instance) => {
                instance.dispose();
                true
            }
            None => false,
        }
    }

    /// Dispose every cached instance
    pub fn dispose_all(&self) {
        for (_, instance) in self.instances.write().drain() {
            instance.dispose();
        }
    }

    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }
}

impl Default for InstanceManager {
    fn default() -> Self {
        Self::new()
    }
}
