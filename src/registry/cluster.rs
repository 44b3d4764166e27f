//! Cluster-API config source.
//!
//! # Responsibilities
//! - Poll the cluster's custom-resource endpoints every 60 s (plus on
//!   explicit refresh) and cache each table's record list
//! - Filter items to supported apiVersion/kind pairs; each item's `spec`
//!   object is one raw record
//! - Treat connection and resolution failures as transient: log, keep
//!   the previous records, try again next tick
//!
//! # Design Decisions
//! - Polling happens on a dedicated thread with a blocking client; the
//!   request runtime never waits on the cluster API
//! - A 404 for a table means the resource kind is not installed and
//!   reads as an empty table; every other failure retains

use std::collections::HashMap;
use std::sync::{mpsc, Arc, RwLock};
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::registry::{ConfigSource, Table};

const API_GROUP: &str = "gateway.example.io";
const SUPPORTED_VERSIONS: [&str; 1] = ["gateway.example.io/v1"];
const POLL_INTERVAL: Duration = Duration::from_secs(60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ResourceList {
    #[serde(default)]
    items: Vec<ResourceItem>,
}

#[derive(Debug, Deserialize)]
struct ResourceItem {
    #[serde(rename = "apiVersion")]
    api_version: String,
    kind: String,
    spec: Value,
}

pub struct ClusterSource {
    base_url: String,
    data: RwLock<HashMap<Table, Vec<Value>>>,
}

impl ClusterSource {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            base_url: format!("http://{host}:{port}"),
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Current cached records for a table.
    pub fn records(&self, table: Table) -> Vec<Value> {
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        data.get(&table).cloned().unwrap_or_default()
    }

    /// Poll every table endpoint. Blocking; runs on the poll thread or
    /// inside `spawn_blocking` at boot, never on the request runtime.
    pub fn refresh(&self) -> Vec<Table> {
        let client = match reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(error = %e, "could not build cluster api client");
                return Vec::new();
            }
        };

        let mut changed = Vec::new();
        for table in Table::ALL {
            let url = format!(
                "{}/apis/{}/v1/namespaces/default/{}",
                self.base_url,
                API_GROUP,
                table.plural()
            );
            match self.fetch(&client, &url, table) {
                Ok(records) => {
                    let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
                    if data.get(&table).map(Vec::as_slice) != Some(records.as_slice()) {
                        tracing::info!(
                            table = ?table,
                            count = records.len(),
                            "loaded objects from cluster api"
                        );
                        data.insert(table, records);
                        changed.push(table);
                    }
                }
                Err(e) => {
                    tracing::warn!(table = ?table, error = %e, "failed to poll cluster api, keeping previous records");
                }
            }
        }
        changed
    }

    fn fetch(
        &self,
        client: &reqwest::blocking::Client,
        url: &str,
        table: Table,
    ) -> Result<Vec<Value>, reqwest::Error> {
        let response = client.get(url).send()?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            // Resource kind not installed: an empty table, not an error.
            return Ok(Vec::new());
        }
        let list: ResourceList = response.error_for_status()?.json()?;
        Ok(Self::extract(list, table))
    }

    fn extract(list: ResourceList, table: Table) -> Vec<Value> {
        list.items
            .into_iter()
            .filter(|item| {
                SUPPORTED_VERSIONS.contains(&item.api_version.as_str())
                    && item.kind == table.kind()
            })
            .map(|item| item.spec)
            .collect()
    }

    pub(crate) fn start(
        &self,
        source: Arc<ConfigSource>,
        events: mpsc::Sender<Table>,
    ) -> std::io::Result<()> {
        std::thread::Builder::new()
            .name("cluster-poll".to_string())
            .spawn(move || loop {
                std::thread::sleep(POLL_INTERVAL);
                let ConfigSource::Cluster(cluster) = &*source else {
                    return;
                };
                for table in cluster.refresh() {
                    if events.send(table).is_err() {
                        return;
                    }
                }
            })?;
        Ok(())
    }
}
