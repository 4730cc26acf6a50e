/*!
Test Harness pour le publisher de télémétrie

Facilite l'écriture de tests avec:
- Démarrage automatique du mock data hub
- Assertions sur les requêtes reçues (chemin, headers, champs JSON)
- Statistiques par chemin
*/

use crate::hub_stub::{MockDataHub, RecordedRequest, TELEMETRY_PATH};
use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Harness de test complet autour d'un [`MockDataHub`]
pub struct TestHarness {
    pub hub: MockDataHub,
}

impl TestHarness {
    /// Crée un nouveau harness avec un mock data hub démarré
    pub async fn new() -> Result<Self> {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();

        Ok(Self {
            hub: MockDataHub::start().await?,
        })
    }

    pub fn base_url(&self) -> String {
        self.hub.base_url()
    }

    /// Attend qu'au moins `count` requêtes soient arrivées sur un chemin
    pub async fn wait_for_requests(
        &self,
        path: &str,
        count: usize,
        timeout_ms: u64,
    ) -> Result<Vec<RecordedRequest>> {
        let start = std::time::Instant::now();

        while start.elapsed() < Duration::from_millis(timeout_ms) {
            let requests = self.hub.find_requests_by_path(path);
            if requests.len() >= count {
                return Ok(requests);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        anyhow::bail!("Timeout waiting for {} requests on {}", count, path);
    }

    /// Dernier payload télémétrie reçu
    pub fn last_telemetry(&self) -> Result<Value> {
        self.hub
            .get_last_json::<Value>(TELEMETRY_PATH)?
            .ok_or_else(|| anyhow::anyhow!("No telemetry received"))
    }

    /// Assert sur le nombre exact de requêtes reçues, tous chemins confondus
    pub fn assert_request_count(&self, expected: usize) -> Result<()> {
        let actual = self.hub.request_count();
        if actual != expected {
            anyhow::bail!("Expected {} requests, got {}", expected, actual);
        }
        Ok(())
    }

    /// Assert qu'un payload précis a été reçu
    pub fn assert_payload_sent(&self, expected: &Value) -> Result<()> {
        for req in self.hub.find_requests_by_path(TELEMETRY_PATH) {
            if req.json::<Value>()? == *expected {
                return Ok(());
            }
        }

        anyhow::bail!("Expected payload not found on {}", TELEMETRY_PATH);
    }

    /// Assert que toutes les requêtes télémétrie déclarent du JSON
    pub fn assert_json_content_type(&self) -> Result<()> {
        let requests = self.hub.find_requests_by_path(TELEMETRY_PATH);
        if requests.is_empty() {
            anyhow::bail!("No telemetry received");
        }
        for req in requests {
            if req.content_type.as_deref() != Some("application/json") {
                anyhow::bail!("Unexpected content type: {:?}", req.content_type);
            }
        }
        Ok(())
    }

    /// Assert qu'un champ a une valeur spécifique dans le dernier payload
    pub fn assert_field_equals(&self, field_path: &str, expected: &Value) -> Result<()> {
        let payload = self.last_telemetry()?;
        match get_nested_field(&payload, field_path) {
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => anyhow::bail!(
                "Field '{}' mismatch: expected {:?}, got {:?}",
                field_path,
                expected,
                actual
            ),
            None => anyhow::bail!("Field '{}' not found in latest telemetry", field_path),
        }
    }

    /// Stats sur les requêtes collectées
    pub fn get_stats(&self) -> TestStats {
        let mut path_counts = HashMap::new();
        let requests = self.hub.requests();

        for req in &requests {
            *path_counts.entry(req.path.clone()).or_insert(0) += 1;
        }

        TestStats {
            total_requests: requests.len(),
            path_counts,
        }
    }
}

fn get_nested_field<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;

    for part in path.split('.') {
        match current {
            Value::Object(obj) => current = obj.get(part)?,
            _ => return None,
        }
    }

    Some(current)
}

#[derive(Debug)]
pub struct TestStats {
    pub total_requests: usize,
    pub path_counts: HashMap<String, usize>,
}
