//! Maps a supplier id to its adapter. Adding a supplier means adding a
//! config row and, if its wire contract differs, a new adapter type — the
//! coordinator never changes.

use crate::supplier::generic::GenericRestSupplierGateway;
use rental_core::ports::SupplierGateway;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Static configuration for one supplier's REST adapter.
#[derive(Clone, Debug)]
pub struct SupplierConfig {
    /// Internal supplier id, as recorded on `reservations.supplier_id`.
    pub supplier_id: i64,
    /// Display name, used in structured logs.
    pub name: String,
    /// Base URL of the supplier's API.
    pub base_url: String,
    /// API key used for the `X-Api-Key` header.
    pub api_key: String,
    /// Retry budget for 5xx/transport failures.
    pub max_retries: u32,
}

/// Builds and memoizes one [`SupplierGateway`] instance per supplier id.
pub struct SupplierGatewayFactory {
    configs: HashMap<i64, SupplierConfig>,
    instances: Mutex<HashMap<i64, Arc<dyn SupplierGateway>>>,
}

impl SupplierGatewayFactory {
    /// Build a factory over the given supplier configurations.
    #[must_use]
    pub fn new(configs: Vec<SupplierConfig>) -> Self {
        Self {
            configs: configs.into_iter().map(|c| (c.supplier_id, c)).collect(),
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Build a factory directly over pre-built adapters, bypassing config
    /// lookup and lazy construction entirely. Intended for tests that need
    /// to hand the coordinator a stub `SupplierGateway` rather than a real
    /// `GenericRestSupplierGateway`.
    #[must_use]
    pub fn from_adapters(adapters: HashMap<i64, Arc<dyn SupplierGateway>>) -> Self {
        Self { configs: HashMap::new(), instances: Mutex::new(adapters) }
    }

    /// Ids of every supplier this factory is configured to build an
    /// adapter for, in no particular order. A factory built via
    /// [`Self::from_adapters`] reports none here, since it has no configs
    /// to enumerate.
    pub fn configured_supplier_ids(&self) -> Vec<i64> {
        self.configs.keys().copied().collect()
    }

    /// Return the adapter for `supplier_id`, building and caching it on
    /// first use. Returns `None` if no config is registered for that id.
    pub async fn get(&self, supplier_id: i64) -> Option<Arc<dyn SupplierGateway>> {
        {
            let cache = self.instances.lock().await;
            if let Some(adapter) = cache.get(&supplier_id) {
                return Some(Arc::clone(adapter));
            }
        }

        let config = self.configs.get(&supplier_id)?;
        let adapter: Arc<dyn SupplierGateway> = Arc::new(GenericRestSupplierGateway::new(
            config.supplier_id,
            config.name.clone(),
            config.base_url.clone(),
            config.api_key.clone(),
            config.max_retries,
        ));

        let mut cache = self.instances.lock().await;
        let adapter = cache.entry(supplier_id).or_insert(adapter);
        Some(Arc::clone(adapter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memoizes_adapter_instances_per_supplier() {
        let factory = SupplierGatewayFactory::new(vec![SupplierConfig {
            supplier_id: 5,
            name: "Acme Rentals".to_string(),
            base_url: "https://supplier.example".to_string(),
            api_key: "key".to_string(),
            max_retries: 3,
        }]);

        let first = factory.get(5).await.unwrap();
        let second = factory.get(5).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn returns_none_for_unconfigured_supplier() {
        let factory = SupplierGatewayFactory::new(vec![]);
        assert!(factory.get(99).await.is_none());
    }
}
