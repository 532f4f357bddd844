use k8s_openapi::api::scheduling::v1::PriorityClass;
use kube::api::{Api, ObjectMeta};
use kube::{Client, ResourceExt};

use crate::translate::Translator;

use super::engine::{copy_field, SyncedResource};

impl SyncedResource for PriorityClass {
    fn virtual_api(client: Client, _namespace: Option<String>) -> Api<Self> {
        Api::all(client)
    }

    fn host_api(client: Client, _target_namespace: &str) -> Api<Self> {
        Api::all(client)
    }

    fn physical_name(&self, translator: &Translator) -> String {
        translator.physical_name_cluster_scoped(&self.name_any())
    }

    fn to_physical(&self, translator: &Translator) -> Self {
        PriorityClass {
            metadata: ObjectMeta {
                name: Some(self.physical_name(translator)),
                ..Default::default()
            },
            value: self.value,
            description: self.description.clone(),
            preemption_policy: self.preemption_policy.clone(),
            // The host's default class stays the host's.
            global_default: None,
        }
    }

    fn copy_managed_fields(&self, physical: &mut Self) -> bool {
        let mut changed = copy_field(&self.value, &mut physical.value);
        changed |= copy_field(&self.description, &mut physical.description);
        changed |= copy_field(&self.preemption_policy, &mut physical.preemption_policy);
        changed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use kube::api::ObjectMeta;
    use kube::ResourceExt;

    use crate::syncers::engine::SyncEngine;
    use crate::syncers::testing::MemoryStore;
    use crate::translate::Translator;

    use super::*;

    fn translator() -> Arc<Translator> {
        Arc::new(Translator::new("suffix", "test").unwrap())
    }

    fn virtual_priority() -> PriorityClass {
        PriorityClass {
            metadata: ObjectMeta {
                name: Some("high-priority".to_string()),
                ..Default::default()
            },
            value: 1000,
            global_default: Some(true),
            description: Some("important workloads".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn global_default_is_not_propagated() {
        let engine = SyncEngine::new(translator(), MemoryStore::with(vec![]));

        let created = engine.sync_to_host(&virtual_priority()).await.unwrap();

        assert_eq!(created.value, 1000);
        assert_eq!(created.global_default, None);
        assert_eq!(
            created.description.as_deref(),
            Some("important workloads")
        );
    }

    #[tokio::test]
    async fn value_changes_are_synced() {
        let engine = SyncEngine::new(translator(), MemoryStore::with(vec![]));
        let created = engine.sync_to_host(&virtual_priority()).await.unwrap();

        let mut updated_virtual = virtual_priority();
        updated_virtual.value = 2000;

        let synced = engine.sync(&created, &updated_virtual).await.unwrap();
        assert_eq!(synced.value, 2000);
        assert_eq!(synced.name_any(), created.name_any());
    }
}
