use k8s_openapi::api::storage::v1::StorageClass;
use kube::api::{Api, ObjectMeta};
use kube::{Client, ResourceExt};

use crate::translate::Translator;

use super::engine::{copy_field, SyncedResource};

impl SyncedResource for StorageClass {
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
        StorageClass {
            metadata: ObjectMeta {
                name: Some(self.physical_name(translator)),
                ..Default::default()
            },
            provisioner: self.provisioner.clone(),
            parameters: self.parameters.clone(),
            reclaim_policy: self.reclaim_policy.clone(),
            mount_options: self.mount_options.clone(),
            allow_volume_expansion: self.allow_volume_expansion,
            volume_binding_mode: self.volume_binding_mode.clone(),
            allowed_topologies: self.allowed_topologies.clone(),
        }
    }

    fn copy_managed_fields(&self, physical: &mut Self) -> bool {
        let mut changed = copy_field(&self.provisioner, &mut physical.provisioner);
        changed |= copy_field(&self.parameters, &mut physical.parameters);
        changed |= copy_field(&self.reclaim_policy, &mut physical.reclaim_policy);
        changed |= copy_field(&self.mount_options, &mut physical.mount_options);
        changed |= copy_field(
            &self.allow_volume_expansion,
            &mut physical.allow_volume_expansion,
        );
        changed |= copy_field(&self.volume_binding_mode, &mut physical.volume_binding_mode);
        changed |= copy_field(&self.allowed_topologies, &mut physical.allowed_topologies);
        changed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use kube::api::ObjectMeta;

    use crate::provenance::{MARKER_LABEL, NAME_ANNOTATION, UID_ANNOTATION};
    use crate::syncers::engine::SyncEngine;
    use crate::syncers::testing::{strip_server_fields, MemoryStore};
    use crate::translate::Translator;

    use super::*;

    fn translator() -> Arc<Translator> {
        Arc::new(Translator::new("suffix", "test").unwrap())
    }

    fn virtual_class() -> StorageClass {
        StorageClass {
            metadata: ObjectMeta {
                name: Some("testsc".to_string()),
                ..Default::default()
            },
            provisioner: "my-provisioner".to_string(),
            ..Default::default()
        }
    }

    fn physical_class(translator: &Translator) -> StorageClass {
        StorageClass {
            metadata: ObjectMeta {
                name: Some(translator.physical_name_cluster_scoped("testsc")),
                labels: Some([(MARKER_LABEL.to_string(), "suffix".to_string())].into()),
                annotations: Some(
                    [
                        (NAME_ANNOTATION.to_string(), "testsc".to_string()),
                        (UID_ANNOTATION.to_string(), String::new()),
                    ]
                    .into(),
                ),
                ..Default::default()
            },
            provisioner: "my-provisioner".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn sync_down() {
        let translator = translator();
        let engine = SyncEngine::new(translator.clone(), MemoryStore::with(vec![]));

        engine.sync_to_host(&virtual_class()).await.unwrap();

        let state: Vec<_> = engine
            .store()
            .dump()
            .into_iter()
            .map(strip_server_fields)
            .collect();
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            serde_json::to_value(vec![physical_class(&translator)]).unwrap()
        );
    }

    #[tokio::test]
    async fn sync_applies_new_parameters() {
        let translator = translator();
        let existing = physical_class(&translator);
        let engine = SyncEngine::new(translator.clone(), MemoryStore::with(vec![existing.clone()]));

        let mut updated_virtual = virtual_class();
        updated_virtual.parameters = Some([("TEST".to_string(), "TEST".to_string())].into());

        engine.sync(&existing, &updated_virtual).await.unwrap();

        let mut expected = physical_class(&translator);
        expected.parameters = Some([("TEST".to_string(), "TEST".to_string())].into());

        let state: Vec<_> = engine
            .store()
            .dump()
            .into_iter()
            .map(strip_server_fields)
            .collect();
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            serde_json::to_value(vec![expected]).unwrap()
        );
    }

    #[test]
    fn copies_the_whole_managed_field_set() {
        let mut source = virtual_class();
        source.reclaim_policy = Some("Retain".to_string());
        source.mount_options = Some(vec!["noatime".to_string()]);
        source.allow_volume_expansion = Some(true);
        source.volume_binding_mode = Some("WaitForFirstConsumer".to_string());

        let mut physical = physical_class(&translator());
        assert!(source.copy_managed_fields(&mut physical));

        assert_eq!(physical.reclaim_policy.as_deref(), Some("Retain"));
        assert_eq!(physical.mount_options, Some(vec!["noatime".to_string()]));
        assert_eq!(physical.allow_volume_expansion, Some(true));
        assert_eq!(
            physical.volume_binding_mode.as_deref(),
            Some("WaitForFirstConsumer")
        );

        // A second pass over identical fields reports no change.
        assert!(!source.copy_managed_fields(&mut physical));
    }
}
