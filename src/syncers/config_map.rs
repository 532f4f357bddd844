use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Api, ObjectMeta};
use kube::{Client, ResourceExt};

use crate::translate::Translator;

use super::engine::{copy_field, SyncedResource};

impl SyncedResource for ConfigMap {
    fn virtual_api(client: Client, namespace: Option<String>) -> Api<Self> {
        Api::namespaced(client, namespace.as_deref().unwrap_or("default"))
    }

    fn host_api(client: Client, target_namespace: &str) -> Api<Self> {
        Api::namespaced(client, target_namespace)
    }

    fn physical_name(&self, translator: &Translator) -> String {
        translator.physical_name(
            &self.name_any(),
            self.namespace().as_deref().unwrap_or("default"),
        )
    }

    fn to_physical(&self, translator: &Translator) -> Self {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(self.physical_name(translator)),
                namespace: Some(translator.target_namespace().to_string()),
                ..Default::default()
            },
            data: self.data.clone(),
            binary_data: self.binary_data.clone(),
            immutable: self.immutable,
        }
    }

    fn copy_managed_fields(&self, physical: &mut Self) -> bool {
        let mut changed = copy_field(&self.data, &mut physical.data);
        changed |= copy_field(&self.binary_data, &mut physical.binary_data);
        changed |= copy_field(&self.immutable, &mut physical.immutable);
        changed
    }
}
