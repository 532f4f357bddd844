//! In-memory host store for exercising sync engines against fixture
//! object sets, mirroring how the live store behaves: occupancy checks on
//! create, resourceVersion conflicts on update.

use std::collections::BTreeMap;
use std::sync::Mutex;

use kube::core::ErrorResponse;
use kube::{Resource, ResourceExt};

use super::engine::HostStore;

#[derive(Default)]
pub struct MemoryStore<K> {
    objects: Mutex<BTreeMap<String, K>>,
}

impl<K> MemoryStore<K>
where
    K: Clone + Resource<DynamicType = ()>,
{
    pub fn with(objects: impl IntoIterator<Item = K>) -> Self {
        Self {
            objects: Mutex::new(
                objects
                    .into_iter()
                    .map(|obj| (obj.name_any(), obj))
                    .collect(),
            ),
        }
    }

    /// Overwrite an object out of band, the way a host-side actor would.
    pub fn replace(&self, obj: K) {
        self.objects.lock().unwrap().insert(obj.name_any(), obj);
    }

    /// Every stored object, for comparing against an expected end state.
    pub fn dump(&self) -> Vec<K> {
        self.objects.lock().unwrap().values().cloned().collect()
    }
}

fn api_error(code: u16, reason: &str, message: String) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: reason.to_string(),
        code,
    })
}

impl<K> HostStore<K> for MemoryStore<K>
where
    K: Clone + Resource<DynamicType = ()>,
{
    async fn get(&self, name: &str) -> kube::Result<Option<K>> {
        Ok(self.objects.lock().unwrap().get(name).cloned())
    }

    async fn create(&self, obj: &K) -> kube::Result<K> {
        let mut objects = self.objects.lock().unwrap();
        let name = obj.name_any();
        if objects.contains_key(&name) {
            return Err(api_error(
                409,
                "AlreadyExists",
                format!("{name} already exists"),
            ));
        }

        let mut created = obj.clone();
        created.meta_mut().resource_version = Some("1".to_string());
        objects.insert(name, created.clone());
        Ok(created)
    }

    async fn update(&self, obj: &K) -> kube::Result<K> {
        let mut objects = self.objects.lock().unwrap();
        let name = obj.name_any();
        let Some(current) = objects.get(&name) else {
            return Err(api_error(404, "NotFound", format!("{name} not found")));
        };
        if current.meta().resource_version != obj.meta().resource_version {
            return Err(api_error(
                409,
                "Conflict",
                format!("{name} was modified concurrently"),
            ));
        }

        let version = current
            .meta()
            .resource_version
            .as_deref()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or_default();
        let mut updated = obj.clone();
        updated.meta_mut().resource_version = Some((version + 1).to_string());
        objects.insert(name, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, name: &str) -> kube::Result<()> {
        match self.objects.lock().unwrap().remove(name) {
            Some(_) => Ok(()),
            None => Err(api_error(404, "NotFound", format!("{name} not found"))),
        }
    }
}

/// Clear server-assigned metadata so fixtures compare on content alone.
pub fn strip_server_fields<K>(mut obj: K) -> K
where
    K: Resource<DynamicType = ()>,
{
    obj.meta_mut().resource_version = None;
    obj
}
