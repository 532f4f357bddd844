use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use kube::api::{Api, DeleteParams, PostParams};
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::provenance;
use crate::translate::Translator;

use super::SyncError;

/// Managed-field mapper, implemented once per mirrored kind.
///
/// A kind declares which translator variant names it on the host, how to
/// build the desired host object from a virtual one, and how to converge
/// the managed fields of an existing host object. Everything else about a
/// host object belongs to the host cluster and is left alone.
pub trait SyncedResource
where
    Self: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static,
    Self: Resource<DynamicType = ()>,
{
    /// Api for the object inside the virtual cluster, scoped to the
    /// object's namespace for namespaced kinds.
    fn virtual_api(client: kube::Client, namespace: Option<String>) -> Api<Self>;

    /// Api for the mirrored objects on the host side.
    fn host_api(client: kube::Client, target_namespace: &str) -> Api<Self>;

    /// Translated host identity of this virtual object.
    fn physical_name(&self, translator: &Translator) -> String;

    /// Desired host object carrying only the managed fields.
    fn to_physical(&self, translator: &Translator) -> Self;

    /// Copy the managed fields onto an existing host object. Returns
    /// whether any value changed.
    fn copy_managed_fields(&self, physical: &mut Self) -> bool;
}

/// Assign `desired` when it differs from the current value.
pub(crate) fn copy_field<T: PartialEq + Clone>(desired: &T, current: &mut T) -> bool {
    if current == desired {
        return false;
    }
    *current = desired.clone();
    true
}

/// Host API surface the engine reads and mutates through. Kept narrow so
/// tests can substitute an in-memory store.
#[allow(async_fn_in_trait)]
pub trait HostStore<K> {
    async fn get(&self, name: &str) -> kube::Result<Option<K>>;
    async fn create(&self, obj: &K) -> kube::Result<K>;
    async fn update(&self, obj: &K) -> kube::Result<K>;
    async fn delete(&self, name: &str) -> kube::Result<()>;
}

pub struct KubeStore<K> {
    api: Api<K>,
}

impl<K> KubeStore<K> {
    pub fn new(api: Api<K>) -> Self {
        Self { api }
    }
}

impl<K: SyncedResource> HostStore<K> for KubeStore<K> {
    async fn get(&self, name: &str) -> kube::Result<Option<K>> {
        self.api.get_opt(name).await
    }

    async fn create(&self, obj: &K) -> kube::Result<K> {
        self.api.create(&PostParams::default(), obj).await
    }

    async fn update(&self, obj: &K) -> kube::Result<K> {
        // Replace keyed on the carried resourceVersion; concurrent writers
        // surface as a conflict.
        self.api
            .replace(&obj.name_any(), &PostParams::default(), obj)
            .await
    }

    async fn delete(&self, name: &str) -> kube::Result<()> {
        self.api
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
    }
}

/// Create/update/delete of mirrored host objects for a single kind.
///
/// Every call is one deterministic attempt: the engine performs no retries
/// of its own, and never mutates an object it cannot prove it owns. The
/// caller serializes invocations per object identity.
pub struct SyncEngine<K, S = KubeStore<K>> {
    translator: Arc<Translator>,
    store: S,
    _kind: PhantomData<fn() -> K>,
}

impl<K, S> SyncEngine<K, S>
where
    K: SyncedResource,
    S: HostStore<K>,
{
    pub fn new(translator: Arc<Translator>, store: S) -> Self {
        Self {
            translator,
            store,
            _kind: PhantomData,
        }
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    /// The host store this engine reads and writes through.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current host counterpart of the virtual object, if any.
    pub async fn lookup(&self, vobj: &K) -> Result<Option<K>, SyncError> {
        self.store
            .get(&vobj.physical_name(&self.translator))
            .await
            .map_err(SyncError::Lookup)
    }

    /// Create the host counterpart of a virtual object that has none yet.
    ///
    /// A marked object already occupying the translated identity is
    /// returned as-is; an unmarked occupant is a naming collision and is
    /// not touched.
    pub async fn sync_to_host(&self, vobj: &K) -> Result<K, SyncError> {
        let name = vobj.name_any();
        if name.is_empty() {
            return Err(SyncError::MissingName);
        }

        let physical_name = vobj.physical_name(&self.translator);
        if let Some(existing) = self
            .store
            .get(&physical_name)
            .await
            .map_err(SyncError::Lookup)?
        {
            if !provenance::matches(existing.meta(), self.translator.vcluster_name()) {
                return Err(SyncError::NamingCollision {
                    name: physical_name,
                });
            }
            return Ok(existing);
        }

        let mut desired = vobj.to_physical(&self.translator);
        provenance::attach(
            desired.meta_mut(),
            &name,
            vobj.uid().as_deref().unwrap_or_default(),
            self.translator.vcluster_name(),
        );

        let created = self.store.create(&desired).await.map_err(SyncError::Create)?;
        info!(name = %physical_name, "created host object");
        Ok(created)
    }

    /// Converge the managed fields of an existing host counterpart.
    ///
    /// Re-asserts provenance, leaves every non-managed field untouched and
    /// issues no write at all when nothing changed.
    pub async fn sync(&self, pobj: &K, vobj: &K) -> Result<K, SyncError> {
        if !provenance::matches(pobj.meta(), self.translator.vcluster_name()) {
            return Err(SyncError::ForeignObject {
                name: pobj.name_any(),
            });
        }

        let mut updated = pobj.clone();
        let mut changed = vobj.copy_managed_fields(&mut updated);
        changed |= provenance::attach(
            updated.meta_mut(),
            &vobj.name_any(),
            vobj.uid().as_deref().unwrap_or_default(),
            self.translator.vcluster_name(),
        );

        if !changed {
            debug!(name = %pobj.name_any(), "host object up to date");
            return Ok(updated);
        }

        let updated = self.store.update(&updated).await.map_err(SyncError::Update)?;
        info!(name = %updated.name_any(), "updated host object");
        Ok(updated)
    }

    /// Remove the host counterpart. Refuses objects owned by anyone else.
    pub async fn delete(&self, pobj: &K) -> Result<(), SyncError> {
        if !provenance::matches(pobj.meta(), self.translator.vcluster_name()) {
            return Err(SyncError::ForeignObject {
                name: pobj.name_any(),
            });
        }

        self.store
            .delete(&pobj.name_any())
            .await
            .map_err(SyncError::Delete)?;
        info!(name = %pobj.name_any(), "deleted host object");
        Ok(())
    }
}
