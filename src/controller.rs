use crate::syncers::engine::{SyncEngine, SyncedResource};
use crate::syncers::{RegisterContext, SyncError};
use crate::translate::Translator;
use crate::{telemetry, Error, Metrics, Result};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::api::scheduling::v1::PriorityClass;
use k8s_openapi::api::storage::v1::StorageClass;
use kube::{
    api::{Api, ListParams, ResourceExt},
    client::Client,
    runtime::controller::{Action, Controller},
    runtime::events::{Event, EventType, Recorder, Reporter},
    runtime::finalizer,
    runtime::watcher::Config,
    Resource,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::{sync::RwLock, time::Duration};
use tracing::*;

pub static SYNCER_FINALIZER: &str = "syncer.vcluster.x-k8s.io";

// Context shared by every per-kind reconciler
#[derive(Clone)]
pub struct Context {
    /// Client for the virtual cluster being mirrored
    pub virtual_client: Client,
    /// Client for the host cluster receiving the mirrored objects
    pub host_client: Client,
    /// Identity mapping for this virtual cluster
    pub translator: Arc<Translator>,
    /// Diagnostics read by the web server
    pub diagnostics: Arc<RwLock<Diagnostics>>,
    /// Prom metrics
    pub metrics: Metrics,
}

/// Per-kind reconciler state: the shared context plus the kind's engine.
pub struct SyncContext<K: SyncedResource> {
    pub base: Arc<Context>,
    pub engine: SyncEngine<K>,
}

#[instrument(skip_all, fields(trace_id = display(telemetry::get_trace_id()), kind = %K::kind(&()), name = vobj.name_any(), namespace = vobj.namespace()), err)]
async fn reconcile<K: SyncedResource>(vobj: Arc<K>, ctx: Arc<SyncContext<K>>) -> Result<Action> {
    ctx.base.diagnostics.write().await.last_event = Utc::now();
    let _timer = ctx.base.metrics.count_and_measure(&K::kind(&()));

    let api = K::virtual_api(ctx.base.virtual_client.clone(), vobj.namespace());
    debug!("Reconciling");

    finalizer(&api, SYNCER_FINALIZER, vobj, |event| async {
        match event {
            finalizer::Event::Apply(v) => apply(v.as_ref(), ctx.as_ref()).await,
            finalizer::Event::Cleanup(v) => cleanup(v.as_ref(), ctx.as_ref()).await,
        }
    })
    .await
    .map_err(|e| Error::FinalizerError(Box::new(e)))
}

/// One sync pass: create the host counterpart when it is missing, converge
/// its managed fields when it exists. Invocations for one object identity
/// are serialized by the controller runtime.
async fn apply<K: SyncedResource>(vobj: &K, ctx: &SyncContext<K>) -> Result<Action> {
    match ctx.engine.lookup(vobj).await? {
        Some(pobj) => {
            ctx.engine.sync(&pobj, vobj).await?;
        }
        None => {
            let created = ctx.engine.sync_to_host(vobj).await?;
            ctx.base
                .diagnostics
                .read()
                .await
                .recorder(ctx.base.virtual_client.clone())
                // Record object creation
                .publish(
                    &Event {
                        type_: EventType::Normal,
                        reason: "Created".into(),
                        note: Some(format!("Created host object `{}`", created.name_any())),
                        action: "Creating".into(),
                        secondary: None,
                    },
                    &vobj.object_ref(&()),
                )
                .await?;
        }
    }

    Ok(Action::await_change())
}

/// The virtual object is going away; take its host counterpart with it.
async fn cleanup<K: SyncedResource>(vobj: &K, ctx: &SyncContext<K>) -> Result<Action> {
    if let Some(pobj) = ctx.engine.lookup(vobj).await? {
        match ctx.engine.delete(&pobj).await {
            Ok(()) => {
                ctx.base
                    .diagnostics
                    .read()
                    .await
                    .recorder(ctx.base.virtual_client.clone())
                    .publish(
                        &Event {
                            type_: EventType::Normal,
                            reason: "Deleted".into(),
                            note: Some(format!("Deleted host object `{}`", pobj.name_any())),
                            action: "Deleting".into(),
                            secondary: None,
                        },
                        &vobj.object_ref(&()),
                    )
                    .await?;
            }
            // A foreign occupant of the translated name is left alone and
            // must not block the virtual object's own deletion.
            Err(SyncError::ForeignObject { name }) => {
                warn!(%name, "skipping deletion of host object owned by another party");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(Action::await_change())
}

fn error_policy<K: SyncedResource>(_vobj: Arc<K>, error: &Error, ctx: Arc<SyncContext<K>>) -> Action {
    warn!("reconcile failed: {:?}", error);
    ctx.base.metrics.reconcile_failure(&K::kind(&()), error);
    match error.is_retryable() {
        true => Action::requeue(Duration::from_secs(5)),
        false => Action::requeue(Duration::from_secs(5 * 60)),
    }
}

/// Diagnostics to be exposed by the web server
#[derive(Clone, Serialize)]
pub struct Diagnostics {
    pub last_event: DateTime<Utc>,
    #[serde(skip)]
    pub reporter: Reporter,
}
impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            last_event: Utc::now(),
            reporter: "vcluster-syncer".into(),
        }
    }
}
impl Diagnostics {
    fn recorder(&self, client: Client) -> Recorder {
        Recorder::new(client, self.reporter.clone())
    }
}

/// State shared between the controller and the web server
#[derive(Clone, Default)]
pub struct State {
    /// Diagnostics populated by the reconciler
    diagnostics: Arc<RwLock<Diagnostics>>,
    /// Metrics registry
    registry: prometheus::Registry,
}

/// State wrapper around the controller outputs for the web server
impl State {
    /// Metrics getter
    pub fn metrics(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }

    /// State getter
    pub async fn diagnostics(&self) -> Diagnostics {
        self.diagnostics.read().await.clone()
    }

    // Create a shared Context for all per-kind reconcilers
    pub fn to_context(
        &self,
        virtual_client: Client,
        host_client: Client,
        translator: Arc<Translator>,
    ) -> Arc<Context> {
        Arc::new(Context {
            virtual_client,
            host_client,
            translator,
            metrics: Metrics::default().register(&self.registry).unwrap(),
            diagnostics: self.diagnostics.clone(),
        })
    }
}

/// Initialize the syncer loop of every mirrored kind and drive them all.
pub async fn run(
    state: State,
    virtual_client: Client,
    host_client: Client,
    translator: Arc<Translator>,
) {
    let ctx = state.to_context(virtual_client, host_client, translator.clone());
    let register = RegisterContext {
        host: ctx.host_client.clone(),
        translator,
    };

    tokio::join!(
        run_syncer::<StorageClass>(ctx.clone(), &register),
        run_syncer::<PriorityClass>(ctx.clone(), &register),
        run_syncer::<ConfigMap>(ctx.clone(), &register),
    );
}

async fn run_syncer<K: SyncedResource>(ctx: Arc<Context>, register: &RegisterContext) {
    let api: Api<K> = Api::all(ctx.virtual_client.clone());
    if let Err(e) = api.list(&ListParams::default().limit(1)).await {
        error!("{} is not queryable; {e:?}", K::kind(&()));
        std::process::exit(1);
    }

    let sync_ctx = Arc::new(SyncContext {
        base: ctx,
        engine: register.syncer::<K>(),
    });
    Controller::new(api, Config::default().any_semantic())
        .shutdown_on_signal()
        .run(reconcile::<K>, error_policy::<K>, sync_ctx)
        .filter_map(|x| async move { x.ok() })
        .for_each(|_| futures::future::ready(()))
        .await;
}
