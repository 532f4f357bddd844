use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{
    get, middleware, web::Data, App, HttpRequest, HttpResponse, HttpServer, Responder,
};
use clap::Parser;
use kube::{
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config,
};
use prometheus::{Encoder, TextEncoder};
pub use syncer::{self, telemetry, State};
use syncer::translate::Translator;

#[derive(Parser)]
#[command(
    name = "vcluster-syncer",
    about = "Mirrors virtual cluster objects into a shared host cluster"
)]
struct Options {
    /// Name of the virtual cluster instance being served
    #[arg(long, env = "VCLUSTER_NAME")]
    name: String,

    /// Host namespace the mirrored objects are placed in
    #[arg(long, env = "TARGET_NAMESPACE")]
    target_namespace: String,

    /// Kubeconfig pointing at the virtual cluster api server; the host
    /// connection always uses the ambient environment
    #[arg(long, env = "VIRTUAL_KUBECONFIG")]
    virtual_kubeconfig: Option<PathBuf>,
}

#[get("/metrics")]
async fn metrics(c: Data<State>, _req: HttpRequest) -> impl Responder {
    let metrics = c.metrics();
    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    encoder.encode(&metrics, &mut buffer).unwrap();
    HttpResponse::Ok().body(buffer)
}

#[get("/health")]
async fn health(_: HttpRequest) -> impl Responder {
    HttpResponse::Ok().json("healthy")
}

#[get("/")]
async fn index(c: Data<State>, _req: HttpRequest) -> impl Responder {
    let d = c.diagnostics().await;
    HttpResponse::Ok().json(&d)
}

async fn virtual_client(opts: &Options) -> anyhow::Result<Client> {
    let config = match &opts.virtual_kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?
        }
        None => Config::infer().await?,
    };

    Ok(Client::try_from(config)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let opts = Options::parse();
    let translator = Arc::new(Translator::new(&opts.name, &opts.target_namespace)?);
    let virt = virtual_client(&opts).await?;
    let host = Client::try_default().await?;

    // Init k8s controller state
    let state = State::default();
    let controllers = syncer::run(state.clone(), virt, host, translator);

    // Start web server
    let server = HttpServer::new(move || {
        App::new()
            .app_data(Data::new(state.clone()))
            .wrap(middleware::Logger::default().exclude("/health"))
            .service(index)
            .service(health)
            .service(metrics)
    })
    .bind("0.0.0.0:8443")?
    .shutdown_timeout(5)
    .run();

    tokio::join!(controllers, server).1?;
    Ok(())
}
