use actix_web::middleware::Logger;
use actix_web::{App, HttpServer};
use clap::Parser;
use hookrelay_common_logger::setup_logger;
use hookrelay_mapper_structure::EventMapper;
use hookrelay_sink_mixpanel::MixpanelSink;
use log::*;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

use crate::config::RelayArgs;
use crate::dispatch::DispatchGate;
use crate::handler::{create_app, RelayContext};

mod config;
mod dispatch;
mod error;
mod handler;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let args = RelayArgs::parse();

    let relay_config = config::build_config(&args.config_dir)?;
    let _guard = setup_logger(&relay_config.logger)?;

    info!(
        "{} - {} - {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION")
    );

    let mode = config::select_mode(&relay_config.webhook_relay, &args.mode)?;
    info!("mode: {}", mode.info);
    info!("sink: {}", mode.name);
    debug!("sink token: {}", mode.mixpanel.token);
    info!("port: {}", mode.port);

    let mapping_file_path = format!("{}/{}", &args.config_dir, &args.mapping_file);
    let mapping_config = config::read_mapping_from_config(&mapping_file_path)?;

    let mapper = EventMapper::new(mapping_config);
    let sink = MixpanelSink::new(&mode.mixpanel)?;
    let context = RelayContext { mapper, gate: DispatchGate::new(Arc::new(sink)) };

    let bind_address = relay_config.webhook_relay.server_bind_address.to_owned();
    let port = mode.port;

    info!("Starting web server at port {}", port);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(TracingLogger::default())
            .service(create_app(context.clone()))
    })
    .bind(format!("{}:{}", bind_address, port))
    // here we are forced to unwrap by the Actix API. See: https://github.com/actix/actix/issues/203
    .unwrap_or_else(|err| {
        error!("Server cannot start on port {}. Err: {:?}", port, err);
        std::process::exit(1);
    })
    .run()
    .await?;

    Ok(())
}
