//! Metrics server module
//!
//! This module provides an HTTP server to expose Prometheus metrics for scraping.

use actix_web::middleware::{Compress, DefaultHeaders, NormalizePath};
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
	services::txwatcher::TransactionRegistry,
	utils::metrics::{gather_metrics, update_system_metrics, update_tracking_metrics},
};

/// Shared registry handle as stored in the actix application data
pub type RegistryArc = Arc<dyn TransactionRegistry>;

pub type RegistryData = web::Data<RegistryArc>;

/// Metrics endpoint handler
async fn metrics_handler(registry: RegistryData) -> impl Responder {
	update_system_metrics();

	match registry.get_all().await {
		Ok(transactions) => update_tracking_metrics(&transactions),
		Err(e) => warn!("Failed to read tracked transactions for metrics: {}", e),
	}

	match gather_metrics() {
		Ok(buffer) => HttpResponse::Ok()
			.content_type("text/plain; version=0.0.4; charset=utf-8")
			.body(buffer),
		Err(e) => {
			error!("Error gathering metrics: {}", e);
			HttpResponse::InternalServerError().finish()
		}
	}
}

/// Rewrites the bind host to 0.0.0.0 when running inside a container
fn resolve_bind_address(bind_address: &str, in_docker: bool) -> String {
	if !in_docker {
		return bind_address.to_string();
	}
	match bind_address.split(':').nth(1) {
		Some(port) => format!("0.0.0.0:{}", port),
		None => "0.0.0.0:8081".to_string(),
	}
}

/// Creates the metrics server
///
/// # Arguments
/// * `bind_address` - Address to listen on, e.g. `127.0.0.1:8081`
/// * `registry` - Registry used to refresh the tracked-transaction gauges on every scrape
pub fn create_metrics_server(
	bind_address: String,
	registry: RegistryArc,
) -> std::io::Result<actix_web::dev::Server> {
	let in_docker = std::env::var("IN_DOCKER").unwrap_or_default() == "true";
	let actual_bind_address = resolve_bind_address(&bind_address, in_docker);

	info!(
		"Starting metrics server on {} (actual bind: {})",
		bind_address, actual_bind_address
	);

	Ok(HttpServer::new(move || {
		App::new()
			.wrap(Compress::default())
			.wrap(NormalizePath::trim())
			.wrap(DefaultHeaders::new())
			.app_data(web::Data::new(registry.clone()))
			.route("/metrics", web::get().to(metrics_handler))
	})
	.workers(2)
	.bind(actual_bind_address)?
	.shutdown_timeout(5)
	.run())
}
