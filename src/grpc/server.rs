//! gRPC server setup and launch.
//!
//! # Responsibilities
//! - Collect services from every registrar into one routing table
//! - Enable server reflection over all registered descriptor sets
//! - Wire up the interceptor chain (logging, metrics, tracing)
//! - Bind the listener and serve HTTP/2 connections on a detached task
//! - Report startup and serve failures to the shared error sink

use tonic::service::RoutesBuilder;
use tower::ServiceBuilder;

use crate::config::GrpcServerConfig;
use crate::lifecycle::{ErrorSink, ServerError, ServerHandle, ServerKind};
use crate::net::bind_listener;
use crate::net::connection::serve_connections;
use crate::observability::{grpc_trace_layer, LogLayer, MetricsLayer};

/// Something that adds gRPC services to a server being built.
pub trait ServiceRegistrar: Send + Sync {
    /// Add this registrar's services.
    fn register_with_server(&self, routes: &mut RoutesBuilder);

    /// Encoded `FileDescriptorSet` describing the services, for reflection.
    fn file_descriptor_set(&self) -> Option<&'static [u8]> {
        None
    }
}

/// Launch a gRPC server hosting every service in `services`.
///
/// Returns `None` when reflection cannot be built or the listener cannot be
/// bound; the error has then been written to `errors` and nothing is
/// serving. Otherwise serving continues on a detached task.
pub async fn serve_grpc(
    errors: &ErrorSink,
    services: &[&dyn ServiceRegistrar],
    config: &GrpcServerConfig,
) -> Option<ServerHandle> {
    let mut routes = RoutesBuilder::default();
    for service in services {
        service.register_with_server(&mut routes);
    }

    if let Err(e) = add_reflection(&mut routes, services) {
        errors.report(e);
        return None;
    }

    let address = config.bind_address();
    let (listener, local_addr) = match bind_listener(ServerKind::Grpc, &address).await {
        Ok(bound) => bound,
        Err(e) => {
            errors.report(e);
            return None;
        }
    };

    tracing::info!(address = %local_addr, port = %config.port, "Starting gRPC server");

    let service = ServiceBuilder::new()
        .layer(LogLayer::server())
        .layer(MetricsLayer::new(ServerKind::Grpc))
        .layer(grpc_trace_layer())
        .map_request(|req: http::Request<hyper::body::Incoming>| req.map(tonic::body::boxed))
        .service(routes.routes());
    let handle = ServerHandle::spawn(ServerKind::Grpc, local_addr, errors.clone(), |stop| {
        serve_connections(ServerKind::Grpc, listener, service, stop)
    });

    Some(handle)
}

fn add_reflection(
    routes: &mut RoutesBuilder,
    services: &[&dyn ServiceRegistrar],
) -> Result<(), ServerError> {
    let mut builder = tonic_reflection::server::Builder::configure();
    for descriptors in services.iter().filter_map(|s| s.file_descriptor_set()) {
        builder = builder.register_encoded_file_descriptor_set(descriptors);
    }

    let reflection = builder.build_v1().map_err(|e| ServerError::Reflection {
        kind: ServerKind::Grpc,
        message: e.to_string(),
    })?;
    routes.add_service(reflection);
    Ok(())
}
