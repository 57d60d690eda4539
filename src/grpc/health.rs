//! The standard `grpc.health.v1` service as a registrar.

use tonic::service::RoutesBuilder;
use tonic_health::pb::health_server::{Health, HealthServer};
use tonic_health::server::HealthReporter;

use crate::grpc::server::ServiceRegistrar;

/// Registers the health service with a launched server.
pub struct HealthRegistrar<T> {
    server: HealthServer<T>,
}

/// Create the health service and the reporter that updates it.
///
/// The overall server status (empty service name) starts as serving.
pub fn health_service() -> (HealthReporter, HealthRegistrar<impl Health>) {
    let (reporter, server) = tonic_health::server::health_reporter();
    (reporter, HealthRegistrar { server })
}

impl<T: Health> ServiceRegistrar for HealthRegistrar<T> {
    fn register_with_server(&self, routes: &mut RoutesBuilder) {
        routes.add_service(self.server.clone());
    }

    fn file_descriptor_set(&self) -> Option<&'static [u8]> {
        Some(tonic_health::pb::FILE_DESCRIPTOR_SET)
    }
}
