//! TCP listener binding for the server launchers.

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::lifecycle::{ServerError, ServerKind};

/// Bind `address` (`host:port`) for a server of `kind`.
///
/// Host names are resolved; an unparseable port or an address already in
/// use comes back as [`ServerError::Bind`].
pub async fn bind_listener(
    kind: ServerKind,
    address: &str,
) -> Result<(TcpListener, SocketAddr), ServerError> {
    let bind_error = |source| ServerError::Bind {
        kind,
        address: address.to_string(),
        source,
    };

    let listener = TcpListener::bind(address).await.map_err(bind_error)?;
    let local_addr = listener.local_addr().map_err(bind_error)?;

    tracing::info!(server = %kind, address = %local_addr, "Listener bound");
    Ok((listener, local_addr))
}
