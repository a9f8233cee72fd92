//! TLS termination toggle.
//!
//! When the configuration carries certificate and key paths, accepted
//! connections are wrapped in a rustls server session; otherwise they pass
//! through untouched. Everything past this module sees one stream type.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;

use rustls::{ServerConfig, ServerConnection, StreamOwned};

use crate::config::TlsConfig;
use crate::error::ServiceError;

/// Load the server TLS configuration from PEM files.
pub fn load(config: &TlsConfig) -> Result<Arc<ServerConfig>, ServiceError> {
    let certs = rustls_pemfile::certs(&mut BufReader::new(File::open(&config.cert_path)?))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ServiceError::Tls(format!("read certificate chain: {e}")))?;
    if certs.is_empty() {
        return Err(ServiceError::Tls(format!(
            "no certificates in {}",
            config.cert_path.display()
        )));
    }

    let key = rustls_pemfile::private_key(&mut BufReader::new(File::open(&config.key_path)?))
        .map_err(|e| ServiceError::Tls(format!("read private key: {e}")))?
        .ok_or_else(|| {
            ServiceError::Tls(format!("no private key in {}", config.key_path.display()))
        })?;

    let server_config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| ServiceError::Tls(e.to_string()))?;

    Ok(Arc::new(server_config))
}

/// A connection, plain or TLS-wrapped.
pub enum ClientStream {
    /// Plain TCP.
    Plain(TcpStream),
    /// TLS session over TCP.
    Tls(Box<StreamOwned<ServerConnection, TcpStream>>),
}

/// Wrap an accepted connection according to the TLS toggle.
pub fn wrap(stream: TcpStream, tls: Option<&Arc<ServerConfig>>) -> io::Result<ClientStream> {
    match tls {
        None => Ok(ClientStream::Plain(stream)),
        Some(config) => {
            let conn = ServerConnection::new(Arc::clone(config))
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            Ok(ClientStream::Tls(Box::new(StreamOwned::new(conn, stream))))
        }
    }
}

impl Read for ClientStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            ClientStream::Plain(s) => s.read(buf),
            ClientStream::Tls(s) => s.read(buf),
        }
    }
}

impl Write for ClientStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            ClientStream::Plain(s) => s.write(buf),
            ClientStream::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            ClientStream::Plain(s) => s.flush(),
            ClientStream::Tls(s) => s.flush(),
        }
    }
}
