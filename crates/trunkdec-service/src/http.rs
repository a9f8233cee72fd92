//! Minimal HTTP/1.1 server and method+path router.
//!
//! The acceptor runs on its own thread and hands each connection to a
//! short-lived worker thread, so multipart parsing never blocks the
//! acceptor. `start` binds and listens before returning: a successful
//! return IS the readiness signal. `stop` flips the shutdown flag; the
//! non-blocking accept loop notices within one poll interval and closes
//! the listening socket.
//!
//! Bodies are handled as raw bytes end to end; nothing here assumes text.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::ServiceError;
use crate::tls::{self, ClientStream};

/// Largest accepted header block.
const MAX_HEADER_BYTES: usize = 64 * 1024;

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 256 * 1024 * 1024;

/// Accept-loop poll interval while idle.
const ACCEPT_POLL: Duration = Duration::from_millis(25);

/// A parsed request.
#[derive(Debug)]
pub struct Request {
    /// Request method, uppercase.
    pub method: String,
    /// Request path without the query string.
    pub path: String,
    /// Header name/value pairs in arrival order.
    pub headers: Vec<(String, String)>,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl Request {
    /// First header with the given name, case-insensitive.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response under construction.
#[derive(Debug)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Content-Type header value.
    pub content_type: String,
    /// Extra headers.
    pub headers: Vec<(String, String)>,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl Response {
    /// JSON response with the given status.
    #[must_use]
    pub fn json(status: u16, value: serde_json::Value) -> Response {
        Response {
            status,
            content_type: "application/json".to_string(),
            headers: Vec::new(),
            body: value.to_string().into_bytes(),
        }
    }

    /// The standard error shape: `{"error": message}`.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Response {
        Response::json(status, json!({ "error": message }))
    }

    /// Attach a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Response {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            202 => "Accepted",
            400 => "Bad Request",
            401 => "Unauthorized",
            404 => "Not Found",
            405 => "Method Not Allowed",
            500 => "Internal Server Error",
            503 => "Service Unavailable",
            _ => "Unknown",
        }
    }

    fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "HTTP/1.1 {} {}\r\n", self.status, self.reason())?;
        write!(out, "Content-Type: {}\r\n", self.content_type)?;
        write!(out, "Content-Length: {}\r\n", self.body.len())?;
        write!(out, "Connection: close\r\n")?;
        for (name, value) in &self.headers {
            write!(out, "{name}: {value}\r\n")?;
        }
        write!(out, "\r\n")?;
        out.write_all(&self.body)?;
        out.flush()
    }
}

/// A request handler value.
pub type Handler = Box<dyn Fn(&Request) -> Response + Send + Sync>;

/// Method + path dispatch table, populated once at startup.
#[derive(Default)]
pub struct Router {
    routes: Vec<(&'static str, Pattern, Handler)>,
}

/// Path matching rule.
pub enum Pattern {
    /// The path must match exactly.
    Exact(&'static str),
    /// The path must start with the prefix and carry a non-empty tail
    /// (e.g. `/api/v1/jobs/{id}`).
    Prefix(&'static str),
}

impl Pattern {
    fn matches(&self, path: &str) -> bool {
        match self {
            Pattern::Exact(p) => path == *p,
            Pattern::Prefix(p) => path.strip_prefix(p).is_some_and(|rest| !rest.is_empty()),
        }
    }
}

impl Router {
    /// Empty router.
    #[must_use]
    pub fn new() -> Router {
        Router::default()
    }

    /// Register a handler.
    pub fn route(&mut self, method: &'static str, pattern: Pattern, handler: Handler) {
        self.routes.push((method, pattern, handler));
    }

    /// Dispatch a request: 404 for unknown paths, 405 when the path exists
    /// under a different method.
    #[must_use]
    pub fn dispatch(&self, request: &Request) -> Response {
        let mut path_matched = false;

        for (method, pattern, handler) in &self.routes {
            if pattern.matches(&request.path) {
                path_matched = true;
                if request.method == *method {
                    return handler(request);
                }
            }
        }

        if path_matched {
            Response::error(405, "Method not allowed")
        } else {
            Response::error(404, "Not found")
        }
    }
}

/// The listening server.
pub struct HttpServer {
    shutdown: Arc<AtomicBool>,
    acceptor: Option<JoinHandle<()>>,
    local_addr: SocketAddr,
}

impl HttpServer {
    /// Bind, listen, and spawn the acceptor. Returns only after the socket
    /// is accepting connections.
    pub fn start(
        addr: &str,
        router: Arc<Router>,
        tls: Option<Arc<rustls::ServerConfig>>,
    ) -> Result<HttpServer, ServiceError> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let acceptor = {
            let shutdown = Arc::clone(&shutdown);
            thread::Builder::new()
                .name("http-acceptor".to_string())
                .spawn(move || accept_loop(&listener, &router, tls.as_ref(), &shutdown))
                .map_err(ServiceError::Io)?
        };

        info!(%local_addr, "HTTP service listening");
        Ok(HttpServer {
            shutdown,
            acceptor: Some(acceptor),
            local_addr,
        })
    }

    /// Address the server is listening on.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and join the acceptor.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.acceptor.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(
    listener: &TcpListener,
    router: &Arc<Router>,
    tls: Option<&Arc<rustls::ServerConfig>>,
    shutdown: &AtomicBool,
) {
    while !shutdown.load(Ordering::Acquire) {
        match listener.accept() {
            Ok((stream, peer)) => {
                debug!(%peer, "connection accepted");
                let router = Arc::clone(router);
                let tls = tls.cloned();

                let spawned = thread::Builder::new()
                    .name("http-conn".to_string())
                    .spawn(move || {
                        if let Err(e) = handle_connection(stream, &router, tls.as_ref()) {
                            debug!(error = %e, "connection ended with error");
                        }
                    });
                if let Err(e) = spawned {
                    warn!(error = %e, "could not spawn connection thread");
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL);
            }
            Err(e) => {
                warn!(error = %e, "accept failed");
                thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

fn handle_connection(
    stream: std::net::TcpStream,
    router: &Router,
    tls: Option<&Arc<rustls::ServerConfig>>,
) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(Duration::from_secs(10)))?;
    stream.set_write_timeout(Some(Duration::from_secs(10)))?;

    let mut stream = tls::wrap(stream, tls)?;

    let response = match read_request(&mut stream) {
        Ok(request) => router.dispatch(&request),
        Err(ReadError::Malformed(reason)) => {
            debug!(reason, "malformed request");
            Response::error(400, "Malformed request")
        }
        Err(ReadError::Io(e)) => return Err(e),
    };

    response.write_to(&mut stream)
}

enum ReadError {
    Malformed(&'static str),
    Io(io::Error),
}

impl From<io::Error> for ReadError {
    fn from(e: io::Error) -> ReadError {
        ReadError::Io(e)
    }
}

/// Read one request: headers until the blank line, then exactly
/// Content-Length body bytes. Binary content is preserved untouched.
fn read_request(stream: &mut ClientStream) -> Result<Request, ReadError> {
    let mut buf = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find_subsequence(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        if buf.len() > MAX_HEADER_BYTES {
            return Err(ReadError::Malformed("header block too large"));
        }

        let n = stream.read(&mut chunk)?;
        if n == 0 {
            return Err(ReadError::Malformed("connection closed mid-header"));
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end - 4]).into_owned();
    let mut lines = head.split("\r\n");

    let request_line = lines.next().ok_or(ReadError::Malformed("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or(ReadError::Malformed("missing method"))?
        .to_uppercase();
    let target = parts.next().ok_or(ReadError::Malformed("missing path"))?;
    let path = target.split('?').next().unwrap_or(target).to_string();

    let mut headers = Vec::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .map(|(_, v)| v.parse::<usize>())
        .transpose()
        .map_err(|_| ReadError::Malformed("bad content-length"))?
        .unwrap_or(0);
    if content_length > MAX_BODY_BYTES {
        return Err(ReadError::Malformed("body too large"));
    }

    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            return Err(ReadError::Malformed("connection closed mid-body"));
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    Ok(Request {
        method,
        path,
        headers,
        body,
    })
}

/// First position of `needle` within `haystack`.
pub(crate) fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
