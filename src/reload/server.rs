//! Development server: static HTTP over the output directory plus the
//! WebSocket reload channel.
//!
//! Client connections are owned by the `DevServer`; `reload()` broadcasts to
//! every connected browser and drops dead sockets. `exit()` tears the whole
//! transport down and unblocks the HTTP accept loop.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use parking_lot::Mutex;
use tiny_http::{Header, Response, Server};
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use super::message::ReloadMessage;
use crate::embed::{self, ReloadVars};

/// Default WebSocket port for the reload channel
pub const DEFAULT_WS_PORT: u16 = 35901;

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub port: u16,
    pub output_dir: PathBuf,
}

/// The live-reload transport.
pub struct DevServer {
    http: Arc<Server>,
    addr: SocketAddr,
    ws_port: u16,
    clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
    shutdown: Arc<AtomicBool>,
}

impl DevServer {
    /// Begin serving the output directory and accepting reload clients.
    pub fn init(options: &ServerOptions) -> Result<Self> {
        let (http, addr) = bind_http_with_retry(options.port)?;
        let http = Arc::new(http);
        let shutdown = Arc::new(AtomicBool::new(false));
        let clients = Arc::new(Mutex::new(Vec::new()));

        let ws_port = start_ws_acceptor(
            DEFAULT_WS_PORT,
            Arc::clone(&clients),
            Arc::clone(&shutdown),
        )?;

        spawn_http_loop(
            Arc::clone(&http),
            options.output_dir.clone(),
            ws_port,
            Arc::clone(&shutdown),
        );

        crate::log!("serve"; "http://{}", addr);
        crate::debug!("reload"; "ws://localhost:{}", ws_port);

        Ok(Self {
            http,
            addr,
            ws_port,
            clients,
            shutdown,
        })
    }

    /// The bound HTTP address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The bound WebSocket port.
    pub fn ws_port(&self) -> u16 {
        self.ws_port
    }

    /// Notify connected clients to refresh.
    ///
    /// `Some(name)` refreshes only the named stylesheet; `None` reloads the
    /// whole page.
    pub fn reload(&self, target: Option<&str>) {
        let msg = match target {
            Some(target) => ReloadMessage::css(Some(target)),
            None => ReloadMessage::reload(),
        };
        self.broadcast(&msg);
    }

    /// Surface a failed rebuild to connected clients.
    pub fn notify_error(&self, message: &str) {
        self.broadcast(&ReloadMessage::build_error(message));
    }

    fn broadcast(&self, msg: &ReloadMessage) {
        let text = msg.to_json();
        let mut clients = self.clients.lock();
        clients.retain_mut(|ws| ws.send(Message::Text(text.clone().into())).is_ok());
    }

    /// Tear down every connection and stop serving.
    pub fn exit(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let mut clients = self.clients.lock();
        for mut ws in clients.drain(..) {
            let _ = ws.close(None);
        }
        drop(clients);
        self.http.unblock();
    }
}

// =============================================================================
// HTTP
// =============================================================================

/// Bind the HTTP server, retrying on the next ports if the base is in use.
fn bind_http_with_retry(base_port: u16) -> Result<(Server, SocketAddr)> {
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    crate::log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                let addr = match server.server_addr().to_ip() {
                    Some(addr) => addr,
                    None => addr,
                };
                return Ok((server, addr));
            }
            Err(_) if base_port != 0 && offset + 1 < MAX_PORT_RETRIES => continue,
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "failed to bind HTTP server at port {}: {}",
                    port,
                    e
                ));
            }
        }
    }
    unreachable!()
}

fn spawn_http_loop(
    server: Arc<Server>,
    output_dir: PathBuf,
    ws_port: u16,
    shutdown: Arc<AtomicBool>,
) {
    std::thread::spawn(move || {
        for request in server.incoming_requests() {
            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            if let Err(e) = handle_request(request, &output_dir, ws_port) {
                crate::log!("serve"; "request error: {}", e);
            }
        }
    });
}

/// Handle a single HTTP request.
fn handle_request(request: tiny_http::Request, output_dir: &Path, ws_port: u16) -> Result<()> {
    let url = request.url().split('?').next().unwrap_or("/");

    // reload client is served from memory; it never exists on disk
    if url == embed::RELOAD_CLIENT_URL {
        let body = embed::RELOAD_JS.render(&ReloadVars { ws_port });
        let response = Response::from_string(body).with_header(content_type_header("js"));
        request.respond(response)?;
        return Ok(());
    }

    match resolve_file(url, output_dir) {
        Some(path) => {
            let ext = path
                .extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or("")
                .to_string();
            let file = std::fs::File::open(&path)?;
            let response = Response::from_file(file).with_header(content_type_header(&ext));
            request.respond(response)?;
        }
        None => {
            request.respond(Response::from_string("not found").with_status_code(404))?;
        }
    }
    Ok(())
}

/// Map a request URL to a file under the output directory.
///
/// Rejects traversal components; directories resolve to their `index.html`.
fn resolve_file(url: &str, output_dir: &Path) -> Option<PathBuf> {
    let relative = url.trim_start_matches('/');
    let relative = Path::new(relative);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }

    let mut path = output_dir.join(relative);
    if path.is_dir() {
        path = path.join("index.html");
    }
    path.is_file().then_some(path)
}

fn content_type_header(ext: &str) -> Header {
    let value = match ext {
        "html" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript; charset=utf-8",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    };
    // static ASCII on both sides, parsing cannot fail
    Header::from_bytes(&b"Content-Type"[..], value.as_bytes()).expect("valid header")
}

// =============================================================================
// WebSocket
// =============================================================================

/// Start the WebSocket acceptor. Returns the bound port.
fn start_ws_acceptor(
    base_port: u16,
    clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
    shutdown: Arc<AtomicBool>,
) -> Result<u16> {
    let (listener, port) = try_bind_port(base_port, MAX_PORT_RETRIES)?;
    listener.set_nonblocking(true)?;

    std::thread::spawn(move || {
        loop {
            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            match listener.accept() {
                Ok((stream, addr)) => {
                    crate::debug!("reload"; "client connected: {}", addr);
                    let _ = stream.set_nonblocking(false);
                    match tungstenite::accept(stream) {
                        Ok(mut ws) => {
                            let _ = ws
                                .send(Message::Text(ReloadMessage::connected().to_json().into()));
                            clients.lock().push(ws);
                        }
                        Err(e) => {
                            crate::debug!("reload"; "handshake failed: {}", e);
                        }
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(std::time::Duration::from_millis(100));
                }
                Err(e) => {
                    crate::log!("reload"; "accept error: {}", e);
                    std::thread::sleep(std::time::Duration::from_millis(100));
                }
            }
        }
    });

    Ok(port)
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(format!("127.0.0.1:{}", port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                return Ok((listener, actual_port));
            }
            Err(e) => {
                last_error = Some(e);
                continue;
            }
        }
    }

    Err(anyhow::anyhow!(
        "failed to bind WebSocket server after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

// =============================================================================
// Tests
// =============================================================================
