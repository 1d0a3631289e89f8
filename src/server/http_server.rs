//! HTTP server implementation.

use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{RwLock, Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio::signal;
use log::{debug, info, warn, error};

use crate::parser::{HttpRequest, Method, find_header_end, parse_request};
use crate::server::config::ServerConfig;
use crate::server::error::Error;
use crate::server::handler::{ErrorHandlerFn, HandlerFuture, Route};
use crate::server::response::{HttpResponse, StatusCode};

/// Upper bound on the header block; larger requests are handed to the parser as-is.
const MAX_HEADER_SIZE: usize = 64 * 1024;

/// How long a client may take to send a complete request.
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// How long shutdown waits for in-flight connections.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// An HTTP server.
pub struct HttpServer {
    /// The server configuration.
    pub config: ServerConfig,
    /// The routes, matched in registration order.
    pub routes: Arc<RwLock<Vec<Route>>>,
    /// Renders errors raised while serving a request.
    pub error_handler: Arc<RwLock<ErrorHandlerFn>>,
}

/// Plain-text rendering used until an application installs its own handler.
pub fn default_error_handler(err: &Error) -> HttpResponse {
    HttpResponse::new(err.status())
        .with_content_type("text/plain")
        .with_body_string(err.to_string())
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServerConfig) -> Self {
        let error_handler: ErrorHandlerFn = Arc::new(default_error_handler);
        Self {
            config,
            routes: Arc::new(RwLock::new(Vec::new())),
            error_handler: Arc::new(RwLock::new(error_handler)),
        }
    }

    /// Add a route to the server.
    pub async fn add_route<F, Fut>(&self, path: impl Into<String>, methods: Vec<Method>, handler: F)
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        let path = path.into();
        let handler = Arc::new(move |req: HttpRequest| -> HandlerFuture { Box::pin(handler(req)) });
        self.routes.write().await.push(Route::new(&path, methods, handler));
    }

    /// Append already-built routes, keeping their order.
    pub async fn add_routes(&self, routes: impl IntoIterator<Item = Route>) {
        self.routes.write().await.extend(routes);
    }

    /// Replace the error handler.
    pub async fn set_error_handler(&self, handler: ErrorHandlerFn) {
        *self.error_handler.write().await = handler;
    }

    /// Log the registered endpoints.
    async fn display_server_info(&self) {
        info!("{name} v{version}", name = env!("CARGO_PKG_NAME"), version = env!("CARGO_PKG_VERSION"));

        let routes = self.routes.read().await;
        info!("Registered endpoints:");
        for route in routes.iter() {
            let methods = route.methods.iter()
                .map(Method::as_str)
                .collect::<Vec<&str>>()
                .join(", ");
            info!("  {methods} {}", route.path());
        }
    }

    /// Set up the TCP listener.
    async fn setup_listener(&self) -> Result<TcpListener, Error> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        info!("Server listening on http://{addr}", addr = self.config.addr);
        Ok(listener)
    }

    /// Set up a Ctrl+C handler for graceful shutdown.
    fn setup_ctrl_c_handler(shutdown_tx: Arc<mpsc::Sender<()>>, tasks: &mut JoinSet<()>) {
        tasks.spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl+C, initiating graceful shutdown");
                    let _ = shutdown_tx.send(()).await;
                }
                Err(e) => {
                    error!("Error setting up Ctrl+C handler: {e}");
                }
            }
        });
    }

    /// Handle a new connection.
    fn handle_new_connection(
        &self,
        mut socket: tokio::net::TcpStream,
        addr: SocketAddr,
        semaphore: Arc<Semaphore>,
        tasks: &mut JoinSet<()>,
    ) {
        let permit = match semaphore.try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Connection limit reached, rejecting connection from {addr}");
                tasks.spawn(async move {
                    let response = HttpResponse::new(StatusCode::SERVICE_UNAVAILABLE)
                        .with_content_type("text/plain")
                        .with_body_string("Server is at capacity, please try again later");
                    let _ = socket.write_all(&response.to_bytes()).await;
                });
                return;
            }
        };

        let routes = self.routes.clone();
        let error_handler = self.error_handler.clone();
        let config = self.config.clone();

        tasks.spawn(async move {
            // The permit is dropped when the task completes, releasing the semaphore slot
            let _permit = permit;
            if let Err(e) = Self::handle_connection(&mut socket, routes, error_handler, &config).await {
                debug!("Connection from {addr} ended with error: {e}");
            }
        });
    }

    /// Handle connection errors.
    async fn handle_connection_error(e: std::io::Error) -> bool {
        error!("Error accepting connection: {e}");
        if e.kind() == std::io::ErrorKind::BrokenPipe {
            error!("Critical error accepting connection, shutting down");
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        false
    }

    /// Perform graceful shutdown.
    async fn perform_shutdown(tasks: &mut JoinSet<()>) {
        info!("Waiting for {len} active connections to complete...", len = tasks.len());
        let drained = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
            while let Some(res) = tasks.join_next().await {
                if let Err(e) = res {
                    error!("Task failed during shutdown: {e}");
                }
            }
        }).await;
        if drained.is_err() {
            warn!("Shutdown timeout elapsed, aborting {len} connections", len = tasks.len());
            tasks.abort_all();
        }
        info!("Server shutdown complete");
    }

    /// Start the server and listen for incoming connections.
    pub async fn start(&self) -> Result<(), Error> {
        self.display_server_info().await;

        let listener = self.setup_listener().await?;
        let semaphore = Arc::new(Semaphore::new(self.config.max_connections));

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let shutdown_tx = Arc::new(shutdown_tx);

        let mut tasks = JoinSet::new();
        Self::setup_ctrl_c_handler(shutdown_tx.clone(), &mut tasks);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Shutting down server...");
                    break;
                }
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((socket, addr)) => {
                            self.handle_new_connection(socket, addr, semaphore.clone(), &mut tasks);
                        },
                        Err(e) => {
                            if Self::handle_connection_error(e).await {
                                break;
                            }
                        }
                    }
                }
            }

            // Reap finished connection tasks so the set does not grow unbounded
            while let Some(res) = tasks.try_join_next() {
                if let Err(e) = res {
                    error!("Connection task failed: {e}");
                }
            }
        }

        Self::perform_shutdown(&mut tasks).await;
        Ok(())
    }

    /// Handle a single connection: read one request, dispatch it, write the response.
    ///
    /// Returns an error only when the request could not be read or parsed; the
    /// client has already been answered in that case unless the socket failed.
    pub async fn handle_connection(
        socket: &mut (impl AsyncRead + AsyncWrite + Unpin),
        routes: Arc<RwLock<Vec<Route>>>,
        error_handler: Arc<RwLock<ErrorHandlerFn>>,
        config: &ServerConfig,
    ) -> Result<(), Error> {
        let raw = match tokio::time::timeout(READ_TIMEOUT, Self::read_request(socket, config)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e @ Error::PayloadTooLarge(..))) => {
                let render = error_handler.read().await.clone();
                let response = render(&e);
                socket.write_all(&response.to_bytes()).await?;
                return Err(e);
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(Error::IoError(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "timed out reading request",
                )));
            }
        };

        if raw.is_empty() {
            return Ok(()); // Connection closed
        }

        let request = match parse_request(&raw) {
            Ok(req) => req,
            Err(e) => {
                let e = Error::ParseError(e);
                let render = error_handler.read().await.clone();
                socket.write_all(&render(&e).to_bytes()).await?;
                return Err(e);
            }
        };

        let response = Self::dispatch(routes, error_handler, request).await;
        socket.write_all(&response.to_bytes()).await?;
        socket.flush().await?;
        Ok(())
    }

    /// Read until the header block and the declared body have arrived, or the peer stops sending.
    async fn read_request(
        socket: &mut (impl AsyncRead + Unpin),
        config: &ServerConfig,
    ) -> Result<Vec<u8>, Error> {
        let mut data = Vec::new();
        let mut buf = vec![0; config.read_buffer_size.max(1)];

        loop {
            let n = socket.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);

            match find_header_end(&data) {
                Some(end) => {
                    let declared = declared_content_length(&data[..end]);
                    if declared > config.max_body_size {
                        return Err(Error::PayloadTooLarge(declared, config.max_body_size));
                    }
                    if data.len() - end >= declared {
                        break;
                    }
                }
                None if data.len() > MAX_HEADER_SIZE => break,
                None => {}
            }
        }

        Ok(data)
    }

    /// Route a parsed request and produce the response.
    ///
    /// The first route whose pattern matches the path and whose methods
    /// include the request method wins. A `HEAD` request without a `HEAD`
    /// route falls back to the first matching `GET` route and is answered
    /// without a body. Handlers run in their own task so a panic is reported
    /// as [`Error::Panic`] instead of killing the connection.
    pub async fn dispatch(
        routes: Arc<RwLock<Vec<Route>>>,
        error_handler: Arc<RwLock<ErrorHandlerFn>>,
        mut request: HttpRequest,
    ) -> HttpResponse {
        let mut allowed: Vec<Method> = Vec::new();
        let mut selected = None;
        let mut head_fallback = None;
        {
            let routes_guard = routes.read().await;
            for route in routes_guard.iter() {
                let Some(params) = route.pattern.matches(&request.path) else {
                    continue;
                };
                if route.methods.contains(&request.method) {
                    selected = Some((route.handler.clone(), params));
                    break;
                }
                if request.method == Method::HEAD && route.methods.contains(&Method::GET) {
                    head_fallback.get_or_insert((route.handler.clone(), params));
                    continue;
                }
                for method in &route.methods {
                    if !allowed.contains(method) {
                        allowed.push(*method);
                    }
                }
            }
        }
        let selected = selected.or(head_fallback);

        let method = request.method;
        let path = request.path.clone();

        let result = match selected {
            Some((handler, params)) => {
                request.path_params = params;
                match tokio::spawn(handler(request)).await {
                    Ok(result) => result,
                    Err(join_error) if join_error.is_panic() => {
                        Err(Error::Panic(panic_message(join_error.into_panic())))
                    }
                    Err(join_error) => Err(Error::InternalError(join_error.to_string())),
                }
            }
            None if allowed.is_empty() => Err(Error::NotFound(path.clone())),
            None => Err(Error::MethodNotAllowed(method, path.clone())),
        };

        let mut response = match result {
            Ok(response) => {
                debug!("{method} {path} -> {}", response.status.as_u16());
                response
            }
            Err(e) => {
                if e.status().as_u16() >= 500 {
                    error!("{method} {path} failed: {e}");
                } else {
                    debug!("{method} {path} rejected: {e}");
                }
                let render = error_handler.read().await.clone();
                let mut response = render(&e);
                if matches!(e, Error::MethodNotAllowed(..)) {
                    let allow = allowed.iter().map(Method::as_str).collect::<Vec<&str>>().join(", ");
                    response.set_header("Allow", allow);
                }
                response
            }
        };
        if method == Method::HEAD {
            response.body.clear();
        }
        response
    }
}

fn declared_content_length(head: &[u8]) -> usize {
    String::from_utf8_lossy(head)
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("Content-Length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
