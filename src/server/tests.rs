//! Tests for the HTTP server implementation.

#[cfg(test)]
mod server_tests {
    use std::io::{self, Cursor};
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

    use crate::errors::HttpError;
    use crate::parser::{HttpRequest, HttpVersion, Method};
    use crate::server::{Error, ErrorHandlerFn, HttpResponse, HttpServer, RoutePattern, ServerConfig, StatusCode};

    // Mock TcpStream for testing
    struct MockTcpStream {
        read_data: Cursor<Vec<u8>>,
        write_data: Vec<u8>,
    }

    impl MockTcpStream {
        fn new(read_data: Vec<u8>) -> Self {
            Self {
                read_data: Cursor::new(read_data),
                write_data: Vec::new(),
            }
        }

        fn written_data(&self) -> &[u8] {
            &self.write_data
        }
    }

    impl AsyncRead for MockTcpStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let this = self.get_mut();
            let n = std::io::Read::read(&mut this.read_data, buf.initialize_unfilled())?;
            buf.advance(n);
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for MockTcpStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let this = self.get_mut();
            this.write_data.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    async fn serve(server: &HttpServer, request: &[u8]) -> (Result<(), Error>, String) {
        let mut stream = MockTcpStream::new(request.to_vec());
        let result = HttpServer::handle_connection(
            &mut stream,
            server.routes.clone(),
            server.error_handler.clone(),
            &server.config,
        ).await;
        let response = String::from_utf8_lossy(stream.written_data()).into_owned();
        (result, response)
    }

    async fn test_server() -> HttpServer {
        let server = HttpServer::new(ServerConfig::default());
        server.add_route("/test", vec![Method::GET], |_req| async {
            Ok(HttpResponse::new(StatusCode::OK)
                .with_content_type("text/plain")
                .with_body_string("Test response"))
        }).await;
        server
    }

    #[tokio::test]
    async fn test_server_creation() {
        let config = ServerConfig {
            addr: "127.0.0.1:8080".parse().unwrap(),
            max_connections: 100,
            read_buffer_size: 4096,
            max_body_size: 512,
        };

        let server = HttpServer::new(config.clone());

        assert_eq!(server.config.addr, config.addr);
        assert_eq!(server.config.max_connections, 100);
        assert_eq!(server.config.read_buffer_size, 4096);
        assert_eq!(server.config.max_body_size, 512);
    }

    #[tokio::test]
    async fn test_add_route() {
        let server = test_server().await;

        let routes = server.routes.read().await;
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].path(), "/test");
        assert_eq!(routes[0].methods, vec![Method::GET]);
    }

    #[tokio::test]
    async fn test_handle_connection_with_valid_request() {
        let server = test_server().await;

        let (result, response) = serve(&server, b"GET /test HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Content-Type: text/plain\r\n"));
        assert!(response.contains("Connection: close\r\n"));
        assert!(response.ends_with("Test response"));
    }

    #[tokio::test]
    async fn test_query_string_does_not_affect_matching() {
        let server = test_server().await;

        let (result, response) = serve(&server, b"GET /test?verbose=1 HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    }

    #[tokio::test]
    async fn test_handle_connection_with_not_found() {
        let server = test_server().await;

        let (result, response) = serve(&server, b"GET /nonexistent HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(response.contains("Not found: /nonexistent"));
    }

    #[tokio::test]
    async fn test_handle_connection_with_method_not_allowed() {
        let server = test_server().await;

        let (result, response) = serve(&server, b"POST /test HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
        assert!(response.contains("Allow: GET\r\n"));
    }

    #[tokio::test]
    async fn test_head_request_uses_get_route_without_body() {
        let server = test_server().await;

        let (result, response) = serve(&server, b"HEAD /test HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Content-Type: text/plain\r\n"));
        assert!(response.ends_with("\r\n\r\n"));
        assert!(!response.contains("Test response"));
    }

    #[tokio::test]
    async fn test_explicit_head_route_wins_over_get() {
        let server = test_server().await;
        server.add_route("/test", vec![Method::HEAD], |_req| async {
            Ok(HttpResponse::new(StatusCode::NO_CONTENT))
        }).await;

        let (_, response) = serve(&server, b"HEAD /test HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(response.starts_with("HTTP/1.1 204 No Content\r\n"));
    }

    #[tokio::test]
    async fn test_handle_connection_with_invalid_request() {
        let server = HttpServer::new(ServerConfig::default());

        let (result, response) = serve(&server, b"INVALID REQUEST").await;

        assert!(matches!(result, Err(Error::ParseError(_))));
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(response.contains("Parse error: "));
    }

    #[tokio::test]
    async fn test_empty_connection_is_ignored() {
        let server = test_server().await;

        let (result, response) = serve(&server, b"").await;

        assert!(result.is_ok());
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn test_body_read_across_multiple_reads() {
        let mut config = ServerConfig::default();
        config.read_buffer_size = 8;
        let server = HttpServer::new(config);
        server.add_route("/echo", vec![Method::POST], |req| async move {
            Ok(HttpResponse::new(StatusCode::OK).with_body_bytes(req.body))
        }).await;

        let request = b"POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: 11\r\n\r\nhello world";
        let (result, response) = serve(&server, request).await;

        assert!(result.is_ok());
        assert!(response.ends_with("\r\n\r\nhello world"));
    }

    #[tokio::test]
    async fn test_payload_too_large() {
        let mut config = ServerConfig::default();
        config.max_body_size = 4;
        let server = HttpServer::new(config);
        server.add_route("/echo", vec![Method::POST], |_req| async {
            Ok(HttpResponse::new(StatusCode::OK))
        }).await;

        let request = b"POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: 11\r\n\r\nhello world";
        let (result, response) = serve(&server, request).await;

        assert!(matches!(result, Err(Error::PayloadTooLarge(11, 4))));
        assert!(response.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
    }

    #[tokio::test]
    async fn test_multiple_routes() {
        let server = HttpServer::new(ServerConfig::default());

        server.add_route("/route1", vec![Method::GET], |_req| async {
            Ok(HttpResponse::new(StatusCode::OK).with_body_string("Route 1"))
        }).await;
        server.add_route("/route2", vec![Method::POST], |_req| async {
            Ok(HttpResponse::new(StatusCode::CREATED).with_body_string("Route 2"))
        }).await;

        let (result1, response1) = serve(&server, b"GET /route1 HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert!(result1.is_ok());
        assert!(response1.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response1.contains("Route 1"));

        let (result2, response2) = serve(&server, b"POST /route2 HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert!(result2.is_ok());
        assert!(response2.starts_with("HTTP/1.1 201 Created\r\n"));
        assert!(response2.contains("Route 2"));
    }

    #[tokio::test]
    async fn test_route_with_multiple_methods() {
        let server = HttpServer::new(ServerConfig::default());

        server.add_route("/multi", vec![Method::GET, Method::POST], |req| async move {
            match req.method {
                Method::GET => Ok(HttpResponse::new(StatusCode::OK).with_body_string("GET response")),
                Method::POST => Ok(HttpResponse::new(StatusCode::CREATED).with_body_string("POST response")),
                _ => Err(Error::InternalError("Unexpected method".to_string())),
            }
        }).await;

        let (_, get_response) = serve(&server, b"GET /multi HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert!(get_response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(get_response.contains("GET response"));

        let (_, post_response) = serve(&server, b"POST /multi HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert!(post_response.starts_with("HTTP/1.1 201 Created\r\n"));
        assert!(post_response.contains("POST response"));
    }

    #[tokio::test]
    async fn test_path_params_are_captured() {
        let server = HttpServer::new(ServerConfig::default());
        server.add_route("/users/:userId/posts/:id", vec![Method::GET], |req| async move {
            let body = format!(
                "{}:{}",
                req.get_path_param("userId").unwrap(),
                req.get_path_param("id").unwrap()
            );
            Ok(HttpResponse::new(StatusCode::OK).with_body_string(body))
        }).await;

        let (_, response) = serve(&server, b"GET /users/7/posts/a%20b HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert!(response.ends_with("7:a b"));
    }

    #[tokio::test]
    async fn test_first_registered_route_wins() {
        let server = HttpServer::new(ServerConfig::default());
        server.add_route("/users/me", vec![Method::GET], |_req| async {
            Ok(HttpResponse::new(StatusCode::OK).with_body_string("me"))
        }).await;
        server.add_route("/users/:id", vec![Method::GET], |_req| async {
            Ok(HttpResponse::new(StatusCode::OK).with_body_string("by id"))
        }).await;

        let (_, response) = serve(&server, b"GET /users/me HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert!(response.ends_with("me"));

        let (_, response) = serve(&server, b"GET /users/42 HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert!(response.ends_with("by id"));
    }

    #[tokio::test]
    async fn test_handler_error_uses_error_handler() {
        let server = HttpServer::new(ServerConfig::default());
        server.add_route("/fail", vec![Method::GET], |_req| async {
            Err(Error::from(HttpError::conflict()))
        }).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler: ErrorHandlerFn = Arc::new(move |err: &Error| {
            counter.fetch_add(1, Ordering::SeqCst);
            HttpResponse::new(err.status()).with_body_string(format!("custom: {err}"))
        });
        server.set_error_handler(handler).await;

        let (result, response) = serve(&server, b"GET /fail HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 409 Conflict\r\n"));
        assert!(response.ends_with("custom: Conflict"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_500() {
        let server = HttpServer::new(ServerConfig::default());
        server.add_route("/panic", vec![Method::GET], |_req| async {
            if true {
                panic!("handler exploded");
            }
            Ok(HttpResponse::new(StatusCode::OK))
        }).await;

        let request = HttpRequest::new(Method::GET, "/panic".to_string(), HttpVersion::Http11, Default::default());
        let response = HttpServer::dispatch(server.routes.clone(), server.error_handler.clone(), request).await;

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.body_text().contains("handler exploded"));
    }

    #[test]
    fn test_route_pattern_matching() {
        let pattern = RoutePattern::parse("/photos/:photoId/comments/:id");
        assert_eq!(pattern.param_names(), vec!["photoId", "id"]);

        let params = pattern.matches("/photos/3/comments/9/").unwrap();
        assert_eq!(params.get("photoId").unwrap(), "3");
        assert_eq!(params.get("id").unwrap(), "9");

        assert!(pattern.matches("/photos/3/comments").is_none());
        assert!(pattern.matches("/photos/3/comments/9/extra").is_none());
        assert!(pattern.matches("/videos/3/comments/9").is_none());

        let root = RoutePattern::parse("/");
        assert!(root.matches("/").is_some());
        assert!(root.matches("/anything").is_none());
    }

    #[test]
    fn test_route_pattern_keeps_empty_segments() {
        let doubled = RoutePattern::parse("/a//b");
        assert!(doubled.matches("/a//b").is_some());
        assert!(doubled.matches("/a//b/").is_some());
        assert!(doubled.matches("/a/b").is_none());

        let user = RoutePattern::parse("/users/:id");
        assert!(user.matches("/users//1").is_none());
        assert!(user.matches("/users//").is_none());
        assert!(RoutePattern::parse("/a/b").matches("/a//b").is_none());
    }

    #[test]
    fn test_status_code() {
        assert_eq!(StatusCode::CONFLICT.as_u16(), 409);
        assert_eq!(StatusCode::CONFLICT.reason_phrase(), "Conflict");
        assert_eq!(StatusCode::from_u16(299).unwrap().reason_phrase(), "Success");
        assert_eq!(StatusCode::NOT_FOUND.to_string(), "404 Not Found");
        assert!(StatusCode::from_u16(42).is_none());
        assert!(StatusCode::BAD_REQUEST.is_error());
        assert!(!StatusCode::NO_CONTENT.is_error());
    }

    #[test]
    fn test_response_headers_are_case_insensitive() {
        let response = HttpResponse::new(StatusCode::OK)
            .with_header("content-type", "text/plain")
            .with_content_type("application/json");

        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(response.headers.keys().filter(|k| k.eq_ignore_ascii_case("content-type")).count(), 1);
    }

    #[test]
    fn test_response_bytes_carry_length_and_close() {
        let bytes = HttpResponse::new(StatusCode::NO_CONTENT).to_bytes();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("HTTP/1.1 204 No Content\r\n"));
        assert!(text.contains("Content-Length: 0\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn test_server_config_max_connections() {
        let config = ServerConfig {
            max_connections: 42,
            ..ServerConfig::default()
        };
        let server = HttpServer::new(config);
        assert_eq!(server.config.max_connections, 42);

        let default_server = HttpServer::new(ServerConfig::default());
        assert_eq!(default_server.config.max_connections, 1024);
        assert_eq!(default_server.config.max_body_size, 1024 * 1024);
    }
}
