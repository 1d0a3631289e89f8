//! Tests for middleware chains and the body parser.

#[cfg(test)]
mod middleware_tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use crate::errors::HttpError;
    use crate::middleware::{BodyParser, Endpoint, Middleware, MiddlewareRef, Next, RequestContext, ResponseSlot};
    use crate::parser::{HttpRequest, HttpVersion, Method};
    use crate::server::{Error, HandlerFuture, HttpResponse, StatusCode};

    fn request_with_body(content_type: &str, body: &str) -> HttpRequest {
        let mut headers = HashMap::new();
        headers.insert("Host".to_string(), "localhost".to_string());
        headers.insert("Content-Type".to_string(), content_type.to_string());
        HttpRequest::with_body(Method::POST, "/items".to_string(), HttpVersion::Http11, headers, body.as_bytes().to_vec())
    }

    fn context() -> RequestContext {
        RequestContext::new(HttpRequest::new(Method::GET, "/".to_string(), HttpVersion::Http10, HashMap::new()))
    }

    fn recording(log: &Arc<Mutex<Vec<String>>>, label: &'static str) -> MiddlewareRef {
        let log = log.clone();
        Arc::new(move |ctx: RequestContext, next: Next| {
            log.lock().unwrap().push(label.to_string());
            next.run(ctx)
        })
    }

    fn ok_endpoint(log: &Arc<Mutex<Vec<String>>>) -> Endpoint {
        let log = log.clone();
        Arc::new(move |_ctx: RequestContext| -> HandlerFuture {
            log.lock().unwrap().push("handler".to_string());
            Box::pin(async { Ok(HttpResponse::new(StatusCode::OK)) })
        })
    }

    #[tokio::test]
    async fn test_chain_runs_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain: Arc<[MiddlewareRef]> = vec![recording(&log, "first"), recording(&log, "second")].into();

        let next = Next::new(chain, ok_endpoint(&log));
        assert_eq!(next.remaining(), 2);
        let response = next.run(context()).await.unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "handler"]);
    }

    #[tokio::test]
    async fn test_middleware_can_short_circuit() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let deny: MiddlewareRef = Arc::new(|_ctx: RequestContext, _next: Next| async {
            Err::<HttpResponse, Error>(HttpError::unauthorized().into())
        });
        let chain: Arc<[MiddlewareRef]> = vec![deny, recording(&log, "after")].into();

        let result = Next::new(chain, ok_endpoint(&log)).run(context()).await;

        assert!(matches!(result, Err(Error::Http(ref e)) if e.status() == StatusCode::UNAUTHORIZED));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_middleware_can_pass_locals() {
        let tag: MiddlewareRef = Arc::new(|mut ctx: RequestContext, next: Next| {
            ctx.set_local("user", json!({ "id": 7 }));
            next.run(ctx)
        });
        let endpoint: Endpoint = Arc::new(|ctx: RequestContext| -> HandlerFuture {
            let id = ctx.local("user").and_then(|user| user["id"].as_i64()).unwrap_or(0);
            Box::pin(async move { Ok(HttpResponse::new(StatusCode::OK).with_body_string(id.to_string())) })
        });

        let response = Next::new(vec![tag].into(), endpoint).run(context()).await.unwrap();
        assert_eq!(response.body_text(), "7");
    }

    #[test]
    fn test_response_slot_overrides() {
        let slot = ResponseSlot::default();
        let shared = slot.clone();
        shared.set_status(StatusCode::CREATED);
        shared.set_header("Location", "/items/1");

        let response = slot.apply(HttpResponse::new(StatusCode::OK));
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.header("location"), Some("/items/1"));
        assert_eq!(slot.status(), Some(StatusCode::CREATED));
    }

    #[test]
    fn test_body_parser_decodes_json() {
        let mut ctx = RequestContext::new(request_with_body("application/json", r#"{"name":"pen","qty":2}"#));
        BodyParser::decode(&mut ctx).unwrap();
        assert_eq!(ctx.body, Some(json!({ "name": "pen", "qty": 2 })));
    }

    #[test]
    fn test_body_parser_decodes_forms() {
        let mut ctx = RequestContext::new(request_with_body("application/x-www-form-urlencoded", "name=fountain+pen&qty=2"));
        BodyParser::decode(&mut ctx).unwrap();
        assert_eq!(ctx.body, Some(json!({ "name": "fountain pen", "qty": "2" })));
    }

    #[test]
    fn test_body_parser_ignores_other_content() {
        let mut ctx = RequestContext::new(request_with_body("text/plain", "just text"));
        BodyParser::decode(&mut ctx).unwrap();
        assert!(ctx.body.is_none());
    }

    #[test]
    fn test_body_parser_rejects_invalid_json() {
        let mut ctx = RequestContext::new(request_with_body("application/json", "{not json"));
        let error = BodyParser::decode(&mut ctx).unwrap_err();
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert!(error.message().starts_with("Invalid JSON body"));
    }

    #[test]
    fn test_middleware_names() {
        assert_eq!(BodyParser.name(), "body-parser");
    }
}
