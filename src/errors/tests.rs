//! Tests for status-coded errors and their rendering.

#[cfg(test)]
mod errors_tests {
    use std::io;

    use crate::errors::{ErrorBody, ErrorTranslator, HttpError};
    use crate::parser::Method;
    use crate::server::{Error, StatusCode};

    #[test]
    fn test_canned_errors_default_status_and_message() {
        let cases = vec![
            (HttpError::bad_request(), 400, "Bad Request"),
            (HttpError::unauthorized(), 401, "Unauthorized"),
            (HttpError::forbidden(), 403, "Forbidden"),
            (HttpError::not_found(), 404, "Not Found"),
            (HttpError::conflict(), 409, "Conflict"),
            (HttpError::internal(), 500, "Internal Server Error"),
        ];

        for (error, status, message) in cases {
            assert_eq!(error.status().as_u16(), status);
            assert_eq!(error.message(), message);
            assert_eq!(error.to_string(), message);
        }
    }

    #[test]
    fn test_custom_message_keeps_status() {
        let error = HttpError::not_found().with_message("User 7 not found");
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert_eq!(error.message(), "User 7 not found");
    }

    #[test]
    fn test_custom_status() {
        let error = HttpError::new(StatusCode::from_u16(418).unwrap(), "I'm a teapot");
        let body = ErrorTranslator::new(true).body(&Error::Http(error));
        assert_eq!(body.status_code, 418);
        assert_eq!(body.message, "I'm a teapot");
    }

    #[test]
    fn test_http_error_keeps_its_status() {
        let translator = ErrorTranslator::new(true);
        let response = translator.render(&Error::from(HttpError::conflict()));

        assert_eq!(response.status, StatusCode::CONFLICT);
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        let body: ErrorBody = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body, ErrorBody { status_code: 409, message: "Conflict".to_string(), stack: None });
    }

    #[test]
    fn test_unknown_errors_become_500_with_their_message() {
        let translator = ErrorTranslator::new(true);
        let body = translator.body(&Error::InternalError("database unreachable".to_string()));
        assert_eq!(body.status_code, 500);
        assert_eq!(body.message, "Internal server error: database unreachable");

        let body = translator.body(&Error::Panic("boom".to_string()));
        assert_eq!(body.status_code, 500);
        assert!(body.message.contains("boom"));
    }

    #[test]
    fn test_platform_errors_keep_their_status() {
        let translator = ErrorTranslator::new(true);
        assert_eq!(translator.body(&Error::NotFound("/missing".to_string())).status_code, 404);
        assert_eq!(translator.body(&Error::MethodNotAllowed(Method::PUT, "/users".to_string())).status_code, 405);
        assert_eq!(translator.body(&Error::PayloadTooLarge(10, 5)).status_code, 413);
    }

    #[test]
    fn test_stack_only_outside_production() {
        let error = Error::from(
            HttpError::internal().with_source(io::Error::new(io::ErrorKind::Other, "disk full")),
        );

        let production = ErrorTranslator::new(true).body(&error);
        assert!(production.stack.is_none());

        let development = ErrorTranslator::new(false).body(&error);
        let stack = development.stack.unwrap();
        assert!(stack.contains("HttpError"));
        assert!(stack.contains("caused by: disk full"));
    }

    #[test]
    fn test_stack_field_omitted_from_json_in_production() {
        let response = ErrorTranslator::new(true).render(&Error::from(HttpError::forbidden()));
        let json: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(json["statusCode"], 403);
        assert_eq!(json["message"], "Forbidden");
        assert!(json.get("stack").is_none());
    }
}
