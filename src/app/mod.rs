//! Application bootstrap.
//!
//! Collects controllers and toggles, registers every route on an
//! [`HttpServer`] and installs the JSON error translator.

mod config;

use std::sync::Arc;

use log::info;

use crate::container::Container;
use crate::decorators::{Controller, ControllerRef, DecoratorError};
use crate::errors::ErrorTranslator;
use crate::metadata::MetadataStore;
use crate::parser::HttpRequest;
use crate::router::{Registrar, RouteEntry};
use crate::server::{Error, HttpResponse, HttpServer, ServerConfig};

pub use config::AppConfig;

/// Builder for an [`App`].
#[derive(Default)]
pub struct AppBuilder {
    config: AppConfig,
    controllers: Vec<ControllerRef>,
    container: Option<Container>,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn controller<C: Controller>(mut self) -> Self {
        self.controllers.push(ControllerRef::of::<C>());
        self
    }

    pub fn controllers(mut self, controllers: impl IntoIterator<Item = ControllerRef>) -> Self {
        self.controllers.extend(controllers);
        self
    }

    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    pub fn server_config(mut self, server: ServerConfig) -> Self {
        self.config.server = server;
        self
    }

    pub fn body_parser(mut self, enabled: bool) -> Self {
        self.config.body_parser = enabled;
        self
    }

    pub fn production(mut self, production: bool) -> Self {
        self.config.production = production;
        self
    }

    /// Resolve controllers and their dependencies from `container` instead of a fresh one.
    pub fn container(mut self, container: Container) -> Self {
        self.container = Some(container);
        self
    }

    /// Registers all controllers. Fails on the first malformed declaration.
    pub async fn build(self) -> Result<App, DecoratorError> {
        let container = self.container.unwrap_or_default();
        let mut store = MetadataStore::new();

        let mut registrar = Registrar::new(&mut store, &container, self.config.body_parser);
        for controller in &self.controllers {
            controller.register(&mut registrar, "")?;
        }
        let (routes, server_routes) = registrar.into_parts();
        info!("Registered {} routes from {} controllers", routes.len(), store.len());

        let server = HttpServer::new(self.config.server.clone());
        server.add_routes(server_routes).await;
        server
            .set_error_handler(ErrorTranslator::new(self.config.production).into_handler())
            .await;

        Ok(App {
            config: self.config,
            server,
            routes,
            container,
        })
    }
}

/// A fully registered application.
pub struct App {
    config: AppConfig,
    server: HttpServer,
    routes: Vec<RouteEntry>,
    container: Container,
}

impl App {
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Registered routes in registration order.
    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn server(&self) -> &HttpServer {
        &self.server
    }

    /// Dispatches a request in process, without a socket.
    pub async fn handle(&self, request: HttpRequest) -> HttpResponse {
        HttpServer::dispatch(
            Arc::clone(&self.server.routes),
            Arc::clone(&self.server.error_handler),
            request,
        )
        .await
    }

    /// Serves until Ctrl+C.
    pub async fn listen(&self) -> Result<(), Error> {
        self.server.start().await
    }
}

/// Builds an application from a controller list and configuration.
pub async fn create_app(
    controllers: impl IntoIterator<Item = ControllerRef>,
    config: AppConfig,
    container: Option<Container>,
) -> Result<App, DecoratorError> {
    let mut builder = App::builder().config(config).controllers(controllers);
    if let Some(container) = container {
        builder = builder.container(container);
    }
    builder.build().await
}
