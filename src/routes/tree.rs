//! # Route Tree
//!
//! Closed model of a routing tree: routers mounted on routers, route entries
//! with a per-method handler stack, annotation markers and plain middleware.
//!
//! ```text
//! Router
//!  ├─ Layer(Any)          → Annotation(token)     applies to later siblings
//!  ├─ Layer("/users")     → Router …              mounted sub-router
//!  ├─ Layer("/health")    → Route [GET fn]        terminal route
//!  └─ Layer(Any)          → Middleware            ignored
//! ```

use crate::routes::annotation::AnnotationToken;
use crate::routes::endpoint::Method;
use crate::routes::pattern::{PathMatcher, PatternError};

/// Node held by a router layer
#[derive(Debug, Clone)]
pub enum RouteNode {
    Router(Router),
    Route(Route),
    Annotation(AnnotationToken),
    Middleware,
}

/// One entry of a router's stack
#[derive(Debug, Clone)]
pub struct Layer {
    pub matcher: PathMatcher,
    pub node: RouteNode,
}

/// Ordered stack of layers
#[derive(Debug, Clone, Default)]
pub struct Router {
    pub layers: Vec<Layer>,
}

/// Handler registered on a route for one method
#[derive(Debug, Clone)]
pub enum Handle {
    /// Application logic, irrelevant to extraction
    Function,
    Annotation(AnnotationToken),
    /// Router used as a route handler, walked as if mounted at the route path
    Router(Router),
}

/// Single handler entry of a route's stack
#[derive(Debug, Clone)]
pub struct RouteLayer {
    pub method: Method,
    pub handle: Handle,
}

/// Terminal route entry
#[derive(Debug, Clone)]
pub struct Route {
    pub path: String,
    pub stack: Vec<RouteLayer>,
}

impl Route {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            stack: Vec::new(),
        }
    }

    /// Register handlers for `method`, in order
    #[must_use]
    pub fn handle(mut self, method: Method, handles: impl IntoIterator<Item = Handle>) -> Self {
        self.stack
            .extend(handles.into_iter().map(|handle| RouteLayer { method, handle }));
        self
    }

    /// Declared methods, without duplicates, in declaration order
    pub fn methods(&self) -> Vec<Method> {
        let mut methods = Vec::new();
        for layer in &self.stack {
            if !methods.contains(&layer.method) {
                methods.push(layer.method);
            }
        }
        methods
    }

    /// A route is simple when no handler is a router with layers of its own
    pub fn is_simple(&self) -> bool {
        !self.stack.is_empty()
            && self.stack.iter().all(|layer| match &layer.handle {
                Handle::Router(router) => router.layers.is_empty(),
                Handle::Function | Handle::Annotation(_) => true,
            })
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn layer(mut self, matcher: PathMatcher, node: RouteNode) -> Self {
        self.layers.push(Layer { matcher, node });
        self
    }

    /// Add a prepared route
    #[must_use]
    pub fn add_route(self, route: Route) -> Self {
        let matcher = PathMatcher::Literal(route.path.clone());
        self.layer(matcher, RouteNode::Route(route))
    }

    #[must_use]
    pub fn route(self, method: Method, path: &str, handles: impl IntoIterator<Item = Handle>) -> Self {
        self.add_route(Route::new(path).handle(method, handles))
    }

    #[must_use]
    pub fn get(self, path: &str, handles: impl IntoIterator<Item = Handle>) -> Self {
        self.route(Method::Get, path, handles)
    }

    #[must_use]
    pub fn post(self, path: &str, handles: impl IntoIterator<Item = Handle>) -> Self {
        self.route(Method::Post, path, handles)
    }

    #[must_use]
    pub fn put(self, path: &str, handles: impl IntoIterator<Item = Handle>) -> Self {
        self.route(Method::Put, path, handles)
    }

    #[must_use]
    pub fn patch(self, path: &str, handles: impl IntoIterator<Item = Handle>) -> Self {
        self.route(Method::Patch, path, handles)
    }

    #[must_use]
    pub fn delete(self, path: &str, handles: impl IntoIterator<Item = Handle>) -> Self {
        self.route(Method::Delete, path, handles)
    }

    /// Mount a sub-router under an express-style path
    ///
    /// # Errors
    /// Returns an error if the path cannot be compiled.
    pub fn mount(self, path: &str, router: Router) -> Result<Self, PatternError> {
        let matcher = PathMatcher::prefix(path)?;
        Ok(self.layer(matcher, RouteNode::Router(router)))
    }

    /// Attach an annotation to every route registered after this point
    #[must_use]
    pub fn annotate(self, token: AnnotationToken) -> Self {
        self.layer(PathMatcher::Any, RouteNode::Annotation(token))
    }

    #[must_use]
    pub fn middleware(self) -> Self {
        self.layer(PathMatcher::Any, RouteNode::Middleware)
    }
}
