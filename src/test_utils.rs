// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses.

use http::{Request, Response};
use kube::client::Body;
use kube::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A mock HTTP service that returns predefined responses based on method and path,
/// and records every request it receives.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, status, body)
    }

    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    pub fn on_delete(self, path: &str, status: u16, body: &str) -> Self {
        self.on("DELETE", path, status, body)
    }

    /// Requests received so far as `(method, path)`
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    /// Whether a request with this method and exact path was received
    pub fn received(&self, method: &str, path: &str) -> bool {
        self.requests().iter().any(|(m, p)| m == method && p == path)
    }

    /// Build a kube Client from this mock service. The service stays usable for
    /// inspecting requests since clones share their state.
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();
        responses.get(&(method.to_string(), path.to_string())).cloned()
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        self.requests.lock().unwrap().push((method.clone(), path.clone()));
        let response = self.find_response(&method, &path);

        Box::pin(async move {
            let (status, body) = response.unwrap_or_else(|| (404, not_found_json("object", &path)));
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a mock Secret JSON response
pub fn secret_json(namespace: &str, name: &str, resource_version: &str) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "uid": format!("uid-{}-{}", namespace, name),
            "resourceVersion": resource_version
        },
        "type": "Opaque",
        "data": {
            "foo": "YmFy"
        }
    })
    .to_string()
}

/// Create a mock Publisher JSON response
pub fn publisher_json(namespace: &str, name: &str, secret_ref: &str) -> String {
    serde_json::json!({
        "apiVersion": "secretshare.io/v1alpha1",
        "kind": "Publisher",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "uid": format!("uid-{}-{}", namespace, name),
            "generation": 1,
            "resourceVersion": "1"
        },
        "spec": {
            "secretRef": secret_ref,
            "allowedNamespaces": ["ns2"]
        }
    })
    .to_string()
}

/// Create a mock Consumer JSON response
pub fn consumer_json(namespace: &str, name: &str) -> String {
    serde_json::json!({
        "apiVersion": "secretshare.io/v1alpha1",
        "kind": "Consumer",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "uid": format!("uid-{}-{}", namespace, name),
            "generation": 1,
            "resourceVersion": "1"
        },
        "spec": {
            "publisherRef": {"name": "pub", "namespace": "ns1"}
        }
    })
    .to_string()
}

/// Create a mock list JSON response
pub fn list_json(kind: &str, items: &[String]) -> String {
    let items: Vec<serde_json::Value> = items
        .iter()
        .map(|item| serde_json::from_str(item).unwrap())
        .collect();
    serde_json::json!({
        "apiVersion": "v1",
        "kind": format!("{}List", kind),
        "metadata": {"resourceVersion": "1"},
        "items": items
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}
