//! # In-Memory Backend
//!
//! A [`Transport`] that answers the REST routes of the remote store from in-process state.
//! Collections are kept per user; the user is resolved from the bearer token registered with
//! [`InMemoryBackend::register`].
//!
//! Besides the happy path it can inject faults (`fail_next`, `drop_next`, `set_offline`) and
//! hold every request at a gate (`pause` / `resume`), which lets tests observe optimistic
//! state while a call is still in flight.

use super::error::TransportError;
use super::transport::{ApiRequest, ApiResponse, Method, Transport};
use super::wire::{BulkDelete, Envelope, MoveTo, Replace};
use crate::model::{quantity_in_range, AddItem, Collection, ItemPatch, Mutation, ResourceKind, MAX_QUANTITY};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    Status(u16),
    Drop,
}

#[derive(Debug, Default)]
struct BackendState {
    sessions: HashMap<String, String>,
    collections: HashMap<(String, ResourceKind), Collection>,
    faults: VecDeque<Fault>,
    offline: bool,
    requests: Vec<(Method, String)>,
    next_id: u64,
}

impl BackendState {
    fn mint(&mut self, resource: ResourceKind) -> String {
        self.next_id += 1;
        format!("{resource}_{}", self.next_id)
    }

    fn collection(&self, user: &str, resource: ResourceKind) -> Collection {
        self.collections
            .get(&(user.to_string(), resource))
            .cloned()
            .unwrap_or_else(|| Collection::empty(resource).with_owner(Some(user.to_string())))
    }

    fn store(&mut self, user: &str, collection: Collection) -> ApiResponse {
        let body = json!(Envelope::of(&collection));
        self.collections
            .insert((user.to_string(), collection.kind()), collection);
        ApiResponse::new(200, body)
    }

    fn apply(&mut self, user: &str, resource: ResourceKind, mutation: &Mutation) -> ApiResponse {
        let id = self.mint(resource);
        let next = self.collection(user, resource).apply_as(mutation, move || id);
        self.store(user, next)
    }
}

/// In-process stand-in for the remote store.
#[derive(Debug)]
pub struct InMemoryBackend {
    state: Mutex<BackendState>,
    paused: watch::Sender<bool>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            state: Mutex::new(BackendState::default()),
            paused,
        }
    }

    /// Accepts `token` as a credential of `user_id`.
    pub fn register(&self, token: impl Into<String>, user_id: impl Into<String>) {
        self.lock().sessions.insert(token.into(), user_id.into());
    }

    /// Adds rows to a user's collection as if they had been added remotely.
    pub fn seed(&self, user_id: &str, resource: ResourceKind, specs: impl IntoIterator<Item = AddItem>) {
        let mut state = self.lock();
        for spec in specs {
            state.apply(user_id, resource, &Mutation::Add(spec));
        }
    }

    /// The server-side collection of a user.
    pub fn collection(&self, user_id: &str, resource: ResourceKind) -> Collection {
        self.lock().collection(user_id, resource)
    }

    /// Answers the next request with `status` instead of serving it.
    pub fn fail_next(&self, status: u16) {
        self.lock().faults.push_back(Fault::Status(status));
    }

    /// Fails the next request at the transport level.
    pub fn drop_next(&self) {
        self.lock().faults.push_back(Fault::Drop);
    }

    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Holds every subsequent request until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    /// Number of requests received so far, paused ones included.
    pub fn request_count(&self, method: Method, path: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|(m, p)| *m == method && p == path)
            .count()
    }

    pub fn total_requests(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn serve(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut state = self.lock();

        if state.offline {
            return Err(TransportError::Connection("backend offline".into()));
        }
        match state.faults.pop_front() {
            Some(Fault::Drop) => return Err(TransportError::Connection("connection reset".into())),
            Some(Fault::Status(status)) => {
                return Ok(error(status, format!("injected status {status}")));
            }
            None => {}
        }

        let Some(user) = state.sessions.get(request.bearer.as_str()).cloned() else {
            return Ok(error(401, "unknown credential".into()));
        };

        let segments: Vec<&str> = request.path.trim_start_matches('/').split('/').collect();
        let Some(resource) = segments.first().and_then(|s| parse_resource(s)) else {
            return Ok(error(404, format!("no route for {}", request.path)));
        };
        let body = request.body.unwrap_or(Value::Null);

        let response = match (request.method, &segments[1..]) {
            (Method::Get, []) => ApiResponse::new(200, json!(Envelope::of(&state.collection(&user, resource)))),
            (Method::Delete, []) => state.apply(&user, resource, &Mutation::Clear),
            (Method::Put, []) => match parse::<Replace>(body) {
                Ok(replace) => {
                    let items = replace.items.into_iter().map(|mut item| {
                        if item.is_local() {
                            item.id = state.mint(resource);
                        }
                        item
                    });
                    let items: Vec<_> = items.collect();
                    state.store(&user, Collection::from_items(resource, Some(user.clone()), items))
                }
                Err(response) => response,
            },
            (Method::Post, ["items"]) => match parse::<AddItem>(body) {
                Ok(spec) if !quantity_in_range(spec.quantity) => {
                    error(422, format!("quantity must be within 1..={MAX_QUANTITY}"))
                }
                Ok(spec) => state.apply(&user, resource, &Mutation::Add(spec)),
                Err(response) => response,
            },
            (Method::Post, ["items", "bulk-delete"]) => match parse::<BulkDelete>(body) {
                Ok(bulk) => state.apply(&user, resource, &Mutation::BulkRemove { item_ids: bulk.item_ids }),
                Err(response) => response,
            },
            (Method::Patch, ["items", item_id]) => {
                if state.collection(&user, resource).find(item_id).is_none() {
                    error(404, format!("item {item_id} not found"))
                } else {
                    match parse::<ItemPatch>(body) {
                        Ok(patch) if patch.quantity.is_some_and(|q| !quantity_in_range(q)) => {
                            error(422, format!("quantity must be within 1..={MAX_QUANTITY}"))
                        }
                        Ok(patch) => state.apply(
                            &user,
                            resource,
                            &Mutation::Update {
                                item_id: item_id.to_string(),
                                patch,
                            },
                        ),
                        Err(response) => response,
                    }
                }
            }
            (Method::Delete, ["items", item_id]) => {
                if state.collection(&user, resource).find(item_id).is_none() {
                    error(404, format!("item {item_id} not found"))
                } else {
                    state.apply(&user, resource, &Mutation::Remove { item_id: item_id.to_string() })
                }
            }
            (Method::Post, ["items", item_id, "move"]) => match parse::<MoveTo>(body) {
                Ok(target) if target.destination == resource => {
                    error(422, "item is already in that collection".into())
                }
                Ok(target) => {
                    let source = state.collection(&user, resource);
                    match source.find(item_id).cloned() {
                        None => error(404, format!("item {item_id} not found")),
                        Some(item) => {
                            let spec = AddItem::from_item(&item, resource.into());
                            state.apply(&user, target.destination, &Mutation::Add(spec));
                            state.apply(&user, resource, &Mutation::Remove { item_id: item.id })
                        }
                    }
                }
                Err(response) => response,
            },
            _ => error(404, format!("no route for {} {}", request.method, request.path)),
        };
        Ok(response)
    }
}

#[async_trait]
impl Transport for InMemoryBackend {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.lock()
            .requests
            .push((request.method, request.path.clone()));

        let mut gate = self.paused.subscribe();
        gate.wait_for(|paused| !*paused)
            .await
            .map_err(|_| TransportError::Connection("backend shut down".into()))?;

        debug!(method = %request.method, path = %request.path, "Backend serving");
        self.serve(request)
    }
}

fn error(status: u16, message: String) -> ApiResponse {
    ApiResponse::new(status, json!({ "message": message }))
}

fn parse<T: DeserializeOwned>(body: Value) -> Result<T, ApiResponse> {
    serde_json::from_value(body).map_err(|e| error(400, format!("invalid body: {e}")))
}

fn parse_resource(segment: &str) -> Option<ResourceKind> {
    ResourceKind::ALL
        .into_iter()
        .find(|kind| kind.cache_key() == segment)
}
