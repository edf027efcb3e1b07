//! Test doubles shared by the workspace's test suites: raw petition JSON in
//! the upstream shape, and a scripted transport that replays canned pages.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use broker::HttpExec;
use http::{header, Request, Response, StatusCode};
use serde_json::{json, Map, Value};

pub const BASE_URL: &str = "https://petition.parliament.uk/";

/// Builds one element of the upstream `data[]` array.
#[derive(Debug, Clone)]
pub struct PetitionBuilder {
    id: Option<Value>,
    attributes: Map<String, Value>,
    links: Value,
}

impl PetitionBuilder {
    pub fn new(id: i64, state: &str) -> Self {
        let mut attributes = Map::new();
        attributes.insert("action".into(), json!(format!("Petition number {id}")));
        attributes.insert("state".into(), json!(state));
        attributes.insert("signature_count".into(), json!(0));
        attributes.insert("created_at".into(), json!("2025-01-01T00:00:00.000Z"));
        attributes.insert("departments".into(), json!([]));
        Self {
            id: Some(json!(id)),
            attributes,
            links: json!({ "self": format!("{BASE_URL}petitions/{id}.json") }),
        }
    }

    pub fn id(mut self, id: Value) -> Self {
        self.id = Some(id);
        self
    }

    pub fn without_id(mut self) -> Self {
        self.id = None;
        self
    }

    pub fn title(self, title: &str) -> Self {
        self.attr("action", json!(title))
    }

    pub fn signatures(self, count: i64) -> Self {
        self.attr("signature_count", json!(count))
    }

    pub fn created(self, at: &str) -> Self {
        self.attr("created_at", json!(at))
    }

    pub fn department(mut self, name: &str) -> Self {
        let entry = json!({ "acronym": null, "name": name, "url": null });
        match self.attributes.get_mut("departments") {
            Some(Value::Array(items)) => items.push(entry),
            _ => {
                self.attributes.insert("departments".into(), json!([entry]));
            }
        }
        self
    }

    pub fn attr(mut self, key: &str, value: Value) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }

    pub fn links(mut self, links: Value) -> Self {
        self.links = links;
        self
    }

    pub fn without_attr(mut self, key: &str) -> Self {
        self.attributes.remove(key);
        self
    }

    pub fn build(self) -> Value {
        let mut root = Map::new();
        if let Some(id) = self.id {
            root.insert("id".into(), id);
        }
        root.insert("type".into(), json!("petition"));
        root.insert("links".into(), self.links);
        root.insert("attributes".into(), Value::Object(self.attributes));
        Value::Object(root)
    }
}

/// `count` valid open petitions with ids starting at `first_id`.
pub fn open_petitions(first_id: i64, count: usize) -> Vec<Value> {
    (0..count as i64)
        .map(|offset| {
            PetitionBuilder::new(first_id + offset, "open")
                .signatures(10 * (offset + 1))
                .build()
        })
        .collect()
}

pub fn page_url(state: &str, page: u32) -> String {
    format!("{BASE_URL}petitions.json?state={state}&page={page}")
}

/// Upstream list envelope around `records`.
pub fn page_body(records: &[Value], next: Option<&str>) -> Vec<u8> {
    json!({
        "links": { "self": null, "next": next, "prev": null },
        "data": records,
    })
    .to_string()
    .into_bytes()
}

#[derive(Debug, Clone)]
pub enum Scripted {
    Respond {
        status: StatusCode,
        headers: Vec<(&'static str, String)>,
        body: Vec<u8>,
    },
    TransportError(String),
}

impl Scripted {
    pub fn ok(body: Vec<u8>) -> Self {
        Self::Respond {
            status: StatusCode::OK,
            headers: vec![("content-type", "application/json".into())],
            body,
        }
    }

    pub fn status(status: StatusCode) -> Self {
        Self::Respond {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn rate_limited(retry_after: &str) -> Self {
        Self::Respond {
            status: StatusCode::TOO_MANY_REQUESTS,
            headers: vec![("retry-after", retry_after.to_string())],
            body: Vec::new(),
        }
    }
}

/// Replays scripted responses in order and remembers every requested URI.
#[derive(Default)]
pub struct ScriptedExec {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedExec {
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// One successful page per entry, linked through `links.next`; the last
    /// page carries no next link.
    pub fn paged(state: &str, pages: Vec<Vec<Value>>) -> Self {
        let total = pages.len();
        let script = pages.into_iter().enumerate().map(|(index, records)| {
            let next = (index + 1 < total).then(|| page_url(state, index as u32 + 2));
            Scripted::ok(page_body(&records, next.as_deref()))
        });
        Self::new(script)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests().len()
    }
}

#[async_trait]
impl HttpExec for ScriptedExec {
    async fn execute(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(req.uri().to_string());
        }
        let next = self
            .script
            .lock()
            .map_err(|_| anyhow!("script poisoned"))?
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted response left for {}", req.uri()))?;
        match next {
            Scripted::TransportError(message) => Err(anyhow!(message)),
            Scripted::Respond {
                status,
                headers,
                body,
            } => {
                let mut builder = Response::builder().status(status);
                for (name, value) in headers {
                    builder = builder.header(name, value);
                }
                if !headers_has_content_type(&builder) {
                    builder = builder.header(header::CONTENT_TYPE, "application/json");
                }
                Ok(builder.body(body)?)
            }
        }
    }
}

fn headers_has_content_type(builder: &http::response::Builder) -> bool {
    builder
        .headers_ref()
        .map(|headers| headers.contains_key(header::CONTENT_TYPE))
        .unwrap_or(false)
}
