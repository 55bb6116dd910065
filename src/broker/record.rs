//! Request records and the descriptors they carry.

use axum::http::{HeaderMap, Method};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

use crate::broker::error::ValidationError;
use crate::broker::key::CorrelationKey;

/// Multi-valued header set, ordered by header name.
///
/// On input a header value may be a single string or a list of strings;
/// it always serializes as a list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HeaderSet(BTreeMap<String, Vec<String>>);

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to `name`, keeping earlier values.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.entry(name.into()).or_default().push(value.into());
    }

    /// Builder form of [`HeaderSet::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// First value of `name`, compared case-insensitively.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Every `(name, value)` pair, one per value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.as_str(), v.as_str())))
    }
}

impl From<&HeaderMap> for HeaderSet {
    fn from(map: &HeaderMap) -> Self {
        let mut headers = HeaderSet::new();
        for (name, value) in map {
            headers.insert(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
        }
        headers
    }
}

impl<'de> Deserialize<'de> for HeaderSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Values {
            One(String),
            Many(Vec<String>),
        }

        let raw = BTreeMap::<String, Values>::deserialize(deserializer)?;
        let map = raw
            .into_iter()
            .map(|(name, values)| match values {
                Values::One(v) => (name, vec![v]),
                Values::Many(vs) => (name, vs),
            })
            .collect();
        Ok(Self(map))
    }
}

/// Methods the broker is willing to forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetMethod {
    Get,
    Post,
}

impl TargetMethod {
    /// Parse the exact upper-case HTTP token.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            other => Err(ValidationError::MethodNotAllowed(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for TargetMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<TargetMethod> for Method {
    fn from(method: TargetMethod) -> Self {
        match method {
            TargetMethod::Get => Method::GET,
            TargetMethod::Post => Method::POST,
        }
    }
}

/// Request description as submitted by a client, not yet validated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientRequest {
    #[serde(default, alias = "Method")]
    pub method: String,

    #[serde(default, alias = "Url")]
    pub url: String,

    #[serde(default, alias = "Headers")]
    pub headers: HeaderSet,
}

impl ClientRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>, headers: HeaderSet) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers,
        }
    }

    /// Checks run in order: url, method, headers. The first failure wins.
    pub fn validate(self) -> Result<RequestDescriptor, ValidationError> {
        if self.url.trim().is_empty() {
            return Err(ValidationError::EmptyUrl);
        }

        let method = TargetMethod::parse(&self.method)?;

        if self.headers.is_empty() {
            return Err(ValidationError::NoHeaders);
        }

        Ok(RequestDescriptor {
            method,
            url: self.url,
            headers: self.headers,
        })
    }
}

/// Validated snapshot of what the client asked for. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestDescriptor {
    pub method: TargetMethod,
    pub url: String,
    pub headers: HeaderSet,
}

/// Outcome of the downstream call as reported by the callback.
///
/// Serializes with lower-case field names; capitalized names are accepted
/// on input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultDescriptor {
    /// Completion identifier echoed by the downstream side.
    #[serde(alias = "Id")]
    pub id: String,
    #[serde(alias = "Status")]
    pub status: u16,
    #[serde(alias = "Headers")]
    pub headers: HeaderSet,
    #[serde(rename = "length", alias = "Length")]
    pub content_length: Option<u64>,
}

/// Lifecycle state, derived from whether a result is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
    Pending,
    Completed,
}

/// Stored state for one correlation key.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub key: CorrelationKey,
    /// Creation time, then refreshed on every touch or completion.
    pub submitted_at: SystemTime,
    pub request: RequestDescriptor,
    pub result: Option<ResultDescriptor>,
}

impl RequestRecord {
    pub(crate) fn new(key: CorrelationKey, request: RequestDescriptor) -> Self {
        Self {
            key,
            submitted_at: SystemTime::now(),
            request,
            result: None,
        }
    }

    pub fn state(&self) -> RecordState {
        if self.result.is_some() {
            RecordState::Completed
        } else {
            RecordState::Pending
        }
    }
}
