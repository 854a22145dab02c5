//! In-memory Kodo bucket for tests / 测试用内存存储空间

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::AsyncReadExt;

use crate::storage::BoxRead;
use super::client::{BodyReader, KodoBackend};
use super::error::ApiError;
use super::types::{FileInfo, ListFilesResult, ListItem};

/// Recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List {
        prefix: String,
        delimiter: String,
        marker: String,
        limit: usize,
    },
    Stat(String),
    Delete(String),
    Get(String),
    Put(String, u64),
}

#[derive(Debug, Clone, Copy)]
pub enum MockFailure {
    Code(i32),
    Transport,
}

impl MockFailure {
    fn to_error(self) -> ApiError {
        match self {
            MockFailure::Code(612) => ApiError::response(612, "no such file or directory"),
            MockFailure::Code(code) => ApiError::response(code, "mock failure"),
            MockFailure::Transport => ApiError::Transport("connection reset".to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockObject {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub put_time: i64,
    pub kind: i64,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<String, MockObject>,
    calls: Vec<Call>,
    list_failure: Option<MockFailure>,
    op_failure: Option<MockFailure>,
    page_size: Option<usize>,
    stuck_marker: bool,
    delay: Option<Duration>,
}

/// Sorted in-memory key space with marker paging / 支持分页的内存键空间
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<State>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys(keys: &[&str]) -> Self {
        let backend = Self::new();
        for key in keys {
            backend.insert(key, key.as_bytes());
        }
        backend
    }

    pub fn insert(&self, key: &str, data: &[u8]) {
        self.state.lock().objects.insert(
            key.to_string(),
            MockObject {
                data: data.to_vec(),
                mime_type: "application/octet-stream".to_string(),
                put_time: 1_609_459_200,
                kind: 0,
            },
        );
    }

    pub fn insert_object(&self, key: &str, object: MockObject) {
        self.state.lock().objects.insert(key.to_string(), object);
    }

    pub fn object(&self, key: &str) -> Option<MockObject> {
        self.state.lock().objects.get(key).cloned()
    }

    /// Server-side page size cap, independent of the requested limit
    pub fn set_page_size(&self, size: usize) {
        self.state.lock().page_size = Some(size);
    }

    pub fn fail_list(&self, failure: MockFailure) {
        self.state.lock().list_failure = Some(failure);
    }

    /// Failure for stat/delete/get/put
    pub fn fail_ops(&self, failure: MockFailure) {
        self.state.lock().op_failure = Some(failure);
    }

    /// Return the request marker back as the next marker
    pub fn stick_marker(&self) {
        self.state.lock().stuck_marker = true;
    }

    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::List { .. }))
            .count()
    }

    async fn enter(&self, call: Call) -> Option<Duration> {
        let mut state = self.state.lock();
        state.calls.push(call);
        state.delay
    }

    fn op_failure(&self) -> Option<ApiError> {
        self.state.lock().op_failure.map(MockFailure::to_error)
    }

    fn page(
        state: &State,
        prefix: &str,
        delimiter: &str,
        marker: &str,
        limit: usize,
    ) -> ListFilesResult {
        let limit = state.page_size.map_or(limit, |p| p.min(limit));
        let mut result = ListFilesResult::default();
        let mut units = 0;
        let mut last_key = String::new();
        let mut more = false;

        let keys = state
            .objects
            .range::<str, _>((std::ops::Bound::Excluded(marker), std::ops::Bound::Unbounded))
            .filter(|(k, _)| k.starts_with(prefix));

        for (key, object) in keys {
            let rest = &key[prefix.len()..];
            let folded = if delimiter.is_empty() {
                None
            } else {
                rest.find(delimiter)
                    .map(|i| format!("{}{}", prefix, &rest[..i + delimiter.len()]))
            };

            if let Some(cp) = &folded {
                if result.common_prefixes.last() == Some(cp) {
                    last_key = key.clone();
                    continue;
                }
            }
            if units == limit {
                more = true;
                break;
            }
            units += 1;
            last_key = key.clone();

            match folded {
                Some(cp) => result.common_prefixes.push(cp),
                None => result.items.push(ListItem {
                    key: key.clone(),
                    hash: format!("hash-{}", key),
                    fsize: object.data.len() as i64,
                    mime_type: object.mime_type.clone(),
                    put_time: object.put_time,
                    kind: object.kind,
                }),
            }
        }

        if more {
            result.marker = last_key;
        }
        if state.stuck_marker {
            result.marker = if marker.is_empty() { "stuck".to_string() } else { marker.to_string() };
        }
        result
    }
}

#[async_trait]
impl KodoBackend for MockBackend {
    async fn list_files(
        &self,
        _bucket: &str,
        prefix: &str,
        delimiter: &str,
        marker: &str,
        limit: usize,
    ) -> Result<ListFilesResult, ApiError> {
        let delay = self
            .enter(Call::List {
                prefix: prefix.to_string(),
                delimiter: delimiter.to_string(),
                marker: marker.to_string(),
                limit,
            })
            .await;
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }

        let state = self.state.lock();
        if let Some(failure) = state.list_failure {
            return Err(failure.to_error());
        }
        Ok(Self::page(&state, prefix, delimiter, marker, limit))
    }

    async fn stat(&self, _bucket: &str, key: &str) -> Result<FileInfo, ApiError> {
        if let Some(d) = self.enter(Call::Stat(key.to_string())).await {
            tokio::time::sleep(d).await;
        }
        if let Some(e) = self.op_failure() {
            return Err(e);
        }
        let state = self.state.lock();
        let object = state
            .objects
            .get(key)
            .ok_or_else(|| MockFailure::Code(612).to_error())?;
        Ok(FileInfo {
            fsize: object.data.len() as i64,
            hash: format!("hash-{}", key),
            mime_type: object.mime_type.clone(),
            put_time: object.put_time,
            kind: object.kind,
        })
    }

    async fn delete(&self, _bucket: &str, key: &str) -> Result<(), ApiError> {
        if let Some(d) = self.enter(Call::Delete(key.to_string())).await {
            tokio::time::sleep(d).await;
        }
        if let Some(e) = self.op_failure() {
            return Err(e);
        }
        match self.state.lock().objects.remove(key) {
            Some(_) => Ok(()),
            None => Err(MockFailure::Code(612).to_error()),
        }
    }

    async fn get(&self, key: &str, _expires: u64) -> Result<BodyReader, ApiError> {
        if let Some(d) = self.enter(Call::Get(key.to_string())).await {
            tokio::time::sleep(d).await;
        }
        if let Some(e) = self.op_failure() {
            return Err(e);
        }
        let data = self
            .object(key)
            .map(|o| o.data)
            .ok_or_else(|| ApiError::response(404, "Document not found"))?;
        Ok(Box::new(std::io::Cursor::new(data)))
    }

    async fn put(&self, _bucket: &str, key: &str, mut body: BoxRead, size: u64) -> Result<(), ApiError> {
        if let Some(d) = self.enter(Call::Put(key.to_string(), size)).await {
            tokio::time::sleep(d).await;
        }
        if let Some(e) = self.op_failure() {
            return Err(e);
        }
        let mut data = Vec::new();
        body.read_to_end(&mut data)
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        if data.len() as u64 != size {
            return Err(ApiError::response(400, "size mismatch"));
        }
        self.insert(key, &data);
        Ok(())
    }

    fn private_url(&self, key: &str, expires: u64) -> String {
        format!("https://mock.example.com/{}?e={}&token=mock", key, expires)
    }
}
