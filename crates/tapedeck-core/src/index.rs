//! The composite `(path, mock_id, content_type)` lookup map. Built once at
//! startup, read-only thereafter — no synchronization is needed on the hot
//! path, so this is a plain `HashMap` rather than the workspace's usual
//! `dashmap::DashMap` (that type earns its keep on genuinely
//! concurrently-*mutated* maps elsewhere in this toolkit, e.g. the SSE
//! writer pool; here it would only add sharding overhead).

use std::collections::HashMap;
use std::path::Path;

use walkdir::WalkDir;

use crate::codec;
use crate::error::CoreError;
use crate::mock_response::MockResponse;

/// Composite key: `(path, mock_id, content_type)`, compared byte-exact.
/// Callers must normalize content-type before probing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct IndexKey {
    path: String,
    mock_id: String,
    content_type: String,
}

/// Pre-cached `/__mock__/stats` projection.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Stats {
    pub total_responses: usize,
    pub unique_paths: usize,
    pub unique_mock_ids: usize,
    pub paths: Vec<String>,
}

/// One entry in the pre-cached `/__mock__/list` projection.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MockListEntry {
    pub request_id: Option<String>,
    pub path: String,
    pub method: String,
    pub mock_id: String,
    pub content_type: String,
    pub status_code: u16,
    pub full_url: String,
}

/// The in-memory mock index.
pub struct Index {
    entries: HashMap<IndexKey, Vec<MockResponse>>,
    stats_json: Vec<u8>,
    list_json: Vec<u8>,
}

impl Index {
    /// Walk `mock_dir`: each immediate subdirectory is a mock-id, each
    /// `*.json` file within it is a record. Files that fail to parse are
    /// skipped and logged, never aborting the load.
    pub fn load(mock_dir: &Path) -> Result<Self, CoreError> {
        let mut entries: HashMap<IndexKey, Vec<MockResponse>> = HashMap::new();

        if mock_dir.exists() {
            for mock_id_dir in WalkDir::new(mock_dir)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_dir())
            {
                let mock_id = mock_id_dir.file_name().to_string_lossy().to_string();
                for entry in WalkDir::new(mock_id_dir.path())
                    .min_depth(1)
                    .max_depth(1)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file())
                    .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
                {
                    match std::fs::read(entry.path()) {
                        Ok(bytes) => match codec::parse_record_bytes(&bytes, &mock_id) {
                            Ok(response) => {
                                let key = IndexKey {
                                    path: response.path.clone(),
                                    mock_id: response.mock_id.clone(),
                                    content_type: response.content_type.clone(),
                                };
                                entries.entry(key).or_default().push(response);
                            }
                            Err(err) => {
                                tracing::warn!(
                                    file = %entry.path().display(),
                                    error = %err,
                                    "skipping unparseable mock record"
                                );
                            }
                        },
                        Err(err) => {
                            tracing::warn!(
                                file = %entry.path().display(),
                                error = %err,
                                "could not read mock record file"
                            );
                        }
                    }
                }
            }
        } else {
            tracing::warn!(dir = %mock_dir.display(), "mock directory does not exist; index will be empty");
        }

        Ok(Self::from_entries(entries))
    }

    /// Hot path: compose the composite key and probe the map, returning the
    /// first candidate whose method matches (case-insensitively), or the
    /// first candidate if `method` is empty.
    ///
    /// Building `IndexKey` is the one unavoidable heap allocation per
    /// request (three owned `String`s for the lookup key); everything
    /// downstream of the map hit borrows directly from the stored
    /// `MockResponse`.
    pub fn find(&self, path: &str, mock_id: &str, content_type: &str, method: &str) -> Option<&MockResponse> {
        let key = IndexKey {
            path: path.to_string(),
            mock_id: mock_id.to_string(),
            content_type: content_type.to_string(),
        };
        let candidates = self.entries.get(&key)?;
        select_by_method(candidates, method)
    }

    /// `Accept: */*` fallback: O(N) scan for the first entry matching
    /// `(path, mock_id)` regardless of content-type, method-filtered when
    /// supplied.
    pub fn find_any_content_type(&self, path: &str, mock_id: &str, method: &str) -> Option<&MockResponse> {
        for candidates in self.entries.values() {
            if let Some(first) = candidates.first() {
                if first.path != path || first.mock_id != mock_id {
                    continue;
                }
            } else {
                continue;
            }
            if let Some(found) = select_by_method(candidates, method) {
                return Some(found);
            }
        }
        None
    }

    /// Pre-serialized `/__mock__/stats` body.
    pub fn stats_json(&self) -> &[u8] {
        &self.stats_json
    }

    /// Pre-serialized `/__mock__/list` body.
    pub fn list_json(&self) -> &[u8] {
        &self.list_json
    }

    /// Total number of loaded mock responses (for diagnostics/tests).
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// True iff the index has no loaded responses.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn from_entries(entries: HashMap<IndexKey, Vec<MockResponse>>) -> Self {
        let stats = build_stats(&entries);
        let list = build_list(&entries);
        let stats_json = serde_json::to_vec(&stats).unwrap_or_default();
        let list_json = serde_json::to_vec(&list).unwrap_or_default();
        Self {
            entries,
            stats_json,
            list_json,
        }
    }
}

fn select_by_method<'a>(candidates: &'a [MockResponse], method: &str) -> Option<&'a MockResponse> {
    if method.is_empty() {
        return candidates.first();
    }
    candidates
        .iter()
        .find(|r| r.method.eq_ignore_ascii_case(method))
}

fn build_stats(entries: &HashMap<IndexKey, Vec<MockResponse>>) -> Stats {
    let total_responses = entries.values().map(Vec::len).sum();
    let mut paths: Vec<String> = entries.keys().map(|k| k.path.clone()).collect();
    paths.sort();
    paths.dedup();
    let mut mock_ids: Vec<&str> = entries.keys().map(|k| k.mock_id.as_str()).collect();
    mock_ids.sort();
    mock_ids.dedup();
    Stats {
        total_responses,
        unique_paths: paths.len(),
        unique_mock_ids: mock_ids.len(),
        paths,
    }
}

#[derive(serde::Serialize)]
struct MockList {
    total: usize,
    mocks: Vec<MockListEntry>,
}

fn build_list(entries: &HashMap<IndexKey, Vec<MockResponse>>) -> MockList {
    let mut mocks: Vec<MockListEntry> = Vec::new();
    for responses in entries.values() {
        for response in responses {
            mocks.push(MockListEntry {
                request_id: response.request_id.clone(),
                path: response.path.clone(),
                method: response.method.clone(),
                mock_id: response.mock_id.clone(),
                content_type: response.content_type.clone(),
                status_code: response.status_code,
                full_url: response.full_url.clone(),
            });
        }
    }
    MockList {
        total: mocks.len(),
        mocks,
    }
}
