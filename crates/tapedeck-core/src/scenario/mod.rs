//! Declaration-ordered, JSON-body-predicate routing that supersedes the
//! header-based index lookup when active.

mod predicate;
mod yaml;

pub use predicate::{Predicate, RawPredicate};

use std::path::Path;

use serde_json::Value;

use crate::codec;
use crate::error::ScenarioError;
use crate::mock_response::MockResponse;
use crate::sse;

/// One compiled scenario entry.
pub struct Scenario {
    pub name: String,
    pub method: String,
    pub path: String,
    pub filter: Option<Predicate>,
    pub response: MockResponse,
}

/// The full, declaration-ordered set of scenarios loaded from one YAML
/// file.
pub struct ScenarioSet {
    scenarios: Vec<Scenario>,
    stats_json: Vec<u8>,
    list_json: Vec<u8>,
}

impl ScenarioSet {
    /// Load and compile a scenario YAML file. All errors here are fatal at
    /// startup.
    pub fn load(yaml_path: &Path) -> Result<Self, ScenarioError> {
        let text = std::fs::read_to_string(yaml_path).map_err(|source| ScenarioError::Read {
            path: yaml_path.display().to_string(),
            source,
        })?;
        let parsed: yaml::ScenarioFile = serde_yaml::from_str(&text)?;

        if parsed.scenarios.is_empty() {
            return Err(ScenarioError::EmptyScenarios);
        }

        let base_dir = yaml_path.parent().unwrap_or_else(|| Path::new("."));
        let mut scenarios = Vec::with_capacity(parsed.scenarios.len());
        let mut seen_names = std::collections::HashSet::new();

        for raw in parsed.scenarios {
            if !seen_names.insert(raw.name.clone()) {
                return Err(ScenarioError::DuplicateName(raw.name));
            }

            let filter = match raw.filter.and_then(|f| f.body) {
                Some(raw_predicate) => Some(predicate::compile(&raw_predicate).map_err(|reason| {
                    ScenarioError::InvalidFilter {
                        name: raw.name.clone(),
                        reason,
                    }
                })?),
                None => None,
            };

            let response_path = base_dir.join(&raw.response.file);
            let bytes = std::fs::read(&response_path).map_err(|source| {
                ScenarioError::MissingResponseFile {
                    name: raw.name.clone(),
                    path: response_path.display().to_string(),
                    source: crate::error::CodecError::Io(source),
                }
            })?;
            let mut response =
                codec::parse_record_bytes(&bytes, &raw.name).map_err(|source| {
                    ScenarioError::MissingResponseFile {
                        name: raw.name.clone(),
                        path: response_path.display().to_string(),
                        source,
                    }
                })?;

            // Delay override: rescale any SSE timestamps proportionally.
            if let Some(new_delay) = raw.response.delay {
                if response.has_timed_sse_events() && response.delay > 0.0 {
                    let scale = new_delay / response.delay;
                    sse::rescale_timestamps(&mut response.sse_events, scale);
                    response.body_bytes = sse::concat_events(&response.sse_events);
                }
                response.delay = new_delay;
            }

            // Overwrite identity fields so /__mock__/list reports the
            // scenario's own path/method/mock_id rather than the referenced
            // response file's.
            let method = raw
                .method
                .clone()
                .unwrap_or_else(|| response.method.clone());
            response.path = raw.path.clone();
            response.full_url = raw.path.clone();
            response.method = method.clone();
            response.mock_id = raw.name.clone();

            scenarios.push(Scenario {
                name: raw.name,
                method,
                path: raw.path,
                filter,
                response,
            });
        }

        let stats_json = build_stats_json(&scenarios);
        let list_json = build_list_json(&scenarios);

        Ok(Self {
            scenarios,
            stats_json,
            list_json,
        })
    }

    /// Match a request against the scenario set: exact path equality,
    /// declaration order, method filter (skip if both sides non-empty and
    /// differ), then the predicate (skip on no-match). Returns the first
    /// scenario that survives.
    pub fn match_request(&self, path: &str, method: &str, body: Option<&Value>) -> Option<&MockResponse> {
        for scenario in &self.scenarios {
            if scenario.path != path {
                continue;
            }
            if !scenario.method.is_empty() && !method.is_empty()
                && !scenario.method.eq_ignore_ascii_case(method)
            {
                continue;
            }
            if let Some(predicate) = &scenario.filter {
                if !predicate.matches(body) {
                    continue;
                }
            }
            return Some(&scenario.response);
        }
        None
    }

    /// Pre-cached `/__mock__/stats` projection, rebuilt from the scenario
    /// set rather than a directory index.
    pub fn stats_json(&self) -> &[u8] {
        &self.stats_json
    }

    /// Pre-cached `/__mock__/list` projection.
    pub fn list_json(&self) -> &[u8] {
        &self.list_json
    }

    /// Number of loaded scenarios.
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// True iff no scenarios were loaded (never actually constructible,
    /// since `load` rejects an empty file, but useful for completeness).
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

fn build_stats_json(scenarios: &[Scenario]) -> Vec<u8> {
    let mut paths: Vec<String> = scenarios.iter().map(|s| s.path.clone()).collect();
    paths.sort();
    paths.dedup();
    let mut mock_ids: Vec<&str> = scenarios.iter().map(|s| s.name.as_str()).collect();
    mock_ids.sort();
    mock_ids.dedup();

    let stats = crate::index::Stats {
        total_responses: scenarios.len(),
        unique_paths: paths.len(),
        unique_mock_ids: mock_ids.len(),
        paths,
    };
    serde_json::to_vec(&stats).unwrap_or_default()
}

fn build_list_json(scenarios: &[Scenario]) -> Vec<u8> {
    let mocks: Vec<crate::index::MockListEntry> = scenarios
        .iter()
        .map(|s| crate::index::MockListEntry {
            request_id: s.response.request_id.clone(),
            path: s.response.path.clone(),
            method: s.response.method.clone(),
            mock_id: s.response.mock_id.clone(),
            content_type: s.response.content_type.clone(),
            status_code: s.response.status_code,
            full_url: s.response.full_url.clone(),
        })
        .collect();

    #[derive(serde::Serialize)]
    struct Simple {
        total: usize,
        mocks: Vec<crate::index::MockListEntry>,
    }

    serde_json::to_vec(&Simple {
        total: mocks.len(),
        mocks,
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn declaration_order_and_predicate_gating() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "done.json",
            r#"{"request":{"url":"http://u/api/v1/status","method":"POST","headers":{}},
               "response":{"status_code":200,"headers":{},"body":{"result":"done"}}}"#,
        );
        write_file(
            dir.path(),
            "pending.json",
            r#"{"request":{"url":"http://u/api/v1/status","method":"POST","headers":{}},
               "response":{"status_code":200,"headers":{},"body":{"result":"pending"}}}"#,
        );
        write_file(
            dir.path(),
            "scenarios.yaml",
            r#"
scenarios:
  - name: done
    path: /api/v1/status
    method: POST
    filter:
      body:
        and:
          - eq:
              field: processing.state
              value: done
          - rx:
              field: payload.id
              value: "^[A-Z]{3}-[0-9]{4}$"
    response:
      file: done.json
  - name: fallback
    path: /api/v1/status
    method: POST
    response:
      file: pending.json
"#,
        );

        let set = ScenarioSet::load(&dir.path().join("scenarios.yaml")).unwrap();

        let matching_body = json!({"processing": {"state": "done"}, "payload": {"id": "ABC-1234"}});
        let hit = set.match_request("/api/v1/status", "POST", Some(&matching_body)).unwrap();
        assert_eq!(hit.body_bytes, br#"{"result":"done"}"#.to_vec());

        let other_body = json!({"processing": {"state": "pending"}});
        let hit2 = set.match_request("/api/v1/status", "POST", Some(&other_body)).unwrap();
        assert_eq!(hit2.body_bytes, br#"{"result":"pending"}"#.to_vec());
    }

    #[test]
    fn empty_scenarios_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "scenarios.yaml", "scenarios: []\n");
        let err = ScenarioSet::load(&dir.path().join("scenarios.yaml")).unwrap_err();
        assert!(matches!(err, ScenarioError::EmptyScenarios));
    }

    #[test]
    fn delay_override_rescales_sse_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "stream.json",
            r#"{"request":{"url":"http://u/stream","method":"GET","headers":{}},
               "response":{"status_code":200,"headers":{"Content-Type":"text/event-stream"},
               "body":[{"data":"a","timestamp":0.1},{"data":"b","timestamp":0.2},
                       {"data":"c","timestamp":0.3},{"data":"d","timestamp":0.4},
                       {"data":"e","timestamp":0.5}],"delay":5.0}}"#,
        );
        write_file(
            dir.path(),
            "scenarios.yaml",
            "scenarios:\n  - name: stream\n    path: /stream\n    response:\n      file: stream.json\n      delay: 1.0\n",
        );
        let set = ScenarioSet::load(&dir.path().join("scenarios.yaml")).unwrap();
        let hit = set.match_request("/stream", "GET", None).unwrap();
        assert!((hit.delay - 1.0).abs() < 1e-9);
        let timestamps: Vec<f64> = hit.sse_events.iter().map(|e| e.timestamp).collect();
        let expected = [0.02, 0.04, 0.06, 0.08, 0.10];
        for (got, want) in timestamps.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-3, "got {got} want {want}");
        }
    }

    #[test]
    fn x_mock_id_header_is_ignored_in_scenario_mode() {
        // Scenario matching only looks at path/method/body; the mock_id on
        // the resulting response is always the scenario name, never taken
        // from any request header.
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "r.json",
            r#"{"request":{"url":"http://u/x","method":"GET","headers":{"x-mock-id":"ignored"}},
               "response":{"status_code":200,"headers":{},"body":{}}}"#,
        );
        write_file(
            dir.path(),
            "scenarios.yaml",
            "scenarios:\n  - name: scn\n    path: /x\n    response:\n      file: r.json\n",
        );
        let set = ScenarioSet::load(&dir.path().join("scenarios.yaml")).unwrap();
        let hit = set.match_request("/x", "GET", None).unwrap();
        assert_eq!(hit.mock_id, "scn");
    }
}
