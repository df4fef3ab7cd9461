//! The YAML surface form of a scenario config file.

use serde::Deserialize;

use super::predicate::RawPredicate;

#[derive(Debug, Deserialize)]
pub struct ScenarioFile {
    pub scenarios: Vec<RawScenario>,
}

#[derive(Debug, Deserialize)]
pub struct RawScenario {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub filter: Option<RawFilter>,
    pub response: RawResponseRef,
}

#[derive(Debug, Deserialize)]
pub struct RawFilter {
    pub body: Option<RawPredicate>,
}

#[derive(Debug, Deserialize)]
pub struct RawResponseRef {
    pub file: String,
    #[serde(default)]
    pub delay: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_scenario() {
        let yaml = r#"
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
    response:
      file: pending.json
      delay: 0.5
"#;
        let parsed: ScenarioFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.scenarios.len(), 2);
        assert_eq!(parsed.scenarios[0].name, "done");
        assert!(parsed.scenarios[0].filter.is_some());
        assert_eq!(parsed.scenarios[1].response.delay, Some(0.5));
    }
}
