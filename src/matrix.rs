//! Matrix loading and filtering.
//!
//! A matrix comes in one of two shapes, chosen by the caller rather than
//! inferred from the document:
//!
//! - **flat**: a JSON array of entries, each naming its top-level
//!   directory in a `service` field;
//! - **sliced**: a JSON object of named groups, each group an object whose
//!   keys are top-level directory names.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::changes::ChangedDirectorySet;
use crate::error::{FilterError, Result};

/// Field of a flat-mode entry naming its directory.
pub const SERVICE_FIELD: &str = "service";

/// How the matrix document is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatrixMode {
    /// A list of entries carrying a `service` field.
    Flat,
    /// Named groups; `filter_by` selects the group to filter.
    Sliced {
        /// Name of the group to filter.
        filter_by: String,
    },
}

/// A parsed matrix document.
#[derive(Debug, Clone, PartialEq)]
pub enum MatrixList {
    /// Entries in document order.
    Flat(Vec<Value>),
    /// Groups keyed by name, in document order.
    Sliced(Map<String, Value>),
}

impl MatrixList {
    /// Reads and parses the matrix document at `path`.
    pub fn load(path: &Path, mode: &MatrixMode) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            FilterError::InputData(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&content, mode)
    }

    /// Parses a matrix document held in memory.
    pub fn parse(content: &str, mode: &MatrixMode) -> Result<Self> {
        if content.trim().is_empty() {
            return Err(FilterError::InputData("no content in the list".to_string()));
        }

        let document: Value = serde_json::from_str(content)
            .map_err(|e| FilterError::InputData(format!("malformed JSON: {e}")))?;

        if is_falsy(&document) {
            return Err(FilterError::InputData(format!(
                "the list document is {document}"
            )));
        }

        match (mode, document) {
            (MatrixMode::Flat, Value::Array(entries)) => {
                if entries.is_empty() {
                    return Err(FilterError::InputData("the list is empty".to_string()));
                }
                Ok(Self::Flat(entries))
            }
            (MatrixMode::Flat, _) => Err(FilterError::InputData(
                "a flat matrix must be a JSON array".to_string(),
            )),
            (MatrixMode::Sliced { .. }, Value::Object(groups)) => Ok(Self::Sliced(groups)),
            (MatrixMode::Sliced { .. }, _) => Err(FilterError::InputData(
                "a sliced matrix must be a JSON object of groups".to_string(),
            )),
        }
    }

    /// Checks up front that a sliced matrix has the requested group, so a
    /// typo in `filter_by` fails before any provider call.
    pub fn check_mode(&self, mode: &MatrixMode) -> Result<()> {
        match (self, mode) {
            (Self::Sliced(groups), MatrixMode::Sliced { filter_by }) => {
                filter_sliced(groups, filter_by, &ChangedDirectorySet::default()).map(|_| ())
            }
            (Self::Flat(_), MatrixMode::Flat) => Ok(()),
            _ => Err(mode_mismatch()),
        }
    }

    /// Filters the matrix down to the changed directories.
    pub fn filter(&self, mode: &MatrixMode, changed: &ChangedDirectorySet) -> Result<FilteredResult> {
        match (self, mode) {
            (Self::Flat(entries), MatrixMode::Flat) => {
                Ok(FilteredResult::Entries(filter_flat(entries, changed)))
            }
            (Self::Sliced(groups), MatrixMode::Sliced { filter_by }) => {
                filter_sliced(groups, filter_by, changed).map(FilteredResult::Keys)
            }
            _ => Err(mode_mismatch()),
        }
    }
}

fn mode_mismatch() -> FilterError {
    FilterError::Configuration("the matrix list does not match the requested mode".to_string())
}

/// The filtered matrix, ready to serialize.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilteredResult {
    /// Matching flat-mode entries, unchanged.
    Entries(Vec<Value>),
    /// Matching keys of the selected sliced-mode group.
    Keys(Vec<String>),
}

impl FilteredResult {
    /// An empty result shaped for `mode`.
    pub fn empty(mode: &MatrixMode) -> Self {
        match mode {
            MatrixMode::Flat => Self::Entries(Vec::new()),
            MatrixMode::Sliced { .. } => Self::Keys(Vec::new()),
        }
    }

    /// Returns true if nothing matched.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of matches.
    pub fn len(&self) -> usize {
        match self {
            Self::Entries(entries) => entries.len(),
            Self::Keys(keys) => keys.len(),
        }
    }

    /// Compact JSON rendering, `[]` when empty.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Keeps the entries whose `service` is a changed directory.
///
/// Entries that are not objects or have no string `service` never match.
pub fn filter_flat(entries: &[Value], changed: &ChangedDirectorySet) -> Vec<Value> {
    entries
        .iter()
        .filter(|entry| {
            entry
                .get(SERVICE_FIELD)
                .and_then(Value::as_str)
                .is_some_and(|service| changed.contains(service))
        })
        .cloned()
        .collect()
}

/// Returns the keys of group `filter_by` that are changed directories.
pub fn filter_sliced(
    groups: &Map<String, Value>,
    filter_by: &str,
    changed: &ChangedDirectorySet,
) -> Result<Vec<String>> {
    let group = groups
        .get(filter_by)
        .ok_or_else(|| FilterError::UnknownFilterGroup(filter_by.to_string()))?;

    let Value::Object(services) = group else {
        return Err(FilterError::InputData(format!(
            "group '{filter_by}' must be a JSON object"
        )));
    };

    debug!(
        group = filter_by,
        candidates = services.len(),
        "Filtering sliced matrix group"
    );

    Ok(services
        .keys()
        .filter(|key| changed.contains(key))
        .cloned()
        .collect())
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn changed(dirs: &[&str]) -> ChangedDirectorySet {
        dirs.iter().copied().collect()
    }

    fn sliced(filter_by: &str) -> MatrixMode {
        MatrixMode::Sliced {
            filter_by: filter_by.to_string(),
        }
    }

    // ── filter_flat ───────────────────────────────────────────────

    #[test]
    fn flat_keeps_changed_services() {
        let entries = vec![
            json!({"service": "a"}),
            json!({"service": "b"}),
            json!({"service": "c"}),
        ];
        assert_eq!(
            filter_flat(&entries, &changed(&["b"])),
            vec![json!({"service": "b"})]
        );
    }

    #[test]
    fn flat_with_no_changes_is_empty() {
        let entries = vec![json!({"service": "a"})];
        assert!(filter_flat(&entries, &changed(&[])).is_empty());
    }

    #[test]
    fn flat_preserves_input_order_and_payload() {
        let entries = vec![
            json!({"service": "web", "node": 20}),
            json!({"service": "api", "rust": "1.80"}),
            json!({"service": "db"}),
        ];
        let result = filter_flat(&entries, &changed(&["api", "web"]));
        assert_eq!(
            result,
            vec![
                json!({"service": "web", "node": 20}),
                json!({"service": "api", "rust": "1.80"}),
            ]
        );
    }

    #[test]
    fn flat_entries_without_service_never_match() {
        let entries = vec![
            json!({"name": "a"}),
            json!({"service": 1}),
            json!("a"),
            json!({"service": "a"}),
        ];
        assert_eq!(
            filter_flat(&entries, &changed(&["a"])),
            vec![json!({"service": "a"})]
        );
    }

    // ── filter_sliced ─────────────────────────────────────────────

    #[test]
    fn sliced_returns_changed_keys_of_group() {
        let groups = json!({"staging": {"a": 1, "b": 2}});
        let Value::Object(groups) = groups else {
            unreachable!()
        };
        assert_eq!(
            filter_sliced(&groups, "staging", &changed(&["b"])).unwrap(),
            vec!["b".to_string()]
        );
    }

    #[test]
    fn sliced_unknown_group_fails() {
        let Value::Object(groups) = json!({"staging": {"a": 1}}) else {
            unreachable!()
        };
        let err = filter_sliced(&groups, "production", &changed(&["a"])).unwrap_err();
        assert!(matches!(err, FilterError::UnknownFilterGroup(ref g) if g == "production"));
    }

    #[test]
    fn sliced_keeps_document_key_order() {
        let list = MatrixList::parse(
            r#"{"prod": {"zeta": {}, "alpha": {}, "mid": {}}}"#,
            &sliced("prod"),
        )
        .unwrap();
        let result = list
            .filter(&sliced("prod"), &changed(&["alpha", "zeta", "mid"]))
            .unwrap();
        assert_eq!(
            result,
            FilteredResult::Keys(vec![
                "zeta".to_string(),
                "alpha".to_string(),
                "mid".to_string()
            ])
        );
    }

    #[test]
    fn sliced_group_must_be_object() {
        let Value::Object(groups) = json!({"prod": ["a"]}) else {
            unreachable!()
        };
        let err = filter_sliced(&groups, "prod", &changed(&["a"])).unwrap_err();
        assert!(matches!(err, FilterError::InputData(_)));
    }

    // ── parse / load ──────────────────────────────────────────────

    #[test]
    fn parse_rejects_empty_and_falsy_documents() {
        for content in ["", "   \n", "null", "false", "0", "\"\""] {
            let err = MatrixList::parse(content, &MatrixMode::Flat).unwrap_err();
            assert!(matches!(err, FilterError::InputData(_)), "{content:?}");
        }
    }

    #[test]
    fn parse_rejects_malformed_json() {
        let err = MatrixList::parse("[{\"service\":", &MatrixMode::Flat).unwrap_err();
        assert!(err.to_string().contains("malformed JSON"));
    }

    #[test]
    fn parse_checks_shape_against_mode() {
        assert!(MatrixList::parse(r#"{"a": {}}"#, &MatrixMode::Flat).is_err());
        assert!(MatrixList::parse(r#"[{"service": "a"}]"#, &sliced("a")).is_err());
        assert!(MatrixList::parse("[]", &MatrixMode::Flat).is_err());
    }

    #[test]
    fn load_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"[{{"service": "api"}}]"#).unwrap();

        let list = MatrixList::load(file.path(), &MatrixMode::Flat).unwrap();

        assert_eq!(list, MatrixList::Flat(vec![json!({"service": "api"})]));
    }

    #[test]
    fn load_missing_file_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = MatrixList::load(&dir.path().join("missing.json"), &MatrixMode::Flat)
            .unwrap_err();
        assert!(matches!(err, FilterError::InputData(_)));
    }

    #[test]
    fn check_mode_catches_unknown_group_early() {
        let list = MatrixList::parse(r#"{"staging": {"a": {}}}"#, &sliced("staging")).unwrap();
        assert!(list.check_mode(&sliced("staging")).is_ok());
        assert!(matches!(
            list.check_mode(&sliced("prod")),
            Err(FilterError::UnknownFilterGroup(_))
        ));
        assert!(list.check_mode(&MatrixMode::Flat).is_err());
    }

    #[test]
    fn filter_rejects_list_of_the_other_mode() {
        let flat = MatrixList::parse(r#"[{"service": "a"}]"#, &MatrixMode::Flat).unwrap();
        let err = flat.filter(&sliced("staging"), &changed(&["a"])).unwrap_err();
        assert!(matches!(err, FilterError::Configuration(_)));

        let groups = MatrixList::parse(r#"{"staging": {"a": {}}}"#, &sliced("staging")).unwrap();
        let err = groups.filter(&MatrixMode::Flat, &changed(&["a"])).unwrap_err();
        assert!(matches!(err, FilterError::Configuration(_)));
    }

    // ── FilteredResult ────────────────────────────────────────────

    #[test]
    fn empty_results_serialize_as_empty_array() {
        assert_eq!(FilteredResult::empty(&MatrixMode::Flat).to_json().unwrap(), "[]");
        assert_eq!(FilteredResult::empty(&sliced("x")).to_json().unwrap(), "[]");
    }

    #[test]
    fn results_serialize_compactly() {
        let entries = FilteredResult::Entries(vec![json!({"service": "a", "os": "linux"})]);
        assert_eq!(
            entries.to_json().unwrap(),
            r#"[{"service":"a","os":"linux"}]"#
        );
        let keys = FilteredResult::Keys(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(keys.to_json().unwrap(), r#"["a","b"]"#);
        assert_eq!(keys.len(), 2);
        assert!(!keys.is_empty());
    }
}
