use serde_json::{Map, Value};

/// Marker substituted for fields missing from a repository record. Kept as a
/// literal string so data-quality gaps stay greppable in the generated
/// reports, and so existing report consumers keep working.
pub const MISSING_FIELD: &str = "GREPPABLEERROR";

/// Canonical report columns, in output order.
pub const REPORT_FIELDS: [&str; 18] = [
    "name",
    "url",
    "description",
    "last_push",
    "size_on_disk",
    "language",
    "topics",
    "issues_count",
    "branches_count",
    "pr_count",
    "last_pr_update",
    "releases_count",
    "released_releases_count",
    "last_release_name",
    "last_release_date",
    "first_release_name",
    "first_release_date",
    "is_archived",
];

/// Projects one repository record onto the flat report schema.
///
/// Every canonical field is emitted exactly once, in [`REPORT_FIELDS`]
/// order, regardless of how sparse the record is.
pub fn map_repo(repo: &Map<String, Value>) -> Map<String, Value> {
    REPORT_FIELDS
        .iter()
        .map(|&name| (name.to_string(), project_field(repo, name)))
        .collect()
}

fn project_field(repo: &Map<String, Value>, name: &str) -> Value {
    match name {
        // Corner case: the join supplies its own empty-collection default,
        // so a record without a `topics` member maps to the empty string,
        // never to the missing-field marker.
        "topics" => Value::String(joined_topics(repo)),
        "last_push" => raw_or_missing(repo, "pushed_at"),
        "size_on_disk" => raw_or_missing(repo, "size"),
        "issues_count" => raw_or_missing(repo, "open_issues"),
        "is_archived" => raw_or_missing(repo, "archived"),
        direct => raw_or_missing(repo, direct),
    }
}

fn raw_or_missing(repo: &Map<String, Value>, key: &str) -> Value {
    repo.get(key)
        .cloned()
        .unwrap_or_else(|| Value::String(MISSING_FIELD.to_string()))
}

fn joined_topics(repo: &Map<String, Value>) -> String {
    repo.get("topics")
        .and_then(Value::as_array)
        .map(|topics| {
            topics
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("|")
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().expect("object literal").clone()
    }

    #[test]
    fn row_always_has_the_canonical_fields_in_order() {
        let row = map_repo(&Map::new());
        let keys: Vec<_> = row.keys().map(String::as_str).collect();
        assert_eq!(keys, REPORT_FIELDS);
    }

    #[test]
    fn empty_record_maps_to_markers_except_topics() {
        let row = map_repo(&Map::new());
        for (key, value) in &row {
            if key == "topics" {
                assert_eq!(value, &json!(""));
            } else {
                assert_eq!(value, &json!(MISSING_FIELD), "field {key}");
            }
        }
    }

    #[test]
    fn topics_join_with_pipes_in_input_order() {
        let repo = record(json!({ "topics": ["a", "b"] }));
        assert_eq!(map_repo(&repo)["topics"], json!("a|b"));
    }

    #[test]
    fn renamed_source_fields_are_projected() {
        let repo = record(json!({
            "pushed_at": "2024-02-01T10:00:00Z",
            "size": 321,
            "open_issues": 7,
            "archived": true,
        }));
        let row = map_repo(&repo);
        assert_eq!(row["last_push"], json!("2024-02-01T10:00:00Z"));
        assert_eq!(row["size_on_disk"], json!(321));
        assert_eq!(row["issues_count"], json!(7));
        assert_eq!(row["is_archived"], json!(true));
    }

    #[test]
    fn enrichment_fields_pass_through_verbatim() {
        let repo = record(json!({
            "branches_count": 4,
            "pr_count": 2,
            "last_pr_update": "2024-03-03T03:03:03Z",
            "releases_count": 3,
            "released_releases_count": 2,
            "last_release_name": "v2.0",
            "last_release_date": "2023-06-01T00:00:00Z",
            "first_release_name": null,
            "first_release_date": null,
        }));
        let row = map_repo(&repo);
        assert_eq!(row["branches_count"], json!(4));
        assert_eq!(row["pr_count"], json!(2));
        assert_eq!(row["last_release_name"], json!("v2.0"));
        assert_eq!(row["first_release_name"], Value::Null);
    }
}
