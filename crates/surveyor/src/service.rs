use std::cmp::Reverse;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use common::config::AppConfig;
use common::time::{missing_stamp, normalize_timestamp};
use gh_client::GithubClient;
use report::{map_repo, write_csv, write_json};
use serde_json::{json, Map, Value};
use tracing::{info, instrument};

pub const ALL_REPOS_FILE: &str = "all_repos.json";
pub const INTERESTING_REPOS_FILE: &str = "interesting_repos.json";
pub const REPORT_JSON_FILE: &str = "interesting_data.json";
pub const REPORT_CSV_FILE: &str = "interesting_data.csv";

/// Stands in for a missing repository name so the enrichment requests and
/// progress logs stay well-formed.
const UNNAMED_REPO: &str = "NONAME";

pub struct Surveyor<C: GithubClient + 'static> {
    config: AppConfig,
    client: Arc<C>,
}

#[derive(Debug)]
pub struct SurveyOutcome {
    pub total_repos: usize,
    pub interesting_repos: usize,
}

impl<C: GithubClient + 'static> Surveyor<C> {
    pub fn new(config: AppConfig, client: Arc<C>) -> Self {
        Self { config, client }
    }

    /// Fetches the organization listing, filters it by the configured topic,
    /// enriches every match, and writes all four report files.
    ///
    /// Repositories are enriched one at a time, in listing order. Any fetch
    /// or parse failure aborts the run before a single file is written.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<SurveyOutcome> {
        let org = &self.config.survey.org;
        let topic = &self.config.survey.topic;

        let org_record = self
            .client
            .fetch_org(org)
            .await
            .with_context(|| format!("fetching organization {org}"))?;
        info!(
            org = %org,
            public_repos = org_record.get("public_repos").and_then(serde_json::Value::as_u64),
            topic = %topic,
            "surveying organization"
        );

        let all_repos = self
            .client
            .list_org_repos(org)
            .await
            .context("listing organization repositories")?;
        let total_repos = all_repos.len();

        // Filtered records are clones: enrichment mutates them, while the
        // raw listing is written out untouched.
        let mut interesting: Vec<Map<String, Value>> = all_repos
            .iter()
            .filter_map(Value::as_object)
            .filter(|repo| has_topic(repo, topic))
            .cloned()
            .collect();
        info!(
            total = total_repos,
            interesting = interesting.len(),
            "filtered repository listing"
        );

        for repo in &mut interesting {
            self.enrich_repo(repo).await?;
        }

        let rows: Vec<Map<String, Value>> = interesting.iter().map(map_repo).collect();

        let out_dir = &self.config.output.dir;
        write_json(out_dir.join(ALL_REPOS_FILE), &Value::Array(all_repos)).await?;
        write_json(out_dir.join(INTERESTING_REPOS_FILE), &to_array(&interesting)).await?;
        write_json(out_dir.join(REPORT_JSON_FILE), &to_array(&rows)).await?;
        write_csv(out_dir.join(REPORT_CSV_FILE), &rows).await?;
        info!(
            total = total_repos,
            interesting = interesting.len(),
            dir = %out_dir.display(),
            "survey reports written"
        );

        Ok(SurveyOutcome {
            total_repos,
            interesting_repos: interesting.len(),
        })
    }

    async fn enrich_repo(&self, repo: &mut Map<String, Value>) -> Result<()> {
        let org = &self.config.survey.org;
        let name = repo
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(UNNAMED_REPO)
            .to_string();
        info!(repo = %name, "enriching repository");

        let branches = self
            .client
            .list_branches(org, &name)
            .await
            .with_context(|| format!("listing branches for {name}"))?;
        let pulls = self
            .client
            .list_pulls(org, &name)
            .await
            .with_context(|| format!("listing pull requests for {name}"))?;
        let releases = self
            .client
            .list_releases(org, &name)
            .await
            .with_context(|| format!("listing releases for {name}"))?;
        let release_stats = derive_release_stats(&releases)
            .with_context(|| format!("deriving release stats for {name}"))?;

        repo.insert("branches_count".to_string(), json!(branches.len()));
        repo.insert("pr_count".to_string(), json!(pulls.len()));
        repo.insert(
            "last_pr_update".to_string(),
            first_field(&pulls, "updated_at"),
        );
        repo.insert("releases_count".to_string(), json!(releases.len()));
        repo.insert(
            "released_releases_count".to_string(),
            json!(release_stats.published_count),
        );
        repo.insert("last_release_name".to_string(), release_stats.last_name);
        repo.insert("last_release_date".to_string(), release_stats.last_date);
        repo.insert("first_release_name".to_string(), release_stats.first_name);
        repo.insert("first_release_date".to_string(), release_stats.first_date);
        Ok(())
    }
}

fn has_topic(repo: &Map<String, Value>, topic: &str) -> bool {
    repo.get("topics")
        .and_then(Value::as_array)
        .map_or(false, |topics| {
            topics.iter().any(|value| value.as_str() == Some(topic))
        })
}

struct ReleaseStats {
    published_count: usize,
    last_name: Value,
    last_date: Value,
    first_name: Value,
    first_date: Value,
}

/// Orders releases by normalized publish date, newest first, and picks the
/// fields the report needs off the two ends.
///
/// A release without a publish date gets the missing-date stamp, so it sorts
/// behind every published release and is left out of `published_count`. The
/// sort is stable; equal stamps keep their listing order.
fn derive_release_stats(releases: &[Value]) -> Result<ReleaseStats> {
    let mut dated: Vec<(DateTime<Utc>, &Value)> = Vec::with_capacity(releases.len());
    for release in releases {
        let stamp = normalize_timestamp(release.get("published_at").and_then(Value::as_str))?;
        dated.push((stamp, release));
    }
    dated.sort_by_key(|(stamp, _)| Reverse(*stamp));

    let published_count = dated
        .iter()
        .filter(|(stamp, _)| *stamp != missing_stamp())
        .count();
    let newest = dated.first().map(|(_, release)| *release);
    let oldest = dated.last().map(|(_, release)| *release);
    Ok(ReleaseStats {
        published_count,
        last_name: release_field(newest, "name"),
        last_date: release_field(newest, "published_at"),
        first_name: release_field(oldest, "name"),
        first_date: release_field(oldest, "published_at"),
    })
}

fn release_field(release: Option<&Value>, key: &str) -> Value {
    release
        .and_then(|item| item.get(key))
        .cloned()
        .unwrap_or(Value::Null)
}

fn first_field(items: &[Value], key: &str) -> Value {
    items
        .first()
        .and_then(|item| item.get(key))
        .cloned()
        .unwrap_or(Value::Null)
}

fn to_array(records: &[Map<String, Value>]) -> Value {
    Value::Array(records.iter().cloned().map(Value::Object).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().expect("object literal").clone()
    }

    fn release(name: &str, published_at: Option<&str>) -> Value {
        match published_at {
            Some(date) => json!({ "name": name, "published_at": date }),
            None => json!({ "name": name }),
        }
    }

    #[test]
    fn topic_filter_matches_exact_tag() {
        let records = [
            record(json!({ "name": "a", "topics": ["x"] })),
            record(json!({ "name": "b", "topics": ["y", "z"] })),
            record(json!({ "name": "c", "topics": [] })),
            record(json!({ "name": "d" })),
        ];
        let kept: Vec<_> = records
            .iter()
            .filter(|repo| has_topic(repo, "z"))
            .map(|repo| repo["name"].clone())
            .collect();
        assert_eq!(kept, vec![json!("b")]);
    }

    #[test]
    fn releases_sort_newest_first() {
        let releases = [
            release("v2", Some("2021-06-01T00:00:00Z")),
            release("v3", Some("2023-01-15T00:00:00Z")),
            release("v1", Some("2020-03-10T00:00:00Z")),
        ];
        let stats = derive_release_stats(&releases).unwrap();
        assert_eq!(stats.last_name, json!("v3"));
        assert_eq!(stats.last_date, json!("2023-01-15T00:00:00Z"));
        assert_eq!(stats.first_name, json!("v1"));
        assert_eq!(stats.first_date, json!("2020-03-10T00:00:00Z"));
    }

    #[test]
    fn unpublished_release_sorts_oldest() {
        let releases = [
            release("draft", None),
            release("v1", Some("2022-01-01T00:00:00Z")),
        ];
        let stats = derive_release_stats(&releases).unwrap();
        assert_eq!(stats.last_name, json!("v1"));
        assert_eq!(stats.first_name, json!("draft"));
        assert_eq!(stats.first_date, Value::Null);
    }

    #[test]
    fn published_count_skips_unpublished_releases() {
        let releases = [
            release("v1", Some("2021-01-01T00:00:00Z")),
            release("draft", None),
            release("v2", Some("2022-01-01T00:00:00Z")),
        ];
        let stats = derive_release_stats(&releases).unwrap();
        assert_eq!(stats.published_count, 2);
    }

    #[test]
    fn equal_publish_dates_keep_listing_order() {
        let releases = [
            release("first-listed", Some("2022-05-05T00:00:00Z")),
            release("second-listed", Some("2022-05-05T00:00:00Z")),
        ];
        let stats = derive_release_stats(&releases).unwrap();
        assert_eq!(stats.last_name, json!("first-listed"));
        assert_eq!(stats.first_name, json!("second-listed"));
    }

    #[test]
    fn no_releases_yields_null_fields() {
        let stats = derive_release_stats(&[]).unwrap();
        assert_eq!(stats.published_count, 0);
        assert_eq!(stats.last_name, Value::Null);
        assert_eq!(stats.first_date, Value::Null);
    }

    #[test]
    fn first_field_is_null_without_items() {
        assert_eq!(first_field(&[], "updated_at"), Value::Null);
        let pulls = [json!({ "updated_at": "2023-02-02T00:00:00Z" })];
        assert_eq!(first_field(&pulls, "updated_at"), json!("2023-02-02T00:00:00Z"));
    }
}
