//! Live Jira adapter for the `IssueTracker` port.
//!
//! Talks to the Jira REST v2 API with blocking requests and basic auth.
//! Project vocabulary reads go through the injected response cache; the
//! engine core never knows the cache exists.

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::config::TrackerSettings;
use crate::error::PortError;
use crate::ports::{
    FieldDelta, Issue, IssueTracker, NewIssue, ProjectMetadata, RemoteLink, ResponseCache,
    Transition,
};

const SEARCH_FIELDS: &str =
    "summary,description,status,priority,resolution,issuetype,labels,versions,fixVersions,assignee,project";
const PAGE_SIZE: usize = 50;

/// Tracker adapter backed by one Jira instance.
pub struct JiraTracker {
    base_url: String,
    user: String,
    token: String,
    client: Client,
    cache: Box<dyn ResponseCache>,
}

impl JiraTracker {
    /// Creates an adapter from connection settings and a resolved API token.
    #[must_use]
    pub fn new(settings: &TrackerSettings, token: String, cache: Box<dyn ResponseCache>) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            user: settings.user.clone(),
            token,
            client: Client::new(),
            cache,
        }
    }

    fn get_text(&self, path: &str) -> Result<String, PortError> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .basic_auth(&self.user, Some(&self.token))
            .header("Accept", "application/json")
            .send()?
            .error_for_status()?;
        Ok(response.text()?)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, PortError> {
        Ok(serde_json::from_str(&self.get_text(path)?)?)
    }

    fn get_json_cached<T: DeserializeOwned>(&self, path: &str) -> Result<T, PortError> {
        let body = self.cache.get_or_fetch(path, &mut || self.get_text(path))?;
        Ok(serde_json::from_str(&body)?)
    }

    fn send_json(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::blocking::Response, PortError> {
        let response = self
            .client
            .request(method, format!("{}{path}", self.base_url))
            .basic_auth(&self.user, Some(&self.token))
            .header("Accept", "application/json")
            .json(body)
            .send()?
            .error_for_status()?;
        Ok(response)
    }
}

#[derive(Deserialize)]
struct Named {
    name: String,
}

#[derive(Deserialize)]
struct Keyed {
    key: String,
}

#[derive(Deserialize)]
struct JiraUser {
    name: String,
}

#[derive(Deserialize)]
struct JiraFields {
    summary: Option<String>,
    description: Option<String>,
    status: Option<Named>,
    priority: Option<Named>,
    resolution: Option<Named>,
    issuetype: Option<Named>,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    versions: Vec<Named>,
    #[serde(default, rename = "fixVersions")]
    fix_versions: Vec<Named>,
    assignee: Option<JiraUser>,
    project: Option<Keyed>,
}

#[derive(Deserialize)]
struct JiraIssue {
    id: String,
    key: String,
    fields: JiraFields,
}

impl From<JiraIssue> for Issue {
    fn from(raw: JiraIssue) -> Self {
        Self {
            id: raw.id,
            key: raw.key,
            project_key: raw.fields.project.map(|p| p.key).unwrap_or_default(),
            summary: raw.fields.summary,
            description: raw.fields.description,
            status: raw.fields.status.map(|s| s.name),
            priority: raw.fields.priority.map(|p| p.name),
            resolution: raw.fields.resolution.map(|r| r.name),
            issue_type: raw.fields.issuetype.map(|t| t.name),
            labels: raw.fields.labels,
            versions: raw.fields.versions.into_iter().map(|v| v.name).collect(),
            fix_versions: raw.fields.fix_versions.into_iter().map(|v| v.name).collect(),
            assignee: raw.fields.assignee.map(|a| a.name),
        }
    }
}

#[derive(Deserialize)]
struct SearchPage {
    total: usize,
    issues: Vec<JiraIssue>,
}

#[derive(Deserialize)]
struct JiraProject {
    key: String,
    #[serde(default, rename = "issueTypes")]
    issue_types: Vec<Named>,
    #[serde(default)]
    versions: Vec<Named>,
    #[serde(default)]
    components: Vec<Named>,
}

#[derive(Deserialize)]
struct LinkObject {
    url: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Deserialize)]
struct JiraRemoteLink {
    object: Option<LinkObject>,
}

#[derive(Deserialize)]
struct JiraTransition {
    id: String,
    name: String,
    to: Named,
}

#[derive(Deserialize)]
struct TransitionsResponse {
    #[serde(default)]
    transitions: Vec<JiraTransition>,
}

#[derive(Deserialize)]
struct CreatedIssue {
    key: String,
}

fn names(raw: Vec<Named>) -> Vec<String> {
    raw.into_iter().map(|n| n.name).collect()
}

/// Builds the `fields` object of an update or transition request.
fn delta_fields(delta: &FieldDelta) -> serde_json::Value {
    let mut fields = serde_json::Map::new();
    if let Some(description) = &delta.description {
        fields.insert("description".to_string(), json!(description));
    }
    if let Some(priority) = &delta.priority {
        fields.insert("priority".to_string(), json!({ "name": priority }));
    }
    if let Some(resolution) = &delta.resolution {
        fields.insert("resolution".to_string(), json!({ "name": resolution }));
    }
    if let Some(labels) = &delta.labels {
        fields.insert("labels".to_string(), json!(labels));
    }
    if let Some(versions) = &delta.versions {
        let named: Vec<_> = versions.iter().map(|v| json!({ "name": v })).collect();
        fields.insert("versions".to_string(), json!(named));
    }
    if let Some(fix_versions) = &delta.fix_versions {
        let named: Vec<_> = fix_versions.iter().map(|v| json!({ "name": v })).collect();
        fields.insert("fixVersions".to_string(), json!(named));
    }
    if let Some(assignee) = &delta.assignee {
        fields.insert("assignee".to_string(), json!({ "name": assignee }));
    }
    serde_json::Value::Object(fields)
}

/// Builds the `fields` object of a create request.
fn create_fields(new_issue: &NewIssue) -> serde_json::Value {
    let mut fields = serde_json::Map::new();
    fields.insert("project".to_string(), json!({ "key": new_issue.project_key }));
    fields.insert("issuetype".to_string(), json!({ "name": new_issue.issue_type }));
    fields.insert("summary".to_string(), json!(new_issue.summary));
    if let Some(description) = &new_issue.description {
        fields.insert("description".to_string(), json!(description));
    }
    if let Some(priority) = &new_issue.priority {
        fields.insert("priority".to_string(), json!({ "name": priority }));
    }
    if !new_issue.labels.is_empty() {
        fields.insert("labels".to_string(), json!(new_issue.labels));
    }
    if !new_issue.versions.is_empty() {
        let named: Vec<_> = new_issue.versions.iter().map(|v| json!({ "name": v })).collect();
        fields.insert("versions".to_string(), json!(named));
    }
    if !new_issue.fix_versions.is_empty() {
        let named: Vec<_> =
            new_issue.fix_versions.iter().map(|v| json!({ "name": v })).collect();
        fields.insert("fixVersions".to_string(), json!(named));
    }
    serde_json::Value::Object(fields)
}

impl IssueTracker for JiraTracker {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn search_issues(&self, filter_id: &str) -> Result<Vec<Issue>, PortError> {
        let mut issues = Vec::new();
        loop {
            let path = format!(
                "/rest/api/2/search?jql=filter%3D{filter_id}&startAt={}&maxResults={PAGE_SIZE}&fields={SEARCH_FIELDS}",
                issues.len()
            );
            let page: SearchPage = self.get_json(&path)?;
            let fetched = page.issues.len();
            issues.extend(page.issues.into_iter().map(Issue::from));
            if fetched == 0 || issues.len() >= page.total {
                break;
            }
        }
        Ok(issues)
    }

    fn fetch_issue(&self, key: &str) -> Result<Option<Issue>, PortError> {
        let response = self
            .client
            .get(format!(
                "{}/rest/api/2/issue/{key}?fields={SEARCH_FIELDS}",
                self.base_url
            ))
            .basic_auth(&self.user, Some(&self.token))
            .header("Accept", "application/json")
            .send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let raw: JiraIssue = response.error_for_status()?.json()?;
        Ok(Some(raw.into()))
    }

    fn project_metadata(&self, project_key: &str) -> Result<ProjectMetadata, PortError> {
        let project: JiraProject =
            self.get_json_cached(&format!("/rest/api/2/project/{project_key}"))?;
        // Priorities and resolutions are instance-global in Jira.
        let priorities: Vec<Named> = self.get_json_cached("/rest/api/2/priority")?;
        let resolutions: Vec<Named> = self.get_json_cached("/rest/api/2/resolution")?;
        Ok(ProjectMetadata {
            key: project.key,
            issue_types: names(project.issue_types),
            priorities: names(priorities),
            resolutions: names(resolutions),
            versions: names(project.versions),
            components: names(project.components),
        })
    }

    fn outbound_links(&self, key: &str) -> Result<Vec<RemoteLink>, PortError> {
        let raw: Vec<JiraRemoteLink> =
            self.get_json(&format!("/rest/api/2/issue/{key}/remotelink"))?;
        Ok(raw
            .into_iter()
            .filter_map(|link| link.object)
            .map(|object| RemoteLink { url: object.url, title: object.title.unwrap_or_default() })
            .collect())
    }

    fn add_link(&self, key: &str, url: &str, title: &str) -> Result<(), PortError> {
        let body = json!({ "object": { "url": url, "title": title } });
        self.send_json(reqwest::Method::POST, &format!("/rest/api/2/issue/{key}/remotelink"), &body)?;
        Ok(())
    }

    fn available_transitions(&self, key: &str) -> Result<Vec<Transition>, PortError> {
        let response: TransitionsResponse =
            self.get_json(&format!("/rest/api/2/issue/{key}/transitions?expand=transitions.fields"))?;
        Ok(response
            .transitions
            .into_iter()
            .map(|t| Transition { id: t.id, name: t.name, to_status: t.to.name })
            .collect())
    }

    fn create_issue(&self, new_issue: &NewIssue) -> Result<Issue, PortError> {
        let body = json!({ "fields": create_fields(new_issue) });
        let created: CreatedIssue =
            self.send_json(reqwest::Method::POST, "/rest/api/2/issue", &body)?.json()?;
        self.fetch_issue(&created.key)?
            .ok_or_else(|| format!("created issue {} could not be fetched back", created.key).into())
    }

    fn update_issue(&self, key: &str, fields: &FieldDelta) -> Result<(), PortError> {
        let body = json!({ "fields": delta_fields(fields) });
        self.send_json(reqwest::Method::PUT, &format!("/rest/api/2/issue/{key}"), &body)?;
        Ok(())
    }

    fn transition_issue(
        &self,
        key: &str,
        transition_id: &str,
        fields: &FieldDelta,
    ) -> Result<(), PortError> {
        let mut body = serde_json::Map::new();
        body.insert("transition".to_string(), json!({ "id": transition_id }));
        if !fields.is_empty() {
            body.insert("fields".to_string(), delta_fields(fields));
        }
        self.send_json(
            reqwest::Method::POST,
            &format!("/rest/api/2/issue/{key}/transitions"),
            &serde_json::Value::Object(body),
        )?;
        Ok(())
    }

    fn current_user(&self) -> Result<String, PortError> {
        let me: JiraUser = self.get_json("/rest/api/2/myself")?;
        Ok(me.name)
    }
}
