use crate::diary::parse::natural_key;
use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use std::env;

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const DOCUMENT_MIME: &str = "application/vnd.google-apps.document";
const REQUEST_TIMEOUT_SECS: u64 = 45;
const PAGE_SIZE: u32 = 1000;

/// Metadata for one remote document as listed from the store. `path` is the
/// slash-joined chain of ancestor folder names built during the walk.
#[derive(Debug, Clone)]
pub struct RemoteDocument {
    pub id: String,
    pub name: String,
    pub path: String,
    pub created_time: Option<String>,
    pub modified_time: Option<String>,
}

/// Boundary to the remote document store. The orchestrator only needs a
/// recursive listing and plain-text export; credential acquisition stays
/// outside this crate (a bearer token is taken as given).
pub trait DocumentSource {
    fn list_documents(&self, folder_id: &str) -> Result<Vec<RemoteDocument>>;
    fn export_text(&self, document_id: &str) -> Result<String>;
}

pub struct DriveClient {
    http: Client,
    token: String,
}

#[derive(Debug, Deserialize)]
struct DriveItem {
    id: String,
    name: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
    #[serde(rename = "createdTime", default)]
    created_time: Option<String>,
    #[serde(rename = "modifiedTime", default)]
    modified_time: Option<String>,
}

impl DriveClient {
    pub fn from_env() -> Result<Self> {
        let token = env::var("GOOGLE_OAUTH_TOKEN")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                anyhow!("GOOGLE_OAUTH_TOKEN is not set; export a Drive read-only OAuth token")
            })?;

        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http, token })
    }

    fn list_children(&self, folder_id: &str) -> Result<Vec<DriveItem>> {
        let query = format!("'{folder_id}' in parents and trashed=false");
        let response = self
            .http
            .get(DRIVE_FILES_URL)
            .bearer_auth(&self.token)
            .query(&[
                ("q", query.as_str()),
                (
                    "fields",
                    "files(id, name, mimeType, createdTime, modifiedTime)",
                ),
                ("pageSize", &PAGE_SIZE.to_string()),
            ])
            .send()
            .context("drive listing request failed")?;
        if !response.status().is_success() {
            anyhow::bail!("drive listing failed with status {}", response.status());
        }

        let json: Value = response.json()?;
        let files = json
            .get("files")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));
        let mut items: Vec<DriveItem> =
            serde_json::from_value(files).context("drive listing payload malformed")?;
        items.sort_by(|a, b| natural_key(&a.name).cmp(&natural_key(&b.name)));
        Ok(items)
    }

    fn walk(&self, folder_id: &str, current_path: &str, out: &mut Vec<RemoteDocument>) -> Result<()> {
        for item in self.list_children(folder_id)? {
            let item_path = if current_path.is_empty() {
                item.name.clone()
            } else {
                format!("{current_path}/{}", item.name)
            };

            if item.mime_type == FOLDER_MIME {
                println!("Scanning folder: {item_path}");
                self.walk(&item.id, &item_path, out)?;
            } else if item.mime_type == DOCUMENT_MIME {
                out.push(RemoteDocument {
                    id: item.id,
                    name: item.name,
                    path: item_path,
                    created_time: item.created_time,
                    modified_time: item.modified_time,
                });
            }
        }
        Ok(())
    }
}

impl DocumentSource for DriveClient {
    fn list_documents(&self, folder_id: &str) -> Result<Vec<RemoteDocument>> {
        let mut out = Vec::new();
        self.walk(folder_id, "", &mut out)?;
        Ok(out)
    }

    fn export_text(&self, document_id: &str) -> Result<String> {
        let url = format!("{DRIVE_FILES_URL}/{document_id}/export");
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("mimeType", "text/plain")])
            .send()
            .with_context(|| format!("drive export request failed for {document_id}"))?;
        if !response.status().is_success() {
            anyhow::bail!(
                "drive export for {document_id} failed with status {}",
                response.status()
            );
        }
        Ok(response.text()?)
    }
}
