use super::{DriveFile, FileDirectory, FolderHandle, RemoteFile, FOLDER_MIME_TYPE};
use crate::auth::TokenSource;
use crate::config::DriveConfig;
use crate::error::DriveError;
use log::debug;
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

/// Blocking client for the Drive v3 REST API.
#[derive(Clone)]
pub struct DriveClient {
    inner: Rc<ClientInner>,
}

struct ClientInner {
    http: Client,
    api_base: String,
    page_size: u32,
    tokens: TokenSource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FolderMetadata {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    trashed: bool,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

impl DriveClient {
    pub fn new(config: &DriveConfig, tokens: TokenSource) -> Result<Self, DriveError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("drivesort/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Rc::new(ClientInner {
                http,
                api_base: config.api_base.trim_end_matches('/').to_string(),
                page_size: config.page_size,
                tokens,
            }),
        })
    }

    fn file_url(&self, id: &str) -> String {
        format!("{}/files/{}", self.inner.api_base, urlencoding::encode(id))
    }

    fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, DriveError> {
        let token = self.inner.tokens.access_token(&self.inner.http)?;
        let response = request.bearer_auth(token).send()?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(DriveError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        Ok(response.json()?)
    }

    fn fetch_page(&self, query: &str, page_token: Option<&str>) -> Result<FileList, DriveError> {
        let page_size = self.inner.page_size.to_string();
        let mut params = vec![
            ("q", query),
            ("fields", "nextPageToken,files(id,name,parents)"),
            ("pageSize", page_size.as_str()),
            ("supportsAllDrives", "true"),
            ("includeItemsFromAllDrives", "true"),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        debug!("Fetching search page (token: {:?})", page_token);
        let request = self
            .inner
            .http
            .get(format!("{}/files", self.inner.api_base))
            .query(&params);

        self.execute(request)
    }
}

impl FileDirectory for DriveClient {
    type File = DriveFile;
    type Files = SearchResults;

    fn search(&self, query: &str) -> Result<SearchResults, DriveError> {
        let first = self
            .fetch_page(query, None)
            .map_err(|e| DriveError::Search(e.to_string()))?;

        Ok(SearchResults {
            client: self.clone(),
            query: query.to_string(),
            buffered: first.files.into(),
            next_page_token: first.next_page_token,
            finished: false,
        })
    }

    fn resolve_folder(&self, id: &str) -> Result<FolderHandle, DriveError> {
        let request = self
            .inner
            .http
            .get(self.file_url(id))
            .query(&[("fields", "id,name,mimeType,trashed"), ("supportsAllDrives", "true")]);

        let metadata: FolderMetadata = self.execute(request).map_err(|e| DriveError::Resolution {
            id: id.to_string(),
            reason: e.to_string(),
        })?;

        if metadata.mime_type != FOLDER_MIME_TYPE {
            return Err(DriveError::Resolution {
                id: id.to_string(),
                reason: format!("not a folder ({})", metadata.mime_type),
            });
        }
        if metadata.trashed {
            return Err(DriveError::Resolution {
                id: id.to_string(),
                reason: "folder is in the trash".to_string(),
            });
        }

        Ok(FolderHandle {
            id: metadata.id,
            name: metadata.name,
        })
    }

    fn move_file(&self, file: &DriveFile, folder: &FolderHandle) -> Result<(), DriveError> {
        let remove_parents = file.parents().join(",");
        let request = self
            .inner
            .http
            .patch(self.file_url(file.id()))
            .query(&[
                ("addParents", folder.id.as_str()),
                ("removeParents", remove_parents.as_str()),
                ("supportsAllDrives", "true"),
                ("fields", "id,parents"),
            ])
            .json(&serde_json::json!({}));

        let _: serde_json::Value = self.execute(request).map_err(|e| DriveError::Move {
            id: file.id().to_string(),
            reason: e.to_string(),
        })?;

        Ok(())
    }
}

/// Lazily paged search results. Later pages are requested only once the
/// buffered page runs out; after an error the sequence ends.
pub struct SearchResults {
    client: DriveClient,
    query: String,
    buffered: VecDeque<DriveFile>,
    next_page_token: Option<String>,
    finished: bool,
}

impl Iterator for SearchResults {
    type Item = Result<DriveFile, DriveError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(file) = self.buffered.pop_front() {
                return Some(Ok(file));
            }

            if self.finished {
                return None;
            }

            let token = match self.next_page_token.take() {
                Some(token) => token,
                None => {
                    self.finished = true;
                    return None;
                }
            };

            match self.client.fetch_page(&self.query, Some(&token)) {
                Ok(page) => {
                    self.buffered = page.files.into();
                    self.next_page_token = page.next_page_token;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(DriveError::Enumeration(e.to_string())));
                }
            }
        }
    }
}

fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => parsed.error.message,
        _ if body.trim().is_empty() => "empty response body".to_string(),
        _ => body.trim().to_string(),
    }
}
