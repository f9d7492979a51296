//! HTTP implementation of the remote API.

use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use lockerbox_common::{ChatId, Error, MessageRecord, RemotePath, SensitiveString, ShareRecord};

use crate::model::{ChatRecord, ConversationDetail, Download, Listing, User};
use crate::outcome::{require, ApiResult, Envelope, Failure};
use crate::remote::{FileChange, RemoteApi};

/// Query value for an enabled flag.
///
/// The service tests flags for presence only, so a disabled flag is sent by
/// omitting the parameter.
const YES: &str = "yes";

/// Client for the service's REST API.
///
/// Session identity rides on a cookie kept in the client's cookie store, so
/// one `HttpApi` corresponds to one signed-in (or anonymous) client.
pub struct HttpApi {
    http: Client,
    base: Url,
}

impl HttpApi {
    /// Create a client for the API rooted at `base` (e.g. `http://host:8080/api`).
    ///
    /// # Errors
    /// - `base` cannot carry path segments
    /// - The HTTP client cannot be constructed
    pub fn new(base: Url, user_agent: &str, timeout: Duration) -> lockerbox_common::Result<Self> {
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!("'{}' cannot be used as an API base", base)));
        }

        let http = Client::builder()
            .user_agent(user_agent)
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http, base })
    }

    /// The API root this client talks to.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Build an endpoint URL from path segments below the API root.
    fn endpoint<I, S>(&self, segments: I) -> ApiResult<Url>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Failure::transport(format!("invalid API base: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Endpoint of a file path; the root maps to `files/`.
    fn file_endpoint(&self, path: &RemotePath) -> ApiResult<Url> {
        let mut segments = vec!["files".to_string()];
        if path.is_root() {
            segments.push(String::new());
        } else {
            segments.extend(path.components().iter().cloned());
        }
        self.endpoint(segments)
    }

    /// Endpoint of a share: `shares/{owner}/{path...}`.
    fn share_endpoint(&self, share: &ShareRecord) -> ApiResult<Url> {
        let segments = ["shares", share.owner.as_str()]
            .into_iter()
            .chain(share.path.split('/').filter(|s| !s.is_empty()));
        self.endpoint(segments)
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        request
            .send()
            .await
            .map_err(|e| Failure::transport(format!("failed to send request: {}", e)))
    }

    /// Send a request whose response is a JSON envelope.
    async fn send_envelope<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> ApiResult<Option<T>> {
        let response = self.send(request).await?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Failure::transport(format!("failed to read response: {}", e)))?;
        parse_envelope(status, &body)
    }

    /// Send a request whose success response is raw content.
    async fn send_binary(&self, request: RequestBuilder, path: &str) -> ApiResult<Download> {
        let response = self.send(request).await?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Failure::transport(format!("failed to read response: {}", e)))?;

        if status == StatusCode::OK {
            return Ok(Download::from_path(path, body.to_vec()));
        }

        match parse_envelope::<serde_json::Value>(status, &body) {
            Err(failure) => Err(failure),
            Ok(_) => Err(Failure::from_status(status.as_u16(), "")),
        }
    }
}

/// Normalize a response body against its status code.
///
/// A body that is not an envelope still yields a failure carrying the
/// status, so an error page from a proxy is not mistaken for a transport
/// failure.
fn parse_envelope<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> ApiResult<Option<T>> {
    match serde_json::from_slice::<Envelope<T>>(body) {
        Ok(envelope) => envelope.into_result(status.as_u16()),
        Err(e) if status.is_success() => Err(Failure::malformed(e)),
        Err(_) => Err(Failure::from_status(
            status.as_u16(),
            status.canonical_reason().unwrap_or_default(),
        )),
    }
}

#[async_trait]
impl RemoteApi for HttpApi {
    async fn register(
        &self,
        username: &str,
        password: &SensitiveString,
        name: &str,
    ) -> ApiResult<()> {
        let url = self.endpoint(["auth", "register"])?;
        debug!("POST {}", url);

        let body = serde_json::json!({
            "username": username,
            "password": password.expose(),
            "name": name,
        });
        self.send_envelope::<serde_json::Value>(self.http.post(url).json(&body))
            .await
            .map(|_| ())
    }

    async fn login(&self, username: &str, password: &SensitiveString) -> ApiResult<()> {
        let url = self.endpoint(["auth", "login"])?;
        debug!("POST {}", url);

        let body = serde_json::json!({
            "username": username,
            "password": password.expose(),
        });
        self.send_envelope::<serde_json::Value>(self.http.post(url).json(&body))
            .await
            .map(|_| ())
    }

    async fn logout(&self) -> ApiResult<()> {
        let url = self.endpoint(["auth", "logout"])?;
        debug!("GET {}", url);

        self.send_envelope::<serde_json::Value>(self.http.get(url))
            .await
            .map(|_| ())
    }

    async fn read_self(&self) -> ApiResult<User> {
        let url = self.endpoint(["user"])?;
        debug!("GET {}", url);

        require(self.send_envelope(self.http.get(url)).await?)
    }

    async fn read_user(&self, username: &str) -> ApiResult<User> {
        let url = self.endpoint(["user", username])?;
        debug!("GET {}", url);

        require(self.send_envelope(self.http.get(url)).await?)
    }

    async fn update_user(&self, name: &str, password: &SensitiveString) -> ApiResult<()> {
        let url = self.endpoint(["user"])?;
        debug!("PUT {}", url);

        let body = serde_json::json!({
            "name": name,
            "password": password.expose(),
        });
        self.send_envelope::<serde_json::Value>(self.http.put(url).json(&body))
            .await
            .map(|_| ())
    }

    async fn delete_user(&self) -> ApiResult<()> {
        let url = self.endpoint(["user"])?;
        debug!("DELETE {}", url);

        self.send_envelope::<serde_json::Value>(self.http.delete(url))
            .await
            .map(|_| ())
    }

    async fn list_chats(&self) -> ApiResult<Vec<ChatId>> {
        let url = self.endpoint(["chats"])?;
        debug!("GET {}", url);

        let ids: Vec<String> = require(self.send_envelope(self.http.get(url)).await?)?;
        ids.into_iter()
            .map(|id| ChatId::new(id).map_err(Failure::malformed))
            .collect()
    }

    async fn read_chat(&self, id: &ChatId) -> ApiResult<ConversationDetail> {
        let url = self.endpoint(["chats", id.as_str()])?;
        debug!("GET {}", url);

        let record: ChatRecord = require(self.send_envelope(self.http.get(url)).await?)?;
        Ok(record.into_detail(id.clone()))
    }

    async fn create_chat(&self, to: &str, message: &str) -> ApiResult<()> {
        let url = self.endpoint(["chats"])?;
        debug!("POST {}", url);

        let body = serde_json::json!({ "to": to, "message": message });
        self.send_envelope::<serde_json::Value>(self.http.post(url).json(&body))
            .await
            .map(|_| ())
    }

    async fn delete_chat(&self, id: &ChatId) -> ApiResult<()> {
        let url = self.endpoint(["chats", id.as_str()])?;
        debug!("DELETE {}", url);

        self.send_envelope::<serde_json::Value>(self.http.delete(url))
            .await
            .map(|_| ())
    }

    async fn list_messages(&self, id: &ChatId) -> ApiResult<Vec<MessageRecord>> {
        let url = self.endpoint(["chats", id.as_str(), "messages"])?;
        debug!("GET {}", url);

        require(self.send_envelope(self.http.get(url)).await?)
    }

    async fn send_message(&self, id: &ChatId, text: &str) -> ApiResult<()> {
        let url = self.endpoint(["chats", id.as_str(), "messages"])?;
        debug!("POST {}", url);

        let body = serde_json::json!({ "message": text });
        self.send_envelope::<serde_json::Value>(self.http.post(url).json(&body))
            .await
            .map(|_| ())
    }

    async fn read_dir(&self, path: &RemotePath) -> ApiResult<Listing> {
        let url = self.file_endpoint(path)?;
        debug!("GET {}", url);

        require(self.send_envelope(self.http.get(url)).await?)
    }

    async fn download_file(&self, path: &RemotePath) -> ApiResult<Download> {
        let url = self.file_endpoint(path)?;
        debug!("GET {} (download)", url);

        let request = self.http.get(url).query(&[("download", YES)]);
        self.send_binary(request, &path.to_string_path()).await
    }

    async fn upload_file(
        &self,
        directory: &RemotePath,
        file_name: &str,
        content: Vec<u8>,
    ) -> ApiResult<()> {
        let url = self.file_endpoint(directory)?;
        debug!("POST {} ({} bytes as '{}')", url, content.len(), file_name);

        let form = multipart::Form::new().part(
            "file",
            multipart::Part::bytes(content).file_name(file_name.to_string()),
        );
        self.send_envelope::<serde_json::Value>(self.http.post(url).multipart(form))
            .await
            .map(|_| ())
    }

    async fn create_directory(&self, path: &RemotePath) -> ApiResult<()> {
        let url = self.file_endpoint(path)?;
        debug!("POST {} (directory)", url);

        // The service only accepts multipart bodies on this route.
        let request = self
            .http
            .post(url)
            .query(&[("directory", YES)])
            .multipart(multipart::Form::new());
        self.send_envelope::<serde_json::Value>(request)
            .await
            .map(|_| ())
    }

    async fn update_file(&self, path: &RemotePath, change: &FileChange) -> ApiResult<()> {
        let url = self.file_endpoint(path)?;
        debug!("PUT {} ({:?})", url, change);

        let body = match change {
            FileChange::Rename(name) => serde_json::json!({ "filename": name, "path": "" }),
            FileChange::Move(destination) => {
                serde_json::json!({ "filename": "", "path": destination })
            }
        };
        self.send_envelope::<serde_json::Value>(self.http.put(url).json(&body))
            .await
            .map(|_| ())
    }

    async fn delete_file(&self, path: &RemotePath) -> ApiResult<()> {
        let url = self.file_endpoint(path)?;
        debug!("DELETE {}", url);

        self.send_envelope::<serde_json::Value>(self.http.delete(url))
            .await
            .map(|_| ())
    }

    async fn list_shares(&self) -> ApiResult<Vec<ShareRecord>> {
        let url = self.endpoint(["shares"])?;
        debug!("GET {}", url);

        require(self.send_envelope(self.http.get(url)).await?)
    }

    async fn create_share(&self, path: &RemotePath, to: &str) -> ApiResult<()> {
        let url = self.endpoint(["shares"])?;
        debug!("POST {}", url);

        let body = serde_json::json!({ "file": path.to_string_path(), "to": to });
        self.send_envelope::<serde_json::Value>(self.http.post(url).json(&body))
            .await
            .map(|_| ())
    }

    async fn download_share(&self, share: &ShareRecord) -> ApiResult<Download> {
        let url = self.share_endpoint(share)?;
        debug!("GET {} (download)", url);

        self.send_binary(self.http.get(url), &share.path).await
    }

    async fn describe_share(&self, share: &ShareRecord) -> ApiResult<Vec<String>> {
        let url = self.share_endpoint(share)?;
        debug!("GET {} (describe)", url);

        let request = self.http.get(url).query(&[("describe", YES)]);
        require(self.send_envelope(request).await?)
    }

    async fn delete_share(&self, share: &ShareRecord, recipient: Option<&str>) -> ApiResult<()> {
        let url = self.share_endpoint(share)?;
        debug!("DELETE {} (recipient: {:?})", url, recipient);

        let mut request = self.http.delete(url);
        if let Some(user) = recipient {
            request = request.query(&[("user", user)]);
        }
        self.send_envelope::<serde_json::Value>(request)
            .await
            .map(|_| ())
    }
}
