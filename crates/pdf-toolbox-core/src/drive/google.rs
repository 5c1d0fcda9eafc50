use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::DriveConfig;
use crate::error::{Error, Result};
use super::traits::{DriveApi, DriveCredentials, DriveFolder, DriveUpload, UploadedFile};

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";

/// Access to files created or opened by this app only
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
const ROOT_FOLDERS_QUERY: &str =
    "mimeType='application/vnd.google-apps.folder' and trashed=false and 'root' in parents";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFolder>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileResource {
    id: String,
    name: String,
    #[serde(default)]
    web_view_link: Option<String>,
}

/// Google Drive v3 client using the OAuth2 web-server flow.
pub struct GoogleDrive {
    client: Client,
    config: DriveConfig,
}

impl GoogleDrive {
    pub fn new(config: DriveConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::DriveRequest(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn ensure_configured(&self) -> Result<()> {
        if self.config.is_configured() {
            Ok(())
        } else {
            Err(Error::DriveNotConfigured)
        }
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .client
            .post(TOKEN_URL)
            .form(params)
            .send()
            .await
            .map_err(|e| Error::DriveRequest(e.to_string()))?;

        if matches!(response.status(), StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED) {
            let body = response.text().await.unwrap_or_default();
            warn!("Token request rejected: {}", body);
            return Err(Error::DriveUnauthorized);
        }
        check_status(response)
            .await?
            .json::<TokenResponse>()
            .await
            .map_err(|e| Error::DriveInvalidResponse(e.to_string()))
    }

    /// Replace the access token using the refresh token.
    async fn refresh(&self, credentials: &mut DriveCredentials) -> Result<()> {
        let Some(refresh_token) = credentials.refresh_token.clone() else {
            return Err(Error::DriveUnauthorized);
        };
        debug!("Refreshing Drive access token");

        let token = self
            .request_token(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .await?;

        credentials.access_token = token.access_token;
        if token.refresh_token.is_some() {
            credentials.refresh_token = token.refresh_token;
        }
        Ok(())
    }

    /// Send a request with the access token, refreshing it once on 401.
    async fn send_authorized<F>(&self, credentials: &mut DriveCredentials, build: F) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        let send = |token: String| {
            build(&self.client)
                .bearer_auth(token)
                .send()
        };

        let response = send(credentials.access_token.clone())
            .await
            .map_err(|e| Error::DriveRequest(e.to_string()))?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return check_status(response).await;
        }

        self.refresh(credentials).await?;
        let response = send(credentials.access_token.clone())
            .await
            .map_err(|e| Error::DriveRequest(e.to_string()))?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(Error::DriveUnauthorized);
        }
        check_status(response).await
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!("Drive API error: {} - {}", status, body);
    Err(Error::DriveRequest(format!("HTTP {status}: {body}")))
}

/// Build a `multipart/related` body with JSON metadata followed by the media.
fn multipart_related(boundary: &str, metadata: &serde_json::Value, mime_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 512);
    body.extend_from_slice(format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n").as_bytes());
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{boundary}\r\nContent-Type: {mime_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

#[async_trait]
impl DriveApi for GoogleDrive {
    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    fn authorization_url(&self, state: &str) -> Result<String> {
        self.ensure_configured()?;
        Ok(format!(
            "{AUTH_URL}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}&access_type=offline&include_granted_scopes=true&prompt=consent",
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(DRIVE_SCOPE),
            urlencoding::encode(state),
        ))
    }

    async fn exchange_code(&self, code: &str) -> Result<DriveCredentials> {
        self.ensure_configured()?;
        let token = self
            .request_token(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .await?;

        info!("Connected to Google Drive");
        Ok(DriveCredentials {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            scopes: token
                .scope
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_else(|| vec![DRIVE_SCOPE.to_string()]),
        })
    }

    async fn list_folders(&self, credentials: &mut DriveCredentials) -> Result<Vec<DriveFolder>> {
        let response = self
            .send_authorized(credentials, |client| {
                client.get(FILES_URL).query(&[
                    ("q", ROOT_FOLDERS_QUERY),
                    ("spaces", "drive"),
                    ("fields", "files(id, name)"),
                    ("pageSize", "50"),
                ])
            })
            .await?;

        let list: FileList = response
            .json()
            .await
            .map_err(|e| Error::DriveInvalidResponse(e.to_string()))?;
        debug!("Listed {} Drive folders", list.files.len());
        Ok(list.files)
    }

    async fn create_folder(&self, credentials: &mut DriveCredentials, name: &str) -> Result<DriveFolder> {
        let metadata = serde_json::json!({ "name": name, "mimeType": FOLDER_MIME_TYPE });
        let response = self
            .send_authorized(credentials, |client| {
                client.post(FILES_URL).query(&[("fields", "id,name")]).json(&metadata)
            })
            .await?;

        let folder: FileResource = response
            .json()
            .await
            .map_err(|e| Error::DriveInvalidResponse(e.to_string()))?;
        info!("Created Drive folder {}", folder.name);
        Ok(DriveFolder {
            id: folder.id,
            name: folder.name,
        })
    }

    async fn upload(&self, credentials: &mut DriveCredentials, file: DriveUpload) -> Result<UploadedFile> {
        let mut metadata = serde_json::json!({ "name": file.name });
        if let Some(folder_id) = file.folder_id.as_deref().filter(|id| !id.is_empty()) {
            metadata["parents"] = serde_json::json!([folder_id]);
        }

        let boundary = format!("pdf-toolbox-{}", uuid::Uuid::new_v4().simple());
        let body = bytes::Bytes::from(multipart_related(&boundary, &metadata, &file.mime_type, &file.data));
        let content_type = format!("multipart/related; boundary={boundary}");

        let response = self
            .send_authorized(credentials, |client| {
                client
                    .post(UPLOAD_URL)
                    .query(&[("uploadType", "multipart"), ("fields", "id,name,webViewLink")])
                    .header(reqwest::header::CONTENT_TYPE, content_type.as_str())
                    .body(body.clone())
            })
            .await?;

        let uploaded: FileResource = response
            .json()
            .await
            .map_err(|e| Error::DriveInvalidResponse(e.to_string()))?;
        info!("Uploaded {} to Google Drive ({} bytes)", uploaded.name, file.data.len());
        Ok(UploadedFile {
            id: uploaded.id,
            name: uploaded.name,
            link: uploaded.web_view_link,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn configured() -> GoogleDrive {
        GoogleDrive::new(DriveConfig::new("client-123", "secret", "http://localhost:5000/drive/callback")).unwrap()
    }

    #[test]
    fn test_authorization_url() {
        let url = configured().authorization_url("abc 123").unwrap();
        assert!(url.starts_with(AUTH_URL));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A5000%2Fdrive%2Fcallback"));
        assert!(url.contains("scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fdrive.file"));
        assert!(url.contains("state=abc%20123"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("include_granted_scopes=true"));
    }

    #[test]
    fn test_unconfigured() {
        let drive = GoogleDrive::new(DriveConfig::default()).unwrap();
        assert!(!drive.is_configured());
        assert!(matches!(drive.authorization_url("s"), Err(Error::DriveNotConfigured)));
    }

    #[tokio::test]
    async fn test_refresh_requires_refresh_token() {
        let mut credentials = DriveCredentials {
            access_token: "expired".to_string(),
            refresh_token: None,
            scopes: vec![],
        };
        let err = configured().refresh(&mut credentials).await.unwrap_err();
        assert!(matches!(err, Error::DriveUnauthorized));
    }

    #[test]
    fn test_multipart_related_body() {
        let metadata = serde_json::json!({ "name": "a.pdf" });
        let body = multipart_related("BOUND", &metadata, "application/pdf", b"%PDF-1.5");
        let text = String::from_utf8(body).unwrap();

        assert!(text.starts_with("--BOUND\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{\"name\":\"a.pdf\"}"));
        assert!(text.contains("\r\n--BOUND\r\nContent-Type: application/pdf\r\n\r\n%PDF-1.5"));
        assert!(text.ends_with("\r\n--BOUND--\r\n"));
    }

    #[test]
    fn test_parse_file_resource() {
        let json = r#"{"id":"f1","name":"merged.pdf","webViewLink":"https://drive.google.com/file/d/f1/view"}"#;
        let file: FileResource = serde_json::from_str(json).unwrap();
        assert_eq!(file.id, "f1");
        assert_eq!(file.web_view_link.as_deref(), Some("https://drive.google.com/file/d/f1/view"));

        let list: FileList = serde_json::from_str(r#"{"files":[{"id":"d1","name":"Docs"}]}"#).unwrap();
        assert_eq!(list.files, vec![DriveFolder { id: "d1".into(), name: "Docs".into() }]);
    }
}
