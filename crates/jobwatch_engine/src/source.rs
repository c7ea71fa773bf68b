use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::time::Duration;

use jobwatch_core::{AnalysisStatus, JobId, JobItem, Page, PageRequest};
use jobwatch_logging::{watch_debug, watch_warn};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::{FailureKind, FetchError};

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Sent as `Authorization: Bearer <token>` on every request.
    pub bearer_token: Option<String>,
    /// Resource key -> endpoint path, relative to `base_url`.
    pub endpoints: BTreeMap<String, String>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            bearer_token: None,
            endpoints: BTreeMap::from([
                ("analyses".to_string(), "/analyses/".to_string()),
                ("alerts".to_string(), "/alerts/".to_string()),
            ]),
        }
    }
}

/// Where the paginated query cache gets its pages from.
#[async_trait::async_trait]
pub trait PageSource<T>: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<T>, FetchError>;
}

/// Thin HTTP client for the analysis server's JSON API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
    bearer_token: Option<String>,
    endpoints: BTreeMap<String, String>,
}

impl ApiClient {
    pub fn new(settings: SourceSettings) -> Result<Self, FetchError> {
        let mut base = settings.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            client,
            base_url,
            bearer_token: settings.bearer_token,
            endpoints: settings.endpoints,
        })
    }

    /// Route of a job's detail resource.
    pub fn detail_route(job_id: &JobId) -> String {
        format!("/analyses/{job_id}")
    }

    fn resolve(&self, path: &str) -> Result<Url, FetchError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    fn page_url(&self, request: &PageRequest) -> Result<Url, FetchError> {
        let path = self
            .endpoints
            .get(request.resource_key.as_str())
            .ok_or_else(|| {
                FetchError::new(
                    FailureKind::UnknownResource,
                    format!("no endpoint configured for {}", request.resource_key),
                )
            })?;
        let mut url = self.resolve(path)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("page", &request.page.to_string());
            query.append_pair("size", &request.page_size.to_string());
            for (name, value) in &request.filters {
                query.append_pair(name, value);
            }
        }
        Ok(url)
    }

    pub async fn get_json<W: DeserializeOwned>(&self, url: Url) -> Result<W, FetchError> {
        watch_debug!("GET {}", url);
        let mut builder = self.client.get(url);
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FetchError::new(
                FailureKind::Unauthorized(status.as_u16()),
                status.to_string(),
            ));
        }
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let body = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&body)
            .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))
    }

    pub async fn fetch_wire_page<W: DeserializeOwned>(
        &self,
        request: &PageRequest,
    ) -> Result<Page<W>, FetchError> {
        let url = self.page_url(request)?;
        let wire: WirePage<W> = self.get_json(url).await?;
        let page = Page::new(wire.items, wire.total, wire.page, wire.size);
        if wire.pages.is_some_and(|pages| pages != page.total_pages) {
            watch_debug!(
                "Server page count {:?} disagrees with computed {} for {}",
                wire.pages,
                page.total_pages,
                request
            );
        }
        Ok(page)
    }

    pub async fn analysis_detail(&self, job_id: &JobId) -> Result<AnalysisDetail, FetchError> {
        let url = self.resolve(&Self::detail_route(job_id))?;
        self.get_json(url).await
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return FetchError::new(FailureKind::Decode, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

/// Paginated envelope returned by every list endpoint.
#[derive(Debug, Deserialize)]
struct WirePage<W> {
    items: Vec<W>,
    total: u64,
    page: u32,
    size: u32,
    #[serde(default)]
    pages: Option<u32>,
}

/// Serves pages of raw wire records.
pub struct WireSource<W> {
    client: ApiClient,
    _record: PhantomData<fn() -> W>,
}

impl<W> WireSource<W> {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            _record: PhantomData,
        }
    }
}

#[async_trait::async_trait]
impl<W> PageSource<W> for WireSource<W>
where
    W: DeserializeOwned + Send + Sync + 'static,
{
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<W>, FetchError> {
        self.client.fetch_wire_page(request).await
    }
}

/// A wire record that describes a job with an evolving status.
pub trait IntoJobItem {
    type Status;

    fn into_job_item(self) -> JobItem<Self::Status>;
}

/// Serves pages of job items decoded from wire records of type `W`.
pub struct JobListSource<W> {
    inner: WireSource<W>,
}

impl<W> JobListSource<W> {
    pub fn new(client: ApiClient) -> Self {
        Self {
            inner: WireSource::new(client),
        }
    }
}

#[async_trait::async_trait]
impl<W> PageSource<JobItem<W::Status>> for JobListSource<W>
where
    W: IntoJobItem + DeserializeOwned + Send + Sync + 'static,
    W::Status: Send + Sync + 'static,
{
    async fn fetch_page(
        &self,
        request: &PageRequest,
    ) -> Result<Page<JobItem<W::Status>>, FetchError> {
        let page = self.inner.fetch_page(request).await?;
        Ok(page.map(W::into_job_item))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileSummary {
    pub file_name: String,
    #[serde(default)]
    pub file_size: f64,
    #[serde(default)]
    pub file_hash: String,
}

/// Row of the analyses list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalysisSummary {
    pub id: String,
    #[serde(default)]
    pub file_id: String,
    /// Kept loose so an unexpected value degrades to an unknown status
    /// instead of failing the whole page.
    #[serde(default)]
    pub status: Option<serde_json::Value>,
    #[serde(default)]
    pub total_packets: u64,
    #[serde(default)]
    pub total_streams: u64,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub analyzed_at: Option<String>,
    #[serde(default)]
    pub file: Option<FileSummary>,
}

impl AnalysisSummary {
    pub fn parsed_status(&self) -> Option<AnalysisStatus> {
        let raw = self.status.as_ref()?;
        match raw.as_str().map(str::parse::<AnalysisStatus>) {
            Some(Ok(status)) => Some(status),
            _ => {
                watch_warn!("Analysis {} has unrecognised status {}", self.id, raw);
                None
            }
        }
    }

    pub fn display_label(&self) -> String {
        match &self.file {
            Some(file) if !file.file_name.is_empty() => file.file_name.clone(),
            _ => format!("Analysis {}", self.id),
        }
    }
}

impl IntoJobItem for AnalysisSummary {
    type Status = AnalysisStatus;

    fn into_job_item(self) -> JobItem<AnalysisStatus> {
        JobItem {
            status: self.parsed_status(),
            display_label: self.display_label(),
            id: JobId::new(self.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamSummary {
    pub id: String,
    pub stream_number: u64,
    #[serde(default)]
    pub preview: Option<String>,
}

/// Detail view of one analysis, fetched when the operator opens it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalysisDetail {
    #[serde(flatten)]
    pub summary: AnalysisSummary,
    #[serde(default)]
    pub streams: Vec<StreamSummary>,
}

/// Row of the alerts list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AlertSummary {
    pub id: String,
    #[serde(default)]
    pub analysis_id: Option<String>,
    pub alert_type: String,
    pub severity: String,
    #[serde(default)]
    pub src_ip: Option<String>,
    #[serde(default)]
    pub dst_ip: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub protocol: Option<String>,
}
