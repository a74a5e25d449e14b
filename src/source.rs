use std::fs;
use std::io::{ErrorKind, Read};
use std::time::Duration;

use flate2::read::GzDecoder;
use reqwest::{StatusCode, Url};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::Location;
use crate::error::KiraError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    Found(Vec<u8>),
    NotFound,
}

pub trait DataSource: Send + Sync {
    fn fetch(&self, location: &Location) -> Result<Fetched, KiraError>;
}

pub fn fetch_text(
    source: &dyn DataSource,
    location: &Location,
) -> Result<Option<String>, KiraError> {
    let bytes = match source.fetch(location)? {
        Fetched::Found(bytes) => bytes,
        Fetched::NotFound => return Ok(None),
    };
    let bytes = if location.is_gzip() {
        let mut decoded = Vec::new();
        GzDecoder::new(bytes.as_slice())
            .read_to_end(&mut decoded)
            .map_err(|err| KiraError::unavailable(location, format!("gzip: {err}")))?;
        decoded
    } else {
        bytes
    };
    String::from_utf8(bytes)
        .map(Some)
        .map_err(|err| KiraError::unavailable(location, err))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSource;

impl DataSource for LocalSource {
    fn fetch(&self, location: &Location) -> Result<Fetched, KiraError> {
        let Location::Local(path) = location else {
            return Err(KiraError::unavailable(
                location,
                "remote locations need an HTTP source",
            ));
        };
        match fs::read(path.as_std_path()) {
            Ok(bytes) => Ok(Fetched::Found(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Fetched::NotFound),
            Err(err) => Err(KiraError::unavailable(location, err)),
        }
    }
}

#[derive(Clone)]
pub struct HttpSource {
    client: Client,
    local: LocalSource,
}

impl HttpSource {
    pub fn new() -> Result<Self, KiraError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kira-cs/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| KiraError::RemoteHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| KiraError::RemoteHttp(err.to_string()))?;
        Ok(Self {
            client,
            local: LocalSource,
        })
    }
}

impl DataSource for HttpSource {
    fn fetch(&self, location: &Location) -> Result<Fetched, KiraError> {
        let url = match location {
            Location::Local(_) => return self.local.fetch(location),
            Location::Remote(url) => url,
        };
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| KiraError::RemoteHttp(err.to_string()))?;
        if status_means_missing(url, response.status()) {
            return Ok(Fetched::NotFound);
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "remote storage request failed".to_string());
            return Err(KiraError::RemoteStatus { status, message });
        }
        let bytes = response
            .bytes()
            .map_err(|err| KiraError::RemoteHttp(err.to_string()))?;
        Ok(Fetched::Found(bytes.to_vec()))
    }
}

/// S3 answers 403 rather than 404 for absent keys when the caller may not
/// list the bucket.
fn status_means_missing(url: &str, status: StatusCode) -> bool {
    match status {
        StatusCode::NOT_FOUND => true,
        StatusCode::FORBIDDEN => Url::parse(url)
            .ok()
            .and_then(|url| url.host_str().map(is_s3_host))
            .unwrap_or(false),
        _ => false,
    }
}

fn is_s3_host(host: &str) -> bool {
    host.ends_with(".amazonaws.com") && (host.contains(".s3.") || host.starts_with("s3."))
}
