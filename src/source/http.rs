use std::io;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::RANGE;
use reqwest::{Client, StatusCode};
use url::Url;

use super::{RangeData, RangeSource};
use crate::error::{AsarError, Result};

/// Stream-backed source issuing HTTP range requests.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    url: Url,
}

impl HttpSource {
    pub fn new(url: Url) -> Result<HttpSource> {
        HttpSource::with_client(Client::new(), url)
    }

    /// Use a preconfigured client, for timeouts, proxies or extra headers.
    pub fn with_client(client: Client, url: Url) -> Result<HttpSource> {
        match url.scheme() {
            "http" | "https" => Ok(HttpSource { client, url }),
            other => Err(AsarError::UnsupportedProtocol(other.to_string())),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Inclusive `Range` header value for `length` (> 0) bytes at `offset`.
fn range_header(offset: u64, length: u64) -> io::Result<String> {
    let last = offset.checked_add(length - 1).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("range {}+{} overflows u64", offset, length),
        )
    })?;
    Ok(format!("bytes={}-{}", offset, last))
}

#[async_trait]
impl RangeSource for HttpSource {
    async fn read_range(&self, offset: u64, length: u64) -> io::Result<RangeData> {
        if length == 0 {
            return Ok(RangeData::Stream(
                futures::stream::empty::<io::Result<bytes::Bytes>>().boxed(),
            ));
        }

        let range = range_header(offset, length)?;
        tracing::trace!(url = %self.url, %range, "http range request");
        let response = self
            .client
            .get(self.url.clone())
            .header(RANGE, range)
            .send()
            .await
            .map_err(io::Error::other)?;

        let status = response.status();
        if status != StatusCode::PARTIAL_CONTENT {
            return Err(io::Error::other(format!(
                "expected 206 Partial Content from {}, got {}",
                self.url, status
            )));
        }

        Ok(RangeData::Stream(
            response
                .bytes_stream()
                .map_err(io::Error::other)
                .boxed(),
        ))
    }
}
