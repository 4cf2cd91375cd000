//! Executes `HttpRequest` values over the network with reqwest.
//!
//! # Design
//! The transport only moves bytes: it sends the request, feeds each body
//! chunk into a `BodyAccumulator` and returns the finished response or the
//! failure. It never looks at the status code or the body, leaving that to
//! the normalizer.

use log::{debug, trace, warn};
use reqwest::redirect::Policy;

use crate::error::{ClientError, TransportError};
use crate::http::{BodyAccumulator, HttpRequest, HttpResponse};

/// Proxy-aware HTTP transport. One instance serves many requests; each call
/// owns its own accumulator.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport that routes every request through `proxy` when set,
    /// and never consults proxy environment variables on its own.
    pub fn new(proxy: Option<&str>) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder().redirect(Policy::none());
        builder = match proxy {
            Some(url) => {
                let proxy = reqwest::Proxy::all(url).map_err(|err| ClientError::InvalidProxy {
                    url: url.to_string(),
                    reason: err.to_string(),
                })?;
                builder.proxy(proxy)
            }
            None => builder.no_proxy(),
        };
        let client = builder
            .build()
            .map_err(|err| ClientError::HttpClient(err.to_string()))?;
        Ok(Self { client })
    }

    /// Run one GET and collect its whole body.
    pub async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        debug!("GET {}", request.url);
        let mut response = builder.send().await.map_err(|err| {
            let err = TransportError::send(&err);
            warn!("GET {} failed: {err}", request.url);
            err
        })?;

        let mut body = BodyAccumulator::new(response.status().as_u16());
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    trace!("received {} bytes", chunk.len());
                    body.push(&chunk);
                }
                Ok(None) => break,
                Err(err) => {
                    let err = TransportError::body(&err);
                    warn!(
                        "GET {} broke after {} bytes: {err}",
                        request.url,
                        body.len()
                    );
                    return Err(err);
                }
            }
        }

        let response = body.finish();
        debug!(
            "GET {} -> {} ({} bytes)",
            request.url,
            response.status,
            response.body.len()
        );
        Ok(response)
    }
}
