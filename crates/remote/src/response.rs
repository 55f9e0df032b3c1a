use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

/// Response surface of a remote call: status plus headers.
///
/// Bodies never cross this boundary; payloads are decoded by the client
/// implementation and returned typed. The headers are kept so the request
/// budget can observe rate-limit state on every exchange.
#[derive(Clone, Debug, Default)]
pub struct RemoteResponse {
    status: StatusCode,
    headers: HeaderMap,
}

impl RemoteResponse {
    /// Builds a response surface.
    pub fn new(status: StatusCode, headers: HeaderMap) -> Self {
        Self { status, headers }
    }

    /// A plain 200 response with no headers.
    pub fn ok() -> Self {
        Self::default()
    }

    /// A response with the given status and no headers.
    pub fn with_status(status: StatusCode) -> Self {
        Self { status, headers: HeaderMap::new() }
    }

    /// Adds a header, replacing an existing one of the same name.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// A decoded payload together with the response it arrived on.
#[derive(Clone, Debug)]
pub struct Fetched<T> {
    /// Decoded payload.
    pub value: T,
    /// The exchange's response surface.
    pub response: RemoteResponse,
}

impl<T> Fetched<T> {
    /// Pairs a payload with its response.
    pub fn new(value: T, response: RemoteResponse) -> Self {
        Self { value, response }
    }

    /// Discards the response surface.
    pub fn into_value(self) -> T {
        self.value
    }
}
