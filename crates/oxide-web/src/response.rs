//! HTTP response types.

/// A finished HTTP response, handed back to the transport.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers in the order they were set. A name may repeat, as
    /// `Set-Cookie` does.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Vec<u8>,
}

impl Response {
    /// Creates a new response with the given status.
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Adds a header, keeping earlier values with the same name.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Gets the first value of a header, ignoring case.
    #[must_use]
    pub fn get_header(&self, key: &str) -> Option<&str> {
        find_header(&self.headers, key)
    }

    /// Gets every value of a header, ignoring case.
    #[must_use]
    pub fn get_headers(&self, key: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Returns the body as a string.
    #[must_use]
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(200)
    }
}

fn find_header<'h>(headers: &'h [(String, String)], key: &str) -> Option<&'h str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
}

/// Reports whether a status code permits a body (RFC 7230, section 3.3).
#[must_use]
pub const fn body_allowed_for_status(status: u16) -> bool {
    !matches!(status, 100..=199 | 204 | 304)
}

/// Response under construction for one request.
///
/// Status and headers are staged until the response is committed, which
/// happens on the first body write or when the request finishes. After
/// that, header and status changes are ignored.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    staged_status: Option<u16>,
    committed: Option<u16>,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl ResponseWriter {
    /// Stages a status code.
    pub fn set_status(&mut self, status: u16) {
        if self.committed.is_some() {
            tracing::warn!(status, "status set after the response was committed");
            return;
        }
        self.staged_status = Some(status);
    }

    /// Status that was staged or committed, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.committed.or(self.staged_status)
    }

    /// Stages a header, replacing every previous value with the same name.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if self.committed.is_some() {
            tracing::warn!(header = %key, "header set after the response was committed");
            return;
        }
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&key));
        self.headers.push((key, value.into()));
    }

    /// Stages another value for a header, keeping the ones already set.
    pub fn append_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if self.committed.is_some() {
            tracing::warn!(header = %key, "header appended after the response was committed");
            return;
        }
        self.headers.push((key, value.into()));
    }

    /// Gets the first staged value of a header, ignoring case.
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        find_header(&self.headers, key)
    }

    /// Appends to the body, committing status and headers first.
    ///
    /// Returns `false` when the committed status forbids a body.
    pub fn write(&mut self, data: &[u8]) -> bool {
        let status = self.commit();
        if !body_allowed_for_status(status) {
            return false;
        }
        self.body.extend_from_slice(data);
        true
    }

    /// Replaces the written body with its `encoding` form.
    ///
    /// The body is buffered until dispatch returns, so middleware wrapping
    /// [`next`](crate::Context::next) can still encode it. `Content-Encoding`
    /// is set, `Vary: Accept-Encoding` added and `Content-Length` dropped.
    /// Returns `Ok(false)` without calling `encode` when there is no body.
    ///
    /// # Errors
    ///
    /// Passes on the error of `encode`; the body is left untouched then.
    pub fn encode_body<E>(
        &mut self,
        encoding: &str,
        encode: impl FnOnce(&[u8]) -> Result<Vec<u8>, E>,
    ) -> Result<bool, E> {
        if self.body.is_empty() {
            return Ok(false);
        }
        self.body = encode(&self.body)?;
        self.headers.retain(|(k, _)| {
            !k.eq_ignore_ascii_case("content-encoding") && !k.eq_ignore_ascii_case("content-length")
        });
        self.headers
            .push(("Content-Encoding".to_string(), encoding.to_string()));
        let varies = self.headers.iter().any(|(k, v)| {
            k.eq_ignore_ascii_case("vary")
                && v.split(',').any(|f| f.trim().eq_ignore_ascii_case("accept-encoding"))
        });
        if !varies {
            self.headers
                .push(("Vary".to_string(), "Accept-Encoding".to_string()));
        }
        Ok(true)
    }

    /// Commits the staged status (200 if none) and returns it.
    pub fn commit(&mut self) -> u16 {
        *self
            .committed
            .get_or_insert(self.staged_status.unwrap_or(200))
    }

    /// Returns true once status and headers are fixed.
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        self.committed.is_some()
    }

    /// Returns true once any body bytes were written.
    #[must_use]
    pub fn has_body(&self) -> bool {
        !self.body.is_empty()
    }

    /// Drops everything staged or written so far.
    pub fn clear(&mut self) {
        self.staged_status = None;
        self.committed = None;
        self.headers.clear();
        self.body.clear();
    }

    /// Commits and moves the response out, leaving the writer empty.
    pub fn take(&mut self) -> Response {
        let status = self.commit();
        let response = Response {
            status,
            headers: std::mem::take(&mut self.headers),
            body: std::mem::take(&mut self.body),
        };
        self.clear();
        response
    }
}
