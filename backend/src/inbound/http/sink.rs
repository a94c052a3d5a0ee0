//! Destinations the response adapter writes to.
//!
//! [`HttpSink`] binds to actix and honours status, headers, and body.
//! [`WriterSink`] wraps any [`std::io::Write`] and receives body bytes only.

use std::io;

use actix_web::http::header::{HeaderMap, HeaderName, HeaderValue};
use actix_web::http::StatusCode;
use actix_web::web::Bytes;
use actix_web::HttpResponse;

/// Something a rendered response can be written to.
pub trait ResponseSink {
    /// Record the response status.
    fn set_status(&mut self, status: StatusCode);

    /// Record a response header, replacing any previous value.
    fn insert_header(&mut self, name: HeaderName, value: HeaderValue);

    /// Write the response body.
    ///
    /// # Errors
    /// Returns the underlying I/O error when the destination rejects the
    /// bytes.
    fn write_body(&mut self, body: Bytes) -> io::Result<()>;
}

/// Sink that accumulates an actix [`HttpResponse`].
///
/// # Examples
/// ```
/// use actix_web::http::StatusCode;
/// use template_api::inbound::http::sink::{HttpSink, ResponseSink};
///
/// let mut sink = HttpSink::default();
/// sink.set_status(StatusCode::NO_CONTENT);
/// assert_eq!(sink.into_response().status(), StatusCode::NO_CONTENT);
/// ```
#[derive(Debug)]
pub struct HttpSink {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl Default for HttpSink {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

impl HttpSink {
    /// Status recorded so far.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Finish into an actix response.
    #[must_use]
    pub fn into_response(self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status);
        for (name, value) in self.headers {
            builder.insert_header((name, value));
        }
        match self.body {
            Some(body) => builder.body(body),
            None => builder.finish(),
        }
    }
}

impl ResponseSink for HttpSink {
    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    fn write_body(&mut self, body: Bytes) -> io::Result<()> {
        self.body = Some(body);
        Ok(())
    }
}

/// Sink over a raw writer; status and headers are discarded.
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: W,
}

impl<W: io::Write> WriterSink<W> {
    /// Wrap `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: io::Write> ResponseSink for WriterSink<W> {
    fn set_status(&mut self, _status: StatusCode) {}

    fn insert_header(&mut self, _name: HeaderName, _value: HeaderValue) {}

    fn write_body(&mut self, body: Bytes) -> io::Result<()> {
        self.writer.write_all(&body)
    }
}
