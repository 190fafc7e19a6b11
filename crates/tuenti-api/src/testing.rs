//! In-memory [`Transport`] for tests, here and in dependent crates
//! (enable the `test-util` feature).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError};

/// Records every request and replays queued responses in order.
///
/// Panics when a request arrives with nothing queued.
#[derive(Default)]
pub struct RecordingTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A transport with one queued response carrying no headers.
    pub fn replying(status: u16, body: &str) -> Arc<Self> {
        let transport = Self::new();
        transport.push(Ok(HttpResponse {
            status,
            body: body.into(),
            ..Default::default()
        }));
        transport
    }

    pub fn push(&self, response: Result<HttpResponse, TransportError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn only_request(&self) -> HttpRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one request");
        requests.into_iter().next().unwrap()
    }
}

impl Transport for RecordingTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("no response queued")
    }
}
