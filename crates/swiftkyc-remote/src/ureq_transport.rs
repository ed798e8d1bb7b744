//! Blocking HTTP transport backed by `ureq`.

use std::io::Read;
use std::sync::Mutex;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::{HttpRequest, HttpResponse, HttpTransport, MultipartForm, RemoteError, RequestBody};

/// Upper bound on buffered response bodies.
const MAX_RESPONSE_BYTES: u64 = 8 * 1024 * 1024;

/// Real network transport.
pub struct UreqTransport {
    agent: ureq::Agent,
    boundary_rng: Mutex<StdRng>,
}

impl UreqTransport {
    /// Builds a transport with one timeout for connect/read/write.
    pub fn new(timeout_ms: u64, seed: u64) -> Self {
        let timeout = Duration::from_millis(timeout_ms.max(100));
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .user_agent(concat!("swiftkyc/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            boundary_rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn next_boundary(&self) -> Result<String, RemoteError> {
        let mut rng = self
            .boundary_rng
            .lock()
            .map_err(|_| RemoteError::Transport("boundary generator lock poisoned".to_string()))?;
        Ok(crate::random_boundary(&mut *rng))
    }
}

impl HttpTransport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, RemoteError> {
        let builder = self
            .agent
            .request(request.method.as_str(), &request.url)
            .set("Accept", "application/json");

        let result = match &request.body {
            RequestBody::Empty => builder.call(),
            RequestBody::Json(value) => builder
                .set("Content-Type", "application/json")
                .send_string(&value.to_string()),
            RequestBody::Form(form) => {
                let boundary = self.next_boundary()?;
                builder
                    .set("Content-Type", &MultipartForm::content_type(&boundary))
                    .send_bytes(&form.encode(&boundary))
            }
        };

        // Non-2xx statuses still carry a body the caller needs for messages.
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(transport)) => {
                return Err(RemoteError::Transport(transport.to_string()));
            }
        };

        let status = response.status();
        let content_type = response.header("content-type").map(str::to_string);
        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_RESPONSE_BYTES)
            .read_to_end(&mut body)
            .map_err(|error| RemoteError::Transport(format!("response read failed: {error}")))?;

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}
