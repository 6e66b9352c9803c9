#![allow(dead_code)]

pub mod temp_files {
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Write `content` to a temporary file with the given extension.
    /// The file is removed when the handle is dropped.
    pub fn create_temp_manifest(content: &str, ext: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("apirouter_test_")
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    pub fn create_temp_yaml(content: &str) -> NamedTempFile {
        create_temp_manifest(content, "yaml")
    }

    pub fn create_temp_json(content: &str) -> NamedTempFile {
        create_temp_manifest(content, "json")
    }
}

pub mod mock_postman {
    use apirouter::postman::PostmanClient;
    use std::collections::HashMap;
    use std::io::Read;
    use std::sync::{Arc, Mutex};
    use std::thread::JoinHandle;
    use std::time::Duration;
    use tiny_http::{Header, Response, Server};

    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub method: String,
        pub url: String,
        pub api_key: Option<String>,
        pub body: String,
    }

    #[derive(Default)]
    struct MockState {
        collections: HashMap<String, String>,
        failures: HashMap<String, u16>,
        requests: Vec<RecordedRequest>,
    }

    /// In-process stand-in for the Postman collections API.
    ///
    /// `GET /collections/{uid}` serves the stored body, `PUT` replaces it.
    pub struct MockPostman {
        pub base_url: String,
        state: Arc<Mutex<MockState>>,
        server: Arc<Server>,
        handle: Option<JoinHandle<()>>,
    }

    impl MockPostman {
        pub fn start() -> Self {
            let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
            let addr = server.server_addr().to_ip().unwrap();
            let state = Arc::new(Mutex::new(MockState::default()));

            let handle = {
                let server = Arc::clone(&server);
                let state = Arc::clone(&state);
                std::thread::spawn(move || {
                    for mut request in server.incoming_requests() {
                        let mut body = String::new();
                        let _ = request.as_reader().read_to_string(&mut body);
                        let method = request.method().to_string();
                        let url = request.url().to_string();
                        let api_key = request
                            .headers()
                            .iter()
                            .find(|h| h.field.equiv("X-Api-Key"))
                            .map(|h| h.value.as_str().to_string());
                        let uid = url
                            .trim_start_matches("/collections/")
                            .split('?')
                            .next()
                            .unwrap_or_default()
                            .to_string();

                        let (status, reply) = {
                            let mut state = state.lock().unwrap();
                            state.requests.push(RecordedRequest {
                                method: method.clone(),
                                url: url.clone(),
                                api_key,
                                body: body.clone(),
                            });
                            if let Some(status) = state.failures.get(&uid) {
                                (*status, r#"{"error":{"name":"serverError"}}"#.to_string())
                            } else if method == "GET" {
                                match state.collections.get(&uid) {
                                    Some(doc) => (200, doc.clone()),
                                    None => (404, r#"{"error":{"name":"instanceNotFoundError"}}"#.to_string()),
                                }
                            } else if method == "PUT" {
                                state.collections.insert(uid.clone(), body);
                                (200, format!(r#"{{"collection":{{"uid":"{uid}"}}}}"#))
                            } else {
                                (405, "{}".to_string())
                            }
                        };

                        let header =
                            Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                                .unwrap();
                        let response = Response::from_string(reply)
                            .with_status_code(status)
                            .with_header(header);
                        let _ = request.respond(response);
                    }
                })
            };

            Self {
                base_url: format!("http://{addr}"),
                state,
                server,
                handle: Some(handle),
            }
        }

        pub fn with_collection(&self, uid: &str, body: &str) {
            self.state
                .lock()
                .unwrap()
                .collections
                .insert(uid.to_string(), body.to_string());
        }

        pub fn fail_with(&self, uid: &str, status: u16) {
            self.state
                .lock()
                .unwrap()
                .failures
                .insert(uid.to_string(), status);
        }

        pub fn collection(&self, uid: &str) -> Option<String> {
            self.state.lock().unwrap().collections.get(uid).cloned()
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.state.lock().unwrap().requests.clone()
        }

        pub fn count(&self, method: &str) -> usize {
            self.requests().iter().filter(|r| r.method == method).count()
        }

        pub fn client(&self) -> PostmanClient {
            PostmanClient::new(self.base_url.clone(), Some(Duration::from_secs(5))).unwrap()
        }
    }

    impl Drop for MockPostman {
        fn drop(&mut self) {
            self.server.unblock();
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
            }
        }
    }
}
