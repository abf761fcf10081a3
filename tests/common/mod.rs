#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Value};
use tiny_http::{Header, Response, Server};

/// A catalog stand-in on a random local port.
pub struct FakeCatalog {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Seen>>>,
}

#[derive(Debug, Clone)]
pub struct Seen {
    pub url: String,
    pub authorization: Option<String>,
}

impl FakeCatalog {
    pub fn start() -> Self {
        Self::serve(false)
    }

    /// Like [`FakeCatalog::start`], but `/videos/all` always fails with 500.
    pub fn start_with_broken_listing() -> Self {
        Self::serve(true)
    }

    fn serve(broken_listing: bool) -> Self {
        let server = Server::http("127.0.0.1:0").expect("bind fake catalog");
        let base_url = format!("http://{}/videos", server.server_addr());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();
        thread::spawn(move || {
            for request in server.incoming_requests() {
                let authorization = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Authorization"))
                    .map(|h| h.value.to_string());
                let url = request.url().to_string();
                seen.lock().unwrap().push(Seen {
                    url: url.clone(),
                    authorization,
                });
                let (status, body) = route(&url, broken_listing);
                let response = Response::from_string(body.to_string())
                    .with_status_code(status)
                    .with_header(
                        Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                            .expect("content type header"),
                    );
                let _ = request.respond(response);
            }
        });
        Self { base_url, requests }
    }

    pub fn requests(&self) -> Vec<Seen> {
        self.requests.lock().unwrap().clone()
    }
}

pub fn video_json(id: &str, title: &str, channel: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "thumbnail_url": format!("https://img.example/{id}.jpg"),
        "view_count": "1.4K",
        "published_at": "Apr 19, 2019",
        "channel": {
            "name": channel,
            "profile_image_url": format!("https://img.example/{channel}.png"),
            "subscriber_count": "2M"
        }
    })
}

fn listing() -> Vec<Value> {
    vec![
        video_json("validId", "Learning Rust the hard way", "Ferris TV"),
        video_json("otherId", "Cooking for programmers", "Kitchen Sync"),
    ]
}

fn route(url: &str, broken_listing: bool) -> (u16, Value) {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    match path {
        "/videos/all" if broken_listing => (500, json!({ "error_msg": "listing unavailable" })),
        "/videos/all" => {
            let term = query
                .split('&')
                .find_map(|pair| pair.strip_prefix("search="))
                .unwrap_or("")
                .replace('+', " ")
                .to_lowercase();
            let videos: Vec<Value> = listing()
                .into_iter()
                .filter(|video| {
                    video["title"]
                        .as_str()
                        .is_some_and(|title| title.to_lowercase().contains(&term))
                })
                .collect();
            (200, json!({ "total": videos.len(), "videos": videos }))
        }
        "/videos/trending" => (
            200,
            json!({ "videos": [video_json("hotId", "Trending now", "Hot Channel")] }),
        ),
        "/videos/gaming" => (500, json!({ "error_msg": "upstream failure" })),
        "/videos/garbled" => (200, json!("not a video")),
        "/videos/validId" => (
            200,
            json!({ "video_details": video_json("validId", "Learning Rust the hard way", "Ferris TV") }),
        ),
        "/videos/detailOnly" => (
            200,
            json!({ "video_details": video_json("detailOnly", "Hidden gem", "Quiet Channel") }),
        ),
        _ => (404, json!({ "error_msg": "Not Found" })),
    }
}
