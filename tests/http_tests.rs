//! HttpChatApi against a throwaway local server serving canned responses

use murmur::transport::{ChatApi, HttpChatApi};
use murmur::MurmurError;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Clone)]
struct Route {
    method: &'static str,
    path: &'static str,
    status: u16,
    body: Vec<u8>,
    set_cookie: Option<&'static str>,
}

impl Route {
    fn json(method: &'static str, path: &'static str, status: u16, body: &str) -> Self {
        Self {
            method,
            path,
            status,
            body: body.as_bytes().to_vec(),
            set_cookie: None,
        }
    }

    fn with_cookie(mut self, cookie: &'static str) -> Self {
        self.set_cookie = Some(cookie);
        self
    }
}

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    body: String,
    cookie: Option<String>,
}

struct CannedServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl CannedServer {
    async fn start(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let routes = routes.clone();
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move {
                    handle(stream, &routes, &recorded).await;
                });
            }
        });

        Self { addr, requests }
    }

    fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().clone()
    }
}

async fn handle(mut stream: TcpStream, routes: &[Route], recorded: &Mutex<Vec<Recorded>>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    let mut cookie = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.trim().parse().unwrap_or(0),
                "cookie" => cookie = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    recorded.lock().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        body,
        cookie,
    });

    let route = routes
        .iter()
        .find(|r| r.method == method && r.path == path)
        .cloned()
        .unwrap_or_else(|| Route::json("GET", "", 404, r#"{"error":"not found"}"#));

    let mut response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
        route.status,
        reason(route.status),
        route.body.len()
    );
    if let Some(cookie) = route.set_cookie {
        response.push_str(&format!("Set-Cookie: {}\r\n", cookie));
    }
    response.push_str("\r\n");

    stream.write_all(response.as_bytes()).await.unwrap();
    stream.write_all(&route.body).await.unwrap();
    stream.shutdown().await.ok();
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        _ => "Unknown",
    }
}

#[tokio::test]
async fn test_chat_reply() {
    let server = CannedServer::start(vec![Route::json(
        "POST",
        "/chat",
        200,
        r#"{"response":"Hi there","audio_url":"/static/audio/hi.mp3"}"#,
    )])
    .await;
    let api = HttpChatApi::new(&server.url()).unwrap();

    let reply = api.send_message("Hello").await.unwrap();
    assert_eq!(reply.response, "Hi there");
    assert_eq!(reply.audio_url.as_deref(), Some("/static/audio/hi.mp3"));

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(body, serde_json::json!({ "message": "Hello" }));
}

#[tokio::test]
async fn test_error_body_is_server_error_whatever_the_status() {
    let server = CannedServer::start(vec![Route::json(
        "POST",
        "/chat",
        500,
        r#"{"error":"model overloaded"}"#,
    )])
    .await;
    let api = HttpChatApi::new(&server.url()).unwrap();

    match api.send_message("Hello").await {
        Err(MurmurError::Server(detail)) => assert_eq!(detail, "model overloaded"),
        other => panic!("expected server error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_undecodable_body_is_transport_error() {
    let server =
        CannedServer::start(vec![Route::json("POST", "/chat", 502, "<html>Bad gateway</html>")])
            .await;
    let api = HttpChatApi::new(&server.url()).unwrap();

    assert!(matches!(
        api.send_message("Hello").await,
        Err(MurmurError::Transport(_))
    ));
}

#[tokio::test]
async fn test_connection_refused() {
    // Bind and release a port so nothing is listening on it
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let api = HttpChatApi::new(&format!("http://{}", addr)).unwrap();

    let err = api.send_message("Hello").await.unwrap_err();
    assert!(matches!(err, MurmurError::Transport(_)));
    assert_eq!(err.user_message(), murmur::CONNECTION_APOLOGY);
}

#[tokio::test]
async fn test_history_and_new_session() {
    let server = CannedServer::start(vec![
        Route::json(
            "GET",
            "/history",
            200,
            r#"[{"message":"hi","is_user":true},{"message":"hello!","is_user":false}]"#,
        ),
        Route::json("POST", "/new-session", 200, r#"{"success":true}"#),
    ])
    .await;
    let api = HttpChatApi::new(&server.url()).unwrap();

    let history = api.fetch_history().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].message, "hi");
    assert!(history[0].is_user);
    assert!(!history[1].is_user);

    assert!(api.start_new_session().await.unwrap().success);

    let requests = server.requests();
    assert_eq!(requests[1].method, "POST");
    assert_eq!(requests[1].path, "/new-session");
    assert!(requests[1].body.is_empty());
}

#[tokio::test]
async fn test_session_cookie_is_kept() {
    let server = CannedServer::start(vec![
        Route::json("GET", "/history", 200, "[]").with_cookie("session=abc123; Path=/"),
        Route::json("POST", "/chat", 200, r#"{"response":"ok"}"#),
    ])
    .await;
    let api = HttpChatApi::new(&server.url()).unwrap();

    api.fetch_history().await.unwrap();
    api.send_message("again").await.unwrap();

    let requests = server.requests();
    assert_eq!(requests[0].cookie, None);
    assert_eq!(requests[1].cookie.as_deref(), Some("session=abc123"));
}

#[tokio::test]
async fn test_endpoints_follow_base_path() {
    let server =
        CannedServer::start(vec![Route::json("POST", "/app/chat", 200, r#"{"response":"ok"}"#)])
            .await;
    let api = HttpChatApi::new(&format!("{}/app", server.url())).unwrap();

    assert_eq!(api.send_message("hi").await.unwrap().response, "ok");
    assert_eq!(server.requests()[0].path, "/app/chat");
}

#[tokio::test]
async fn test_audio_fetch() {
    let server = CannedServer::start(vec![Route {
        method: "GET",
        path: "/static/audio/hi.mp3",
        status: 200,
        body: vec![0x49, 0x44, 0x33, 0x04],
        set_cookie: None,
    }])
    .await;
    let api = HttpChatApi::new(&server.url()).unwrap();

    let bytes = api.fetch_audio("/static/audio/hi.mp3").await.unwrap();
    assert_eq!(bytes, vec![0x49, 0x44, 0x33, 0x04]);

    assert!(matches!(
        api.fetch_audio("/static/audio/missing.mp3").await,
        Err(MurmurError::Playback(_))
    ));
}
