use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub(crate) enum Behavior {
    Respond(u16, Vec<u8>),
    DelayRespond(Duration, u16, Vec<u8>),
}

impl Behavior {
    pub(crate) fn text(status: u16, body: &str) -> Self {
        Self::Respond(status, body.as_bytes().to_vec())
    }

    /// Replaces `{base}` in text bodies with the server's own URL.
    fn substitute_base(&mut self, base_url: &str) {
        let body = match self {
            Self::Respond(_, body) | Self::DelayRespond(_, _, body) => body,
        };
        if let Ok(text) = std::str::from_utf8(body) {
            if text.contains("{base}") {
                *body = text.replace("{base}", base_url).into_bytes();
            }
        }
    }
}

#[derive(Debug)]
enum Script {
    Queue(VecDeque<Behavior>),
    Routes(HashMap<String, Behavior>),
}

impl Script {
    fn next(&mut self, path: &str) -> Behavior {
        match self {
            Self::Queue(queue) => queue
                .pop_front()
                .unwrap_or_else(|| Behavior::text(200, "default-ok")),
            Self::Routes(routes) => routes
                .get(path)
                .cloned()
                .unwrap_or_else(|| Behavior::text(404, "not found")),
        }
    }
}

#[derive(Debug)]
pub(crate) struct TestServer {
    pub(crate) base_url: String,
    requests: Arc<AtomicUsize>,
    paths: Arc<Mutex<Vec<String>>>,
    shutdown_tx: mpsc::Sender<()>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl TestServer {
    /// Answers requests in arrival order, ignoring the path.
    pub(crate) fn spawn(behaviors: Vec<Behavior>) -> Self {
        Self::start(Script::Queue(VecDeque::from(behaviors)))
    }

    /// Answers by request path; unknown paths get a 404. `{base}` in a body
    /// expands to this server's URL.
    pub(crate) fn routes<I, P>(routes: I) -> Self
    where
        I: IntoIterator<Item = (P, Behavior)>,
        P: Into<String>,
    {
        let routes = routes
            .into_iter()
            .map(|(path, behavior)| (path.into(), behavior))
            .collect();
        Self::start(Script::Routes(routes))
    }

    fn start(mut script: Script) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind test server");
        listener.set_nonblocking(true).expect("set nonblocking");
        let addr = listener.local_addr().expect("local addr");
        let base_url = format!("http://{addr}");
        if let Script::Routes(routes) = &mut script {
            for behavior in routes.values_mut() {
                behavior.substitute_base(&base_url);
            }
        }

        let requests = Arc::new(AtomicUsize::new(0));
        let requests_clone = Arc::clone(&requests);
        let paths = Arc::new(Mutex::new(Vec::new()));
        let paths_clone = Arc::clone(&paths);
        let script = Arc::new(Mutex::new(script));
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                match listener.accept() {
                    Ok((mut stream, _)) => {
                        requests_clone.fetch_add(1, Ordering::SeqCst);
                        let path = read_request_path(&mut stream).unwrap_or_default();
                        paths_clone.lock().expect("lock paths").push(path.clone());
                        let behavior = script.lock().expect("lock script").next(&path);
                        std::thread::spawn(move || serve_behavior(&mut stream, behavior));
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                        std::thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            base_url,
            requests,
            paths,
            shutdown_tx,
            join_handle: Some(join_handle),
        }
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub(crate) fn requested_paths(&self) -> Vec<String> {
        self.paths.lock().expect("lock paths").clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

fn read_request_path(stream: &mut TcpStream) -> std::io::Result<String> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(Duration::from_millis(200)))?;
    let mut buf = [0_u8; 1024];
    let mut data = Vec::new();
    loop {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => {
                data.extend_from_slice(&buf[..read]);
                if data.windows(4).any(|window| window == b"\r\n\r\n") {
                    break;
                }
            }
            Err(err)
                if err.kind() == std::io::ErrorKind::WouldBlock
                    || err.kind() == std::io::ErrorKind::TimedOut =>
            {
                break;
            }
            Err(err) => return Err(err),
        }
    }

    let head = String::from_utf8_lossy(&data);
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or_default()
        .to_string();
    Ok(path)
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        408 => "Request Timeout",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

fn serve_behavior(stream: &mut TcpStream, behavior: Behavior) {
    match behavior {
        Behavior::Respond(status, body) => {
            let _ = write_response(stream, status, &body);
        }
        Behavior::DelayRespond(delay, status, body) => {
            std::thread::sleep(delay);
            let _ = write_response(stream, status, &body);
        }
    }
}

fn write_response(stream: &mut TcpStream, status: u16, payload: &[u8]) -> std::io::Result<()> {
    let reason = reason_phrase(status);
    write!(
        stream,
        "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        payload.len()
    )?;
    stream.write_all(payload)?;
    stream.flush()
}

pub(crate) fn comic_json(num: u32, title: &str, transcript: &str, img: &str) -> String {
    serde_json::json!({
        "num": num,
        "year": "2006",
        "month": "1",
        "day": "1",
        "title": title,
        "safe_title": title,
        "transcript": transcript,
        "alt": format!("Alt for {title}"),
        "img": img,
    })
    .to_string()
}

#[derive(Debug)]
pub(crate) struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub(crate) fn new(label: &str) -> Self {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!(
            "xkcd-cli-{label}-{}-{ts}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("create temp dir");
        Self { path }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}
