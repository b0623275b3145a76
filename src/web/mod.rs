//! Browser dashboard.
//!
//! Serves the live view, the recent-detections sidebar and the saved-images
//! gallery over plain HTTP on the loopback interface. The server thread owns
//! the one detection session per process; `GET /live` advances the loop by a
//! single iteration while the session is Running, so the dashboard's polling
//! is what drives detection.

use anyhow::{anyhow, Result};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::session::{DetectionSession, PollOutcome, SessionState};
use crate::storage::SIDEBAR_LIMIT;

const MAX_REQUEST_BYTES: usize = 8192;

#[derive(Clone, Debug)]
pub struct DashboardConfig {
    pub addr: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8807".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct DashboardHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl DashboardHandle {
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("dashboard server thread panicked"))?;
        }
        Ok(())
    }
}

pub struct DashboardServer {
    cfg: DashboardConfig,
    session: DetectionSession,
}

impl DashboardServer {
    pub fn new(cfg: DashboardConfig, session: DetectionSession) -> Self {
        Self { cfg, session }
    }

    pub fn spawn(self) -> Result<DashboardHandle> {
        let configured_addr: SocketAddr = self.cfg.addr.parse()?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        if configured_addr.ip().is_loopback() && !addr.ip().is_loopback() {
            return Err(anyhow!(
                "dashboard configured for loopback address '{}', but bound to non-loopback address '{}'",
                configured_addr,
                addr
            ));
        }
        listener.set_nonblocking(true)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let mut session = self.session;
        let join = std::thread::spawn(move || {
            if let Err(err) = run_dashboard(listener, &mut session, shutdown_thread) {
                log::error!("dashboard stopped: {}", err);
            }
            // Release the camera on shutdown regardless of session state.
            session.stop();
        });

        Ok(DashboardHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_dashboard(
    listener: TcpListener,
    session: &mut DetectionSession,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, _)) => {
                if let Err(err) = handle_connection(stream, session) {
                    log::warn!("dashboard request rejected: {}", err);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn handle_connection(mut stream: TcpStream, session: &mut DetectionSession) -> Result<()> {
    let peer = stream.peer_addr()?;
    let local = stream.local_addr()?;
    if local.ip().is_loopback() && !peer.ip().is_loopback() {
        write_json_response(&mut stream, 403, r#"{"error":"forbidden"}"#)?;
        return Ok(());
    }

    let request = read_request(&mut stream)?;
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/") => write_response(&mut stream, 200, "text/html", DASHBOARD_HTML.as_bytes()),
        ("GET", "/health") => write_json_response(&mut stream, 200, r#"{"status":"ok"}"#),
        ("GET", "/status") => {
            let body = status_json(session);
            write_json_response(&mut stream, 200, &body)
        }
        ("POST", "/session/start") => match session.start() {
            Ok(()) => write_json_response(&mut stream, 200, &status_json(session)),
            Err(err) => {
                write_json_response(&mut stream, 500, r#"{"error":"start_failed"}"#)?;
                Err(err)
            }
        },
        ("POST", "/session/stop") => {
            session.stop();
            write_json_response(&mut stream, 200, &status_json(session))
        }
        ("GET", "/live") => serve_live(&mut stream, session),
        ("GET", "/snapshots") => {
            let all = session.store().list()?;
            let recent = &all[..all.len().min(SIDEBAR_LIMIT)];
            let body = serde_json::json!({ "snapshots": all, "recent": recent });
            write_json_response(&mut stream, 200, &body.to_string())
        }
        ("GET", path) if path.starts_with("/snapshots/") => {
            serve_snapshot(&mut stream, session, &path["/snapshots/".len()..])
        }
        ("GET", _) => write_json_response(&mut stream, 404, r#"{"error":"not_found"}"#),
        _ => write_json_response(&mut stream, 405, r#"{"error":"method_not_allowed"}"#),
    }
}

/// One poll per live-view request; this is the only place the loop advances.
fn serve_live(stream: &mut TcpStream, session: &mut DetectionSession) -> Result<()> {
    if session.state() == SessionState::Running {
        match session.poll() {
            Ok(PollOutcome::SessionEnded) => {
                log::warn!("session ended: {}", session.notice().unwrap_or("grab failure"));
            }
            Ok(_) => {}
            Err(err) => {
                write_json_response(stream, 500, r#"{"error":"detection_failed"}"#)?;
                return Err(err);
            }
        }
    }

    match session.live_jpeg() {
        Some(jpeg) => write_response(stream, 200, "image/jpeg", jpeg),
        None => write_response(stream, 204, "image/jpeg", &[]),
    }
}

fn serve_snapshot(stream: &mut TcpStream, session: &mut DetectionSession, name: &str) -> Result<()> {
    let path = match session.store().path_for(name) {
        Ok(path) => path,
        Err(_) => {
            write_json_response(stream, 404, r#"{"error":"not_found"}"#)?;
            return Ok(());
        }
    };
    match std::fs::read(&path) {
        Ok(bytes) => write_response(stream, 200, "image/jpeg", &bytes),
        Err(_) => write_json_response(stream, 404, r#"{"error":"not_found"}"#),
    }
}

fn status_json(session: &DetectionSession) -> String {
    let state = match session.state() {
        SessionState::Running => "running",
        SessionState::Idle => "idle",
    };
    serde_json::json!({ "state": state, "notice": session.notice() }).to_string()
}

fn read_request(stream: &mut TcpStream) -> Result<HttpRequest> {
    stream.set_read_timeout(Some(Duration::from_secs(2)))?;
    let mut buf = [0u8; 1024];
    let mut data = Vec::new();
    loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
        if data.len() > MAX_REQUEST_BYTES {
            return Err(anyhow!("request too large"));
        }
        if data.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    let text = String::from_utf8_lossy(&data);
    let mut lines = text.split("\r\n");
    let request_line = lines.next().ok_or_else(|| anyhow!("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or_else(|| anyhow!("missing method"))?;
    let raw_path = parts.next().ok_or_else(|| anyhow!("missing path"))?;
    let path = raw_path.split('?').next().unwrap_or(raw_path).to_string();
    Ok(HttpRequest {
        method: method.to_string(),
        path,
    })
}

fn write_json_response(stream: &mut TcpStream, status: u16, body: &str) -> Result<()> {
    write_response(stream, status, "application/json", body.as_bytes())
}

fn write_response(
    stream: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &[u8],
) -> Result<()> {
    let status_line = match status {
        200 => "HTTP/1.1 200 OK",
        204 => "HTTP/1.1 204 No Content",
        403 => "HTTP/1.1 403 Forbidden",
        404 => "HTTP/1.1 404 Not Found",
        405 => "HTTP/1.1 405 Method Not Allowed",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let header = format!(
        "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\nCache-Control: no-store\r\n\r\n",
        status_line = status_line,
        content_type = content_type,
        len = body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)?;
    Ok(())
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
}

const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Person Detection with Auto-Save</title>
<style>
  body { font-family: sans-serif; margin: 0; display: flex; }
  #sidebar { width: 220px; padding: 12px; background: #f2f2f2; min-height: 100vh; }
  #sidebar img { width: 100%; margin-bottom: 8px; }
  #main { flex: 1; padding: 16px; }
  .tab-buttons button { margin-right: 8px; }
  #live-frame { max-width: 100%; margin-top: 12px; }
  #gallery { display: grid; grid-template-columns: repeat(3, 1fr); gap: 8px; margin-top: 12px; }
  #gallery figure { margin: 0; }
  #gallery img { width: 100%; }
  figcaption { font-size: 11px; word-break: break-all; }
  .hidden { display: none; }
</style>
</head>
<body>
<div id="sidebar">
  <h3>Recent Detections</h3>
  <div id="recent"></div>
</div>
<div id="main">
  <h1>Person Detection with Auto-Save</h1>
  <div class="tab-buttons">
    <button onclick="showTab('live')">Live Feed</button>
    <button onclick="showTab('saved')">Saved Images</button>
  </div>
  <div id="tab-live">
    <h2>Live Feed</h2>
    <button onclick="startFeed()">Start Live Feed</button>
    <button onclick="stopFeed()">Stop Live Feed</button>
    <p id="status-line">Click 'Start Live Feed' to begin</p>
    <img id="live-frame" alt="">
  </div>
  <div id="tab-saved" class="hidden">
    <h2>Saved Detections Gallery</h2>
    <button onclick="refreshGallery()">Refresh Saved Images</button>
    <div id="gallery"></div>
  </div>
</div>
<script>
let pollTimer = null;

function showTab(name) {
  document.getElementById('tab-live').classList.toggle('hidden', name !== 'live');
  document.getElementById('tab-saved').classList.toggle('hidden', name !== 'saved');
}

function startFeed() {
  fetch('/session/start', { method: 'POST' }).then(() => {
    if (!pollTimer) pollTimer = setInterval(pollLive, 200);
  });
}

function stopFeed() {
  fetch('/session/stop', { method: 'POST' }).then(updateStatus);
  if (pollTimer) { clearInterval(pollTimer); pollTimer = null; }
}

function pollLive() {
  const img = document.getElementById('live-frame');
  img.src = '/live?ts=' + Date.now();
  updateStatus();
}

function updateStatus() {
  fetch('/status').then(r => r.json()).then(s => {
    const line = document.getElementById('status-line');
    if (s.state === 'running') {
      line.textContent = s.notice || "Live feed is running. Click 'Stop Live Feed' to end.";
    } else {
      line.textContent = s.notice || 'Live feed stopped';
      if (pollTimer) { clearInterval(pollTimer); pollTimer = null; }
    }
    refreshSidebar();
  });
}

function refreshSidebar() {
  fetch('/snapshots').then(r => r.json()).then(data => {
    const recent = document.getElementById('recent');
    recent.innerHTML = '';
    for (const name of data.recent) {
      const fig = document.createElement('figure');
      const img = document.createElement('img');
      img.src = '/snapshots/' + name;
      const cap = document.createElement('figcaption');
      cap.textContent = name;
      fig.appendChild(img);
      fig.appendChild(cap);
      recent.appendChild(fig);
    }
  });
}

function refreshGallery() {
  fetch('/snapshots').then(r => r.json()).then(data => {
    const gallery = document.getElementById('gallery');
    gallery.innerHTML = '';
    for (const name of data.snapshots) {
      const fig = document.createElement('figure');
      const img = document.createElement('img');
      img.src = '/snapshots/' + name;
      const cap = document.createElement('figcaption');
      cap.textContent = name;
      fig.appendChild(img);
      fig.appendChild(cap);
      gallery.appendChild(fig);
    }
  });
}

refreshSidebar();
</script>
</body>
</html>
"#;
