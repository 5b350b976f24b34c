//! Synchronous HTTP server for the download page. One directory scan and one
//! render per request; the filesystem is the only state, so concurrent
//! requests need no coordination beyond what the filesystem itself provides.

use std::fs;
use std::io::Read;
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tiny_http::{Header, Method, Response, Server};

use crate::config::{ResolvedDirs, ShelfConfig};
use crate::error::{Result, ShelfError};
use crate::manifest;
use crate::output::human;
use crate::releases;
use crate::render;

/// Handle to a running server. Drop or call `stop()` to shut down.
pub struct ServerHandle {
    stop: Arc<AtomicBool>,
    port: u16,
}

impl ServerHandle {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Start the server in a background thread. Returns a handle to stop it.
pub fn start(
    config: &ShelfConfig,
    dirs: &ResolvedDirs,
    port: u16,
    auto_increment: bool,
) -> Result<ServerHandle> {
    let (server, actual_port) = if auto_increment {
        try_bind_auto(port)?
    } else {
        if !port_is_available(port) {
            return Err(ShelfError::Server(format!("port {port} is already in use")));
        }
        let addr = format!("127.0.0.1:{port}");
        let server = Server::http(&addr)
            .map_err(|e| ShelfError::Server(format!("failed to start server on port {port}: {e}")))?;
        (server, port)
    };

    if actual_port != port {
        human::info(&format!(
            "Port {port} in use, serving at http://localhost:{actual_port}"
        ));
    } else {
        human::success(&format!("Serving at http://localhost:{actual_port}"));
    }

    let tera = render::load_templates(&dirs.templates)?;

    let stop = Arc::new(AtomicBool::new(false));
    let loop_stop = stop.clone();
    let loop_config = config.clone();
    let loop_dirs = dirs.clone();
    std::thread::spawn(move || {
        run_serve_loop(server, &loop_config, &loop_dirs, &tera, &loop_stop);
    });

    Ok(ServerHandle {
        stop,
        port: actual_port,
    })
}

fn run_serve_loop(
    server: Server,
    config: &ShelfConfig,
    dirs: &ResolvedDirs,
    tera: &tera::Tera,
    stop: &AtomicBool,
) {
    loop {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        match server.recv_timeout(Duration::from_secs(1)) {
            Ok(Some(mut request)) => {
                let url_path = request.url().to_string();
                let response = match (request.method().clone(), url_path.as_str()) {
                    (Method::Get, "/") => respond_index(config, dirs, tera),
                    (Method::Post, "/generate") => respond_generate(config, dirs),
                    (Method::Post, "/delete") => {
                        let mut body = String::new();
                        let _ = request.as_reader().read_to_string(&mut body);
                        respond_delete(config, dirs, &body)
                    }
                    (Method::Get, path) => respond_download(config, dirs, path),
                    _ => text_response(405, "405 Method Not Allowed"),
                };
                let _ = request.respond(response);
            }
            Ok(None) => {}
            Err(_) => break,
        }
    }
}

fn text_response(status: u16, body: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    let header = Header::from_bytes("Content-Type", "text/plain; charset=utf-8").unwrap();
    Response::from_string(body)
        .with_status_code(status)
        .with_header(header)
}

fn html_response(body: String) -> Response<std::io::Cursor<Vec<u8>>> {
    let header = Header::from_bytes("Content-Type", "text/html; charset=utf-8").unwrap();
    Response::from_string(body).with_header(header)
}

/// 303 back to the listing, the post/redirect/get dance for the forms.
fn redirect_home() -> Response<std::io::Cursor<Vec<u8>>> {
    let header = Header::from_bytes("Location", "/").unwrap();
    Response::from_string("")
        .with_status_code(303)
        .with_header(header)
}

fn respond_index(
    config: &ShelfConfig,
    dirs: &ResolvedDirs,
    tera: &tera::Tera,
) -> Response<std::io::Cursor<Vec<u8>>> {
    // Unreadable directories degrade to empty sections; the page must always
    // render.
    let manifest = manifest::build_manifest(&dirs.generated).unwrap_or_else(|e| {
        tracing::warn!("{e}");
        Vec::new()
    });
    let release_names = releases::list_releases(&dirs.releases).unwrap_or_else(|e| {
        tracing::warn!("{e}");
        Vec::new()
    });

    match render::render_page(tera, config, &manifest, &release_names) {
        Ok(html) => html_response(html),
        Err(e) => {
            tracing::error!("render failed: {e}");
            text_response(500, "500 Internal Server Error")
        }
    }
}

fn respond_download(
    config: &ShelfConfig,
    dirs: &ResolvedDirs,
    url_path: &str,
) -> Response<std::io::Cursor<Vec<u8>>> {
    match resolve_download(config, dirs, url_path) {
        Some(path) => match fs::read(&path) {
            Ok(content) => {
                let header = Header::from_bytes("Content-Type", guess_mime(&path)).unwrap();
                Response::from_data(content).with_header(header)
            }
            Err(e) => {
                tracing::warn!("cannot read {}: {e}", path.display());
                text_response(404, "404 Not Found")
            }
        },
        None => text_response(404, "404 Not Found"),
    }
}

/// Map a request path onto an entry of one of the two served directories.
/// The path must be `/<dir prefix>/<bare entry name>` with nothing else in
/// it; names are percent-decoded before matching.
fn resolve_download(
    config: &ShelfConfig,
    dirs: &ResolvedDirs,
    url_path: &str,
) -> Option<PathBuf> {
    let clean = url_path.split('?').next().unwrap_or(url_path);
    let decoded = urlencoding::decode(clean).ok()?;
    let relative = decoded.trim_start_matches('/');

    let served = [
        (config.dirs.generated_dir.as_str(), &dirs.generated),
        (config.dirs.releases_dir.as_str(), &dirs.releases),
    ];
    for (prefix, dir) in served {
        if let Some(name) = entry_name(relative, prefix) {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

/// The bare entry name of `relative` under `prefix`, or None when the path
/// escapes the directory (nested path, `..`, empty name).
fn entry_name<'a>(relative: &'a str, prefix: &str) -> Option<&'a str> {
    let name = relative.strip_prefix(prefix)?.strip_prefix('/')?;
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return None;
    }
    Some(name)
}

fn respond_delete(
    config: &ShelfConfig,
    dirs: &ResolvedDirs,
    body: &str,
) -> Response<std::io::Cursor<Vec<u8>>> {
    let Some(posted) = form_field(body, "filename") else {
        return text_response(400, "400 Bad Request: missing filename");
    };

    // The original deleted whatever path was posted. Deletion here is
    // allow-listed to direct entries of the generated directory.
    let Some(name) = entry_name(&posted, &config.dirs.generated_dir) else {
        tracing::warn!("rejecting delete of {posted:?}");
        return text_response(400, "400 Bad Request: not a generated tarball");
    };

    let target = dirs.generated.join(name);
    match fs::remove_file(&target) {
        Ok(()) => {
            tracing::info!("deleted {}", target.display());
            redirect_home()
        }
        Err(e) => {
            tracing::warn!("cannot delete {}: {e}", target.display());
            text_response(404, "404 Not Found")
        }
    }
}

fn respond_generate(
    config: &ShelfConfig,
    dirs: &ResolvedDirs,
) -> Response<std::io::Cursor<Vec<u8>>> {
    match run_generate(config, dirs) {
        Ok(ran) => {
            if !ran {
                tracing::warn!("generate requested but no generate.command configured");
            }
            redirect_home()
        }
        Err(e) => {
            tracing::error!("{e}");
            text_response(500, "500 Internal Server Error")
        }
    }
}

/// Run the configured generate hook. Returns false when none is configured.
/// The hook is expected to drop a new tarball into the generated directory;
/// the next render picks it up by re-reading the directory.
fn run_generate(config: &ShelfConfig, dirs: &ResolvedDirs) -> Result<bool> {
    let Some(ref command) = config.generate.command else {
        return Ok(false);
    };

    let output = Command::new(command)
        .args(&config.generate.args)
        .current_dir(&dirs.root)
        .output()
        .map_err(|e| ShelfError::Generate(format!("{command}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ShelfError::Generate(format!(
            "{command} failed: {}",
            stderr.trim()
        )));
    }

    tracing::info!("generate hook {command} finished");
    Ok(true)
}

/// Pull one field out of an `application/x-www-form-urlencoded` body.
fn form_field(body: &str, field: &str) -> Option<String> {
    for pair in body.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        if key == field {
            let value = value.replace('+', " ");
            return match urlencoding::decode(&value) {
                Ok(decoded) => Some(decoded.into_owned()),
                Err(_) => None,
            };
        }
    }
    None
}

fn guess_mime(path: &Path) -> &'static str {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        return "application/gzip";
    }
    if name.ends_with(".tar.bz2") {
        return "application/x-bzip2";
    }
    if name.ends_with(".tar.xz") {
        return "application/x-xz";
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some("zip") => "application/zip",
        Some("tar") => "application/x-tar",
        Some("txt" | "md") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Check if a port is available by trying to connect to it. If the
/// connection succeeds, something is already listening.
fn port_is_available(port: u16) -> bool {
    TcpStream::connect_timeout(
        &format!("127.0.0.1:{port}").parse().unwrap(),
        Duration::from_millis(100),
    )
    .is_err()
}

fn try_bind_auto(start_port: u16) -> Result<(Server, u16)> {
    for port in start_port..start_port.saturating_add(100) {
        if !port_is_available(port) {
            continue;
        }
        match Server::http(&format!("127.0.0.1:{port}")) {
            Ok(server) => return Ok((server, port)),
            Err(_) => continue,
        }
    }
    Err(ShelfError::Server("no available port found".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn test_config() -> ShelfConfig {
        toml::from_str("[page]\ntitle = \"test tarballs\"\n").unwrap()
    }

    fn test_site() -> (tempfile::TempDir, ShelfConfig, ResolvedDirs) {
        let root = tempfile::tempdir().unwrap();
        let config = test_config();
        let dirs = config.resolve_dirs(root.path());
        fs::create_dir_all(&dirs.generated).unwrap();
        fs::create_dir_all(&dirs.releases).unwrap();
        (root, config, dirs)
    }

    /// Bare-bones HTTP exchange against the test server.
    fn http(port: u16, request: &str) -> String {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        stream.write_all(request.as_bytes()).unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    fn get(port: u16, path: &str) -> String {
        http(
            port,
            &format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"),
        )
    }

    fn post(port: u16, path: &str, body: &str) -> String {
        http(
            port,
            &format!(
                "POST {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
                 Content-Type: application/x-www-form-urlencoded\r\n\
                 Content-Length: {}\r\n\r\n{body}",
                body.len()
            ),
        )
    }

    #[test]
    fn test_index_lists_generated_tarballs() {
        let (_root, config, dirs) = test_site();
        fs::write(
            dirs.generated.join("pkg-200901151230.tar.gz"),
            vec![0u8; 2048],
        )
        .unwrap();

        let handle = start(&config, &dirs, 4780, true).unwrap();
        let response = get(handle.port(), "/");
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("pkg-200901151230.tar.gz"));
        assert!(response.contains("15-Jan-2009"));
        assert!(response.contains("2K"));
    }

    #[test]
    fn test_index_renders_with_missing_directories() {
        let root = tempfile::tempdir().unwrap();
        let config = test_config();
        let dirs = config.resolve_dirs(root.path());

        let handle = start(&config, &dirs, 4790, true).unwrap();
        let response = get(handle.port(), "/");
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("Generated Tarballs"));
    }

    #[test]
    fn test_download_serves_listed_file() {
        let (_root, config, dirs) = test_site();
        fs::write(dirs.generated.join("pkg-200901151230.tar.gz"), b"tarball").unwrap();

        let handle = start(&config, &dirs, 4800, true).unwrap();
        let response = get(
            handle.port(),
            "/Download/Generated/pkg-200901151230.tar.gz",
        );
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("application/gzip"));
        assert!(response.ends_with("tarball"));
    }

    #[test]
    fn test_download_rejects_traversal() {
        let (_root, config, dirs) = test_site();
        fs::write(dirs.root.join("secret"), b"nope").unwrap();

        let handle = start(&config, &dirs, 4810, true).unwrap();
        let response = get(handle.port(), "/Download/Generated/%2E%2E/secret");
        assert!(response.starts_with("HTTP/1.1 404"));
    }

    #[test]
    fn test_delete_removes_generated_tarball() {
        let (_root, config, dirs) = test_site();
        let target = dirs.generated.join("pkg-200901151230.tar.gz");
        fs::write(&target, b"x").unwrap();

        let handle = start(&config, &dirs, 4820, true).unwrap();
        let response = post(
            handle.port(),
            "/delete",
            "filename=Download%2FGenerated%2Fpkg-200901151230.tar.gz",
        );
        assert!(response.starts_with("HTTP/1.1 303"));
        assert!(!target.exists());
    }

    #[test]
    fn test_delete_rejects_path_outside_generated_dir() {
        let (_root, config, dirs) = test_site();
        let outside = dirs.root.join("keep.txt");
        fs::write(&outside, b"x").unwrap();

        let handle = start(&config, &dirs, 4830, true).unwrap();
        let response = post(handle.port(), "/delete", "filename=keep.txt");
        assert!(response.starts_with("HTTP/1.1 400"));
        let response = post(
            handle.port(),
            "/delete",
            "filename=Download/Generated/../keep.txt",
        );
        assert!(response.starts_with("HTTP/1.1 400"));
        assert!(outside.exists());
    }

    #[test]
    fn test_generate_without_hook_redirects() {
        let (_root, config, dirs) = test_site();
        let handle = start(&config, &dirs, 4840, true).unwrap();
        let response = post(handle.port(), "/generate", "submit=Generate");
        assert!(response.starts_with("HTTP/1.1 303"));
    }

    #[test]
    fn test_form_field_decodes_value() {
        assert_eq!(
            form_field("filename=a%20b.tar.gz&submit=x", "filename").as_deref(),
            Some("a b.tar.gz")
        );
        assert_eq!(
            form_field("filename=a+b", "filename").as_deref(),
            Some("a b")
        );
        assert!(form_field("other=x", "filename").is_none());
    }

    #[test]
    fn test_entry_name_allow_list() {
        assert_eq!(
            entry_name("Download/Generated/pkg.tar.gz", "Download/Generated"),
            Some("pkg.tar.gz")
        );
        assert!(entry_name("Download/Generated/a/b", "Download/Generated").is_none());
        assert!(entry_name("Download/Generated/..", "Download/Generated").is_none());
        assert!(entry_name("Download/Generated/", "Download/Generated").is_none());
        assert!(entry_name("elsewhere/pkg.tar.gz", "Download/Generated").is_none());
    }

    #[test]
    fn test_guess_mime_archives() {
        assert_eq!(guess_mime(Path::new("a.tar.gz")), "application/gzip");
        assert_eq!(guess_mime(Path::new("a.tgz")), "application/gzip");
        assert_eq!(guess_mime(Path::new("a.tar.bz2")), "application/x-bzip2");
        assert_eq!(guess_mime(Path::new("a.zip")), "application/zip");
        assert_eq!(guess_mime(Path::new("a.bin")), "application/octet-stream");
    }
}
