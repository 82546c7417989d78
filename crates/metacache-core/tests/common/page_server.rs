//! Minimal HTTP/1.1 server for collector integration tests.
//!
//! Routes:
//! - `/page`: 200 with a small HTML body, custom headers and two cookies
//! - `/big`: 200 with a body of `big_len` bytes of `a`
//! - `/redirect`: 302 to `/page`, with a header that must not survive the hop
//! - anything else: 404

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

pub const PAGE_BODY: &str = "<html><head><title>fixture</title></head><body>ok</body></html>";

/// Starts the server in a background thread. Returns the base URL without a
/// trailing slash (e.g. "http://127.0.0.1:12345"). Runs until the process exits.
pub fn start(big_len: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            thread::spawn(move || handle(stream, big_len));
        }
    });
    format!("http://127.0.0.1:{}", port)
}

fn handle(mut stream: TcpStream, big_len: usize) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/");

    let response = match path {
        "/page" => respond(
            "200 OK",
            &[
                "Server: dummy",
                "X-Fixture: yes",
                "Set-Cookie: sessionid=abc; Path=/; HttpOnly",
                "Set-Cookie: theme=dark",
                "Content-Type: text/html; charset=utf-8",
            ],
            PAGE_BODY.as_bytes(),
        ),
        "/big" => respond("200 OK", &["Content-Type: text/plain"], &vec![b'a'; big_len]),
        "/redirect" => respond("302 Found", &["Location: /page", "X-Hop: first"], b""),
        _ => respond("404 Not Found", &["Content-Type: text/plain"], b"missing"),
    };
    let _ = stream.write_all(&response);
}

fn respond(status: &str, headers: &[&str], body: &[u8]) -> Vec<u8> {
    let mut head = format!("HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n", status, body.len());
    for h in headers {
        head.push_str(h);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
    let mut out = head.into_bytes();
    out.extend_from_slice(body);
    out
}
