//! Shared helpers for integration tests.
//!
//! wiremock always sends a `Content-Length` and a complete body, so responses
//! without a length, bodies that stall mid-way, and connections that drop are
//! produced by a tiny scripted TCP server instead.

#![allow(dead_code)]

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// One step of a scripted response.
#[derive(Debug, Clone)]
pub enum Step {
    Send(Vec<u8>),
    Sleep(Duration),
    /// Keep the connection open without sending anything more.
    Hold,
}

/// Serves `script` to every connection on an ephemeral local port.
///
/// Returns the base URL (`http://127.0.0.1:<port>`). The server task lives
/// until the test runtime shuts down.
pub async fn spawn_scripted_server(script: Vec<Step>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind scripted server");
    let addr = listener.local_addr().expect("scripted server address");

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let script = script.clone();
            tokio::spawn(async move {
                let _ = serve(stream, &script).await;
            });
        }
    });

    format!("http://{addr}")
}

async fn serve(mut stream: TcpStream, script: &[Step]) -> std::io::Result<()> {
    read_request_head(&mut stream).await?;
    for step in script {
        match step {
            Step::Send(bytes) => {
                stream.write_all(bytes).await?;
                stream.flush().await?;
            }
            Step::Sleep(duration) => tokio::time::sleep(*duration).await,
            Step::Hold => {
                tokio::time::sleep(Duration::from_secs(600)).await;
            }
        }
    }
    stream.shutdown().await
}

async fn read_request_head(stream: &mut TcpStream) -> std::io::Result<()> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        head.extend_from_slice(&buf[..n]);
    }
    Ok(())
}

/// `200 OK` head with an optional `Content-Length`, closing after the body.
pub fn ok_head(content_length: Option<u64>) -> Vec<u8> {
    let mut head = String::from("HTTP/1.1 200 OK\r\nContent-Type: video/mp4\r\nConnection: close\r\n");
    if let Some(length) = content_length {
        head.push_str(&format!("Content-Length: {length}\r\n"));
    }
    head.push_str("\r\n");
    head.into_bytes()
}

/// Deterministic test payload of `len` bytes.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Body with no `Content-Length`, terminated by closing the connection.
pub async fn spawn_unsized_server(body: Vec<u8>) -> String {
    spawn_scripted_server(vec![Step::Send(ok_head(None)), Step::Send(body)]).await
}

/// Declares `declared` bytes, sends `prefix`, then goes silent.
pub async fn spawn_stalling_server(declared: u64, prefix: Vec<u8>) -> String {
    spawn_scripted_server(vec![
        Step::Send(ok_head(Some(declared))),
        Step::Send(prefix),
        Step::Hold,
    ])
    .await
}

/// Declares `declared` bytes, sends `prefix`, then closes the connection.
pub async fn spawn_truncating_server(declared: u64, prefix: Vec<u8>) -> String {
    spawn_scripted_server(vec![Step::Send(ok_head(Some(declared))), Step::Send(prefix)]).await
}

/// Sends `pieces` chunks of `piece_len` bytes, `gap` apart.
pub async fn spawn_trickle_server(pieces: usize, piece_len: usize, gap: Duration) -> String {
    let total = (pieces * piece_len) as u64;
    let mut script = vec![Step::Send(ok_head(Some(total)))];
    for _ in 0..pieces {
        script.push(Step::Send(payload(piece_len)));
        script.push(Step::Sleep(gap));
    }
    spawn_scripted_server(script).await
}

/// Answers any request with headers only, declaring `declared` bytes.
pub async fn spawn_head_server(declared: Option<u64>) -> String {
    spawn_scripted_server(vec![Step::Send(ok_head(declared))]).await
}
