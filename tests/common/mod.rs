//! Shared test helpers
//!
//! A scripted in-process cache server: a test spawns a listener with
//! canned response bytes, points a client at it, and afterwards joins
//! the server to inspect the requests it captured.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread::JoinHandle;
use std::time::Duration;

use cachewire::{Client, ClientConfig};

pub const HEADER_SIZE: usize = 24;

/// One captured request frame.
pub struct Request {
    pub raw_header: [u8; HEADER_SIZE],
    pub opcode: u8,
    pub extras: Vec<u8>,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub cas: u64,
}

/// Build one response frame. The body is extras + key + value;
/// lengths are derived.
pub fn response(status: u16, extras: &[u8], key: &[u8], value: &[u8], cas: u64) -> Vec<u8> {
    let body_len = extras.len() + key.len() + value.len();
    let mut frame = Vec::with_capacity(HEADER_SIZE + body_len);
    frame.push(0x81); // response magic
    frame.push(0x00); // opcode (not checked by the client)
    frame.extend_from_slice(&(key.len() as u16).to_be_bytes());
    frame.push(extras.len() as u8);
    frame.push(0x00); // data type
    frame.extend_from_slice(&status.to_be_bytes());
    frame.extend_from_slice(&(body_len as u32).to_be_bytes());
    frame.extend_from_slice(&0u32.to_be_bytes()); // opaque
    frame.extend_from_slice(&cas.to_be_bytes());
    frame.extend_from_slice(extras);
    frame.extend_from_slice(key);
    frame.extend_from_slice(value);
    frame
}

/// Serve scripted sessions on an ephemeral port. Each session is one
/// accepted connection; for every reply in its script the server reads
/// one request and writes the canned bytes back (a reply may hold
/// several concatenated frames, as stats responses do, or be empty to
/// leave the request unanswered). The connection closes when a
/// session's script runs out. Returns the server address and a handle
/// yielding every captured request.
pub fn spawn_server(sessions: Vec<Vec<Vec<u8>>>) -> (SocketAddr, JoinHandle<Vec<Request>>) {
    serve(sessions, Duration::ZERO)
}

/// Single-connection convenience wrapper around [`spawn_server`].
pub fn spawn_session(script: Vec<Vec<u8>>) -> (SocketAddr, JoinHandle<Vec<Request>>) {
    spawn_server(vec![script])
}

/// Single connection that waits `delay` before writing each reply.
pub fn spawn_slow_session(
    script: Vec<Vec<u8>>,
    delay: Duration,
) -> (SocketAddr, JoinHandle<Vec<Request>>) {
    serve(vec![script], delay)
}

fn serve(sessions: Vec<Vec<Vec<u8>>>, delay: Duration) -> (SocketAddr, JoinHandle<Vec<Request>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = std::thread::spawn(move || {
        let mut requests = Vec::new();
        for script in sessions {
            let (mut stream, _) = listener.accept().unwrap();
            for reply in script {
                requests.push(read_request(&mut stream));
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
                stream.write_all(&reply).unwrap();
            }
        }
        requests
    });
    (addr, handle)
}

/// A client pointed at the given server address.
pub fn open_client(addr: SocketAddr) -> Client {
    Client::open(config_for(addr).build()).unwrap()
}

/// A config builder pointed at the given server address.
pub fn config_for(addr: SocketAddr) -> cachewire::ClientConfigBuilder {
    ClientConfig::builder()
        .host(addr.ip().to_string())
        .port(addr.port().to_string())
        .timeout_ms(2000)
}

fn read_request(stream: &mut TcpStream) -> Request {
    let mut header = [0u8; HEADER_SIZE];
    stream.read_exact(&mut header).unwrap();
    assert_eq!(header[0], 0x80, "request magic");

    let key_len = u16::from_be_bytes([header[2], header[3]]) as usize;
    let extras_len = header[4] as usize;
    let body_len = u32::from_be_bytes([header[8], header[9], header[10], header[11]]) as usize;
    let cas = u64::from_be_bytes(header[16..24].try_into().unwrap());
    assert!(extras_len + key_len <= body_len, "request lengths");

    let mut body = vec![0u8; body_len];
    stream.read_exact(&mut body).unwrap();

    Request {
        raw_header: header,
        opcode: header[1],
        extras: body[..extras_len].to_vec(),
        key: body[extras_len..extras_len + key_len].to_vec(),
        value: body[extras_len + key_len..].to_vec(),
        cas,
    }
}
