use std::io::{self, Read, Write};
use std::net::TcpStream;

use bytes::Bytes;
use larder_core::ProxyRequest;
use larder_observe::Level;

use crate::{resolve_ipv4, WorkerContext, IO_CHUNK_SIZE};

const DEFAULT_HTTP_PORT: u16 = 80;

/// Serves one GET: cache lookup, then origin fetch with the response
/// streamed to the client while it accumulates for the cache.
pub(crate) fn run(mut client: TcpStream, request: &ProxyRequest, context: &WorkerContext) {
    let sink = &context.sink;
    let Some(path) = request.path.as_deref() else {
        sink.log(Level::Error, "cannot build cache key from incomplete request");
        return;
    };
    let cache_key = format!("{}{path}", request.host);

    if let Some(payload) = context.cache.get(&cache_key) {
        if let Err(error) = client.write_all(&payload) {
            sink.log(
                Level::Error,
                &format!("client write failed for {cache_key}: {error}"),
            );
        }
        return;
    }

    let port = request.port.unwrap_or(DEFAULT_HTTP_PORT);
    let addr = match resolve_ipv4(&request.host, port) {
        Ok(addr) => addr,
        Err(error) => {
            sink.log(
                Level::Error,
                &format!("cannot resolve host {}: {error}", request.host),
            );
            return;
        }
    };
    let mut origin = match TcpStream::connect(addr) {
        Ok(origin) => origin,
        Err(error) => {
            sink.log(
                Level::Error,
                &format!("failed to connect to origin {}: {error}", request.host),
            );
            return;
        }
    };

    let rewritten = format!(
        "GET {path} {}\r\nHost: {}\r\nConnection: close\r\n\r\n",
        request.version.as_str(),
        request.host
    );
    sink.log(
        Level::Info,
        &format!("forwarding request for {}", request.host),
    );
    if let Err(error) = origin.write_all(rewritten.as_bytes()) {
        sink.log(
            Level::Error,
            &format!("failed to send request to origin {}: {error}", request.host),
        );
        return;
    }

    // Forward each chunk before appending it; accumulation is bounded by
    // the per-element ceiling, so an oversized response stops the read
    // loop once the buffer fills.
    let ceiling = context.max_element_bytes;
    let mut accumulated: Vec<u8> = Vec::new();
    let mut chunk = [0_u8; IO_CHUNK_SIZE];
    loop {
        let remaining = ceiling - accumulated.len();
        if remaining == 0 {
            break;
        }
        let read = match origin.read(&mut chunk[..remaining.min(IO_CHUNK_SIZE)]) {
            Ok(0) => break,
            Ok(read) => read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        };
        if let Err(error) = client.write_all(&chunk[..read]) {
            sink.log(
                Level::Error,
                &format!("client write failed for {cache_key}: {error}"),
            );
            return;
        }
        accumulated.extend_from_slice(&chunk[..read]);
    }

    if !accumulated.is_empty() {
        context.cache.put(&cache_key, Bytes::from(accumulated));
    }
}
