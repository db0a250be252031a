use std::io::{self, Read, Write};
use std::net::TcpStream;

use larder_core::ProxyRequest;
use larder_observe::Level;
use larder_policy::RouteAction;

use crate::task_queue::TaskQueue;
use crate::{fetch, tunnel, WorkerContext, MAX_REQUEST_BYTES};

const FORBIDDEN_RESPONSE: &[u8] = b"HTTP/1.1 403 Forbidden\r\nContent-Length: 0\r\n\r\n";

/// One worker thread: pop a socket, handle the connection, close it, and
/// repeat until the queue signals shutdown.
pub(crate) fn worker_loop(queue: &TaskQueue<TcpStream>, context: &WorkerContext) {
    while let Some(client) = queue.pop() {
        handle_connection(client, context);
    }
}

fn handle_connection(mut client: TcpStream, context: &WorkerContext) {
    let mut buffer = [0_u8; MAX_REQUEST_BYTES];
    let read = loop {
        match client.read(&mut buffer) {
            Ok(0) => return,
            Ok(read) => break read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => return,
        }
    };

    let request = match ProxyRequest::parse(&buffer[..read]) {
        Ok(request) => request,
        Err(error) => {
            context.sink.log(
                Level::Error,
                &format!("failed to parse request: {}", error.code()),
            );
            return;
        }
    };

    match context.policy.decide(&request) {
        RouteAction::Block => {
            context
                .sink
                .log(Level::Warn, &format!("blocked host: {}", request.host));
            let _ = client.write_all(FORBIDDEN_RESPONSE);
        }
        RouteAction::Tunnel => tunnel::run(client, &request, context),
        RouteAction::Fetch => fetch::run(client, &request, context),
    }
}
