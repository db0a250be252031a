//! Minimal client for exercising a running proxy by hand:
//!
//! ```text
//! cargo run --example fetch_client -- 127.0.0.1 8080 http://example.com/
//! ```

use std::io::{Read, Write};
use std::net::TcpStream;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let [_, proxy_host, proxy_port, url] = args.as_slice() else {
        eprintln!("usage: fetch_client <proxy_host> <proxy_port> <url>");
        return ExitCode::FAILURE;
    };
    let port: u16 = match proxy_port.parse() {
        Ok(port) => port,
        Err(_) => {
            eprintln!("invalid proxy port: {proxy_port}");
            return ExitCode::FAILURE;
        }
    };

    match fetch(proxy_host, port, url) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("fetch failed: {error}");
            ExitCode::FAILURE
        }
    }
}

fn fetch(proxy_host: &str, proxy_port: u16, url: &str) -> std::io::Result<()> {
    let mut stream = TcpStream::connect((proxy_host, proxy_port))?;
    println!("--- connected to proxy at {proxy_host}:{proxy_port} ---");

    let request = format!(
        "GET {url} HTTP/1.0\r\nHost: {}\r\nConnection: close\r\n\r\n",
        hostname_from_url(url)
    );
    print!("--- sending request ---\n{request}");
    stream.write_all(request.as_bytes())?;

    println!("--- receiving response ---");
    let mut buffer = [0_u8; 8 * 1024];
    loop {
        let read = stream.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        print!("{}", String::from_utf8_lossy(&buffer[..read]));
    }
    println!("\n--- connection closed ---");
    Ok(())
}

fn hostname_from_url(url: &str) -> &str {
    let rest = match url.find("://") {
        Some(index) => &url[index + 3..],
        None => url,
    };
    match rest.find('/') {
        Some(index) => &rest[..index],
        None => rest,
    }
}
