use std::process::ExitCode;
use std::sync::Arc;

use larder_core::ProxyConfig;
use larder_observe::{FileSink, Level, LogSink};
use larder_policy::{Blocklist, BlocklistPolicy};
use larder_proxy::{signals, ProxyServer};

const CONFIG_PATH: &str = "proxy.conf";
const BLOCKLIST_PATH: &str = "blacklist.txt";
const LOG_PATH: &str = "proxy.log";

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("larder-proxy: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    signals::install()?;

    let config = ProxyConfig::load(CONFIG_PATH)?;
    let blocklist = Blocklist::load(BLOCKLIST_PATH)?;
    let sink: Arc<dyn LogSink> = Arc::new(FileSink::open(LOG_PATH)?);

    if !blocklist.is_empty() {
        sink.log(
            Level::Info,
            &format!("loaded {} blocklist entries", blocklist.len()),
        );
    }

    let port = config.port;
    let policy = Arc::new(BlocklistPolicy::new(blocklist));
    let server = ProxyServer::new(config, policy, Arc::clone(&sink));

    let listener = match server.bind() {
        Ok(listener) => listener,
        Err(error) => {
            sink.log(Level::Fatal, &format!("bind failed on port {port}: {error}"));
            return Err(error.into());
        }
    };

    println!("Proxy server listening on port {port}...");
    server.run_with_listener(listener)?;
    Ok(())
}
