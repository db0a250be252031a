use std::io;
use std::path::Path;

use larder_core::{Method, ProxyRequest};

const MAX_BLOCKLIST_ENTRIES: usize = 100;

/// What a worker should do with a parsed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAction {
    /// Serve through the cache, talking to the origin on a miss.
    Fetch,
    /// Open an opaque CONNECT tunnel to the origin.
    Tunnel,
    /// Refuse the request and close early.
    Block,
}

impl RouteAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Tunnel => "tunnel",
            Self::Block => "block",
        }
    }
}

pub trait RoutePolicy: Send + Sync {
    fn decide(&self, request: &ProxyRequest) -> RouteAction;
}

/// Static list of forbidden domain substrings, read-only after startup.
#[derive(Debug, Clone, Default)]
pub struct Blocklist {
    domains: Vec<String>,
}

impl Blocklist {
    pub fn new(domains: Vec<String>) -> Self {
        let domains = domains
            .into_iter()
            .take(MAX_BLOCKLIST_ENTRIES)
            .collect();
        Self { domains }
    }

    /// Reads one domain substring per line, skipping blanks, capped at 100
    /// entries. A missing file yields an empty list.
    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(error) => return Err(error),
        };
        let domains = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .take(MAX_BLOCKLIST_ENTRIES)
            .map(str::to_string)
            .collect();
        Ok(Self { domains })
    }

    /// True iff any entry is a case-sensitive substring of `host`.
    pub fn is_blocked(&self, host: &str) -> bool {
        if host.is_empty() {
            return false;
        }
        self.domains.iter().any(|domain| host.contains(domain.as_str()))
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// Production policy: blocklisted hosts are refused, everything else is
/// routed by method.
#[derive(Debug, Clone, Default)]
pub struct BlocklistPolicy {
    blocklist: Blocklist,
}

impl BlocklistPolicy {
    pub fn new(blocklist: Blocklist) -> Self {
        Self { blocklist }
    }

    pub fn blocklist(&self) -> &Blocklist {
        &self.blocklist
    }
}

impl RoutePolicy for BlocklistPolicy {
    fn decide(&self, request: &ProxyRequest) -> RouteAction {
        if self.blocklist.is_blocked(&request.host) {
            return RouteAction::Block;
        }
        match request.method {
            Method::Connect => RouteAction::Tunnel,
            Method::Get => RouteAction::Fetch,
        }
    }
}
