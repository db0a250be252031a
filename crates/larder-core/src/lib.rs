mod config;

pub use config::{ConfigError, ProxyConfig};

/// Methods the proxy accepts on its listening endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Connect,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Connect => "CONNECT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    Http10,
    Http11,
}

impl HttpVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http10 => "HTTP/1.0",
            Self::Http11 => "HTTP/1.1",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    TooShort,
    MissingLineTerminator,
    InvalidUtf8,
    EmptyRequestLine,
    InvalidRequestLine,
    MethodNotSupported,
    InvalidHttpVersion,
    EmptyHost,
    MissingPort,
    InvalidPort,
}

impl ParseError {
    pub fn code(self) -> &'static str {
        match self {
            Self::TooShort => "too_short",
            Self::MissingLineTerminator => "missing_line_terminator",
            Self::InvalidUtf8 => "invalid_utf8",
            Self::EmptyRequestLine => "empty_request_line",
            Self::InvalidRequestLine => "invalid_request_line",
            Self::MethodNotSupported => "method_not_supported",
            Self::InvalidHttpVersion => "invalid_http_version",
            Self::EmptyHost => "empty_host",
            Self::MissingPort => "missing_port",
            Self::InvalidPort => "invalid_port",
        }
    }
}

/// Descriptor for one accepted request line.
///
/// `path` is always present for GET (defaulting to `/`) and always absent
/// for CONNECT. `port` is always present for CONNECT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    pub method: Method,
    pub version: HttpVersion,
    pub host: String,
    pub port: Option<u16>,
    pub path: Option<String>,
}

impl ProxyRequest {
    /// Parses the request line out of a raw client buffer.
    ///
    /// Only the bytes up to the first line terminator are considered; the
    /// buffer itself is never modified.
    pub fn parse(buf: &[u8]) -> Result<Self, ParseError> {
        if buf.len() < 4 {
            return Err(ParseError::TooShort);
        }
        let line_end = buf
            .iter()
            .position(|&b| b == b'\r' || b == b'\n')
            .ok_or(ParseError::MissingLineTerminator)?;
        let line =
            std::str::from_utf8(&buf[..line_end]).map_err(|_| ParseError::InvalidUtf8)?;
        Self::parse_request_line(line)
    }

    /// Parses a single request line already stripped of its terminator.
    pub fn parse_request_line(line: &str) -> Result<Self, ParseError> {
        let mut parts = line.split_whitespace();
        let method = parts.next().ok_or(ParseError::EmptyRequestLine)?;
        let target = parts.next().ok_or(ParseError::InvalidRequestLine)?;
        let version_text = parts.next().ok_or(ParseError::InvalidRequestLine)?;
        if parts.next().is_some() {
            return Err(ParseError::InvalidRequestLine);
        }
        let version = parse_http_version(version_text)?;

        match method {
            "CONNECT" => {
                let (host, port_text) =
                    target.split_once(':').ok_or(ParseError::MissingPort)?;
                if host.is_empty() {
                    return Err(ParseError::EmptyHost);
                }
                let port = port_text
                    .parse::<u16>()
                    .map_err(|_| ParseError::InvalidPort)?;
                Ok(Self {
                    method: Method::Connect,
                    version,
                    host: host.to_string(),
                    port: Some(port),
                    path: None,
                })
            }
            "GET" => {
                let rest = match target.find("://") {
                    Some(index) => &target[index + 3..],
                    None => target,
                };
                let (authority, path) = match rest.find('/') {
                    Some(index) => (&rest[..index], &rest[index..]),
                    None => (rest, "/"),
                };
                let (host, port) = match authority.split_once(':') {
                    Some((host, port_text)) => {
                        let port = port_text
                            .parse::<u16>()
                            .map_err(|_| ParseError::InvalidPort)?;
                        (host, Some(port))
                    }
                    None => (authority, None),
                };
                if host.is_empty() {
                    return Err(ParseError::EmptyHost);
                }
                Ok(Self {
                    method: Method::Get,
                    version,
                    host: host.to_string(),
                    port,
                    path: Some(path.to_string()),
                })
            }
            _ => Err(ParseError::MethodNotSupported),
        }
    }

    /// Formats the descriptor back into a proxy-style request line.
    pub fn request_line(&self) -> String {
        let authority = match self.port {
            Some(port) => format!("{}:{port}", self.host),
            None => self.host.clone(),
        };
        match self.method {
            Method::Connect => {
                format!("CONNECT {authority} {}", self.version.as_str())
            }
            Method::Get => {
                let path = self.path.as_deref().unwrap_or("/");
                format!("GET http://{authority}{path} {}", self.version.as_str())
            }
        }
    }
}

fn parse_http_version(text: &str) -> Result<HttpVersion, ParseError> {
    match text {
        "HTTP/1.0" => Ok(HttpVersion::Http10),
        "HTTP/1.1" => Ok(HttpVersion::Http11),
        _ => Err(ParseError::InvalidHttpVersion),
    }
}

#[cfg(test)]
mod tests {
    use super::{HttpVersion, Method, ParseError, ProxyRequest};

    #[test]
    fn parses_absolute_form_get() {
        let request = ProxyRequest::parse(b"GET http://example.com/index HTTP/1.0\r\n\r\n")
            .expect("must parse");
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.host, "example.com");
        assert_eq!(request.port, None);
        assert_eq!(request.path.as_deref(), Some("/index"));
        assert_eq!(request.version, HttpVersion::Http10);
    }

    #[test]
    fn parses_get_with_explicit_port() {
        let request = ProxyRequest::parse(b"GET http://example.com:8081/a/b HTTP/1.1\r\n")
            .expect("must parse");
        assert_eq!(request.host, "example.com");
        assert_eq!(request.port, Some(8081));
        assert_eq!(request.path.as_deref(), Some("/a/b"));
    }

    #[test]
    fn get_without_path_defaults_to_root() {
        let request =
            ProxyRequest::parse(b"GET http://example.com HTTP/1.0\r\n").expect("must parse");
        assert_eq!(request.path.as_deref(), Some("/"));
    }

    #[test]
    fn get_without_scheme_takes_host_from_authority() {
        let request =
            ProxyRequest::parse(b"GET example.com/x HTTP/1.0\r\n").expect("must parse");
        assert_eq!(request.host, "example.com");
        assert_eq!(request.path.as_deref(), Some("/x"));
    }

    #[test]
    fn parses_connect_with_port() {
        let request =
            ProxyRequest::parse(b"CONNECT secure.test:443 HTTP/1.1\r\n\r\n").expect("must parse");
        assert_eq!(request.method, Method::Connect);
        assert_eq!(request.host, "secure.test");
        assert_eq!(request.port, Some(443));
        assert_eq!(request.path, None);
    }

    #[test]
    fn connect_without_port_fails() {
        let error = ProxyRequest::parse(b"CONNECT secure.test HTTP/1.1\r\n").expect_err("must fail");
        assert_eq!(error, ParseError::MissingPort);
    }

    #[test]
    fn rejects_missing_line_terminator() {
        let error = ProxyRequest::parse(b"GET http://example.com/ HTTP/1.0").expect_err("must fail");
        assert_eq!(error, ParseError::MissingLineTerminator);
    }

    #[test]
    fn rejects_short_buffer() {
        assert_eq!(ProxyRequest::parse(b"GE"), Err(ParseError::TooShort));
    }

    #[test]
    fn rejects_unsupported_method() {
        let error =
            ProxyRequest::parse(b"POST http://example.com/ HTTP/1.1\r\n").expect_err("must fail");
        assert_eq!(error, ParseError::MethodNotSupported);
    }

    #[test]
    fn rejects_missing_version() {
        let error = ProxyRequest::parse(b"GET http://example.com/\r\n").expect_err("must fail");
        assert_eq!(error, ParseError::InvalidRequestLine);
    }

    #[test]
    fn rejects_unknown_version() {
        let error =
            ProxyRequest::parse(b"GET http://example.com/ HTTP/2\r\n").expect_err("must fail");
        assert_eq!(error, ParseError::InvalidHttpVersion);
    }

    #[test]
    fn rejects_empty_host() {
        let error = ProxyRequest::parse(b"GET http:///missing HTTP/1.0\r\n").expect_err("must fail");
        assert_eq!(error, ParseError::EmptyHost);
    }

    #[test]
    fn rejects_non_numeric_port() {
        let error =
            ProxyRequest::parse(b"CONNECT secure.test:https HTTP/1.1\r\n").expect_err("must fail");
        assert_eq!(error, ParseError::InvalidPort);
    }

    #[test]
    fn only_first_line_is_considered() {
        let request = ProxyRequest::parse(b"GET http://a.test/ HTTP/1.0\nHost: b.test\r\n\r\n")
            .expect("must parse");
        assert_eq!(request.host, "a.test");
    }
}
