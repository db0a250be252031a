use larder_core::{Method, ParseError, ProxyRequest};
use proptest::prelude::*;

fn host_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z0-9](?:[a-z0-9.-]{0,30}[a-z0-9])?")
        .expect("valid hostname regex")
}

fn path_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("/[a-zA-Z0-9._~/-]{0,40}").expect("valid path regex")
}

proptest! {
    #[test]
    fn accepted_get_lines_round_trip(
        host in host_strategy(),
        port in proptest::option::of(1_u16..=u16::MAX),
        path in path_strategy(),
    ) {
        let authority = match port {
            Some(port) => format!("{host}:{port}"),
            None => host.clone(),
        };
        let line = format!("GET http://{authority}{path} HTTP/1.0");
        let parsed = ProxyRequest::parse_request_line(&line)
            .expect("canonical GET line must parse");
        prop_assert_eq!(&parsed.host, &host);
        prop_assert_eq!(parsed.port, port);
        prop_assert_eq!(parsed.path.as_deref(), Some(path.as_str()));

        let reparsed = ProxyRequest::parse_request_line(&parsed.request_line())
            .expect("serialized descriptor must re-parse");
        prop_assert_eq!(reparsed, parsed);
    }

    #[test]
    fn accepted_connect_lines_round_trip(host in host_strategy(), port in 1_u16..=u16::MAX) {
        let line = format!("CONNECT {host}:{port} HTTP/1.1");
        let parsed = ProxyRequest::parse_request_line(&line)
            .expect("canonical CONNECT line must parse");
        prop_assert_eq!(parsed.method, Method::Connect);
        prop_assert_eq!(&parsed.host, &host);
        prop_assert_eq!(parsed.port, Some(port));

        let reparsed = ProxyRequest::parse_request_line(&parsed.request_line())
            .expect("serialized descriptor must re-parse");
        prop_assert_eq!(reparsed, parsed);
    }

    #[test]
    fn connect_without_colon_is_rejected(host in host_strategy()) {
        let line = format!("CONNECT {host} HTTP/1.1");
        let error = ProxyRequest::parse_request_line(&line).expect_err("must fail");
        prop_assert_eq!(error, ParseError::MissingPort);
    }
}
