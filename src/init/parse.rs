// SPDX-License-Identifier: Apache-2.0

use std::net::SocketAddr;
use std::time::Duration;
use tower::BoxError;

/// Parse an endpoint, accepting `localhost` in place of the loopback address.
pub fn parse_endpoint(s: &str) -> Result<SocketAddr, BoxError> {
    let sa = match s.strip_prefix("localhost:") {
        Some(port) => format!("127.0.0.1:{port}").parse()?,
        None => s.parse()?,
    };
    Ok(sa)
}

/// Parse a non-zero duration given in whole milliseconds.
pub fn parse_millis(s: &str) -> Result<Duration, BoxError> {
    let ms: u64 = s.trim().parse()?;
    if ms == 0 {
        return Err("duration must be greater than zero".into());
    }
    Ok(Duration::from_millis(ms))
}

#[cfg(test)]
mod test {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn endpoint_parse() {
        let sa = parse_endpoint("localhost:9623");
        assert_ok!(&sa);
        let sa = sa.unwrap();
        assert!(sa.is_ipv4());
        assert_eq!("127.0.0.1", sa.ip().to_string());
        assert_eq!(9623, sa.port());

        let sa = parse_endpoint("[::1]:9623").unwrap();
        assert!(sa.is_ipv6());

        let sa = parse_endpoint("0.0.0.0:1234").unwrap();
        assert_eq!("0.0.0.0", sa.ip().to_string());

        assert_err!(parse_endpoint("localhost"));
        assert_err!(parse_endpoint("example.org:9623"));
    }

    #[test]
    fn millis_parse() {
        assert_eq!(Duration::from_millis(250), parse_millis("250").unwrap());
        assert_eq!(Duration::from_secs(30), parse_millis(" 30000 ").unwrap());
        assert_err!(parse_millis("0"));
        assert_err!(parse_millis("-5"));
        assert_err!(parse_millis("1s"));
    }
}
