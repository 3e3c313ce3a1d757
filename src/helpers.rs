use regex::Regex;

/// Tries to turn a raw TLS/socket-open failure message into a friendlier
/// certificate mismatch diagnostic.
///
/// The expected shape is the one the TLS layer produces on a
/// subject/hostname mismatch:
///
/// ```plain
/// socket ssl wrapping error: certificate {'subject': 'CN=foo'} ... in ['bar.example.com']
/// ```
///
/// Returns `None` whenever the message does not match that shape. This is
/// a best-effort enrichment over a free-text format; the caller falls
/// back to the raw message.
pub fn interpret_certificate_error(message: &str) -> Option<String> {
    let envelope =
        Regex::new(r"(?i)socket ssl wrapping error: certificate \{(.*)\} .* in \[(.*)\]").ok()?;
    let caps = envelope.captures(message)?;
    let cert = caps.get(1)?.as_str();
    let subject = Regex::new(r#"['"]subject['"]\s*:\s*['"]([^'"]*)['"]"#)
        .ok()?
        .captures(cert)?
        .get(1)?
        .as_str();

    let names: Vec<&str> = caps
        .get(2)?
        .as_str()
        .split(',')
        .map(|n| n.trim().trim_matches(|c| c == '\'' || c == '"'))
        .filter(|n| !n.is_empty())
        .collect();

    Some(format!(
        "certificate error: subject does not match hostnames: {} subject: {}",
        names.join(","),
        subject
    ))
}

#[cfg(test)]
mod interpreter_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(
        "socket ssl wrapping error: certificate {'subject': 'CN=foo'} ... in ['bar.example.com']",
        "certificate error: subject does not match hostnames: bar.example.com subject: CN=foo"
    )]
    #[case(
        "Socket SSL wrapping error: certificate {'subject': 'CN=dc1'} doesn't match any name in ['dc1.example.com', 'ad.example.com']",
        "certificate error: subject does not match hostnames: dc1.example.com,ad.example.com subject: CN=dc1"
    )]
    #[case(
        "socket ssl wrapping error: certificate {\"issuer\": \"CN=ca\", \"subject\": \"CN=dc1,DC=example,DC=com\"} was not valid in [\"dc1\"]",
        "certificate error: subject does not match hostnames: dc1 subject: CN=dc1,DC=example,DC=com"
    )]
    fn extracts_subject_and_hostnames(#[case] message: &str, #[case] expected: &str) {
        assert_eq!(
            interpret_certificate_error(message).as_deref(),
            Some(expected)
        );
    }

    #[rstest]
    #[case("connection refused")]
    #[case("")]
    #[case("socket ssl wrapping error: handshake timed out")]
    // envelope matches but the certificate part carries no subject
    #[case("socket ssl wrapping error: certificate {'issuer': 'CN=ca'} was not valid in ['dc1']")]
    fn unrelated_messages_stay_unparsed(#[case] message: &str) {
        assert_eq!(interpret_certificate_error(message), None);
    }
}
