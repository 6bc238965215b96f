//! Subject validation and wildcard matching.
//!
//! Subjects are dot-separated tokens. Publish subjects contain no wildcards;
//! subscription filters may use `*` for exactly one token and `>` as the
//! final token for one or more trailing tokens.

fn token_is_clean(token: &str) -> bool {
    !token.is_empty() && !token.chars().any(|c| c.is_whitespace() || c.is_control())
}

/// Returns true if `subject` can be published to.
pub fn is_valid_subject(subject: &str) -> bool {
    !subject.is_empty()
        && subject
            .split('.')
            .all(|t| token_is_clean(t) && !t.contains('*') && !t.contains('>'))
}

/// Returns true if `filter` can be subscribed to.
pub fn is_valid_filter(filter: &str) -> bool {
    if filter.is_empty() {
        return false;
    }
    let tokens: Vec<&str> = filter.split('.').collect();
    let last = tokens.len() - 1;
    tokens.iter().enumerate().all(|(i, t)| match *t {
        "*" => true,
        ">" => i == last,
        t => token_is_clean(t) && !t.contains('*') && !t.contains('>'),
    })
}

/// Returns true if the publish subject `subject` is covered by `filter`.
pub fn subject_matches(filter: &str, subject: &str) -> bool {
    let mut filter_tokens = filter.split('.');
    let mut subject_tokens = subject.split('.');
    loop {
        match (filter_tokens.next(), subject_tokens.next()) {
            (Some(">"), Some(_)) => return true,
            (Some("*"), Some(_)) => {}
            (Some(f), Some(s)) if f == s => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_subjects() {
        assert!(is_valid_subject("svc.endpoint"));
        assert!(is_valid_subject("_INBOX.a1B2c3"));
        assert!(!is_valid_subject(""));
        assert!(!is_valid_subject("svc..endpoint"));
        assert!(!is_valid_subject(".svc"));
        assert!(!is_valid_subject("svc.*"));
        assert!(!is_valid_subject("svc.>"));
        assert!(!is_valid_subject("svc end"));
        assert!(!is_valid_subject("svc\n"));
    }

    #[test]
    fn filters() {
        assert!(is_valid_filter("svc.*"));
        assert!(is_valid_filter("svc.>"));
        assert!(is_valid_filter(">"));
        assert!(!is_valid_filter("svc.>.x"));
        assert!(!is_valid_filter("svc.a*"));
        assert!(!is_valid_filter(""));
    }

    #[test]
    fn matching() {
        assert!(subject_matches("svc.echo", "svc.echo"));
        assert!(!subject_matches("svc.echo", "svc.echo.v2"));
        assert!(subject_matches("svc.*", "svc.echo"));
        assert!(!subject_matches("svc.*", "svc.echo.v2"));
        assert!(subject_matches("svc.>", "svc.echo.v2"));
        assert!(!subject_matches("svc.>", "svc"));
        assert!(subject_matches("*.echo", "svc.echo"));
        assert!(!subject_matches("svc.echo", "svc"));
    }
}
