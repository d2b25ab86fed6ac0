use crate::error::MdupError;
use url::{ParseError, Url};

/// Where an image reference currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A filesystem path: absolute (`/img/a.png`) or relative to the document.
    Local,
    /// Already served from the configured bucket domain.
    RemoteHosted,
    /// Any other URL; the bucket fetches it server-side.
    External,
}

/// Classifies `reference` against the bucket `domain`.
///
/// Depends only on its two inputs. A reference that carries no scheme is a
/// path; one that cannot be parsed at all is a `Parse` error.
pub fn classify(reference: &str, domain: &Url) -> Result<Origin, MdupError> {
    if reference.starts_with('/') {
        return Ok(Origin::Local);
    }

    let url = match Url::parse(reference) {
        Ok(url) => url,
        Err(ParseError::RelativeUrlWithoutBase) => return Ok(Origin::Local),
        Err(e) => {
            return Err(MdupError::Parse {
                reference: reference.to_string(),
                reason: e.to_string(),
            });
        }
    };

    if is_bucket_url(&url, domain) {
        Ok(Origin::RemoteHosted)
    } else {
        Ok(Origin::External)
    }
}

/// Host comparison includes the port. Default ports are treated as equal to
/// their explicit form, so `http://cdn` matches `http://cdn:80`, but an
/// `https://` reference to an `http://` domain only matches when both ports
/// are spelled out the same.
fn is_bucket_url(url: &Url, domain: &Url) -> bool {
    let http = matches!(url.scheme(), "http" | "https");
    http && url.host_str().is_some()
        && url.host_str() == domain.host_str()
        && same_port(url, domain)
}

fn same_port(url: &Url, domain: &Url) -> bool {
    match (url.port(), domain.port()) {
        (None, None) => true,
        _ => url.port_or_known_default() == domain.port_or_known_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain() -> Url {
        Url::parse("https://cdn.example.com").unwrap()
    }

    #[test]
    fn test_absolute_path_is_local() {
        assert_eq!(classify("/tmp/photo.jpg", &domain()).unwrap(), Origin::Local);
    }

    #[test]
    fn test_relative_path_is_local() {
        assert_eq!(classify("img/a.png", &domain()).unwrap(), Origin::Local);
        assert_eq!(classify("./a.png", &domain()).unwrap(), Origin::Local);
        assert_eq!(classify("../a b.png", &domain()).unwrap(), Origin::Local);
    }

    #[test]
    fn test_bucket_host_is_remote_hosted_for_either_scheme() {
        let d = domain();
        assert_eq!(
            classify("http://cdn.example.com/xyz.png", &d).unwrap(),
            Origin::RemoteHosted
        );
        assert_eq!(
            classify("https://cdn.example.com/a/b", &d).unwrap(),
            Origin::RemoteHosted
        );
    }

    #[test]
    fn test_other_hosts_and_schemes_are_external() {
        let d = domain();
        assert_eq!(
            classify("http://other.com/pic.png", &d).unwrap(),
            Origin::External
        );
        assert_eq!(
            classify("https://sub.cdn.example.com/pic.png", &d).unwrap(),
            Origin::External
        );
        assert_eq!(
            classify("ftp://cdn.example.com/pic.png", &d).unwrap(),
            Origin::External
        );
        assert_eq!(
            classify("data:image/png;base64,AAAA", &d).unwrap(),
            Origin::External
        );
    }

    #[test]
    fn test_port_is_part_of_the_bucket_host() {
        let d = Url::parse("https://cdn.example.com:8080").unwrap();
        assert_eq!(
            classify("https://cdn.example.com:8080/a.png", &d).unwrap(),
            Origin::RemoteHosted
        );
        assert_eq!(
            classify("https://cdn.example.com:9090/a.png", &d).unwrap(),
            Origin::External
        );
        assert_eq!(
            classify("https://cdn.example.com/a.png", &d).unwrap(),
            Origin::External
        );
        assert_eq!(
            classify("https://cdn.example.com:443/a.png", &domain()).unwrap(),
            Origin::RemoteHosted
        );
        assert_eq!(
            classify("http://cdn.example.com/xyz.png", &domain()).unwrap(),
            Origin::RemoteHosted
        );
    }

    #[test]
    fn test_malformed_url_is_parse_error() {
        let err = classify("http://[::1", &domain()).unwrap_err();
        assert!(matches!(err, MdupError::Parse { .. }));
    }
}
