//! Helpers for registry API paths and repository names.

use crate::digest::ContentDigest;

const API_PREFIX: &str = "/v2/";
const BLOBS_SEGMENT: &str = "/blobs/";

/// Extracts the repository name from a `/v2/<repo>/blobs/<digest>` path.
///
/// Returns `None` when the path has no repository before `/blobs/`.
///
/// # Examples
///
/// ```
/// use pullcache_core::parse_repository;
///
/// assert_eq!(
///     parse_repository("/v2/proxy/library/alpine/blobs/sha256:abc"),
///     Some("proxy/library/alpine"),
/// );
/// assert_eq!(parse_repository("/v2/_catalog"), None);
/// ```
#[must_use]
pub fn parse_repository(path: &str) -> Option<&str> {
    let rest = path.strip_prefix(API_PREFIX).unwrap_or(path);
    match rest.rfind(BLOBS_SEGMENT) {
        Some(i) if i > 0 => Some(&rest[..i]),
        _ => None,
    }
}

/// Extracts the blob digest from a blob URL or path.
///
/// The algorithm written in the path is kept as is, so
/// `.../blobs/sha512:...` yields a `sha512` digest.
///
/// # Examples
///
/// ```
/// use pullcache_core::parse_blob_digest;
///
/// let path = "/v2/lib/x/blobs/sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
/// assert_eq!(parse_blob_digest(path).unwrap().algorithm(), "sha256");
/// assert!(parse_blob_digest("/v2/lib/x/blobs/uploads/").is_none());
/// ```
#[must_use]
pub fn parse_blob_digest(path: &str) -> Option<ContentDigest> {
    let candidate = path
        .rfind(BLOBS_SEGMENT)
        .map_or(path, |i| &path[i + BLOBS_SEGMENT.len()..]);
    let candidate = candidate.split(['?', '#']).next().unwrap_or_default();
    ContentDigest::parse(candidate).ok()
}

/// Strips a leading `project/` from a repository name.
///
/// # Examples
///
/// ```
/// use pullcache_core::trim_proxy_prefix;
///
/// assert_eq!(trim_proxy_prefix("dockerhub", "dockerhub/library/hello-world"), "library/hello-world");
/// assert_eq!(trim_proxy_prefix("dockerhub", "library/hello-world"), "library/hello-world");
/// ```
#[must_use]
pub fn trim_proxy_prefix<'a>(project_name: &str, repository: &'a str) -> &'a str {
    repository
        .strip_prefix(project_name)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(repository)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn test_parse_repository_nested() {
        assert_eq!(
            parse_repository(&format!("/v2/a/b/c/blobs/sha256:{HEX}")),
            Some("a/b/c")
        );
    }

    #[test]
    fn test_parse_repository_uses_last_blobs_segment() {
        assert_eq!(
            parse_repository("/v2/team/blobs/store/blobs/sha256:x"),
            Some("team/blobs/store")
        );
    }

    #[test]
    fn test_parse_repository_without_repo() {
        assert_eq!(parse_repository("/v2//blobs/sha256:x"), None);
        assert_eq!(parse_repository("/v2/lib/x/manifests/latest"), None);
    }

    #[test]
    fn test_parse_blob_digest_keeps_algorithm() {
        let sha512 = "a".repeat(128);
        let digest = parse_blob_digest(&format!("/v2/lib/x/blobs/sha512:{sha512}")).unwrap();
        assert_eq!(digest.algorithm(), "sha512");
        assert_eq!(digest.encoded(), sha512);
    }

    #[test]
    fn test_parse_blob_digest_strips_query() {
        let digest = parse_blob_digest(&format!("/v2/lib/x/blobs/sha256:{HEX}?ns=docker.io"));
        assert_eq!(digest.map(|d| d.encoded().to_string()), Some(HEX.to_string()));
    }

    #[test]
    fn test_parse_blob_digest_bare_digest() {
        assert!(parse_blob_digest(&format!("sha256:{HEX}")).is_some());
        assert!(parse_blob_digest("sha256:short").is_none());
    }

    #[test]
    fn test_trim_proxy_prefix_requires_separator() {
        assert_eq!(trim_proxy_prefix("hub", "hubble/app"), "hubble/app");
        assert_eq!(trim_proxy_prefix("hub", "hub/app"), "app");
    }
}
