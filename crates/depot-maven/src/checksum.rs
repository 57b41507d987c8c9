//! Digest verification of repository files against their sidecar checksums.

use std::fmt;

use depot_util::hash::{md5_bytes, sha1_bytes, sha256_bytes};

use crate::download::Fetcher;
use crate::repository::RemoteRepository;

/// Supported digest algorithms, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Md5,
    Sha1,
    Sha256,
}

impl Algorithm {
    pub const PREFERENCE: [Algorithm; 3] = [Algorithm::Md5, Algorithm::Sha1, Algorithm::Sha256];

    /// Sidecar file extension, e.g. `md5` for `lib-1.0.pom.md5`.
    pub fn extension(&self) -> &'static str {
        match self {
            Algorithm::Md5 => "md5",
            Algorithm::Sha1 => "sha1",
            Algorithm::Sha256 => "sha256",
        }
    }

    /// Lowercase hex digest of `data`.
    pub fn hex(&self, data: &[u8]) -> String {
        match self {
            Algorithm::Md5 => md5_bytes(data),
            Algorithm::Sha1 => sha1_bytes(data),
            Algorithm::Sha256 => sha256_bytes(data),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Algorithm::Md5 => "MD5",
            Algorithm::Sha1 => "SHA-1",
            Algorithm::Sha256 => "SHA-256",
        })
    }
}

/// Whether a sidecar's content vouches for `computed`.
///
/// Sidecars may be just the hash or `hash  filename`, in any case, so the
/// trimmed content only has to start with the computed hex digest.
pub fn matches(computed: &str, sidecar: &str) -> bool {
    !computed.is_empty()
        && sidecar
            .trim()
            .to_ascii_lowercase()
            .starts_with(&computed.to_ascii_lowercase())
}

/// Verify `data` (the content of `relative`) against `repo`'s published digests.
///
/// Tries each algorithm in [`Algorithm::PREFERENCE`] order and returns the
/// first one whose sidecar matches. Fails closed: a missing sidecar, a
/// mismatch or a failed sidecar download never counts as verified.
pub async fn verify(
    fetcher: &Fetcher,
    repo: &RemoteRepository,
    relative: &str,
    data: &[u8],
) -> Option<Algorithm> {
    for algo in Algorithm::PREFERENCE {
        let sidecar = format!("{relative}.{}", algo.extension());
        match fetcher.fetch_text(repo, &sidecar).await {
            Ok(Some(expected)) => {
                let actual = algo.hex(data);
                if matches(&actual, &expected) {
                    tracing::debug!("{algo} ok for {}", repo.file_url(relative));
                    return Some(algo);
                }
                tracing::warn!(
                    "{algo} mismatch for {}: expected {}, got {actual}",
                    repo.file_url(relative),
                    expected.trim()
                );
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Could not fetch {algo} for {}: {e}", repo.file_url(relative));
            }
        }
    }
    tracing::warn!("No matching checksum for {}", repo.file_url(relative));
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_plain_hash() {
        assert!(matches("abc123", "abc123\n"));
    }

    #[test]
    fn matches_hash_with_filename() {
        assert!(matches("abc123", "abc123  my-lib-1.0.jar\n"));
    }

    #[test]
    fn matches_is_case_insensitive() {
        assert!(matches("5eb63bbbe01eeed093cb22bb8f5acdc3", "5EB63BBBE01EEED093CB22BB8F5ACDC3"));
    }

    #[test]
    fn mismatch_and_empty_sidecar_fail() {
        assert!(!matches("abc123", "def456"));
        assert!(!matches("abc123", ""));
        assert!(!matches("", "anything"));
    }

    #[test]
    fn preference_order_is_md5_sha1_sha256() {
        let exts: Vec<&str> = Algorithm::PREFERENCE.iter().map(|a| a.extension()).collect();
        assert_eq!(exts, vec!["md5", "sha1", "sha256"]);
    }

    #[test]
    fn md5_computation() {
        assert_eq!(
            Algorithm::Md5.hex(b"hello world"),
            "5eb63bbbe01eeed093cb22bb8f5acdc3"
        );
    }

    #[tokio::test]
    async fn verify_falls_through_to_sha1_when_md5_is_wrong() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("f.pom.md5"), "00000000000000000000000000000000").unwrap();
        std::fs::write(tmp.path().join("f.pom.sha1"), sha1_bytes(b"data")).unwrap();
        let repo = RemoteRepository::from_dir(tmp.path()).unwrap();
        let fetcher = Fetcher::new(crate::download::build_client().unwrap());

        assert_eq!(
            verify(&fetcher, &repo, "f.pom", b"data").await,
            Some(Algorithm::Sha1)
        );
        assert_eq!(verify(&fetcher, &repo, "f.pom", b"other").await, None);
    }

    #[tokio::test]
    async fn verify_without_sidecars_is_untrusted() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = RemoteRepository::from_dir(tmp.path()).unwrap();
        let fetcher = Fetcher::new(crate::download::build_client().unwrap());
        assert_eq!(verify(&fetcher, &repo, "f.pom", b"data").await, None);
    }
}
