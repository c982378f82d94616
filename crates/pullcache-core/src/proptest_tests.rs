//! Property-based tests for pullcache-core types.
//!
//! These tests use proptest to verify invariants across many randomly generated inputs.

use proptest::prelude::*;

use crate::{ArtifactKey, ContentDigest, Descriptor, ManifestList, MediaType, Platform};

/// Strategy for generating operating systems.
fn os_strategy() -> impl Strategy<Value = String> {
    "(linux|windows|freebsd)"
}

/// Strategy for generating architectures.
fn arch_strategy() -> impl Strategy<Value = String> {
    "(amd64|arm64|arm|386|s390x|ppc64le)"
}

/// Strategy for generating variants (often empty).
fn variant_strategy() -> impl Strategy<Value = String> {
    "(|v6|v7|v8)"
}

/// Strategy for generating a platform-tagged list entry.
fn entry_strategy() -> impl Strategy<Value = Descriptor> {
    (
        any::<Vec<u8>>(),
        os_strategy(),
        arch_strategy(),
        variant_strategy(),
        1u64..100_000,
    )
        .prop_map(|(seed, os, arch, variant, size)| {
            Descriptor::new(
                MediaType::docker_manifest(),
                ContentDigest::sha256_of(&seed),
                size,
            )
            .with_platform(Platform::new(os, arch, &variant))
        })
}

/// Strategy for generating manifest lists.
fn list_strategy() -> impl Strategy<Value = ManifestList> {
    prop::collection::vec(entry_strategy(), 0..12)
        .prop_map(|entries| ManifestList::new(MediaType::docker_manifest_list(), entries))
}

/// Strategy for generating repository names.
fn repository_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{1,12}(/[a-z][a-z0-9-]{1,12}){0,2}"
}

/// Strategy for generating tags.
fn tag_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_][a-zA-Z0-9_.-]{0,20}"
}

proptest! {
    #[test]
    fn select_platform_keeps_only_matching_entries(
        list in list_strategy(),
        os in os_strategy(),
        arch in arch_strategy(),
        variant in variant_strategy(),
    ) {
        let selected = list.select_platform(&os, &arch, &variant);
        for entry in &selected.manifests {
            prop_assert!(entry.matches_platform(&os, &arch, &variant));
        }
        let expected = list
            .manifests
            .iter()
            .filter(|d| d.matches_platform(&os, &arch, &variant))
            .count();
        prop_assert_eq!(selected.manifests.len(), expected);
    }

    #[test]
    fn select_platform_preserves_relative_order(
        list in list_strategy(),
        os in os_strategy(),
        arch in arch_strategy(),
        variant in variant_strategy(),
    ) {
        let selected = list.select_platform(&os, &arch, &variant);
        let mut cursor = list.manifests.iter();
        for entry in &selected.manifests {
            prop_assert!(cursor.any(|d| d == entry));
        }
    }

    #[test]
    fn select_platform_is_idempotent(
        list in list_strategy(),
        os in os_strategy(),
        arch in arch_strategy(),
        variant in variant_strategy(),
    ) {
        let once = list.select_platform(&os, &arch, &variant);
        let twice = once.select_platform(&os, &arch, &variant);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn keys_for_different_tags_never_collide(
        repo in repository_strategy(),
        a in tag_strategy(),
        b in tag_strategy(),
    ) {
        prop_assume!(a != b);
        prop_assert_ne!(ArtifactKey::new(&repo, &a), ArtifactKey::new(&repo, &b));
    }

    #[test]
    fn computed_digests_always_parse(data in any::<Vec<u8>>()) {
        let digest = ContentDigest::sha256_of(&data);
        let parsed = ContentDigest::parse(digest.as_str());
        prop_assert!(parsed.is_ok());
        prop_assert_eq!(parsed.unwrap(), digest);
    }
}
