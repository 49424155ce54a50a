use serde::Serialize;

/// Prefix a ref needs before git and cloc can resolve it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RefPrefix {
    /// Commit hashes are used as-is
    None,
    /// `tags/<name>` becomes `refs/tags/<name>`
    Refs,
    /// Branch on the repository's own remote
    Origin,
    /// Branch on the fork registered as the `base` remote
    Base,
}

impl RefPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefPrefix::None => "",
            RefPrefix::Refs => "refs/",
            RefPrefix::Origin => "origin/",
            RefPrefix::Base => "base/",
        }
    }

    /// Prepend this prefix to `reference`
    pub fn apply(&self, reference: &str) -> String {
        format!("{}{}", self.as_str(), reference)
    }
}

impl std::fmt::Display for RefPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefPrefixPair {
    pub from: RefPrefix,
    pub to: RefPrefix,
}

/// Compute the prefix of each side of a comparison.
///
/// Only the "to" side can point at the `base` remote; a branch on the "from" side
/// always resolves against `origin`.
pub fn resolve_prefixes(to_ref: &str, from_ref: &str, compare_with_remote: bool) -> RefPrefixPair {
    RefPrefixPair {
        to: prefix_for(to_ref, compare_with_remote),
        from: prefix_for(from_ref, false),
    }
}

fn prefix_for(reference: &str, compare_with_remote: bool) -> RefPrefix {
    if reference.starts_with("tags/") {
        RefPrefix::Refs
    } else if is_hash_like(reference) {
        RefPrefix::None
    } else if compare_with_remote {
        RefPrefix::Base
    } else {
        RefPrefix::Origin
    }
}

/// Whether `candidate` has the shape of a full or abbreviated commit hash
pub fn is_hash_like(candidate: &str) -> bool {
    let cleaned = candidate.trim();
    (7..=40).contains(&cleaned.len()) && cleaned.chars().all(|c| c.is_ascii_hexdigit())
}

/// Both sides of a comparison, qualified with their prefixes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRefs {
    pub from: String,
    pub to: String,
    pub prefixes: RefPrefixPair,
}

impl ResolvedRefs {
    pub fn new(from_ref: &str, to_ref: &str, compare_with_remote: bool) -> Self {
        let prefixes = resolve_prefixes(to_ref, from_ref, compare_with_remote);
        Self {
            from: prefixes.from.apply(from_ref),
            to: prefixes.to.apply(to_ref),
            prefixes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_hash_like() {
        let cases = [
            ("535f140d6d9d3532e6f4018cd02ea5b4e83c8e39", true),
            ("aae72b4", true),
            ("AAE72B4", true),
            ("aae72b", false),
            ("xyz123", false),
            ("aae72bz", false),
            ("  aae72b42  ", true),
            ("", false),
            ("aae72b42ad2a4d6a66f787e7297df455c0a2dfb6extra", false),
            ("aae72b42ad2a4d6a66f787e7297df455c0a2dfb6abcde", false),
        ];

        for (input, expected) in cases {
            assert_eq!(is_hash_like(input), expected, "input {:?}", input);
        }
    }

    #[test]
    fn test_two_tags_use_refs_prefix_regardless_of_remote() {
        for remote in [true, false] {
            let pair = resolve_prefixes("tags/tag-on-the-forked-repo", "tags/first-tag", remote);
            assert_eq!(pair.from, RefPrefix::Refs);
            assert_eq!(pair.to, RefPrefix::Refs);
        }
    }

    #[test]
    fn test_two_branches() {
        let pair = resolve_prefixes("remote-branch", "local-branch", true);
        assert_eq!(pair.from, RefPrefix::Origin);
        assert_eq!(pair.to, RefPrefix::Base);

        let pair = resolve_prefixes("remote-branch", "local-branch", false);
        assert_eq!(pair.from, RefPrefix::Origin);
        assert_eq!(pair.to, RefPrefix::Origin);
    }

    #[test]
    fn test_two_commits_have_no_prefix() {
        for remote in [true, false] {
            let pair = resolve_prefixes(
                "aae72b42ad2a4d6a66f787e7297df455c0a2dfb6",
                "535f140d6d9d3532e6f4018cd02ea5b4e83c8e39",
                remote,
            );
            assert_eq!(pair.from, RefPrefix::None);
            assert_eq!(pair.to, RefPrefix::None);
        }
    }

    #[test]
    fn test_commit_and_branch() {
        let from = "535f140d6d9d3532e6f4018cd02ea5b4e83c8e39";

        let pair = resolve_prefixes("a-branch", from, true);
        assert_eq!(pair.from, RefPrefix::None);
        assert_eq!(pair.to, RefPrefix::Base);

        let pair = resolve_prefixes("a-branch", from, false);
        assert_eq!(pair.from, RefPrefix::None);
        assert_eq!(pair.to, RefPrefix::Origin);
    }

    #[test]
    fn test_resolution_is_stable() {
        let first = resolve_prefixes("main", "tags/v1", true);
        let second = resolve_prefixes("main", "tags/v1", true);
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolved_refs_qualify_both_sides() {
        let refs = ResolvedRefs::new("tags/v1.0", "feature/login", true);
        assert_eq!(refs.from, "refs/tags/v1.0");
        assert_eq!(refs.to, "base/feature/login");

        let refs = ResolvedRefs::new("develop", "aae72b4", false);
        assert_eq!(refs.from, "origin/develop");
        assert_eq!(refs.to, "aae72b4");
    }
}
