//! Semantic-version engine (parse / render / compare / bump).
//!
//! The numeric-triple and grammar validation are delegated to the `semver`
//! crate's `Version`/`Prerelease`/`BuildMetadata` types rather than
//! hand-rolling SemVer 2.0.0 grammar checks. The pre-release increment
//! heuristic and the `v`-prefix tolerance have no equivalent there and are
//! layered on top.

use std::cmp::Ordering;
use std::fmt;

use crate::error::Error;

/// A parsed, canonical SemVer 2.0.0 value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    /// Dot-separated pre-release identifiers, rendered without the leading `-`.
    pub pre_release: String,
    /// Dot-separated build identifiers, rendered without the leading `+`.
    pub build: String,
}

impl SemVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        SemVersion { major, minor, patch, pre_release: String::new(), build: String::new() }
    }

    /// Parses a SemVer 2.0.0 string, tolerating a single leading `v`.
    ///
    /// Rejects leading/trailing whitespace in the numeric core, enforces three
    /// dotted non-negative integers, and accepts `-PRE` then `+BUILD` suffixes.
    pub fn parse(s: &str) -> Result<SemVersion, Error> {
        if s.is_empty() {
            return Err(invalid(s, "empty version string"));
        }
        if s.trim() != s {
            return Err(invalid(s, "leading or trailing whitespace"));
        }

        let stripped = s.strip_prefix('v').unwrap_or(s);

        let parsed = semver::Version::parse(stripped)
            .map_err(|e| invalid(s, &e.to_string()))?;

        Ok(SemVersion {
            major: parsed.major,
            minor: parsed.minor,
            patch: parsed.patch,
            pre_release: parsed.pre.as_str().to_string(),
            build: parsed.build.as_str().to_string(),
        })
    }

    /// Canonical rendering: `MAJOR.MINOR.PATCH[-PRE][+BUILD]`, omitting empty
    /// suffixes.
    pub fn render(&self) -> String {
        let mut out = format!("{}.{}.{}", self.major, self.minor, self.patch);
        if !self.pre_release.is_empty() {
            out.push('-');
            out.push_str(&self.pre_release);
        }
        if !self.build.is_empty() {
            out.push('+');
            out.push_str(&self.build);
        }
        out
    }

    fn as_semver(&self) -> Result<semver::Version, Error> {
        let rendered = format!("{}.{}.{}", self.major, self.minor, self.patch);
        let mut v = semver::Version::parse(&rendered).map_err(|e| invalid(&rendered, &e.to_string()))?;
        if !self.pre_release.is_empty() {
            v.pre = semver::Prerelease::new(&self.pre_release)
                .map_err(|e| invalid(&self.pre_release, &e.to_string()))?;
        }
        Ok(v)
    }

    /// SemVer 2.0.0 precedence. Build metadata is not consulted.
    pub fn compare(&self, other: &SemVersion) -> Ordering {
        // as_semver() never fails for values already parsed through `parse`,
        // but we degrade to a field-wise comparison rather than panic on a
        // hand-constructed SemVersion with an unusual pre-release string.
        match (self.as_semver(), other.as_semver()) {
            (Ok(a), Ok(b)) => a.cmp(&b),
            _ => (self.major, self.minor, self.patch, pre_rank(&self.pre_release))
                .cmp(&(other.major, other.minor, other.patch, pre_rank(&other.pre_release))),
        }
    }

    pub fn bump_patch(&self) -> SemVersion {
        SemVersion::new(self.major, self.minor, self.patch + 1)
    }

    pub fn bump_minor(&self) -> SemVersion {
        SemVersion::new(self.major, self.minor + 1, 0)
    }

    pub fn bump_major(&self) -> SemVersion {
        SemVersion::new(self.major + 1, 0, 0)
    }

    /// Strips pre-release unconditionally. When `preserve_metadata` is set,
    /// build metadata survives the transition instead of also being cleared.
    pub fn bump_release(&self, preserve_metadata: bool) -> SemVersion {
        SemVersion {
            major: self.major,
            minor: self.minor,
            patch: self.patch,
            pre_release: String::new(),
            build: if preserve_metadata { self.build.clone() } else { String::new() },
        }
    }

    /// Drops the pre-release if one is present; otherwise bumps the patch.
    pub fn next_auto(&self) -> Result<SemVersion, Error> {
        if !self.pre_release.is_empty() {
            Ok(SemVersion {
                major: self.major,
                minor: self.minor,
                patch: self.patch,
                pre_release: String::new(),
                build: self.build.clone(),
            })
        } else {
            Ok(self.bump_patch())
        }
    }
}

impl fmt::Display for SemVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl PartialOrd for SemVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl Ord for SemVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

fn invalid(value: &str, reason: &str) -> Error {
    Error::InvalidVersion { value: value.to_string(), reason: reason.to_string() }
}

fn pre_rank(pre: &str) -> (bool, &str) {
    // Absent pre-release sorts greater than any present one.
    (pre.is_empty(), pre)
}

/// Increments the trailing numeric of `current`'s pre-release against `label`.
///
/// - If `current` begins with `label` followed by an optional `.`/`-` separator
///   (or none) and an integer suffix, that integer is incremented, preserving
///   the separator shape.
/// - If `current` equals `label` with no numeric suffix, `.1` is appended.
/// - Otherwise (the label differs), the result is `{label}.1`.
pub fn increment_pre_release(current: &str, label: &str) -> String {
    if current == label {
        return format!("{}.1", label);
    }

    if let Some(rest) = current.strip_prefix(label) {
        let (separator, numeric_part) = if let Some(n) = rest.strip_prefix('.') {
            (".", n)
        } else if let Some(n) = rest.strip_prefix('-') {
            ("-", n)
        } else {
            ("", rest)
        };

        if !numeric_part.is_empty() && numeric_part.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(n) = numeric_part.parse::<u64>() {
                return format!("{}{}{}", label, separator, n + 1);
            }
        }
    }

    format!("{}.1", label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_v_prefix() {
        assert_eq!(SemVersion::parse("v1.2.3").unwrap(), SemVersion::new(1, 2, 3));
    }

    #[test]
    fn rejects_surrounding_whitespace() {
        assert!(SemVersion::parse(" 1.2.3").is_err());
        assert!(SemVersion::parse("1.2.3 ").is_err());
    }

    #[test]
    fn rejects_leading_zero_numeric_identifier() {
        assert!(SemVersion::parse("1.2.3-01").is_err());
    }

    #[test]
    fn render_omits_empty_suffixes() {
        assert_eq!(SemVersion::new(1, 2, 3).render(), "1.2.3");
        let mut v = SemVersion::new(1, 2, 3);
        v.pre_release = "beta.1".to_string();
        v.build = "build.7".to_string();
        assert_eq!(v.render(), "1.2.3-beta.1+build.7");
    }

    #[test]
    fn render_round_trips_parse() {
        for s in ["1.2.3", "0.0.1-alpha", "2.0.0-rc.1+exp.sha.5114f85"] {
            assert_eq!(SemVersion::parse(s).unwrap().render(), s);
        }
    }

    #[test]
    fn bump_patch_resets_nothing_else() {
        let v = SemVersion::new(1, 2, 3);
        assert_eq!(v.bump_patch(), SemVersion::new(1, 2, 4));
    }

    #[test]
    fn bump_minor_resets_patch() {
        let v = SemVersion::new(1, 2, 3);
        assert_eq!(v.bump_minor(), SemVersion::new(1, 3, 0));
    }

    #[test]
    fn bump_major_resets_minor_and_patch() {
        let v = SemVersion::new(1, 2, 3);
        assert_eq!(v.bump_major(), SemVersion::new(2, 0, 0));
    }

    #[test]
    fn bump_minor_drops_pre_and_build() {
        let v = SemVersion::parse("1.2.3-beta.1+build.7").unwrap();
        assert_eq!(v.bump_minor(), SemVersion::new(1, 3, 0));
    }

    #[test]
    fn compare_orders_pre_release_before_release() {
        let pre = SemVersion::parse("1.0.0-alpha").unwrap();
        let release = SemVersion::parse("1.0.0").unwrap();
        assert_eq!(pre.compare(&release), Ordering::Less);
    }

    #[test]
    fn compare_ignores_build_metadata() {
        let a = SemVersion::parse("1.0.0+a").unwrap();
        let b = SemVersion::parse("1.0.0+b").unwrap();
        assert_eq!(a.compare(&b), Ordering::Equal);
    }

    #[test]
    fn compare_is_reflexive_and_antisymmetric() {
        let a = SemVersion::parse("1.2.3-beta.2").unwrap();
        let b = SemVersion::parse("1.2.3-beta.10").unwrap();
        assert_eq!(a.compare(&a), Ordering::Equal);
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(b.compare(&a), Ordering::Greater);
    }

    #[test]
    fn next_auto_drops_pre_release() {
        let v = SemVersion::parse("1.2.3-beta.1").unwrap();
        assert_eq!(v.next_auto().unwrap(), SemVersion::new(1, 2, 3));
    }

    #[test]
    fn next_auto_bumps_patch_without_pre_release() {
        let v = SemVersion::new(1, 2, 3);
        assert_eq!(v.next_auto().unwrap(), v.bump_patch());
    }

    #[test]
    fn increment_pre_release_numeric_suffix() {
        assert_eq!(increment_pre_release("alpha.1", "alpha"), "alpha.2");
    }

    #[test]
    fn increment_pre_release_no_numeric() {
        assert_eq!(increment_pre_release("alpha", "alpha"), "alpha.1");
    }

    #[test]
    fn increment_pre_release_label_mismatch() {
        assert_eq!(increment_pre_release("alpha.1", "beta"), "beta.1");
    }

    #[test]
    fn increment_pre_release_dash_separator() {
        assert_eq!(increment_pre_release("rc-1", "rc"), "rc-2");
    }

    #[test]
    fn increment_pre_release_no_separator() {
        assert_eq!(increment_pre_release("rc1", "rc"), "rc2");
    }

    proptest::proptest! {
        #[test]
        fn compare_is_consistent_with_reverse(
            a_major in 0u64..5, a_minor in 0u64..5, a_patch in 0u64..5,
            b_major in 0u64..5, b_minor in 0u64..5, b_patch in 0u64..5,
        ) {
            let a = SemVersion::new(a_major, a_minor, a_patch);
            let b = SemVersion::new(b_major, b_minor, b_patch);
            proptest::prop_assert_eq!(a.compare(&b), b.compare(&a).reverse());
        }

        #[test]
        fn bump_patch_is_always_greater(major in 0u64..50, minor in 0u64..50, patch in 0u64..50) {
            let v = SemVersion::new(major, minor, patch);
            proptest::prop_assert_eq!(v.bump_patch().compare(&v), Ordering::Greater);
        }
    }
}
