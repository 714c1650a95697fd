//! Gitignore-style pattern compilation and matching, merged from three
//! sources in priority order: config-provided excludes, a `.sleyignore` file
//! at the workspace root, then a built-in default set.

/// Directories and files excluded from discovery unless a configuration
/// overrides them.
pub const DEFAULT_PATTERNS: &[&str] =
    &[".git", "node_modules", "vendor", "build", "dist", ".DS_Store", "__pycache__", ".cache", "tmp"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Exact(String),
    DirScoped(String),
    ComponentLiteral(String),
    PathGlob(String),
    ComponentGlob(String),
}

#[derive(Debug, Clone)]
pub struct Pattern {
    kind: Kind,
}

impl Pattern {
    /// Compiles one non-comment, non-blank `.sleyignore` line.
    pub fn compile(raw: &str) -> Pattern {
        let normalized = raw.replace('\\', "/");
        let has_glob = normalized.contains('*');
        let has_slash = normalized.contains('/');

        let kind = if let Some(dir) = normalized.strip_suffix('/') {
            Kind::DirScoped(dir.to_string())
        } else if has_glob && has_slash {
            Kind::PathGlob(normalized)
        } else if has_glob {
            Kind::ComponentGlob(normalized)
        } else if has_slash {
            Kind::Exact(normalized)
        } else {
            Kind::ComponentLiteral(normalized)
        };

        Pattern { kind }
    }

    fn matches(&self, path: &str) -> bool {
        let path = normalize(path);
        match &self.kind {
            Kind::Exact(p) => path == *p,
            Kind::DirScoped(p) => path == *p || path.starts_with(&format!("{}/", p)),
            Kind::ComponentLiteral(p) => path.split('/').any(|c| c == p),
            Kind::PathGlob(p) => {
                glob_match(p, &path)
                    || basename(&path).map(|b| glob_match(p, b)).unwrap_or(false)
            }
            Kind::ComponentGlob(p) => {
                path.split('/').any(|c| glob_match(p, c)) || glob_match(p, &path)
            }
        }
    }
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}

fn basename(path: &str) -> Option<&str> {
    path.rsplit('/').next()
}

/// Minimal shell-style glob: `*` matches any run of characters other than
/// `/` (including none), everything else is literal. No character classes,
/// no `**`. `*` does not cross a path separator, matching standard
/// shell/gitignore behavior.
fn glob_match(pattern: &str, text: &str) -> bool {
    fn rec(p: &[u8], t: &[u8]) -> bool {
        match p.first() {
            None => t.is_empty(),
            Some(b'*') => {
                // try consuming zero or more non-'/' characters of `t`
                let limit = t.iter().position(|&b| b == b'/').unwrap_or(t.len());
                for i in 0..=limit {
                    if rec(&p[1..], &t[i..]) {
                        return true;
                    }
                }
                false
            }
            Some(c) => t.first() == Some(c) && rec(&p[1..], &t[1..]),
        }
    }
    rec(pattern.as_bytes(), text.as_bytes())
}

/// An ordered sequence of compiled patterns. First match wins; a match means
/// the path is excluded from discovery.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    patterns: Vec<Pattern>,
}

impl IgnoreSet {
    pub fn new() -> Self {
        IgnoreSet { patterns: Vec::new() }
    }

    pub fn push(&mut self, pattern: Pattern) {
        self.patterns.push(pattern);
    }

    /// Parses the textual contents of a `.sleyignore`-shaped file: blank
    /// lines and `#`-prefixed comments are discarded.
    pub fn parse(text: &str) -> IgnoreSet {
        let mut set = IgnoreSet::new();
        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            set.push(Pattern::compile(trimmed));
        }
        set
    }

    /// Merges `config_excludes`, then a parsed `.sleyignore` file (if given),
    /// then the built-in defaults, in that priority order.
    pub fn merged(config_excludes: &[String], sleyignore_contents: Option<&str>) -> IgnoreSet {
        let mut set = IgnoreSet::new();
        for pattern in config_excludes {
            set.push(Pattern::compile(pattern));
        }
        if let Some(text) = sleyignore_contents {
            for line in text.lines() {
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    continue;
                }
                set.push(Pattern::compile(trimmed));
            }
        }
        for pattern in DEFAULT_PATTERNS {
            set.push(Pattern::compile(pattern));
        }
        set
    }

    /// First match wins; match implies exclusion.
    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }
}
