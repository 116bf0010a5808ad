//! Build context: which files of a package directory take part in a build.
//!
//! A file is skipped when its name carries a `_GOOS`, `_GOARCH` or
//! `_GOOS_GOARCH` suffix for another platform, or when its header holds a
//! `//go:build` (or legacy `// +build`) constraint the context does not
//! satisfy. `//go:build ignore` is never satisfied.

use crate::error::SyntaxError;
use std::path::PathBuf;

const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "js", "linux",
    "nacl", "netbsd", "openbsd", "plan9", "solaris", "wasip1", "windows", "zos",
];

const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "amd64p32", "arm", "armbe", "arm64", "arm64be", "loong64", "mips", "mipsle",
    "mips64", "mips64le", "mips64p32", "mips64p32le", "ppc", "ppc64", "ppc64le", "riscv",
    "riscv64", "s390", "s390x", "sparc", "sparc64", "wasm",
];

const UNIX_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "linux",
    "netbsd", "openbsd", "solaris",
];

/// Target platform and toolchain directories the loader consults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoEnv {
    pub goos: String,
    pub goarch: String,
    pub cgo: bool,
    /// `$GOMODCACHE`: extracted module downloads, `<path>@<version>` each.
    pub mod_cache: Option<PathBuf>,
    /// `$GOROOT`; standard-library sources live under `src/`.
    pub goroot: Option<PathBuf>,
}

impl GoEnv {
    /// A context for `goos`/`goarch` with cgo on and no toolchain directories.
    pub fn new(goos: impl Into<String>, goarch: impl Into<String>) -> Self {
        GoEnv {
            goos: goos.into(),
            goarch: goarch.into(),
            cgo: true,
            mod_cache: None,
            goroot: None,
        }
    }

    pub fn with_mod_cache(mut self, dir: impl Into<PathBuf>) -> Self {
        self.mod_cache = Some(dir.into());
        self
    }

    pub fn with_goroot(mut self, dir: impl Into<PathBuf>) -> Self {
        self.goroot = Some(dir.into());
        self
    }

    /// The host platform, overridden by `GOOS`, `GOARCH`, `CGO_ENABLED`,
    /// `GOMODCACHE` (else `$GOPATH/pkg/mod`, else `~/go/pkg/mod`) and
    /// `GOROOT`.
    pub fn from_env() -> Self {
        let goos = env_var("GOOS").unwrap_or_else(|| host_os().to_string());
        let goarch = env_var("GOARCH").unwrap_or_else(|| host_arch().to_string());
        let cgo = env_var("CGO_ENABLED").map_or(true, |v| v != "0");
        let mod_cache = env_var("GOMODCACHE").map(PathBuf::from).or_else(|| {
            let gopath = match std::env::var_os("GOPATH").filter(|v| !v.is_empty()) {
                Some(list) => std::env::split_paths(&list).next()?,
                None => home_dir()?.join("go"),
            };
            Some(gopath.join("pkg").join("mod"))
        });
        let goroot = env_var("GOROOT").map(PathBuf::from);
        GoEnv {
            goos,
            goarch,
            cgo,
            mod_cache,
            goroot,
        }
    }

    /// Whether `file_name` with contents `src` is part of the build.
    pub fn includes(&self, file_name: &str, src: &str) -> Result<bool, SyntaxError> {
        if !self.name_matches(file_name) {
            return Ok(false);
        }
        self.header_matches(file_name, src)
    }

    fn name_matches(&self, file_name: &str) -> bool {
        let stem = file_name.strip_suffix(".go").unwrap_or(file_name);
        let Some(at) = stem.find('_') else {
            return true;
        };
        let parts: Vec<&str> = stem[at..].split('_').collect();
        let n = parts.len();
        if n >= 2 && KNOWN_OS.contains(&parts[n - 2]) && KNOWN_ARCH.contains(&parts[n - 1]) {
            return self.tag(parts[n - 2]) && self.tag(parts[n - 1]);
        }
        let last = parts[n - 1];
        if KNOWN_OS.contains(&last) || KNOWN_ARCH.contains(&last) {
            return self.tag(last);
        }
        true
    }

    fn header_matches(&self, file_name: &str, src: &str) -> Result<bool, SyntaxError> {
        let src = src.strip_prefix('\u{feff}').unwrap_or(src);
        let mut plus_lines = Vec::new();
        let mut in_block = false;
        for (index, raw) in src.lines().enumerate() {
            let line_no = index as u32 + 1;
            let line = raw.trim();
            if in_block {
                in_block = !line.contains("*/");
                continue;
            }
            if line.is_empty() {
                continue;
            }
            if line.starts_with("/*") {
                in_block = !line[2..].contains("*/");
                continue;
            }
            let Some(comment) = line.strip_prefix("//") else {
                break;
            };
            if let Some(expr) = comment.strip_prefix("go:build") {
                if expr.is_empty() || expr.starts_with(char::is_whitespace) {
                    return ExprParser::new(self, file_name, line_no, expr).parse();
                }
            } else if let Some(expr) = comment.trim_start().strip_prefix("+build") {
                if expr.is_empty() || expr.starts_with(char::is_whitespace) {
                    plus_lines.push(expr);
                }
            }
        }
        Ok(plus_lines.iter().all(|line| self.plus_build(line)))
    }

    /// `// +build a,!b c`: space-separated options, any of which may hold;
    /// each option is a comma-separated conjunction.
    fn plus_build(&self, line: &str) -> bool {
        line.split_whitespace().any(|option| {
            option.split(',').all(|term| match term.strip_prefix('!') {
                Some(name) => !self.tag(name),
                None => self.tag(term),
            })
        })
    }

    fn tag(&self, name: &str) -> bool {
        if name == self.goos || name == self.goarch {
            return true;
        }
        match name {
            "unix" => UNIX_OS.contains(&self.goos.as_str()),
            "linux" => self.goos == "android",
            "solaris" => self.goos == "illumos",
            "darwin" => self.goos == "ios",
            "gc" => true,
            "cgo" => self.cgo,
            _ => is_release_tag(name),
        }
    }
}

/// `go1.N`: every release tag is considered satisfied.
fn is_release_tag(name: &str) -> bool {
    name.strip_prefix("go1.")
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn host_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64",
        "loongarch64" => "loong64",
        other => other,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ExprToken<'s> {
    Tag(&'s str),
    Not,
    And,
    Or,
    LParen,
    RParen,
}

/// Evaluates a `//go:build` expression while parsing it:
/// `or := and ("||" and)*`, `and := unary ("&&" unary)*`,
/// `unary := "!" unary | "(" or ")" | tag`.
struct ExprParser<'e, 's> {
    env: &'e GoEnv,
    file: &'s str,
    line: u32,
    tokens: Vec<ExprToken<'s>>,
    pos: usize,
    error: Option<String>,
}

impl<'e, 's> ExprParser<'e, 's> {
    fn new(env: &'e GoEnv, file: &'s str, line: u32, expr: &'s str) -> Self {
        let mut tokens = Vec::new();
        let mut error = None;
        let mut rest = expr.trim_start();
        while !rest.is_empty() {
            let (token, len) = if rest.starts_with("&&") {
                (ExprToken::And, 2)
            } else if rest.starts_with("||") {
                (ExprToken::Or, 2)
            } else if rest.starts_with('!') {
                (ExprToken::Not, 1)
            } else if rest.starts_with('(') {
                (ExprToken::LParen, 1)
            } else if rest.starts_with(')') {
                (ExprToken::RParen, 1)
            } else {
                let len = rest
                    .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
                    .unwrap_or(rest.len());
                if len == 0 {
                    error = rest.chars().next().map(|c| format!("unexpected '{}'", c));
                    break;
                }
                (ExprToken::Tag(&rest[..len]), len)
            };
            tokens.push(token);
            rest = rest[len..].trim_start();
        }
        ExprParser {
            env,
            file,
            line,
            tokens,
            pos: 0,
            error,
        }
    }

    fn parse(mut self) -> Result<bool, SyntaxError> {
        if let Some(message) = self.error.take() {
            return Err(self.err(message));
        }
        let value = self.or()?;
        if self.pos != self.tokens.len() {
            return Err(self.err("unexpected tokens after expression"));
        }
        Ok(value)
    }

    fn err(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::parse(
            self.file,
            self.line,
            format!("invalid //go:build line: {}", message.into()),
        )
    }

    fn peek(&self) -> Option<&ExprToken<'s>> {
        self.tokens.get(self.pos)
    }

    fn or(&mut self) -> Result<bool, SyntaxError> {
        let mut value = self.and()?;
        while self.peek() == Some(&ExprToken::Or) {
            self.pos += 1;
            let rhs = self.and()?;
            value = value || rhs;
        }
        Ok(value)
    }

    fn and(&mut self) -> Result<bool, SyntaxError> {
        let mut value = self.unary()?;
        while self.peek() == Some(&ExprToken::And) {
            self.pos += 1;
            let rhs = self.unary()?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<bool, SyntaxError> {
        let token = self.peek().cloned();
        self.pos += 1;
        match token {
            Some(ExprToken::Not) => Ok(!self.unary()?),
            Some(ExprToken::LParen) => {
                let value = self.or()?;
                if self.peek() != Some(&ExprToken::RParen) {
                    return Err(self.err("missing ')'"));
                }
                self.pos += 1;
                Ok(value)
            }
            Some(ExprToken::Tag(name)) => Ok(self.env.tag(name)),
            Some(other) => Err(self.err(format!("unexpected {:?}", other))),
            None => Err(self.err("unexpected end of expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux() -> GoEnv {
        GoEnv::new("linux", "amd64")
    }

    #[test]
    fn platform_suffixes_select_files() {
        let env = linux();
        assert!(env.includes("user.go", "package m").unwrap());
        assert!(env.includes("user_linux.go", "package m").unwrap());
        assert!(env.includes("user_linux_amd64.go", "package m").unwrap());
        assert!(env.includes("user_amd64.go", "package m").unwrap());
        assert!(!env.includes("user_windows.go", "package m").unwrap());
        assert!(!env.includes("user_linux_arm64.go", "package m").unwrap());
        assert!(!env.includes("user_darwin_amd64.go", "package m").unwrap());
        // The leading element is never a constraint.
        assert!(env.includes("windows.go", "package m").unwrap());
    }

    #[test]
    fn go_build_ignore_is_never_satisfied() {
        let src = "// Command gen writes fixtures.\n//go:build ignore\n\npackage main\n";
        assert!(!linux().includes("gen.go", src).unwrap());
    }

    #[test]
    fn go_build_expressions_are_evaluated() {
        let env = linux();
        let check = |expr: &str| {
            env.includes("x.go", &format!("//go:build {}\n\npackage m\n", expr))
                .unwrap()
        };
        assert!(check("linux && amd64"));
        assert!(check("unix"));
        assert!(check("!windows"));
        assert!(check("(darwin || linux) && !cgo || gc"));
        assert!(check("go1.21"));
        assert!(!check("windows || (linux && arm64)"));
        assert!(!check("!unix"));
        assert!(!check("integration"));
    }

    #[test]
    fn constraints_after_package_clause_are_ignored() {
        let src = "/* header\n   block */\npackage m\n\n//go:build ignore\n";
        assert!(linux().includes("x.go", src).unwrap());
    }

    #[test]
    fn legacy_plus_build_lines_are_anded() {
        let env = linux();
        let src = "// +build linux,amd64 windows\n// +build !cgo\n\npackage m\n";
        assert!(!env.includes("x.go", src).unwrap());
        let src = "// +build darwin linux,!arm64\n\npackage m\n";
        assert!(env.includes("x.go", src).unwrap());
    }

    #[test]
    fn malformed_expression_is_a_syntax_error() {
        let err = linux()
            .includes("x.go", "\n//go:build linux &&\n\npackage m\n")
            .unwrap_err();
        assert_eq!(err.file, "x.go");
        assert_eq!(err.line, 2);
        assert!(err.message.contains("//go:build"), "{}", err.message);
    }

    #[test]
    fn os_aliases_follow_go_rules() {
        let android = GoEnv::new("android", "arm64");
        assert!(android.includes("x_linux.go", "package m").unwrap());
        let ios = GoEnv::new("ios", "arm64");
        assert!(ios.includes("x.go", "//go:build darwin\npackage m").unwrap());
    }
}
