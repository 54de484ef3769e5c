//! Path-based authorization rules.
//!
//! The rule table is plain data: an ordered list of (path pattern, role predicate) entries,
//! evaluated first-match-wins with an "authenticated" fallback. It is built once at startup
//! (defaults or `AUTH_RULES`) and only read afterwards.
//!
//! Definition syntax, entries separated by `;`:
//!
//! ```text
//! /,/auth/**,/public/**=permitAll; /admin/**=ADMIN; /management/**=ADMIN|MANAGER; /api/**=authenticated
//! ```
//!
//! A pattern ending in `/**` matches the base path and everything below it; any other pattern
//! matches exactly. Role names are case-sensitive.

use crate::services::auth::context::AuthContext;
use crate::services::auth::role::Role;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleParseError {
    #[error("invalid path pattern: {0:?}")]
    InvalidPattern(String),
    #[error("invalid role predicate: {0:?}")]
    InvalidPredicate(String),
    #[error("rule without '=': {0:?}")]
    MissingPredicate(String),
}

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Denial {
    /// No identity was established for the request.
    #[error("authentication required")]
    AuthenticationRequired,
    /// An identity exists but its roles do not satisfy the rule.
    #[error("access denied")]
    AuthorizationDenied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(String),
    Prefix(String),
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, RuleParseError> {
        let raw = raw.trim();
        if !raw.starts_with('/') {
            return Err(RuleParseError::InvalidPattern(raw.to_string()));
        }

        match raw.strip_suffix("/**") {
            Some(base) if !base.contains('*') => Ok(Self::Prefix(base.to_string())),
            None if !raw.contains('*') => Ok(Self::Exact(raw.to_string())),
            _ => Err(RuleParseError::InvalidPattern(raw.to_string())),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(exact) => path == exact,
            Self::Prefix(base) => {
                path == base
                    || path
                        .strip_prefix(base.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }
}

/// Paths the request authenticator skips entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathList {
    patterns: Vec<PathPattern>,
}

impl PathList {
    pub const DEFAULT_BYPASS: &'static str =
        "/auth/**,/public/**,/health,/swagger-ui/**,/v3/api-docs/**,/favicon.ico";

    /// Comma-separated patterns; blank items are ignored.
    pub fn parse(raw: &str) -> Result<Self, RuleParseError> {
        let patterns = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathPattern::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }
}

impl Default for PathList {
    fn default() -> Self {
        Self {
            patterns: vec![
                PathPattern::Prefix("/auth".into()),
                PathPattern::Prefix("/public".into()),
                PathPattern::Exact("/health".into()),
                PathPattern::Prefix("/swagger-ui".into()),
                PathPattern::Prefix("/v3/api-docs".into()),
                PathPattern::Exact("/favicon.ico".into()),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RolePredicate {
    PermitAll,
    Authenticated,
    HasRole(Role),
    HasAnyRole(Vec<Role>),
}

impl RolePredicate {
    pub fn parse(raw: &str) -> Result<Self, RuleParseError> {
        let raw = raw.trim();
        match raw {
            "permitAll" => return Ok(Self::PermitAll),
            "authenticated" => return Ok(Self::Authenticated),
            _ => {}
        }

        let mut roles = raw
            .split('|')
            .map(|name| name.trim().parse::<Role>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| RuleParseError::InvalidPredicate(raw.to_string()))?;

        match roles.len() {
            1 => Ok(Self::HasRole(roles.remove(0))),
            _ => Ok(Self::HasAnyRole(roles)),
        }
    }

    pub fn evaluate(&self, ctx: Option<&AuthContext>) -> Result<(), Denial> {
        match (self, ctx) {
            (Self::PermitAll, _) => Ok(()),
            (_, None) => Err(Denial::AuthenticationRequired),
            (Self::Authenticated, Some(_)) => Ok(()),
            (Self::HasRole(role), Some(ctx)) if ctx.has_role(*role) => Ok(()),
            (Self::HasAnyRole(roles), Some(ctx)) if ctx.has_any_role(roles) => Ok(()),
            _ => Err(Denial::AuthorizationDenied),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleEntry {
    pub pattern: PathPattern,
    pub predicate: RolePredicate,
}

/// Ordered rule table; priority is declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    rules: Vec<RuleEntry>,
    fallback: RolePredicate,
}

impl RuleTable {
    pub fn new(rules: Vec<RuleEntry>) -> Self {
        Self {
            rules,
            fallback: RolePredicate::Authenticated,
        }
    }

    pub fn parse(definition: &str) -> Result<Self, RuleParseError> {
        let mut rules = Vec::new();

        for item in definition.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (patterns, predicate) = item
                .split_once('=')
                .ok_or_else(|| RuleParseError::MissingPredicate(item.to_string()))?;
            let predicate = RolePredicate::parse(predicate)?;

            for pattern in patterns.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                rules.push(RuleEntry {
                    pattern: PathPattern::parse(pattern)?,
                    predicate: predicate.clone(),
                });
            }
        }

        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[RuleEntry] {
        &self.rules
    }

    /// First matching entry's predicate, or the fallback when nothing matches.
    pub fn predicate_for(&self, path: &str) -> &RolePredicate {
        self.rules
            .iter()
            .find(|rule| rule.pattern.matches(path))
            .map(|rule| &rule.predicate)
            .unwrap_or(&self.fallback)
    }

    pub fn evaluate(&self, path: &str, ctx: Option<&AuthContext>) -> Result<(), Denial> {
        self.predicate_for(path).evaluate(ctx)
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        let public = [
            PathPattern::Exact("/".into()),
            PathPattern::Prefix("/auth".into()),
            PathPattern::Prefix("/public".into()),
            PathPattern::Exact("/health".into()),
            PathPattern::Prefix("/swagger-ui".into()),
            PathPattern::Prefix("/v3/api-docs".into()),
            PathPattern::Exact("/swagger-ui.html".into()),
            PathPattern::Exact("/favicon.ico".into()),
            PathPattern::Exact("/error".into()),
        ];

        let mut rules: Vec<RuleEntry> = public
            .into_iter()
            .map(|pattern| RuleEntry {
                pattern,
                predicate: RolePredicate::PermitAll,
            })
            .collect();

        rules.push(RuleEntry {
            pattern: PathPattern::Prefix("/admin".into()),
            predicate: RolePredicate::HasRole(Role::Admin),
        });
        rules.push(RuleEntry {
            pattern: PathPattern::Prefix("/management".into()),
            predicate: RolePredicate::HasAnyRole(vec![Role::Admin, Role::Manager]),
        });
        rules.push(RuleEntry {
            pattern: PathPattern::Prefix("/api".into()),
            predicate: RolePredicate::Authenticated,
        });

        Self::new(rules)
    }
}
