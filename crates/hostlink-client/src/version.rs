// crates/hostlink-client/src/version.rs
// ============================================================================
// Module: Version Compatibility
// Description: Evaluation of remote-declared client version constraints.
// Purpose: Produce actionable upgrade/downgrade guidance on mismatch.
// Dependencies: semver, serde, thiserror
// ============================================================================

//! ## Overview
//! A remote service may declare the client versions it accepts as a minimum,
//! a maximum, and a list of excluded versions. [`check_constraints`] evaluates
//! the running client version against the range `>= minimum, <= maximum`
//! plus one `!= x` clause per exclusion.
//! Invariants:
//! - A constraint without minimum and maximum is always satisfied.
//! - Malformed version strings yield [`VersionCheckError::Unexpected`], never a panic.
//! - Exclusion remediation always names the largest excluded version.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::fmt;

use semver::Version;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Version identifier of development builds; constraint checks are skipped.
pub const DEV_VERSION: &str = "dev";

// ============================================================================
// SECTION: Constraint Model
// ============================================================================

/// Remote-declared version constraint.
///
/// # Invariants
/// - Empty strings are treated as absent bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionConstraint {
    /// Lowest accepted version, inclusive.
    #[serde(default)]
    pub minimum: Option<String>,
    /// Highest accepted version, inclusive.
    #[serde(default)]
    pub maximum: Option<String>,
    /// Versions rejected even when inside the range.
    #[serde(default)]
    pub excluding: Vec<String>,
}

impl VersionConstraint {
    /// Returns the declared minimum, ignoring blank values.
    #[must_use]
    pub fn minimum(&self) -> Option<&str> {
        non_blank(self.minimum.as_deref())
    }

    /// Returns the declared maximum, ignoring blank values.
    #[must_use]
    pub fn maximum(&self) -> Option<&str> {
        non_blank(self.maximum.as_deref())
    }

    /// Returns true when a minimum or maximum is declared.
    #[must_use]
    pub fn is_declared(&self) -> bool {
        self.minimum().is_some() || self.maximum().is_some()
    }

    /// Renders the range expression, e.g. `>= 1.0.0, <= 2.0.0, != 1.5.0`.
    #[must_use]
    pub fn range_expression(&self) -> String {
        let mut clauses = Vec::new();
        if let Some(minimum) = self.minimum() {
            clauses.push(format!(">= {minimum}"));
        }
        if let Some(maximum) = self.maximum() {
            clauses.push(format!("<= {maximum}"));
        }
        for excluded in self.excluding.iter().filter(|value| !value.trim().is_empty()) {
            clauses.push(format!("!= {}", excluded.trim()));
        }
        clauses.join(", ")
    }
}

// ============================================================================
// SECTION: Violations
// ============================================================================

/// Action that restores compatibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Remediation {
    /// Running version is below the minimum.
    Upgrade {
        /// Declared minimum version.
        minimum: String,
    },
    /// Running version is above the maximum.
    Downgrade {
        /// Declared maximum version.
        maximum: String,
    },
    /// Running version is excluded; move past the largest exclusion.
    UpgradePast {
        /// Largest excluded version.
        excluded: String,
    },
}

impl fmt::Display for Remediation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upgrade {
                minimum,
            } => write!(f, "upgrade to >= {minimum}"),
            Self::Downgrade {
                maximum,
            } => write!(f, "downgrade to <= {maximum}"),
            Self::UpgradePast {
                excluded,
            } => write!(f, "upgrade to > {excluded}"),
        }
    }
}

/// Running client version falls outside the remote-declared constraint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{summary}: {detail}")]
pub struct ConstraintViolation {
    /// Running client version.
    pub current: String,
    /// Action that restores compatibility.
    pub remediation: Remediation,
    /// Short guidance, e.g. `upgrade to >= 2.0.0`.
    pub summary: String,
    /// Full compatible range and exclusions.
    pub detail: String,
}

/// Version constraint evaluation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionCheckError {
    /// Running version does not satisfy the constraint.
    #[error(transparent)]
    Violation(#[from] ConstraintViolation),
    /// A version string could not be parsed; advisory only.
    #[error("checking version constraints failed, this is unexpected: {0}")]
    Unexpected(String),
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Checks `current` against `constraint`.
///
/// # Errors
///
/// Returns [`VersionCheckError::Violation`] when `current` is outside the
/// declared range or excluded, and [`VersionCheckError::Unexpected`] when any
/// version string is malformed.
pub fn check_constraints(constraint: &VersionConstraint, current: &str) -> Result<(), VersionCheckError> {
    if !constraint.is_declared() {
        return Ok(());
    }

    let running = parse_version(current)?;
    let minimum = constraint.minimum().map(parse_version).transpose()?;
    let maximum = constraint.maximum().map(parse_version).transpose()?;
    let mut excluded = constraint
        .excluding
        .iter()
        .filter(|value| !value.trim().is_empty())
        .map(|value| parse_version(value))
        .collect::<Result<Vec<_>, _>>()?;
    excluded.sort_by(Version::cmp_precedence);

    let below = minimum.as_ref().is_some_and(|min| running.cmp_precedence(min) == Ordering::Less);
    let above = maximum.as_ref().is_some_and(|max| running.cmp_precedence(max) == Ordering::Greater);
    let is_excluded = excluded.iter().any(|version| running.cmp_precedence(version) == Ordering::Equal);
    if !below && !above && !is_excluded {
        return Ok(());
    }

    let remediation = match (below, above, constraint.minimum(), constraint.maximum()) {
        (true, _, Some(minimum), _) => Remediation::Upgrade {
            minimum: minimum.trim().to_string(),
        },
        (false, true, _, Some(maximum)) => Remediation::Downgrade {
            maximum: maximum.trim().to_string(),
        },
        _ => {
            let largest = excluded.last().ok_or_else(|| {
                VersionCheckError::Unexpected("excluded version missing".to_string())
            })?;
            Remediation::UpgradePast {
                excluded: largest.to_string(),
            }
        }
    };

    let current = current.trim().to_string();
    let summary = remediation.to_string();
    let detail = compose_detail(constraint, &current, &remediation);
    Err(VersionCheckError::Violation(ConstraintViolation {
        current,
        remediation,
        summary,
        detail,
    }))
}

/// Builds the detail block listing the compatible range and exclusions.
fn compose_detail(constraint: &VersionConstraint, current: &str, remediation: &Remediation) -> String {
    let mut range = Vec::new();
    if let Some(minimum) = constraint.minimum() {
        range.push(format!(">= {}", minimum.trim()));
    }
    if let Some(maximum) = constraint.maximum() {
        range.push(format!("<= {}", maximum.trim()));
    }
    let mut detail = format!(
        "Client version {current} is not compatible with the remote service, which accepts versions {}",
        range.join(", ")
    );
    let excluded: Vec<&str> =
        constraint.excluding.iter().map(|value| value.trim()).filter(|value| !value.is_empty()).collect();
    match excluded.as_slice() {
        [] => {}
        [single] => detail.push_str(&format!(", excluding version {single}")),
        many => detail.push_str(&format!(", excluding versions {}", many.join(", "))),
    }
    detail.push_str(&format!(". Please {remediation}."));
    detail
}

/// Parses a version, accepting a leading `v` and missing minor/patch parts.
fn parse_version(raw: &str) -> Result<Version, VersionCheckError> {
    let trimmed = raw.trim();
    let unprefixed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    let split = unprefixed.find(['-', '+']).unwrap_or(unprefixed.len());
    let (core, suffix) = unprefixed.split_at(split);
    let padded = match core.matches('.').count() {
        0 => format!("{core}.0.0{suffix}"),
        1 => format!("{core}.0{suffix}"),
        _ => unprefixed.to_string(),
    };
    Version::parse(&padded)
        .map_err(|err| VersionCheckError::Unexpected(format!("invalid version '{trimmed}': {err}")))
}

/// Returns `value` unless it is absent or blank.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
