//! Configuration-pipeline resolution.
//!
//! A deploying webapp is processed by an ordered list of configuration
//! stages (descriptor parsing, fragment merging, env binding, annotation
//! scanning, ...). Which stages apply depends on caller overrides, feature
//! toggles, and which optional server modules are actually present at
//! runtime. [`resolve`] folds all three into one ordered stage list.
//!
//! The presence checks themselves are performed once by an external
//! capability probe and handed in as [`Capabilities`], keeping resolution
//! pure and testable.

use serde::{Deserialize, Serialize};

/// Identifiers for the webapp-configuration stages a server driver
/// understands. Opaque to the resolver; drivers map them onto their own
/// processing steps.
pub mod stage {
    /// WEB-INF scanning and classpath setup.
    pub const WEB_INF: &str = "web-inf";
    /// Core deployment-descriptor parsing.
    pub const DESCRIPTOR: &str = "descriptor";
    /// META-INF resource scanning.
    pub const META_INF: &str = "meta-inf";
    /// Web-fragment merging.
    pub const FRAGMENTS: &str = "fragments";
    /// JNDI environment binding.
    pub const ENV: &str = "env";
    /// Plus (extended JNDI/resource-injection) support.
    pub const PLUS: &str = "plus";
    /// Legacy-compatible plus support for servers without the plus module.
    pub const LEGACY_PLUS: &str = "legacy-plus";
    /// Annotation scanning.
    pub const ANNOTATIONS: &str = "annotations";
    /// Server-specific override-descriptor processing.
    pub const OVERRIDE_DESCRIPTOR: &str = "override-descriptor";
}

/// The platform default pipeline, applied when the caller supplies no
/// explicit stage list.
pub const DEFAULT_PIPELINE: &[&str] = &[
    stage::WEB_INF,
    stage::DESCRIPTOR,
    stage::META_INF,
    stage::FRAGMENTS,
    stage::OVERRIDE_DESCRIPTOR,
];

/// Which optional server modules the runtime actually provides.
///
/// Produced once at startup by a capability probe against the embedded
/// server library; resolution itself performs no runtime lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// The plus (extended env-binding) module is present.
    pub plus_available: bool,

    /// The annotation-scanning module is present.
    pub annotations_available: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            plus_available: true,
            annotations_available: true,
        }
    }
}

/// Caller feature toggles for optional pipeline stages.
///
/// Both default to enabled: the harness assumes a full-featured servlet
/// environment unless told otherwise, mirroring what deployed test apps
/// expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginFlags {
    /// Enable extended JNDI/env binding ("plus" support).
    pub enable_plus: bool,

    /// Enable annotation scanning.
    pub enable_annotations: bool,
}

impl Default for PluginFlags {
    fn default() -> Self {
        Self {
            enable_plus: true,
            enable_annotations: true,
        }
    }
}

/// Resolves the ordered configuration-stage list for a deployment.
///
/// An explicit, non-blank `explicit_class_list` wins outright: it is
/// split on `,` and returned verbatim, blanks and all, since the caller's
/// list is authoritative and is not validated here.
///
/// Otherwise the default pipeline is extended per `flags`, degrading
/// gracefully when `capabilities` reports an optional module absent:
/// missing plus support falls back to a legacy-compatible stage with a
/// warning, missing annotation support skips the stage with a warning.
/// A deployment must never fail to start merely because an optional
/// enhancement module is absent.
///
/// Never fails; the worst case is the minimal default pipeline.
#[must_use]
pub fn resolve(
    explicit_class_list: Option<&str>,
    flags: PluginFlags,
    capabilities: Capabilities,
) -> Vec<String> {
    if let Some(list) = explicit_class_list {
        if !list.trim().is_empty() {
            return list.split(',').map(str::to_string).collect();
        }
    }

    let mut stages: Vec<String> = DEFAULT_PIPELINE.iter().map(|s| (*s).to_string()).collect();

    if flags.enable_plus {
        if capabilities.plus_available {
            insert_after(&mut stages, stage::FRAGMENTS, &[stage::ENV, stage::PLUS]);
        } else {
            tracing::warn!(
                "plus support requested but the plus module is absent, \
                 falling back to legacy-compatible configuration"
            );
            insert_after(&mut stages, stage::FRAGMENTS, &[stage::LEGACY_PLUS]);
        }
    }

    if flags.enable_annotations {
        if capabilities.annotations_available {
            insert_before(&mut stages, stage::OVERRIDE_DESCRIPTOR, stage::ANNOTATIONS);
        } else {
            tracing::warn!(
                "annotation scanning requested but the annotation module is absent, \
                 skipping the stage"
            );
        }
    }

    stages
}

fn insert_after(stages: &mut Vec<String>, anchor: &str, extra: &[&str]) {
    let at = stages
        .iter()
        .position(|s| s == anchor)
        .map_or(stages.len(), |i| i + 1);
    for (offset, s) in extra.iter().enumerate() {
        stages.insert(at + offset, (*s).to_string());
    }
}

fn insert_before(stages: &mut Vec<String>, anchor: &str, extra: &str) {
    let at = stages
        .iter()
        .position(|s| s == anchor)
        .unwrap_or(stages.len());
    stages.insert(at, extra.to_string());
}
