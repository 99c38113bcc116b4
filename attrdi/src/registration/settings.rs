use std::collections::HashMap;
use std::fmt;

use crate::config::Configuration;
use crate::discovery::Manifest;
use crate::error::Result;
use crate::features::{FeatureCategory, FeatureFlags, FeatureSet};

/// Section read by [`DiOptions::features_from_config`]
pub const DEFAULT_FEATURES_PATH: &str = "DIFeatureFlags";

#[derive(Clone)]
struct FeatureSource {
    category: &'static str,
    path: String,
    apply: fn(&mut FeatureSet, &[String]),
}

/// Options for one registration pass
///
/// # Example
/// ```rust,ignore
/// services.add_attribute_based_di(&configuration, |options| {
///     options
///         .add_feature(Features::BETA)
///         .features_from_config::<Features>()
///         .strict_decoration(true);
/// }, &["app::*"])?;
/// ```
#[derive(Clone, Default)]
pub struct DiOptions {
    features: FeatureSet,
    sources: Vec<FeatureSource>,
    strict_decoration: bool,
    manifest: Option<Manifest>,
}

impl DiOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate flags, merging with those already active
    pub fn add_feature<F: FeatureFlags>(&mut self, flags: F) -> &mut Self {
        self.features.add(flags);
        self
    }

    /// Activate the flags of `F` listed under `DIFeatureFlags:<F>`
    pub fn features_from_config<F: FeatureFlags>(&mut self) -> &mut Self {
        self.features_from_config_at::<F>(DEFAULT_FEATURES_PATH)
    }

    /// Activate the flags of `F` listed under `<path>:<F>`
    ///
    /// The section maps flag type names to lists of flag names, e.g.
    /// `{ "Features": ["BETA", "AUDIT"] }`. Type and flag names are matched
    /// ignoring ASCII case; unknown flag names are ignored.
    pub fn features_from_config_at<F: FeatureFlags>(&mut self, path: impl Into<String>) -> &mut Self {
        let category = FeatureCategory::of::<F>().name();
        self.sources.push(FeatureSource {
            category,
            path: path.into(),
            apply: |features, names| {
                features.add_names::<F, _, _>(names);
            },
        });
        self
    }

    /// Fail registration when a decorator matches nothing
    pub fn strict_decoration(&mut self, strict: bool) -> &mut Self {
        self.strict_decoration = strict;
        self
    }

    /// Register from this manifest instead of discovered declarations
    pub fn use_manifest(&mut self, manifest: Manifest) -> &mut Self {
        self.manifest = Some(manifest);
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict_decoration
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    /// Flags added in code merged with those read from configuration
    pub fn active_features(&self, configuration: &Configuration) -> Result<FeatureSet> {
        let mut active = self.features.clone();
        for source in &self.sources {
            let Some(section) = configuration.get::<HashMap<String, Vec<String>>>(&source.path)? else {
                tracing::debug!(path = %source.path, "No feature flag section in configuration");
                continue;
            };
            let names = section
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(source.category))
                .map(|(_, names)| names.as_slice())
                .unwrap_or(&[]);
            (source.apply)(&mut active, names);
        }
        Ok(active)
    }
}

impl fmt::Debug for DiOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiOptions")
            .field("features", &self.features)
            .field("sources", &self.sources.iter().map(|s| (s.category, s.path.as_str())).collect::<Vec<_>>())
            .field("strict_decoration", &self.strict_decoration)
            .field("manifest", &self.manifest)
            .finish()
    }
}
