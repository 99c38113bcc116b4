//! Feature flags gating registrations
//!
//! Any `bitflags` type can gate declarations. A declaration carries a
//! [`Feature`]: either the no-op feature (always active) or a flag value of one
//! category. A [`FeatureSet`] holds the active flags per category; several
//! independent flag types can be active at once.
//!
//! ```rust,ignore
//! bitflags::bitflags! {
//!     #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//!     pub struct Features: u32 {
//!         const BETA = 1 << 0;
//!     }
//! }
//!
//! let mut active = FeatureSet::new();
//! active.add(Features::BETA);
//! assert!(active.is_active(&Feature::of(Features::BETA)));
//! ```

use std::any::{type_name, TypeId};
use std::fmt;

use bitflags::Flags;
use serde::{Serialize, Serializer};

/// A flags type usable as a feature category
pub trait FeatureFlags: Copy + Send + Sync + 'static {
    /// Raw bits widened to `u64`
    fn feature_bits(self) -> u64;

    /// Parse a single flag by name, ignoring ASCII case
    fn flag_named(name: &str) -> Option<Self>;

    /// Render raw bits as `A | B`
    fn describe_bits(bits: u64) -> String;
}

impl<F> FeatureFlags for F
where
    F: Flags + Copy + Send + Sync + 'static,
    F::Bits: Into<u64> + TryFrom<u64>,
{
    fn feature_bits(self) -> u64 {
        self.bits().into()
    }

    fn flag_named(name: &str) -> Option<Self> {
        F::from_name(name).or_else(|| {
            F::FLAGS
                .iter()
                .find(|flag| flag.name().eq_ignore_ascii_case(name))
                .map(|flag| *flag.value())
        })
    }

    fn describe_bits(bits: u64) -> String {
        let Ok(raw) = F::Bits::try_from(bits) else {
            return format!("{:#b}", bits);
        };
        let names: Vec<&str> = F::from_bits_retain(raw).iter_names().map(|(name, _)| name).collect();
        if names.is_empty() {
            format!("{:#b}", bits)
        } else {
            names.join(" | ")
        }
    }
}

/// The flags type a feature value belongs to
#[derive(Clone, Copy)]
pub struct FeatureCategory {
    id: TypeId,
    name: &'static str,
    describe: fn(u64) -> String,
}

impl FeatureCategory {
    pub fn of<F: FeatureFlags>() -> Self {
        let full = type_name::<F>();
        Self {
            id: TypeId::of::<F>(),
            name: full.rsplit("::").next().unwrap_or(full),
            describe: F::describe_bits,
        }
    }

    /// Unqualified type name, used to look the category up in configuration
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn id(&self) -> TypeId {
        self.id
    }
}

impl PartialEq for FeatureCategory {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for FeatureCategory {}

impl fmt::Debug for FeatureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Feature requirement of a single declaration
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Feature {
    category: Option<FeatureCategory>,
    bits: u64,
}

impl Feature {
    /// The no-op feature: always active
    pub const fn none() -> Self {
        Self {
            category: None,
            bits: 0,
        }
    }

    pub fn of<F: FeatureFlags>(flags: F) -> Self {
        Self {
            category: Some(FeatureCategory::of::<F>()),
            bits: flags.feature_bits(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.category.is_none()
    }

    pub fn category(&self) -> Option<&FeatureCategory> {
        self.category.as_ref()
    }

    pub fn bits(&self) -> u64 {
        self.bits
    }
}

impl Default for Feature {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.category {
            None => f.write_str("None"),
            Some(category) => write!(f, "{}({})", category.name, (category.describe)(self.bits)),
        }
    }
}

impl fmt::Debug for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Serialize for Feature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Active feature flags, one accumulated value per category
///
/// Categories keep the order in which they were first added.
#[derive(Clone, Default, Debug)]
pub struct FeatureSet {
    entries: Vec<(FeatureCategory, u64)>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge flags into their category (bitwise OR)
    pub fn add<F: FeatureFlags>(&mut self, flags: F) -> &mut Self {
        self.add_feature(Feature::of(flags))
    }

    /// Merge an already-erased feature value; the no-op feature is ignored
    pub fn add_feature(&mut self, feature: Feature) -> &mut Self {
        if let Some(category) = feature.category {
            self.merge_bits(category, feature.bits);
        }
        self
    }

    /// Merge flags by name; unknown names are ignored
    ///
    /// The category is recorded even when no name matches.
    pub fn add_names<F, I, S>(&mut self, names: I) -> &mut Self
    where
        F: FeatureFlags,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let bits = names
            .into_iter()
            .filter_map(|name| F::flag_named(name.as_ref().trim()))
            .fold(0u64, |acc, flag| acc | flag.feature_bits());
        self.merge_bits(FeatureCategory::of::<F>(), bits);
        self
    }

    /// Merge another set into this one
    pub fn merge(&mut self, other: &FeatureSet) -> &mut Self {
        for (category, bits) in &other.entries {
            self.merge_bits(*category, *bits);
        }
        self
    }

    fn merge_bits(&mut self, category: FeatureCategory, bits: u64) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == category) {
            Some((_, current)) => *current |= bits,
            None => self.entries.push((category, bits)),
        }
    }

    /// Whether a declaration carrying `feature` is active
    ///
    /// The no-op feature is always active. A flag value is active when its
    /// category is present and every one of its bits is set; the zero value of
    /// a category never activates anything.
    pub fn is_active(&self, feature: &Feature) -> bool {
        match &feature.category {
            None => true,
            Some(category) => {
                feature.bits != 0
                    && self
                        .bits_of(category)
                        .is_some_and(|active| active & feature.bits == feature.bits)
            }
        }
    }

    /// Whether flags of type `F` are active
    pub fn contains<F: FeatureFlags>(&self, flags: F) -> bool {
        self.is_active(&Feature::of(flags))
    }

    pub fn bits_of(&self, category: &FeatureCategory) -> Option<u64> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == category)
            .map(|(_, bits)| *bits)
    }

    pub fn categories(&self) -> impl Iterator<Item = &FeatureCategory> {
        self.entries.iter().map(|(category, _)| category)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    bitflags::bitflags! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        struct Features: u32 {
            const FEATURE_A = 1 << 0;
            const FEATURE_B = 1 << 1;
            const FEATURE_C = 1 << 2;
        }
    }

    bitflags::bitflags! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        struct Rollout: u8 {
            const CANARY = 1;
        }
    }

    #[test]
    fn none_is_always_active() {
        assert!(FeatureSet::new().is_active(&Feature::none()));
    }

    #[test]
    fn flags_require_every_bit() {
        let mut active = FeatureSet::new();
        active.add(Features::FEATURE_A | Features::FEATURE_C);

        assert!(active.contains(Features::FEATURE_A));
        assert!(active.contains(Features::FEATURE_C));
        assert!(active.contains(Features::FEATURE_A | Features::FEATURE_C));
        assert!(!active.contains(Features::FEATURE_B));
        assert!(!active.contains(Features::FEATURE_A | Features::FEATURE_B));
    }

    #[test]
    fn zero_value_is_inert() {
        let mut active = FeatureSet::new();
        active.add(Features::all());
        assert!(!active.contains(Features::empty()));
    }

    #[test]
    fn categories_are_independent() {
        let mut active = FeatureSet::new();
        active.add(Features::FEATURE_A);

        assert!(!active.contains(Rollout::CANARY));
        active.add(Rollout::CANARY);
        assert!(active.contains(Rollout::CANARY));
        assert_eq!(active.categories().map(|c| c.name()).collect::<Vec<_>>(), vec!["Features", "Rollout"]);
    }

    #[test]
    fn adding_merges_with_or() {
        let mut active = FeatureSet::new();
        active.add(Features::FEATURE_A);
        active.add(Features::FEATURE_B);
        assert_eq!(active.bits_of(&FeatureCategory::of::<Features>()), Some(0b011));
    }

    #[test]
    fn names_are_case_insensitive_and_unknown_names_ignored() {
        let mut active = FeatureSet::new();
        active.add_names::<Features, _, _>(["feature_a", "FEATURE_C", "FeatureZ"]);

        assert!(active.contains(Features::FEATURE_A | Features::FEATURE_C));
        assert!(!active.contains(Features::FEATURE_B));
    }

    #[test]
    fn display_lists_flag_names() {
        assert_eq!(Feature::none().to_string(), "None");
        assert_eq!(
            Feature::of(Features::FEATURE_A | Features::FEATURE_B).to_string(),
            "Features(FEATURE_A | FEATURE_B)"
        );
    }
}
