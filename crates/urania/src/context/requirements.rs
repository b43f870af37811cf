//! Query analysis: which optional computations a request needs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Computation categories a context can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextComponent {
    BasicCosmic,
    PersonalTransits,
    NatalPatterns,
    PlanetaryReturns,
    ProgressedChart,
    Eclipses,
    TarotPatterns,
    JournalHistory,
}

impl ContextComponent {
    pub const ALL: [ContextComponent; 8] = [
        ContextComponent::BasicCosmic,
        ContextComponent::PersonalTransits,
        ContextComponent::NatalPatterns,
        ContextComponent::PlanetaryReturns,
        ContextComponent::ProgressedChart,
        ContextComponent::Eclipses,
        ContextComponent::TarotPatterns,
        ContextComponent::JournalHistory,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Key used in configuration files and cost breakdowns.
    pub fn key(self) -> &'static str {
        match self {
            ContextComponent::BasicCosmic => "basic_cosmic",
            ContextComponent::PersonalTransits => "personal_transits",
            ContextComponent::NatalPatterns => "natal_patterns",
            ContextComponent::PlanetaryReturns => "planetary_returns",
            ContextComponent::ProgressedChart => "progressed_chart",
            ContextComponent::Eclipses => "eclipses",
            ContextComponent::TarotPatterns => "tarot_patterns",
            ContextComponent::JournalHistory => "journal_history",
        }
    }

    pub fn from_key(key: &str) -> Option<ContextComponent> {
        let key = key.trim();
        ContextComponent::ALL.iter().copied().find(|c| c.key() == key)
    }
}

impl fmt::Display for ContextComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One flag per computation category. `basic_cosmic` is always set by the
/// analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextRequirements {
    pub basic_cosmic: bool,
    pub personal_transits: bool,
    pub natal_patterns: bool,
    pub planetary_returns: bool,
    pub progressed_chart: bool,
    pub eclipses: bool,
    pub tarot_patterns: bool,
    pub journal_history: bool,
}

impl ContextRequirements {
    /// Only the basic cosmic snapshot.
    pub fn basic() -> Self {
        Self {
            basic_cosmic: true,
            ..Self::default()
        }
    }

    pub fn is_active(&self, component: ContextComponent) -> bool {
        match component {
            ContextComponent::BasicCosmic => self.basic_cosmic,
            ContextComponent::PersonalTransits => self.personal_transits,
            ContextComponent::NatalPatterns => self.natal_patterns,
            ContextComponent::PlanetaryReturns => self.planetary_returns,
            ContextComponent::ProgressedChart => self.progressed_chart,
            ContextComponent::Eclipses => self.eclipses,
            ContextComponent::TarotPatterns => self.tarot_patterns,
            ContextComponent::JournalHistory => self.journal_history,
        }
    }

    pub fn set(&mut self, component: ContextComponent, value: bool) {
        let flag = match component {
            ContextComponent::BasicCosmic => &mut self.basic_cosmic,
            ContextComponent::PersonalTransits => &mut self.personal_transits,
            ContextComponent::NatalPatterns => &mut self.natal_patterns,
            ContextComponent::PlanetaryReturns => &mut self.planetary_returns,
            ContextComponent::ProgressedChart => &mut self.progressed_chart,
            ContextComponent::Eclipses => &mut self.eclipses,
            ContextComponent::TarotPatterns => &mut self.tarot_patterns,
            ContextComponent::JournalHistory => &mut self.journal_history,
        };
        *flag = value;
    }

    pub fn with(mut self, component: ContextComponent) -> Self {
        self.set(component, true);
        self
    }

    pub fn active_components(&self) -> impl Iterator<Item = ContextComponent> + '_ {
        ContextComponent::ALL
            .into_iter()
            .filter(move |c| self.is_active(*c))
    }

    /// Component-wise OR.
    pub fn union(mut self, other: &ContextRequirements) -> Self {
        for c in ContextComponent::ALL {
            if other.is_active(c) {
                self.set(c, true);
            }
        }
        self
    }
}

/// Trigger phrases per optional category, matched as lowercase substrings.
const RULES: &[(ContextComponent, &[&str])] = &[
    (
        ContextComponent::PersonalTransits,
        &["transit", "aspect", "influence", "affecting"],
    ),
    (
        ContextComponent::NatalPatterns,
        &[
            "pattern",
            "natal",
            "stellium",
            "grand trine",
            "t-square",
            "grand cross",
            "yod",
            "birth chart",
        ],
    ),
    (ContextComponent::PlanetaryReturns, &["return"]),
    (
        ContextComponent::ProgressedChart,
        &["progress", "evolv", "changed"],
    ),
    (
        ContextComponent::Eclipses,
        &["eclipse", "portal", "transform"],
    ),
    (
        ContextComponent::TarotPatterns,
        &["tarot", "card", "reading", "spread"],
    ),
    (
        ContextComponent::JournalHistory,
        &["journal", "wrote", "entries", "entry", "written", "reflect"],
    ),
];

/// Derive requirements from a free-text query. Deterministic substring
/// matching against a fixed rule table.
pub fn analyze(query: &str) -> ContextRequirements {
    let lowered = query.to_lowercase();
    let mut requirements = ContextRequirements::basic();
    for (component, triggers) in RULES {
        if triggers.iter().any(|t| lowered.contains(t)) {
            requirements.set(*component, true);
        }
    }
    requirements
}

/// Named requirement bundles for callers that skip query analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextPreset {
    QuickCosmic,
    DeepAnalysis,
    TarotFocus,
    JournalReflection,
}

impl ContextPreset {
    pub fn requirements(self) -> ContextRequirements {
        use ContextComponent::*;
        let base = ContextRequirements::basic();
        match self {
            ContextPreset::QuickCosmic | ContextPreset::TarotFocus => base.with(TarotPatterns),
            ContextPreset::DeepAnalysis => base
                .with(PersonalTransits)
                .with(NatalPatterns)
                .with(PlanetaryReturns)
                .with(ProgressedChart)
                .with(Eclipses),
            ContextPreset::JournalReflection => base
                .with(PersonalTransits)
                .with(TarotPatterns)
                .with(JournalHistory),
        }
    }

    pub fn from_name(name: &str) -> Option<ContextPreset> {
        match name.trim().to_lowercase().replace('-', "_").as_str() {
            "quick_cosmic" => Some(ContextPreset::QuickCosmic),
            "deep_analysis" => Some(ContextPreset::DeepAnalysis),
            "tarot_focus" => Some(ContextPreset::TarotFocus),
            "journal_reflection" => Some(ContextPreset::JournalReflection),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_cosmic_always_on() {
        assert!(analyze("").basic_cosmic);
        assert_eq!(analyze("What's the moon phase?"), ContextRequirements::basic());
    }

    #[test]
    fn test_saturn_return_query() {
        let req = analyze("what's my saturn return?");
        assert!(req.planetary_returns);
        assert!(!req.journal_history);
        assert!(!req.personal_transits);
    }

    #[test]
    fn test_case_insensitive_multi_match() {
        let req = analyze("How are TRANSITS affecting my Grand Trine? I wrote about it.");
        assert!(req.personal_transits);
        assert!(req.natal_patterns);
        assert!(req.journal_history);
        assert!(!req.tarot_patterns);
    }

    #[test]
    fn test_presets() {
        let deep = ContextPreset::DeepAnalysis.requirements();
        assert!(deep.progressed_chart && deep.eclipses && deep.planetary_returns);
        assert!(!deep.tarot_patterns && !deep.journal_history);

        let journal = ContextPreset::from_name("journal-reflection")
            .unwrap()
            .requirements();
        assert_eq!(journal.active_components().count(), 4);
        assert_eq!(
            ContextPreset::QuickCosmic.requirements(),
            ContextPreset::TarotFocus.requirements()
        );
    }
}
