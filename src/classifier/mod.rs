use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Dragon & Matt syncs
    Dragon,
    /// Meetings marked `[No]`
    NoInstructions,
    /// Customer calls marked `[R]`
    Customer,
    /// Everything else
    Catchall,
}

impl Destination {
    pub const ALL: [Destination; 4] = [
        Destination::Dragon,
        Destination::NoInstructions,
        Destination::Customer,
        Destination::Catchall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dragon => "dragon",
            Self::NoInstructions => "no_instructions",
            Self::Customer => "customer",
            Self::Catchall => "catchall",
        }
    }

    /// Label used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Dragon => "Dragon",
            Self::NoInstructions => "No Instructions",
            Self::Customer => "Customer Call",
            Self::Catchall => "catch-all",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// Byte-exact prefix comparison
    #[default]
    CaseSensitive,
    /// Prefix comparison after Unicode lowercasing both sides
    CaseInsensitive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRule {
    pub prefix: String,
    pub destination: Destination,
}

impl ClassificationRule {
    pub fn new(prefix: impl Into<String>, destination: Destination) -> Self {
        Self {
            prefix: prefix.into(),
            destination,
        }
    }

    fn matches(&self, name: &str, mode: MatchMode) -> bool {
        match mode {
            MatchMode::CaseSensitive => name.starts_with(&self.prefix),
            MatchMode::CaseInsensitive => name.to_lowercase().starts_with(&self.prefix.to_lowercase()),
        }
    }
}

// Priority order; first match wins
static DEFAULT_RULES: Lazy<Vec<ClassificationRule>> = Lazy::new(|| {
    vec![
        ClassificationRule::new("Dragon & Matt", Destination::Dragon),
        ClassificationRule::new("[No]", Destination::NoInstructions),
        ClassificationRule::new("[R]", Destination::Customer),
    ]
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub destination: Destination,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<ClassificationRule>,
    match_mode: MatchMode,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES.clone(),
            match_mode: MatchMode::CaseSensitive,
        }
    }
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_match_mode(match_mode: MatchMode) -> Self {
        Self {
            match_mode,
            ..Self::default()
        }
    }

    /// Build a classifier from an explicit rule list. Names matching no rule go to the catch-all.
    pub fn with_rules(rules: Vec<ClassificationRule>, match_mode: MatchMode) -> Self {
        Self { rules, match_mode }
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    pub fn match_mode(&self) -> MatchMode {
        self.match_mode
    }

    pub fn classify(&self, name: &str) -> Destination {
        self.explain(name).destination
    }

    pub fn explain(&self, name: &str) -> Classification {
        for rule in &self.rules {
            if rule.matches(name, self.match_mode) {
                return Classification {
                    destination: rule.destination,
                    reason: format!("starts with \"{}\"", rule.prefix),
                };
            }
        }

        Classification {
            destination: Destination::Catchall,
            reason: "no prefix rule matched".to_string(),
        }
    }
}
