//! Rules locating the named child tasks under a product line.

use std::fmt;
use std::str::FromStr;

use megaplan_api::Issue;

pub const DEFAULT_DEVELOPMENT_PATTERN: &str = "разработка продуктов";
pub const RAW_MATERIALS_TASK: &str = "1. Поставщики сырья";
pub const PACKAGING_TASK: &str = "2. Поставщики упаковки";

/// Known child tasks of a report hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildLabel {
    Development,
    RawMaterials,
    Packaging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Task name equals the pattern exactly.
    Exact,
    /// Lowercased task name contains the lowercased pattern.
    ContainsIgnoreCase,
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "exact" => Ok(MatchMode::Exact),
            "contains" | "contains_ignore_case" => Ok(MatchMode::ContainsIgnoreCase),
            other => Err(format!("unknown match mode '{other}', expected 'exact' or 'contains'")),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Exact => f.write_str("exact"),
            MatchMode::ContainsIgnoreCase => f.write_str("contains"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRule {
    pub pattern: String,
    pub mode: MatchMode,
}

impl NameRule {
    pub fn exact(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            mode: MatchMode::Exact,
        }
    }

    pub fn contains(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            mode: MatchMode::ContainsIgnoreCase,
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self.mode {
            MatchMode::Exact => name == self.pattern,
            MatchMode::ContainsIgnoreCase => name
                .to_lowercase()
                .contains(&self.pattern.to_lowercase()),
        }
    }
}

/// One rule per [`ChildLabel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyRules {
    pub development: NameRule,
    pub raw_materials: NameRule,
    pub packaging: NameRule,
}

impl Default for HierarchyRules {
    fn default() -> Self {
        Self {
            development: NameRule::contains(DEFAULT_DEVELOPMENT_PATTERN),
            raw_materials: NameRule::exact(RAW_MATERIALS_TASK),
            packaging: NameRule::exact(PACKAGING_TASK),
        }
    }
}

impl HierarchyRules {
    pub fn with_development(mut self, rule: NameRule) -> Self {
        self.development = rule;
        self
    }

    pub fn rule(&self, label: ChildLabel) -> &NameRule {
        match label {
            ChildLabel::Development => &self.development,
            ChildLabel::RawMaterials => &self.raw_materials,
            ChildLabel::Packaging => &self.packaging,
        }
    }

    /// First child whose name satisfies the rule for `label`.
    pub fn find<'a>(&self, label: ChildLabel, children: &'a [Issue]) -> Option<&'a Issue> {
        let rule = self.rule(label);
        children.iter().find(|child| rule.matches(&child.name))
    }
}

#[cfg(test)]
mod tests {
    use super::{ChildLabel, HierarchyRules, MatchMode, NameRule};
    use megaplan_api::Issue;

    fn issue(id: &str, name: &str) -> Issue {
        Issue {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn development_defaults_to_case_insensitive_containment() {
        let rules = HierarchyRules::default();
        let children = vec![
            issue("1", "Дизайн"),
            issue("2", "🧪 Разработка Продуктов"),
            issue("3", "разработка продуктов (архив)"),
        ];

        assert_eq!(rules.find(ChildLabel::Development, &children).map(|c| c.id.as_str()), Some("2"));
    }

    #[test]
    fn supplier_tasks_require_exact_names() {
        let rules = HierarchyRules::default();
        let children = vec![issue("1", "1. поставщики сырья"), issue("2", "2. Поставщики упаковки")];

        assert!(rules.find(ChildLabel::RawMaterials, &children).is_none());
        assert_eq!(rules.find(ChildLabel::Packaging, &children).map(|c| c.id.as_str()), Some("2"));
    }

    #[test]
    fn exact_development_rule_ignores_partial_names() {
        let rules = HierarchyRules::default().with_development(NameRule::exact("🧪 Разработка продуктов"));
        let children = vec![issue("1", "Разработка продуктов"), issue("2", "🧪 Разработка продуктов")];

        assert_eq!(rules.find(ChildLabel::Development, &children).map(|c| c.id.as_str()), Some("2"));
    }

    #[test]
    fn match_mode_parses_config_values() {
        assert_eq!("Exact".parse::<MatchMode>(), Ok(MatchMode::Exact));
        assert_eq!("contains".parse::<MatchMode>(), Ok(MatchMode::ContainsIgnoreCase));
        assert!("regex".parse::<MatchMode>().is_err());
    }
}
