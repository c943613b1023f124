//! Deliberation templates.
//!
//! A template names the weighted dimensions a session should evaluate.
//! Templates guide questions; they never determine answers.

use serde::{Deserialize, Serialize};

use quorum_types::StakeholderKind;

use crate::error::DeliberationError;

/// Tolerance for the dimension weight sum.
const WEIGHT_EPSILON: f64 = 1e-6;

/// One evaluation dimension.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub question: String,
    pub weight: f64,
}

/// A named set of weighted dimensions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeliberationTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub required_stakeholder_types: Vec<StakeholderKind>,
}

impl DeliberationTemplate {
    /// Load a template from YAML, enforcing the weight-sum invariant.
    pub fn from_yaml(input: &str) -> Result<Self, DeliberationError> {
        let template: Self = serde_yaml::from_str(input)?;
        template.validate()?;
        Ok(template)
    }

    /// Weights must sum to 1.0 within tolerance.
    pub fn validate(&self) -> Result<(), DeliberationError> {
        if self.dimensions.is_empty() {
            return Err(DeliberationError::Template(format!(
                "template {} has no dimensions",
                self.name
            )));
        }
        let total: f64 = self.dimensions.iter().map(|d| d.weight).sum();
        if (total - 1.0).abs() > WEIGHT_EPSILON {
            return Err(DeliberationError::Template(format!(
                "template {} dimension weights sum to {total}, expected 1.0",
                self.name
            )));
        }
        Ok(())
    }

    /// Built-in templates, by name.
    pub fn builtin(name: &str) -> Option<Self> {
        let template = match name {
            "btb_dimensions" => Self {
                name: "btb_dimensions".into(),
                description: "Five-dimension review for structural changes".into(),
                dimensions: vec![
                    dimension("legibility", "Can humans understand the resulting structure?", 0.25),
                    dimension("reversibility", "Can changes be undone if problems emerge?", 0.25),
                    dimension("auditability", "Can we trace why decisions were made?", 0.20),
                    dimension("governance", "Who has authority over the system?", 0.15),
                    dimension("paradigm_safety", "Does this create risks if widely adopted?", 0.15),
                ],
                required_stakeholder_types: vec![
                    StakeholderKind::Technical,
                    StakeholderKind::Ethical,
                ],
            },
            "self_modification" => Self {
                name: "self_modification".into(),
                description: "Review for systems that modify their own behavior".into(),
                dimensions: vec![
                    dimension("scope_limitation", "Are modifications bounded in scope?", 0.30),
                    dimension("human_veto", "Can humans override any modification?", 0.30),
                    dimension("rollback_capability", "Can we return to the previous state?", 0.25),
                    dimension("transparency", "Are modifications visible and logged?", 0.15),
                ],
                required_stakeholder_types: vec![StakeholderKind::Technical],
            },
            "minimal" => Self {
                name: "minimal".into(),
                description: "Quick review for low-stakes decisions".into(),
                dimensions: vec![
                    dimension("risk_level", "What is the worst-case outcome?", 0.5),
                    dimension("reversibility", "Can this be undone?", 0.5),
                ],
                required_stakeholder_types: vec![],
            },
            _ => return None,
        };
        Some(template)
    }
}

fn dimension(name: &str, question: &str, weight: f64) -> Dimension {
    Dimension {
        name: name.into(),
        question: question.into(),
        weight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_validate() {
        for name in ["btb_dimensions", "self_modification", "minimal"] {
            let template = DeliberationTemplate::builtin(name).unwrap();
            template.validate().unwrap();
            assert_eq!(template.name, name);
        }
        assert!(DeliberationTemplate::builtin("nonexistent").is_none());
    }

    #[test]
    fn btb_dimensions_has_five() {
        let template = DeliberationTemplate::builtin("btb_dimensions").unwrap();
        assert_eq!(template.dimensions.len(), 5);
    }

    #[test]
    fn yaml_loading_checks_weight_sum() {
        let good = "name: custom\ndimensions:\n  - name: reversibility\n    question: \"How reversible is the proposed action?\"\n    weight: 0.6\n  - name: risk\n    question: \"What can go wrong?\"\n    weight: 0.4\n";
        let template = DeliberationTemplate::from_yaml(good).unwrap();
        assert_eq!(template.dimensions.len(), 2);

        let bad = "name: custom\ndimensions:\n  - name: reversibility\n    question: q\n    weight: 0.6\n  - name: risk\n    question: q\n    weight: 0.6\n";
        assert!(matches!(
            DeliberationTemplate::from_yaml(bad),
            Err(DeliberationError::Template(_))
        ));
    }

    #[test]
    fn empty_dimensions_rejected() {
        let err = DeliberationTemplate::from_yaml("name: hollow\ndimensions: []\n").unwrap_err();
        assert!(matches!(err, DeliberationError::Template(_)));
    }
}
