// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Region selectors and parameter-distribution rules.

A parameter distribution is an ordered list of (selector, value) rules plus
a default. Selectors name regions by label; values are either constants or
diameter-dependent functions. Evaluation against a morphology is pure:
for each section the first matching rule wins, in listed order (overlap is
resolved by order alone, never by specificity), and sections matched by no
rule take the default. A `None` default is the absence marker: the
parameter is left uninserted there, which is distinct from being set to
any value.

Diameter-dependent values are declarative data (tagged variants evaluated
by a single interpreter) rather than closures, so the whole catalogue
remains inspectable and serializable.
*/

use crate::morphology::Morphology;
use crate::types::{ConfigError, ConfigResult};
use serde::Serialize;

/// A function of a section's representative diameter
#[derive(Debug, Clone, Serialize)]
pub enum DiameterFn {
    /// Σ c[i]·d^i, coefficients in ascending powers
    Polynomial(Vec<f64>),
    /// base + Σ scale·exp(−d / tau)
    ExpSum { base: f64, terms: Vec<(f64, f64)> },
    /// `value` when lo ≤ d ≤ hi, `otherwise` outside the range
    Gated {
        lo: f64,
        hi: f64,
        value: f64,
        otherwise: f64,
    },
    /// `inner(d)` when d ≥ min, `otherwise` below it
    Threshold {
        min: f64,
        inner: Box<DiameterFn>,
        otherwise: f64,
    },
}

impl DiameterFn {
    pub fn eval(&self, d: f64) -> f64 {
        match self {
            DiameterFn::Polynomial(coefficients) => coefficients
                .iter()
                .rev()
                .fold(0.0, |acc, &c| acc * d + c),
            DiameterFn::ExpSum { base, terms } => terms
                .iter()
                .fold(*base, |acc, &(scale, tau)| acc + scale * (-d / tau).exp()),
            DiameterFn::Gated {
                lo,
                hi,
                value,
                otherwise,
            } => {
                if (*lo..=*hi).contains(&d) {
                    *value
                } else {
                    *otherwise
                }
            }
            DiameterFn::Threshold {
                min,
                inner,
                otherwise,
            } => {
                if d >= *min {
                    inner.eval(d)
                } else {
                    *otherwise
                }
            }
        }
    }
}

/// A predicate over sections, built from region labels.
///
/// Each label resolves against the morphology at evaluation time: to a
/// section group when one is defined under that name, otherwise to the
/// sections carrying the label as their name. The selector matches the
/// union over all its labels. An unknown label is a configuration error.
#[derive(Debug, Clone, Serialize)]
pub struct Selector {
    labels: Vec<String>,
}

impl Selector {
    /// Section-membership mask, one slot per section id
    pub fn mask(&self, morphology: &Morphology) -> ConfigResult<Vec<bool>> {
        let mut mask = vec![false; morphology.len()];
        for label in &self.labels {
            let members = morphology
                .members_of_label(label)
                .ok_or_else(|| ConfigError::UndefinedLabel(label.clone()))?;
            for id in members {
                mask[id] = true;
            }
        }
        Ok(mask)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Selector matching the union of the given region labels
pub fn named<S: AsRef<str>>(labels: &[S]) -> Selector {
    Selector {
        labels: labels.iter().map(|l| l.as_ref().to_string()).collect(),
    }
}

/// Right-hand side of a distribution rule
#[derive(Debug, Clone, Serialize)]
pub enum RuleValue {
    Uniform(f64),
    ByDiameter(DiameterFn),
}

impl RuleValue {
    fn eval(&self, diameter: f64) -> f64 {
        match self {
            RuleValue::Uniform(v) => *v,
            RuleValue::ByDiameter(f) => f.eval(diameter),
        }
    }
}

/// One (selector, value) rule of a distribution
#[derive(Debug, Clone, Serialize)]
pub struct DistributionRule {
    pub selector: Selector,
    pub value: RuleValue,
}

/// Rule assigning a constant over a region
pub fn uniform(selector: Selector, value: f64) -> DistributionRule {
    DistributionRule {
        selector,
        value: RuleValue::Uniform(value),
    }
}

/// Rule assigning a function of the local diameter over a region
pub fn by_diameter(selector: Selector, f: DiameterFn) -> DistributionRule {
    DistributionRule {
        selector,
        value: RuleValue::ByDiameter(f),
    }
}

/// An ordered first-match-wins parameter distribution.
///
/// `default: None` marks the parameter as absent on unmatched sections.
#[derive(Debug, Clone, Serialize)]
pub struct Distribution {
    pub rules: Vec<DistributionRule>,
    pub default: Option<f64>,
}

/// Combine rules into a distribution; rule order is the priority order
pub fn combine(rules: Vec<DistributionRule>, default: Option<f64>) -> Distribution {
    Distribution { rules, default }
}

impl Distribution {
    /// A distribution holding one value on every section
    pub fn constant(value: f64) -> Self {
        Distribution {
            rules: Vec::new(),
            default: Some(value),
        }
    }

    /// Resolve to a per-section value, `None` where the parameter is absent.
    ///
    /// Pure and deterministic: the same distribution over the same
    /// morphology always yields the same map.
    pub fn resolve(&self, morphology: &Morphology) -> ConfigResult<Vec<Option<f64>>> {
        let masks: Vec<Vec<bool>> = self
            .rules
            .iter()
            .map(|rule| rule.selector.mask(morphology))
            .collect::<ConfigResult<_>>()?;

        let mut values = Vec::with_capacity(morphology.len());
        for segment in morphology.segments() {
            let mut resolved = self.default;
            for (rule, mask) in self.rules.iter().zip(&masks) {
                if mask[segment.id] {
                    resolved = Some(rule.value.eval(segment.mean_diameter()));
                    break;
                }
            }
            values.push(resolved);
        }
        Ok(values)
    }
}
