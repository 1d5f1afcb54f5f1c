// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Cross-model equivalence checking.

Compares two independently constructed cells section by section: for each
section name present in both backend contexts, the section's diagnostic
report is parsed into a typed record and the two records are structurally
diffed (added / removed / changed keys across geometry and every inserted
mechanism's parameters). Lengths are rounded to three decimal places
before comparison to absorb floating-point error in coordinate-derived
length computation; every other field compares exactly.

All mismatches across the whole cell are accumulated, so the caller sees
the full scope of divergence rather than the first hit. A non-empty report
is a validation signal, not a crash: callers decide whether to treat it as
fatal.
*/

use crate::backend::{MechanismMap, ModelContext};
use crate::types::{ConfigError, ConfigResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Decimal places kept when comparing coordinate-derived section lengths
const LENGTH_DECIMALS: i32 = 3;

/// Typed form of one section's diagnostic report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionRecord {
    pub name: String,
    pub nseg: u32,
    pub length: f64,
    pub ra: f64,
    pub mechanisms: MechanismMap,
}

/// Structural difference between two records of the same section
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectionDiff {
    pub section: String,
    /// Keys present only in the candidate model
    pub added: Vec<String>,
    /// Keys present only in the reference model
    pub removed: Vec<String>,
    /// Key → (candidate value, reference value)
    pub changed: BTreeMap<String, (f64, f64)>,
}

impl SectionDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

impl fmt::Display for SectionDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.section)?;
        for key in &self.added {
            write!(f, " +{}", key)?;
        }
        for key in &self.removed {
            write!(f, " -{}", key)?;
        }
        for (key, (candidate, reference)) in &self.changed {
            write!(f, " {}={} (expected {})", key, candidate, reference)?;
        }
        Ok(())
    }
}

/// Accumulated result of a whole-cell comparison
#[derive(Debug, Clone, Default, Serialize)]
pub struct EquivalenceReport {
    pub diffs: Vec<SectionDiff>,
}

impl EquivalenceReport {
    /// The two models are equivalent iff no section diverged
    pub fn is_equivalent(&self) -> bool {
        self.diffs.is_empty()
    }

    /// JSON form of the report, for logging and offline inspection
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for EquivalenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_equivalent() {
            return write!(f, "models are equivalent");
        }
        writeln!(f, "{} section(s) diverged:", self.diffs.len())?;
        for diff in &self.diffs {
            writeln!(f, "  {}", diff)?;
        }
        Ok(())
    }
}

fn report_error(detail: impl Into<String>) -> ConfigError {
    ConfigError::MalformedReport(detail.into())
}

fn parse_value(field: &str) -> ConfigResult<(&str, f64)> {
    let (key, value) = field
        .split_once('=')
        .ok_or_else(|| report_error(format!("expected key=value, found '{}'", field)))?;
    let value = value
        .parse::<f64>()
        .map_err(|_| report_error(format!("'{}' is not a number in '{}'", value, field)))?;
    Ok((key, value))
}

/// Parse a backend diagnostic report into a typed record.
///
/// The captured text is never evaluated; every field is parsed explicitly.
pub fn parse_section_report(text: &str) -> ConfigResult<SectionRecord> {
    let mut lines = text.lines();
    let header = lines
        .next()
        .ok_or_else(|| report_error("empty report"))?;
    let (name, geometry) = header
        .split_once(" { ")
        .ok_or_else(|| report_error(format!("malformed header '{}'", header)))?;

    let mut nseg = None;
    let mut length = None;
    let mut ra = None;
    for field in geometry.split_whitespace() {
        let (key, value) = parse_value(field)?;
        match key {
            "nseg" => nseg = Some(value as u32),
            "L" => length = Some(value),
            "Ra" => ra = Some(value),
            other => {
                return Err(report_error(format!("unknown geometry field '{}'", other)));
            }
        }
    }

    let mut mechanisms = MechanismMap::new();
    for line in lines {
        let Some(start) = line.find("insert ") else {
            continue;
        };
        let body = &line[start + "insert ".len()..];
        let lbracket = body
            .find('{')
            .ok_or_else(|| report_error(format!("missing '{{' in '{}'", line)))?;
        let rbracket = body
            .find('}')
            .ok_or_else(|| report_error(format!("missing '}}' in '{}'", line)))?;
        let mech_name = body[..lbracket].trim();
        if mech_name.is_empty() {
            return Err(report_error(format!("missing mechanism name in '{}'", line)));
        }
        let mut params = BTreeMap::new();
        for field in body[lbracket + 1..rbracket].split_whitespace() {
            let (key, value) = parse_value(field)?;
            params.insert(key.to_string(), value);
        }
        mechanisms.insert(mech_name.to_string(), params);
    }

    Ok(SectionRecord {
        name: name.to_string(),
        nseg: nseg.ok_or_else(|| report_error("missing nseg"))?,
        length: length.ok_or_else(|| report_error("missing L"))?,
        ra: ra.ok_or_else(|| report_error("missing Ra"))?,
        mechanisms,
    })
}

fn round_length(value: f64) -> f64 {
    let scale = 10f64.powi(LENGTH_DECIMALS);
    (value * scale).round() / scale
}

/// Structurally diff two records of the same section.
///
/// `length` is rounded on both sides before comparison; all other values
/// compare exactly.
pub fn diff_records(candidate: &SectionRecord, reference: &SectionRecord) -> SectionDiff {
    let mut diff = SectionDiff {
        section: candidate.name.clone(),
        ..SectionDiff::default()
    };

    if candidate.nseg != reference.nseg {
        diff.changed.insert(
            "nseg".to_string(),
            (candidate.nseg as f64, reference.nseg as f64),
        );
    }
    let (candidate_l, reference_l) = (round_length(candidate.length), round_length(reference.length));
    if candidate_l != reference_l {
        diff.changed.insert("L".to_string(), (candidate_l, reference_l));
    }
    if candidate.ra != reference.ra {
        diff.changed
            .insert("Ra".to_string(), (candidate.ra, reference.ra));
    }

    for (mech, params) in &candidate.mechanisms {
        match reference.mechanisms.get(mech) {
            None => diff.added.push(mech.clone()),
            Some(reference_params) => {
                for (param, &value) in params {
                    match reference_params.get(param) {
                        None => diff.added.push(format!("{}.{}", mech, param)),
                        Some(&reference_value) if reference_value != value => {
                            diff.changed
                                .insert(format!("{}.{}", mech, param), (value, reference_value));
                        }
                        Some(_) => {}
                    }
                }
                for param in reference_params.keys() {
                    if !params.contains_key(param) {
                        diff.removed.push(format!("{}.{}", mech, param));
                    }
                }
            }
        }
    }
    for mech in reference.mechanisms.keys() {
        if !candidate.mechanisms.contains_key(mech) {
            diff.removed.push(mech.clone());
        }
    }

    diff
}

/// Compare two assembled cells section by section.
///
/// Sections are matched by NAME, never by position, since ids may differ
/// between two independent constructions. Only names present in both
/// contexts are compared; every non-empty diff is accumulated.
pub fn compare_cells(
    candidate: &ModelContext,
    reference: &ModelContext,
) -> ConfigResult<EquivalenceReport> {
    let mut report = EquivalenceReport::default();
    for name in candidate.section_names() {
        if reference.section(name).is_none() {
            continue;
        }
        let candidate_text = candidate
            .describe(name)
            .ok_or_else(|| report_error(format!("no report for section '{}'", name)))?;
        let reference_text = reference
            .describe(name)
            .ok_or_else(|| report_error(format!("no report for section '{}'", name)))?;
        let diff = diff_records(
            &parse_section_report(&candidate_text)?,
            &parse_section_report(&reference_text)?,
        );
        if !diff.is_empty() {
            report.diffs.push(diff);
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SectionState;

    fn sample_record() -> SectionRecord {
        let mut mechanisms = MechanismMap::new();
        mechanisms.insert(
            "Leak".to_string(),
            BTreeMap::from([("e".to_string(), -63.0), ("gmax".to_string(), 1.1e-3)]),
        );
        mechanisms.insert(
            "capacitance".to_string(),
            BTreeMap::from([("cm".to_string(), 1.87e-11)]),
        );
        SectionRecord {
            name: "axonmyelin".to_string(),
            nseg: 1,
            length: 100.0,
            ra: 122.0,
            mechanisms,
        }
    }

    fn context_with(record: &SectionRecord) -> ModelContext {
        let mut ctx = ModelContext::new();
        ctx.add_section(SectionState {
            name: record.name.clone(),
            nseg: record.nseg,
            length: record.length,
            ra: record.ra,
            mechanisms: record.mechanisms.clone(),
        });
        ctx
    }

    #[test]
    fn test_parse_round_trip() {
        let record = sample_record();
        let ctx = context_with(&record);
        let text = ctx.describe("axonmyelin").unwrap();
        let parsed = parse_section_report(&text).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_parse_empty_parameter_list() {
        let parsed =
            parse_section_report("soma { nseg=1 L=29.8 Ra=122\n\tinsert ca_ion { }\n}\n").unwrap();
        assert!(parsed.mechanisms["ca_ion"].is_empty());
    }

    #[test]
    fn test_parse_malformed_header() {
        assert!(parse_section_report("soma nseg=1").is_err());
        assert!(parse_section_report("soma { nseg=1 L=x Ra=122").is_err());
        assert!(parse_section_report("soma { nseg=1 Ra=122").is_err());
    }

    #[test]
    fn test_identical_records_have_empty_diff() {
        let record = sample_record();
        assert!(diff_records(&record, &record).is_empty());
    }

    #[test]
    fn test_changed_parameter() {
        let reference = sample_record();
        let mut candidate = sample_record();
        *candidate
            .mechanisms
            .get_mut("Leak")
            .unwrap()
            .get_mut("gmax")
            .unwrap() = 9.9;
        let diff = diff_records(&candidate, &reference);
        assert_eq!(diff.changed.len(), 1);
        assert_eq!(diff.changed["Leak.gmax"], (9.9, 1.1e-3));
        assert!(diff.added.is_empty() && diff.removed.is_empty());
    }

    #[test]
    fn test_added_and_removed_mechanisms() {
        let mut reference = sample_record();
        let mut candidate = sample_record();
        candidate
            .mechanisms
            .insert("HCN1".to_string(), BTreeMap::new());
        reference
            .mechanisms
            .get_mut("Leak")
            .unwrap()
            .insert("extra".to_string(), 1.0);
        let diff = diff_records(&candidate, &reference);
        assert_eq!(diff.added, vec!["HCN1".to_string()]);
        assert_eq!(diff.removed, vec!["Leak.extra".to_string()]);
    }

    #[test]
    fn test_length_rounding_absorbs_float_error() {
        let reference = sample_record();
        let mut candidate = sample_record();
        candidate.length = 100.0000004;
        assert!(diff_records(&candidate, &reference).is_empty());

        candidate.length = 100.0006;
        let diff = diff_records(&candidate, &reference);
        assert_eq!(diff.changed["L"], (100.001, 100.0));
    }

    #[test]
    fn test_compare_cells_matches_by_name() {
        let record = sample_record();
        let candidate = context_with(&record);

        let mut renamed = sample_record();
        renamed.name = "axonmyelin2".to_string();
        let reference = context_with(&renamed);

        // no common section names: nothing to compare, trivially equivalent
        let report = compare_cells(&candidate, &reference).unwrap();
        assert!(report.is_equivalent());
    }

    #[test]
    fn test_compare_cells_sensitivity() {
        let record = sample_record();
        let candidate = context_with(&record);

        let mut mutated = sample_record();
        *mutated
            .mechanisms
            .get_mut("capacitance")
            .unwrap()
            .get_mut("cm")
            .unwrap() = 0.77;
        let reference = context_with(&mutated);

        let report = compare_cells(&candidate, &reference).unwrap();
        assert_eq!(report.diffs.len(), 1);
        assert_eq!(report.diffs[0].section, "axonmyelin");
        assert_eq!(
            report.diffs[0].changed["capacitance.cm"],
            (1.87e-11, 0.77)
        );
    }

    #[test]
    fn test_report_json_dump() {
        let record = sample_record();
        let mut mutated = sample_record();
        mutated.ra = 250.0;
        let report = compare_cells(&context_with(&record), &context_with(&mutated)).unwrap();
        let json = report.to_json();
        assert_eq!(json["diffs"][0]["section"], "axonmyelin");
    }

    #[test]
    fn test_report_display_names_offenders() {
        let record = sample_record();
        let mut mutated = sample_record();
        mutated.nseg = 3;
        let report = compare_cells(&context_with(&record), &context_with(&mutated)).unwrap();
        let rendered = report.to_string();
        assert!(rendered.contains("axonmyelin"));
        assert!(rendered.contains("nseg"));
    }
}
