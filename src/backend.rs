// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Simulation-backend boundary.

The backend owns the materialized per-section electrical state of an
assembled cell. `ModelContext` stands in for the backend's process-global
model-construction context: assembly borrows a handle to it for the
duration of one call and writes configuration into it one-directionally;
afterwards the context is read-only, inspected either through the typed
accessors or through `describe()`, the backend's single-section diagnostic
text report (the format the equivalence checker parses).

The context is single-instance per run. Building a second model requires a
fresh context; nothing in this crate holds a global reference to one.
*/

use crate::types::SegmentId;
use ahash::AHashMap;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Mechanism name → parameter name → value, with deterministic ordering
pub type MechanismMap = BTreeMap<String, BTreeMap<String, f64>>;

/// Fully resolved electrical state of one section
#[derive(Debug, Clone, PartialEq)]
pub struct SectionState {
    pub name: String,
    /// Spatial discretization count; this model never subdivides sections
    pub nseg: u32,
    pub length: f64,
    pub ra: f64,
    /// Inserted mechanisms with their parameters. Includes the built-in
    /// `capacitance` and `morphology` entries and one `<ion>_ion` entry per
    /// ionic species the section's mechanisms use.
    pub mechanisms: MechanismMap,
}

/// The backend's model-construction context, holding every materialized
/// section of one assembled cell, keyed by section name.
#[derive(Debug, Default, Clone)]
pub struct ModelContext {
    sections: Vec<SectionState>,
    by_name: AHashMap<String, SegmentId>,
}

impl ModelContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a section. The first registration under a name wins;
    /// sections are kept in registration order.
    pub fn add_section(&mut self, state: SectionState) {
        if self.by_name.contains_key(&state.name) {
            return;
        }
        self.by_name.insert(state.name.clone(), self.sections.len());
        self.sections.push(state);
    }

    pub fn section(&self, name: &str) -> Option<&SectionState> {
        self.by_name.get(name).map(|&i| &self.sections[i])
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut SectionState> {
        let i = *self.by_name.get(name)?;
        Some(&mut self.sections[i])
    }

    pub fn sections(&self) -> &[SectionState] {
        &self.sections
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// One-section diagnostic report in the backend's text format:
    ///
    /// ```text
    /// soma { nseg=1 L=29.8 Ra=122
    ///     insert capacitance { cm=0.77}
    ///     insert Leak { e=-63 gmax=0.0011}
    /// }
    /// ```
    pub fn describe(&self, name: &str) -> Option<String> {
        let section = self.section(name)?;
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} {{ nseg={} L={} Ra={}",
            section.name, section.nseg, section.length, section.ra
        );
        for (mech, params) in &section.mechanisms {
            let rendered: Vec<String> = params
                .iter()
                .map(|(param, value)| format!("{}={}", param, value))
                .collect();
            let _ = writeln!(out, "\tinsert {} {{ {}}}", mech, rendered.join(" "));
        }
        out.push_str("}\n");
        Some(out)
    }
}
