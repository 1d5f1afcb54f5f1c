// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Cell assembly.

Combines a morphology, the capacitance distribution, the ionic species and
the mechanism catalogue into one fully specified `CellModel`, writing the
resolved per-section configuration one-directionally into the injected
backend context. Assembly is the only stage with side effects, and those
are limited to the borrowed context: it never starts a simulation and the
returned model is immutable.

A mechanism is inserted on a section exactly where its conductance-slot
parameter resolves to a value; its remaining parameters are then set
wherever they resolve. Sections additionally carry the backend's built-in
`capacitance` and `morphology` entries and one `<ion>_ion` entry per ionic
species their mechanisms use.
*/

use crate::backend::{MechanismMap, ModelContext, SectionState};
use crate::catalogue::{
    capacitance_distribution, ion_channel_catalogue, ionic_species, IonicSpecies, MechanismSpec,
};
use crate::config::ModelConfig;
use crate::morphology::{build_morphology, Morphology, MorphologyInputs};
use crate::regions::Distribution;
use crate::tables;
use crate::types::{ConfigError, ConfigResult};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// A fully assembled, simulation-ready cell
#[derive(Debug, Clone)]
pub struct CellModel {
    pub label: String,
    pub morphology: Morphology,
    pub axial_resistance: f64,
    /// Resolved per-section state, in section-id order
    pub sections: Vec<SectionState>,
}

/// A population of identical cells handed to the simulation backend.
/// This model always simulates a single cell.
#[derive(Debug, Clone)]
pub struct Population {
    pub size: usize,
    pub cell: CellModel,
}

impl Population {
    pub fn new(size: usize, cell: CellModel) -> Self {
        Self { size, cell }
    }
}

/// Assembles a `CellModel` from its configured parts
pub struct CellBuilder {
    label: String,
    axial_resistance: f64,
    cm: Distribution,
    species: Vec<IonicSpecies>,
    mechanisms: Vec<MechanismSpec>,
}

impl CellBuilder {
    pub fn new(
        label: impl Into<String>,
        axial_resistance: f64,
        cm: Distribution,
        species: Vec<IonicSpecies>,
        mechanisms: Vec<MechanismSpec>,
    ) -> Self {
        Self {
            label: label.into(),
            axial_resistance,
            cm,
            species,
            mechanisms,
        }
    }

    /// Resolve every distribution against the morphology and materialize
    /// the per-section state into the borrowed backend context.
    ///
    /// Fails if a mechanism references an undeclared ionic species or any
    /// distribution references an undefined region label.
    pub fn assemble(
        &self,
        morphology: Morphology,
        ctx: &mut ModelContext,
    ) -> ConfigResult<CellModel> {
        self.validate_ions()?;

        let cm_values = self.cm.resolve(&morphology)?;

        let mut reversals: BTreeMap<&str, Vec<Option<f64>>> = BTreeMap::new();
        for species in &self.species {
            reversals.insert(species.name, species.reversal_potential.resolve(&morphology)?);
        }

        // mechanism -> (per-param values, insertion mask source index)
        let mut resolved: Vec<(&MechanismSpec, Vec<(&str, Vec<Option<f64>>)>, usize)> =
            Vec::with_capacity(self.mechanisms.len());
        for mech in &self.mechanisms {
            let mut params = Vec::with_capacity(mech.params.len());
            for (param, distribution) in &mech.params {
                params.push((*param, distribution.resolve(&morphology)?));
            }
            let insertion_index = params
                .iter()
                .position(|(param, _)| *param == mech.conductance_param)
                .ok_or_else(|| ConfigError::MissingInsertionParam(mech.name.to_string()))?;
            resolved.push((mech, params, insertion_index));
        }

        let mut sections = Vec::with_capacity(morphology.len());
        let mut inserted_total = 0usize;
        for segment in morphology.segments() {
            let id = segment.id;
            let mut mechanisms = MechanismMap::new();

            mechanisms.insert(
                "morphology".to_string(),
                BTreeMap::from([("diam".to_string(), segment.mean_diameter())]),
            );
            if let Some(cm) = cm_values[id] {
                mechanisms.insert(
                    "capacitance".to_string(),
                    BTreeMap::from([("cm".to_string(), cm)]),
                );
            }

            for (mech, params, insertion_index) in &resolved {
                if params[*insertion_index].1[id].is_none() {
                    continue;
                }
                let mut values = BTreeMap::new();
                for (param, per_section) in params {
                    if let Some(value) = per_section[id] {
                        values.insert(param.to_string(), value);
                    }
                }
                mechanisms.insert(mech.name.to_string(), values);
                inserted_total += 1;

                for &ion in mech.ions {
                    let entry = mechanisms.entry(format!("{}_ion", ion)).or_default();
                    if let Some(erev) = reversals[ion][id] {
                        entry.insert(format!("e{}", ion), erev);
                    }
                    let species = self
                        .species
                        .iter()
                        .find(|s| s.name == ion)
                        .expect("ion validated against the species map");
                    if let Some(conc) = species.internal_concentration {
                        entry.insert(format!("{}i", ion), conc);
                    }
                    if let Some(conc) = species.external_concentration {
                        entry.insert(format!("{}o", ion), conc);
                    }
                }
            }

            let state = SectionState {
                name: segment.name.clone(),
                nseg: 1,
                length: segment.length(),
                ra: self.axial_resistance,
                mechanisms,
            };
            ctx.add_section(state.clone());
            sections.push(state);
        }

        debug!(
            target: "purkinje",
            "resolved {} mechanism insertions across {} sections",
            inserted_total,
            sections.len()
        );
        info!(
            target: "purkinje",
            "assembled cell '{}' ({} sections, Ra {})",
            self.label,
            sections.len(),
            self.axial_resistance
        );

        Ok(CellModel {
            label: self.label.clone(),
            morphology,
            axial_resistance: self.axial_resistance,
            sections,
        })
    }

    fn validate_ions(&self) -> ConfigResult<()> {
        for mech in &self.mechanisms {
            for &ion in mech.ions {
                if !self.species.iter().any(|s| s.name == ion) {
                    return Err(ConfigError::UndefinedIon {
                        mechanism: mech.name.to_string(),
                        ion: ion.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Load the input tables named by `config`, build the morphology and
/// assemble the full Purkinje cell into `ctx`.
pub fn build_purkinje(config: &ModelConfig, ctx: &mut ModelContext) -> ConfigResult<CellModel> {
    let data = &config.data;
    let names = tables::load_name_list(&data.path(&data.dendrite_names))?;
    let coordinates = tables::load_table(&data.path(&data.coordinates), 9)?;
    let connections = tables::load_table(&data.path(&data.connections), 4)?;
    let subsets = tables::load_pairs(&data.path(&data.subsets))?;
    let subset_cm = tables::load_value_pairs(&data.path(&data.subset_cm))?;

    let morphology = build_morphology(MorphologyInputs {
        names: &names,
        coordinates: &coordinates,
        connections: &connections,
        subsets: &subsets,
    })?;

    let cm = capacitance_distribution(&subset_cm, config.cell.cm_ratio());
    let builder = CellBuilder::new(
        config.cell.label.clone(),
        config.cell.axial_resistance,
        cm,
        ionic_species(),
        ion_channel_catalogue(),
    );
    builder.assemble(morphology, ctx)
}
