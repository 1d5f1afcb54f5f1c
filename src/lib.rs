// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# Purkinje cell model builder

Builds a fully parameterized multi-compartment model of a cerebellar
Purkinje neuron (Masoli et al., 2015) from declarative configuration:

1. **Morphology**: the soma, a dendritic arbor wired from tabular
   coordinate/connectivity data, and a fixed eleven-section myelinated
   axon with a collateral branch, grouped into named regions.
2. **Parameter distribution**: an ordered first-match-wins rule algebra
   assigns membrane capacitance and ion-channel conductance densities per
   region, with diameter-dependent values expressed as declarative
   functions rather than code.
3. **Assembly**: the resolved configuration is written one-directionally
   into an injected simulation-backend context, yielding an immutable
   [`CellModel`] wrapped in a single-cell [`Population`].
4. **Equivalence checking**: two independently constructed cells are
   compared section by section through typed parsing of the backend's
   diagnostic reports, accumulating every structural difference.

## Usage

```rust,no_run
use purkinje_cell::{build_purkinje, compare_cells, load_config, ModelContext};

let config = load_config(None).expect("configuration");
let mut ctx = ModelContext::new();
let cell = build_purkinje(&config, &mut ctx).expect("assembly");
println!("{}: {} sections", cell.label, cell.sections.len());

let mut reference_ctx = ModelContext::new();
// ... build the reference model into reference_ctx ...
let report = compare_cells(&ctx, &reference_ctx).expect("comparison");
assert!(report.is_equivalent(), "{report}");
```
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod backend;
pub mod catalogue;
pub mod cell;
pub mod check;
pub mod config;
pub mod morphology;
pub mod regions;
pub mod tables;
pub mod types;

pub use backend::{MechanismMap, ModelContext, SectionState};
pub use catalogue::{
    capacitance_distribution, ion_channel_catalogue, ionic_species, IonicSpecies, MechanismSpec,
};
pub use cell::{build_purkinje, CellBuilder, CellModel, Population};
pub use check::{
    compare_cells, diff_records, parse_section_report, EquivalenceReport, SectionDiff,
    SectionRecord,
};
pub use config::{find_config_file, load_config, ModelConfig};
pub use morphology::{build_morphology, Morphology, MorphologyInputs, Point3d, Segment};
pub use regions::{
    by_diameter, combine, named, uniform, DiameterFn, Distribution, DistributionRule, RuleValue,
    Selector,
};
pub use types::{ConfigError, ConfigResult, SegmentId};
