// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Morphology construction.

Builds the rooted tree of cylindrical sections for the Purkinje cell:
the soma, the dendritic arbor wired from tabular connectivity data, and a
fixed eleven-section myelinated axon with a collateral branch. After
construction the morphology also carries named section groups ("dend" and
the "dend_subsetN" classification groups) used as units of parameter
assignment.

Section ids are assigned in first-seen order (soma, then dendrites in
input order, then the axon in its fixed order) and are stable across runs
for the same input tables.
*/

use crate::types::{ConfigError, ConfigResult, SegmentId};
use ahash::AHashMap;
use ndarray::Array2;
use tracing::{debug, info};

/// Number of dendritic classification groups derived from the subset table
pub const NUM_DEND_SUBSETS: usize = 88;

/// Number of sections in the fixed axon chain (AIS, AIS potassium zone,
/// four myelinated internodes, three nodes of Ranvier, two collateral
/// sections)
pub const AXON_SECTION_COUNT: usize = 11;

/// A 3-D point with a local diameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub diameter: f64,
}

impl Point3d {
    pub const fn new(x: f64, y: f64, z: f64, diameter: f64) -> Self {
        Self { x, y, z, diameter }
    }
}

/// A single cylindrical section of the cell
#[derive(Debug, Clone)]
pub struct Segment {
    pub id: SegmentId,
    pub name: String,
    pub proximal: Point3d,
    pub distal: Point3d,
    /// Id of the parent section; `None` only for the soma root
    pub parent: Option<SegmentId>,
}

impl Segment {
    /// Euclidean length between the proximal and distal endpoints
    pub fn length(&self) -> f64 {
        let dx = self.distal.x - self.proximal.x;
        let dy = self.distal.y - self.proximal.y;
        let dz = self.distal.z - self.proximal.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Representative diameter used by diameter-dependent parameter rules:
    /// the mean of the proximal and distal diameters, matching the
    /// mid-section sampling of the reference model.
    pub fn mean_diameter(&self) -> f64 {
        (self.proximal.diameter + self.distal.diameter) / 2.0
    }
}

/// The full section tree plus named section groups.
///
/// Group membership is immutable after construction.
#[derive(Debug, Clone)]
pub struct Morphology {
    segments: Vec<Segment>,
    section_groups: AHashMap<String, Vec<SegmentId>>,
}

impl Morphology {
    /// Assemble a morphology from pre-built sections and groups.
    ///
    /// Section ids are reassigned to match position, so parent links must
    /// already refer to positions in `segments`.
    pub fn from_parts(
        mut segments: Vec<Segment>,
        section_groups: AHashMap<String, Vec<SegmentId>>,
    ) -> Self {
        for (i, seg) in segments.iter_mut().enumerate() {
            seg.id = i;
        }
        Self {
            segments,
            section_groups,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Members of a named section group, if the group is defined
    pub fn group(&self, name: &str) -> Option<&[SegmentId]> {
        self.section_groups.get(name).map(|v| v.as_slice())
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.section_groups.keys().map(|s| s.as_str())
    }

    /// First section carrying the given name
    pub fn segment_by_name(&self, name: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.name == name)
    }

    /// Resolve a region label to section ids: a section group when one is
    /// defined under that name, otherwise every section carrying the label
    /// as its name. `None` if the label matches neither.
    pub fn members_of_label(&self, label: &str) -> Option<Vec<SegmentId>> {
        if let Some(ids) = self.section_groups.get(label) {
            return Some(ids.clone());
        }
        let by_name: Vec<SegmentId> = self
            .segments
            .iter()
            .filter(|s| s.name == label)
            .map(|s| s.id)
            .collect();
        if by_name.is_empty() {
            None
        } else {
            Some(by_name)
        }
    }
}

/// Soma geometry of the Masoli et al. (2015) reconstruction
const SOMA_PROXIMAL: Point3d = Point3d::new(0.0, 0.0, 0.0, 29.8);
const SOMA_DISTAL: Point3d = Point3d::new(0.0, 29.8, 0.0, 29.8);

/// Fixed axon chain: (name, parent name, proximal, distal).
///
/// Geometry is literal, not loaded from file. The collateral branches off
/// the second node of Ranvier.
const AXON_SECTIONS: [(&str, &str, Point3d, Point3d); AXON_SECTION_COUNT] = [
    (
        "axonAIS",
        "soma",
        Point3d::new(0.0, 0.0, 0.0, 0.97),
        Point3d::new(17.0, 0.0, 0.0, 0.97),
    ),
    (
        "axonAISK",
        "axonAIS",
        Point3d::new(17.0, 0.0, 0.0, 0.97),
        Point3d::new(21.0, 0.0, 0.0, 0.97),
    ),
    (
        "axonmyelin",
        "axonAISK",
        Point3d::new(21.0, 0.0, 0.0, 0.73),
        Point3d::new(121.0, 0.0, 0.0, 0.73),
    ),
    (
        "axonNOR",
        "axonmyelin",
        Point3d::new(121.0, 0.0, 0.0, 0.73),
        Point3d::new(125.0, 0.0, 0.0, 0.73),
    ),
    (
        "axonmyelin2",
        "axonNOR",
        Point3d::new(125.0, 0.0, 0.0, 0.73),
        Point3d::new(225.0, 0.0, 0.0, 0.73),
    ),
    (
        "axonNOR2",
        "axonmyelin2",
        Point3d::new(225.0, 0.0, 0.0, 0.73),
        Point3d::new(229.0, 0.0, 0.0, 0.73),
    ),
    (
        "axonmyelin3",
        "axonNOR2",
        Point3d::new(229.0, 0.0, 0.0, 0.73),
        Point3d::new(329.0, 0.0, 0.0, 0.73),
    ),
    (
        "axonNOR3",
        "axonmyelin3",
        Point3d::new(329.0, 0.0, 0.0, 0.73),
        Point3d::new(333.0, 0.0, 0.0, 0.73),
    ),
    (
        "axonmyelin4",
        "axonNOR3",
        Point3d::new(333.0, 0.0, 0.0, 0.73),
        Point3d::new(433.0, 0.0, 0.0, 0.73),
    ),
    (
        "axoncoll",
        "axonNOR2",
        Point3d::new(229.0, 0.0, 0.0, 0.60),
        Point3d::new(229.0, 0.0, 100.0, 0.60),
    ),
    (
        "axoncoll2",
        "axoncoll",
        Point3d::new(229.0, 0.0, 100.0, 0.60),
        Point3d::new(229.0, 0.0, 200.0, 0.60),
    ),
];

/// Tabular inputs to morphology construction
pub struct MorphologyInputs<'a> {
    /// Dendritic section names, in input order
    pub names: &'a [String],
    /// One row per dendrite: (index, prox x/y/z/diameter, dist x/y/z/diameter)
    pub coordinates: &'a Array2<f64>,
    /// Tree edges: (child index, 0, parent index, 1)
    pub connections: &'a Array2<f64>,
    /// (dendrite-local index, subset id) classification rows
    pub subsets: &'a [(i64, i64)],
}

/// Build the full Purkinje morphology from the input tables.
///
/// The name list and coordinate table must have equal length. Connectivity
/// sentinel columns are checked against their expected constants. Dendrite
/// 0 is parented to the soma; every other dendrite is parented strictly by
/// table lookup, with no assumption that parents precede children in the
/// list. The fixed axon chain is appended last.
pub fn build_morphology(inputs: MorphologyInputs<'_>) -> ConfigResult<Morphology> {
    let MorphologyInputs {
        names,
        coordinates,
        connections,
        subsets,
    } = inputs;

    if names.len() != coordinates.nrows() {
        return Err(ConfigError::LengthMismatch {
            left: "dendrite name list".to_string(),
            left_len: names.len(),
            right: "coordinate table".to_string(),
            right_len: coordinates.nrows(),
        });
    }

    let ndend = names.len();
    let mut segments = Vec::with_capacity(1 + ndend + AXON_SECTION_COUNT);

    segments.push(Segment {
        id: 0,
        name: "soma".to_string(),
        proximal: SOMA_PROXIMAL,
        distal: SOMA_DISTAL,
        parent: None,
    });

    for (i, name) in names.iter().enumerate() {
        let row = coordinates.row(i);
        segments.push(Segment {
            id: 1 + i,
            name: name.clone(),
            proximal: Point3d::new(row[1], row[2], row[3], row[4]),
            distal: Point3d::new(row[5], row[6], row[7], row[8]),
            // wired below; dendrite 0 attaches to the soma
            parent: if i == 0 { Some(0) } else { None },
        });
    }

    wire_dendrites(&mut segments, connections, ndend)?;

    for (name, parent_name, proximal, distal) in AXON_SECTIONS {
        let parent_id = segments
            .iter()
            .find(|s| s.name == parent_name)
            .map(|s| s.id)
            .expect("axon parent precedes its children in the fixed chain");
        let id = segments.len();
        segments.push(Segment {
            id,
            name: name.to_string(),
            proximal,
            distal,
            parent: Some(parent_id),
        });
    }

    validate_tree(&segments)?;

    let mut section_groups: AHashMap<String, Vec<SegmentId>> = AHashMap::new();
    section_groups.insert("dend".to_string(), (1..=ndend).collect());

    // Raw subset indices are dendrite-local; section ids offset by 1 (soma).
    let mut subset_members: Vec<Vec<SegmentId>> = vec![Vec::new(); NUM_DEND_SUBSETS];
    for (row, &(dend_index, subset_id)) in subsets.iter().enumerate() {
        if dend_index < 0 || dend_index as usize >= ndend {
            return Err(ConfigError::IndexOutOfRange {
                table: "subset classification table".to_string(),
                row: row + 1,
                index: dend_index,
                count: ndend,
            });
        }
        if (0..NUM_DEND_SUBSETS as i64).contains(&subset_id) {
            subset_members[subset_id as usize].push(1 + dend_index as usize);
        }
    }
    for (subset_id, members) in subset_members.into_iter().enumerate() {
        section_groups.insert(format!("dend_subset{}", subset_id), members);
    }

    debug!(
        target: "purkinje",
        "derived {} section groups over {} dendrites",
        section_groups.len(),
        ndend
    );
    info!(
        target: "purkinje",
        "built morphology: {} sections (1 soma, {} dendritic, {} axonal)",
        segments.len(),
        ndend,
        AXON_SECTION_COUNT
    );

    Ok(Morphology {
        segments,
        section_groups,
    })
}

/// Apply connectivity rows, parenting children strictly by table lookup
fn wire_dendrites(
    segments: &mut [Segment],
    connections: &Array2<f64>,
    ndend: usize,
) -> ConfigResult<()> {
    const TABLE: &str = "connectivity table";

    for (i, row) in connections.rows().into_iter().enumerate() {
        let rowno = i + 1;
        if row[1] != 0.0 {
            return Err(ConfigError::SentinelViolation {
                table: TABLE.to_string(),
                row: rowno,
                column: 2,
                expected: 0,
                actual: row[1],
            });
        }
        if row[3] != 1.0 {
            return Err(ConfigError::SentinelViolation {
                table: TABLE.to_string(),
                row: rowno,
                column: 4,
                expected: 1,
                actual: row[3],
            });
        }

        let child = row[0] as i64;
        let parent = row[2] as i64;
        for index in [child, parent] {
            if index < 0 || index as usize >= ndend {
                return Err(ConfigError::IndexOutOfRange {
                    table: TABLE.to_string(),
                    row: rowno,
                    index,
                    count: ndend,
                });
            }
        }
        segments[1 + child as usize].parent = Some(1 + parent as usize);
    }
    Ok(())
}

/// Verify the parent graph is a tree rooted at the soma
fn validate_tree(segments: &[Segment]) -> ConfigResult<()> {
    for seg in segments {
        if seg.id != 0 && seg.parent.is_none() {
            return Err(ConfigError::UnparentedSection(seg.name.clone()));
        }
        let mut cursor = seg.parent;
        let mut steps = 0;
        while let Some(parent) = cursor {
            steps += 1;
            if steps > segments.len() {
                return Err(ConfigError::ParentCycle(seg.name.clone()));
            }
            cursor = segments[parent].parent;
        }
    }
    Ok(())
}
