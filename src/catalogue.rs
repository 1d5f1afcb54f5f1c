// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Static parameter catalogue for the Masoli et al. (2015) Purkinje cell.

Maps every membrane mechanism to the ordered region rules that set its
conductance density and ancillary parameters, declares the ionic species
the mechanisms depend on, and builds the membrane-capacitance
distribution. The catalogue is plain data: rule order within each
distribution is authoritative (general rules are listed after specific
ones where the reference model does so), and nothing here mutates during a
run.
*/

use crate::regions::{
    by_diameter, combine, named, uniform, DiameterFn, Distribution, DistributionRule,
};
use serde::Serialize;

/// Membrane capacitance of unmyelinated axonal sections and the soma (µF/cm²)
pub const CM_DEFAULT: f64 = 0.77;
/// Membrane capacitance of myelinated internodes: orders of magnitude below
/// the unmyelinated value, never to be rescaled with the rest
pub const CM_MYELIN: f64 = 1.87e-11;

const NODES_AND_COLLATERAL: [&str; 5] = [
    "axonNOR",
    "axonNOR2",
    "axonNOR3",
    "axoncoll",
    "axoncoll2",
];
const MYELIN: [&str; 4] = ["axonmyelin", "axonmyelin2", "axonmyelin3", "axonmyelin4"];

/// Parameter distributions for one membrane mechanism.
///
/// A mechanism is inserted on a section exactly where its
/// `conductance_param` distribution resolves to a value; the remaining
/// parameters are then set wherever they resolve.
#[derive(Debug, Clone, Serialize)]
pub struct MechanismSpec {
    pub name: &'static str,
    /// The parameter whose distribution decides insertion. Usually the
    /// conductance density; `cdp5` is a calcium pump/buffer rather than a
    /// conductance and is keyed by its `Nannuli` parameter instead.
    pub conductance_param: &'static str,
    /// Ionic species this mechanism reads or writes; each must be declared
    pub ions: &'static [&'static str],
    pub params: Vec<(&'static str, Distribution)>,
}

/// An ionic species with its reversal potential and optional concentrations
#[derive(Debug, Clone, Serialize)]
pub struct IonicSpecies {
    pub name: &'static str,
    pub reversal_potential: Distribution,
    pub internal_concentration: Option<f64>,
    pub external_concentration: Option<f64>,
}

/// Per-subset leak conductances (before halving), in rule priority order.
/// Subsets absent from this table fall through to the unclassified-dendrite
/// default, the last rule of the leak distribution.
const LEAK_SUBSET_GMAX: &[(u32, f64)] = &[
    (10, 9.81576e-5),
    (11, 9.93235e-5),
    (14, 1.03622e-4),
    (7, 9.44842e-5),
    (48, 3.07143e-4),
    (6, 9.32852e-5),
    (44, 2.28496e-4),
    (8, 9.57322e-5),
    (9, 9.68117e-5),
    (13, 1.02042e-4),
    (26, 1.27897e-4),
    (5, 9.23213e-5),
    (30, 1.39992e-4),
    (45, 2.3946e-4),
    (24, 1.22388e-4),
    (21, 1.1597e-4),
    (22, 1.17874e-4),
    (15, 1.04995e-4),
    (47, 2.68529e-4),
    (34, 1.55635e-4),
    (46, 2.54361e-4),
    (17, 1.08519e-4),
    (38, 1.76656e-4),
    (32, 1.47279e-4),
    (36, 1.65314e-4),
    (25, 1.2506e-4),
    (42, 2.06402e-4),
    (41, 1.98606e-4),
    (19, 1.12068e-4),
    (12, 1.00779e-4),
    (29, 1.36397e-4),
    (33, 1.50931e-4),
    (31, 1.43185e-4),
    (37, 1.71268e-4),
    (43, 2.16786e-4),
    (40, 1.9013e-4),
    (27, 1.30398e-4),
    (23, 1.20278e-4),
    (39, 1.83704e-4),
    (18, 1.10092e-4),
    (16, 1.06714e-4),
    (35, 1.60731e-4),
    (28, 1.33581e-4),
    (20, 1.13795e-4),
    (87, 3.33333e-5),
];

fn leak_gmax() -> Distribution {
    let mut rules = vec![
        uniform(named(&["soma"]), 1.1e-3),
        uniform(
            named(&[
                "axonAIS",
                "axonAISK",
                "axonNOR",
                "axonNOR2",
                "axonNOR3",
                "axoncoll",
                "axoncoll2",
            ]),
            0.0003,
        ),
        uniform(named(&["b0s02[24]"]), 1.74451e-4 / 2.0),
    ];
    for &(subset_id, gmax) in LEAK_SUBSET_GMAX {
        rules.push(uniform(
            named(&[format!("dend_subset{}", subset_id)]),
            gmax / 2.0,
        ));
    }
    // unclassified dendrites
    rules.push(uniform(named(&["dend"]), 3.33333e-5 / 2.0));
    combine(rules, None)
}

fn gated(lo: f64, hi: f64, value: f64) -> DiameterFn {
    DiameterFn::Gated {
        lo,
        hi,
        value,
        otherwise: 0.0,
    }
}

/// 0.000267 + 0.0167·exp(−d/0.722) + 0.0028·exp(−d/4)
fn rf4_exponential() -> DiameterFn {
    DiameterFn::ExpSum {
        base: 0.000267,
        terms: vec![(0.0167, 0.722), (0.0028, 4.0)],
    }
}

fn cdp5_params() -> Vec<(&'static str, Distribution)> {
    let carriers = named(&[
        "soma",
        "dend",
        "axonAIS",
        "axonNOR",
        "axonNOR2",
        "axonNOR3",
        "axoncoll",
        "axoncoll2",
    ]);
    vec![
        (
            "TotalPump",
            combine(
                vec![
                    uniform(named(&["soma", "axonAIS"]), 5e-8),
                    uniform(named(&["dend"]), 2e-8),
                    uniform(named(&NODES_AND_COLLATERAL), 5e-7),
                ],
                None,
            ),
        ),
        (
            "Nannuli",
            combine(
                vec![by_diameter(
                    carriers.clone(),
                    DiameterFn::Polynomial(vec![
                        0.326, 1.94, 0.289, -3.33e-2, 1.55e-3, -2.55e-5,
                    ]),
                )],
                None,
            ),
        ),
        (
            "Buffnull2",
            combine(
                vec![by_diameter(
                    carriers.clone(),
                    DiameterFn::ExpSum {
                        base: 64.2,
                        terms: vec![(-57.3, 1.4)],
                    },
                )],
                None,
            ),
        ),
        (
            "rf3",
            combine(
                vec![by_diameter(
                    carriers,
                    DiameterFn::ExpSum {
                        base: 0.162,
                        terms: vec![(-0.106, 2.29)],
                    },
                )],
                None,
            ),
        ),
        (
            "rf4",
            combine(
                vec![
                    by_diameter(named(&["soma"]), rf4_exponential()),
                    uniform(
                        named(&[
                            "axonAIS",
                            "axonNOR",
                            "axonNOR2",
                            "axonNOR3",
                            "axoncoll",
                            "axoncoll2",
                        ]),
                        0.003,
                    ),
                    by_diameter(
                        named(&["dend"]),
                        DiameterFn::Threshold {
                            min: 2.0,
                            inner: Box::new(rf4_exponential()),
                            otherwise: 0.003,
                        },
                    ),
                ],
                None,
            ),
        ),
    ]
}

/// The full mechanism catalogue of the Purkinje cell model.
pub fn ion_channel_catalogue() -> Vec<MechanismSpec> {
    vec![
        MechanismSpec {
            name: "Leak",
            conductance_param: "gmax",
            ions: &[],
            params: vec![
                (
                    "e",
                    combine(
                        vec![uniform(
                            named(&[
                                "soma",
                                "dend",
                                "axonAIS",
                                "axonAISK",
                                "axonNOR",
                                "axonNOR2",
                                "axonNOR3",
                                "axoncoll",
                                "axoncoll2",
                            ]),
                            -63.0,
                        )],
                        None,
                    ),
                ),
                ("gmax", leak_gmax()),
            ],
        },
        MechanismSpec {
            name: "Cav3_1",
            conductance_param: "pcabar",
            ions: &["ca"],
            params: vec![(
                "pcabar",
                combine(
                    vec![
                        uniform(named(&["soma"]), 7e-6),
                        by_diameter(named(&["dend"]), gated(3.5, 12.0, 5e-6)),
                        uniform(named(&["axonAIS"]), 8.2e-6),
                        uniform(named(&NODES_AND_COLLATERAL), 1e-5),
                    ],
                    None,
                ),
            )],
        },
        MechanismSpec {
            name: "Cav2_1",
            conductance_param: "pcabar",
            ions: &["ca"],
            params: vec![(
                "pcabar",
                combine(
                    vec![
                        uniform(
                            named(&[
                                "soma",
                                "axonAIS",
                                "axonNOR",
                                "axonNOR2",
                                "axonNOR3",
                                "axoncoll",
                                "axoncoll2",
                            ]),
                            2.2e-4,
                        ),
                        uniform(named(&["dend"]), 1e-3),
                    ],
                    None,
                ),
            )],
        },
        MechanismSpec {
            name: "HCN1",
            conductance_param: "gbar",
            ions: &["h"],
            params: vec![(
                "gbar",
                combine(
                    vec![
                        uniform(named(&["soma"]), 0.0004),
                        uniform(named(&["dend"]), 0.000004),
                    ],
                    None,
                ),
            )],
        },
        MechanismSpec {
            name: "Nav1_6",
            conductance_param: "gbar",
            ions: &["na"],
            params: vec![(
                "gbar",
                combine(
                    vec![
                        uniform(named(&["soma"]), 0.214),
                        by_diameter(named(&["dend"]), gated(8.0, 12.0, 0.016)),
                        uniform(named(&["axonAIS"]), 0.50),
                        uniform(named(&NODES_AND_COLLATERAL), 0.03),
                    ],
                    None,
                ),
            )],
        },
        MechanismSpec {
            name: "Kv3_4",
            conductance_param: "gkbar",
            ions: &["k"],
            params: vec![(
                "gkbar",
                combine(
                    vec![
                        uniform(named(&["soma"]), 0.05),
                        uniform(named(&["axonAIS"]), 0.01),
                        uniform(named(&NODES_AND_COLLATERAL), 0.02),
                    ],
                    None,
                ),
            )],
        },
        MechanismSpec {
            name: "Kv1_1",
            conductance_param: "gbar",
            ions: &["k"],
            params: vec![(
                "gbar",
                combine(
                    vec![
                        uniform(named(&["soma"]), 0.002),
                        uniform(named(&["dend"]), 0.0012),
                        uniform(named(&["axonAISK"]), 0.01),
                    ],
                    None,
                ),
            )],
        },
        MechanismSpec {
            name: "Cav3_2",
            conductance_param: "gcabar",
            ions: &["ca"],
            params: vec![(
                "gcabar",
                combine(
                    vec![
                        uniform(named(&["soma"]), 0.0008),
                        by_diameter(named(&["dend"]), gated(3.5, 12.0, 0.0012)),
                    ],
                    None,
                ),
            )],
        },
        MechanismSpec {
            name: "Kca3_1",
            conductance_param: "gkbar",
            ions: &["k", "ca"],
            params: vec![(
                "gkbar",
                combine(
                    vec![
                        uniform(named(&["soma"]), 0.01),
                        by_diameter(named(&["dend"]), gated(3.5, 12.0, 0.002)),
                    ],
                    None,
                ),
            )],
        },
        MechanismSpec {
            name: "Cav3_3",
            conductance_param: "pcabar",
            ions: &["ca"],
            params: vec![(
                "pcabar",
                combine(vec![uniform(named(&["soma", "dend"]), 0.0001)], None),
            )],
        },
        MechanismSpec {
            name: "Kir2_3",
            conductance_param: "gkbar",
            ions: &["k"],
            params: vec![(
                "gkbar",
                combine(
                    vec![
                        uniform(named(&["soma"]), 0.00003),
                        by_diameter(named(&["dend"]), gated(3.5, 12.0, 0.00001)),
                    ],
                    None,
                ),
            )],
        },
        MechanismSpec {
            name: "Kca1_1",
            conductance_param: "gbar",
            ions: &["k", "ca"],
            params: vec![(
                "gbar",
                combine(
                    vec![
                        uniform(named(&["soma"]), 0.01),
                        uniform(named(&["dend"]), 3.5e-2),
                    ],
                    None,
                ),
            )],
        },
        MechanismSpec {
            name: "Kca2_2",
            conductance_param: "gkbar",
            ions: &["k", "ca"],
            params: vec![(
                "gkbar",
                combine(
                    vec![
                        uniform(named(&["soma"]), 1e-3),
                        by_diameter(named(&["dend"]), gated(3.5, 12.0, 1e-3)),
                    ],
                    None,
                ),
            )],
        },
        MechanismSpec {
            name: "Kv4_3",
            conductance_param: "gkbar",
            ions: &["k"],
            params: vec![(
                "gkbar",
                combine(vec![uniform(named(&["dend"]), 0.001)], None),
            )],
        },
        MechanismSpec {
            name: "Kv1_5",
            conductance_param: "gKur",
            ions: &["k"],
            params: vec![(
                "gKur",
                combine(vec![uniform(named(&["dend"]), 0.13195e-3)], None),
            )],
        },
        MechanismSpec {
            name: "Kv3_3",
            conductance_param: "gbar",
            ions: &["k"],
            params: vec![(
                "gbar",
                combine(vec![uniform(named(&["dend"]), 0.01)], None),
            )],
        },
        MechanismSpec {
            name: "cdp5",
            conductance_param: "Nannuli",
            ions: &["ca"],
            params: cdp5_params(),
        },
        MechanismSpec {
            name: "pas",
            conductance_param: "g",
            ions: &[],
            params: vec![
                ("e", combine(vec![uniform(named(&MYELIN), -63.0)], None)),
                ("g", combine(vec![uniform(named(&MYELIN), 5.6e-9)], None)),
            ],
        },
    ]
}

/// Membrane-capacitance distribution.
///
/// `subset_cm` rows come from the capacitance-subset table; each value is
/// rescaled by `ratio` before use. The myelinated internodes keep their
/// own far smaller constant.
pub fn capacitance_distribution(subset_cm: &[(i64, f64)], ratio: f64) -> Distribution {
    let mut rules: Vec<DistributionRule> = vec![
        uniform(
            named(&[
                "soma",
                "axonAIS",
                "axonAISK",
                "axonNOR",
                "axonNOR2",
                "axonNOR3",
            ]),
            CM_DEFAULT,
        ),
        uniform(named(&MYELIN), CM_MYELIN),
        uniform(named(&["axoncoll", "axoncoll2"]), 1.0),
        uniform(named(&["b0s02[24]"]), 8.58298 * ratio),
    ];
    for &(subset_id, value) in subset_cm {
        rules.push(uniform(
            named(&[format!("dend_subset{}", subset_id)]),
            value * ratio,
        ));
    }
    combine(rules, Some(CM_DEFAULT))
}

/// Ionic species declarations: reversal potentials and, for calcium, the
/// internal/external concentrations its buffering mechanisms require.
pub fn ionic_species() -> Vec<IonicSpecies> {
    vec![
        IonicSpecies {
            name: "h",
            reversal_potential: Distribution::constant(-34.4),
            internal_concentration: None,
            external_concentration: None,
        },
        IonicSpecies {
            name: "na",
            reversal_potential: combine(
                vec![uniform(named(&["axonAIS"]), 75.0)],
                Some(60.0),
            ),
            internal_concentration: None,
            external_concentration: None,
        },
        IonicSpecies {
            name: "k",
            reversal_potential: Distribution::constant(-88.0),
            internal_concentration: None,
            external_concentration: None,
        },
        IonicSpecies {
            name: "ca",
            reversal_potential: combine(
                vec![uniform(
                    named(&[
                        "soma",
                        "dend",
                        "axonAIS",
                        "axonAISK",
                        "axoncoll",
                        "axoncoll2",
                    ]),
                    137.52625,
                )],
                None,
            ),
            internal_concentration: Some(5e-5),
            external_concentration: Some(2.0),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regions::RuleValue;

    fn catalogue_mechanism(name: &str) -> MechanismSpec {
        ion_channel_catalogue()
            .into_iter()
            .find(|m| m.name == name)
            .unwrap_or_else(|| panic!("mechanism {name} missing from catalogue"))
    }

    #[test]
    fn test_catalogue_mechanism_count() {
        assert_eq!(ion_channel_catalogue().len(), 18);
    }

    #[test]
    fn test_conductance_slot_special_cases() {
        assert_eq!(catalogue_mechanism("Kv1_5").conductance_param, "gKur");
        assert_eq!(catalogue_mechanism("Cav3_1").conductance_param, "pcabar");
        assert_eq!(catalogue_mechanism("Cav2_1").conductance_param, "pcabar");
        assert_eq!(catalogue_mechanism("Cav3_3").conductance_param, "pcabar");
        // cdp5 is keyed by a non-conductance parameter on purpose
        assert_eq!(catalogue_mechanism("cdp5").conductance_param, "Nannuli");
    }

    #[test]
    fn test_leak_gmax_rule_order() {
        let leak = catalogue_mechanism("Leak");
        let (_, gmax) = leak.params.iter().find(|(p, _)| *p == "gmax").unwrap();
        // soma + axon + b0s02[24] + 45 subset rules + dend fallback
        assert_eq!(gmax.rules.len(), 3 + LEAK_SUBSET_GMAX.len() + 1);
        // the general dendrite rule must come last so subset rules win
        let last = gmax.rules.last().unwrap();
        assert_eq!(last.selector.labels(), ["dend"]);
        match last.value {
            RuleValue::Uniform(v) => assert!((v - 3.33333e-5 / 2.0).abs() < 1e-20),
            _ => panic!("dend fallback must be uniform"),
        }
        assert!(gmax.default.is_none());
    }

    #[test]
    fn test_nannuli_polynomial() {
        let cdp5 = catalogue_mechanism("cdp5");
        let (_, nannuli) = cdp5.params.iter().find(|(p, _)| *p == "Nannuli").unwrap();
        let RuleValue::ByDiameter(f) = &nannuli.rules[0].value else {
            panic!("Nannuli must be diameter-dependent");
        };
        let d: f64 = 4.0;
        let expected = 0.326 + 1.94 * d + 0.289 * d.powi(2) - 3.33e-2 * d.powi(3)
            + 1.55e-3 * d.powi(4)
            - 2.55e-5 * d.powi(5);
        assert!((f.eval(d) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_capacitance_distribution_shape() {
        let dist = capacitance_distribution(&[(5, 2.0), (10, 3.0)], 0.77 / 1.64);
        assert_eq!(dist.default, Some(CM_DEFAULT));
        assert_eq!(dist.rules.len(), 4 + 2);
        // myelin stays at its own tiny constant, not a rescaled table value
        match dist.rules[1].value {
            RuleValue::Uniform(v) => assert_eq!(v, CM_MYELIN),
            _ => panic!("myelin cm must be uniform"),
        }
        match dist.rules[5].value {
            RuleValue::Uniform(v) => assert!((v - 3.0 * 0.77 / 1.64).abs() < 1e-15),
            _ => panic!("subset cm must be uniform"),
        }
    }

    #[test]
    fn test_ionic_species() {
        let species = ionic_species();
        assert_eq!(species.len(), 4);
        let ca = species.iter().find(|s| s.name == "ca").unwrap();
        assert_eq!(ca.internal_concentration, Some(5e-5));
        assert_eq!(ca.external_concentration, Some(2.0));
        // calcium reversal is regional with no fallback value
        assert!(ca.reversal_potential.default.is_none());
        let na = species.iter().find(|s| s.name == "na").unwrap();
        assert_eq!(na.reversal_potential.default, Some(60.0));
    }
}
