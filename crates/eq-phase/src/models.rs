//! Gibbs energy models.
//!
//! Each model turns (phase, sublattice view, parameter view) into a symbolic
//! AST over the phase's site-fraction variables and the state variable T.
//! Models are built once at composition-set construction; everything
//! downstream works on the trees.
//!
//! All energetic models are normalized by the phase's total site count, so
//! energies are per mole of sites.

use crate::parameters::{ParameterKind, ParameterSet};
use crate::sublattice::{Phase, Species, SublatticeSet};
use eq_core::GAS_CONSTANT;
use eq_expr::{simplify, Expr, SymbolTable};
use std::fmt;

/// Model kinds owned by a composition set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ModelKind {
    PureEnergy,
    IdealMix,
    RedlichKister,
    IhjMagnetic,
}

/// A Gibbs energy contribution with its expression tree and symbols.
pub trait EnergyModel: fmt::Debug {
    fn kind(&self) -> ModelKind;
    fn ast(&self) -> &Expr;
    fn symbol_table(&self) -> &SymbolTable;
    /// Deep copy with every phase-owned symbol renamed; used when a
    /// miscibility gap forces a second composition set of the same phase.
    fn clone_with_renamed_phase(&self, old: &str, new: &str) -> Box<dyn EnergyModel>;
}

fn renamed_symbols(symbols: &SymbolTable, old: &str, new: &str) -> SymbolTable {
    symbols
        .iter()
        .map(|(name, body)| {
            (
                eq_expr::tree::rename_variable(name, old, new),
                body.rename_phase(old, new),
            )
        })
        .collect()
}

/// Site-fraction symbol for one sublattice entry.
fn site_fraction(phase: &str, sublattice: usize, species: &Species) -> Expr {
    Expr::sym(format!("{phase}_{sublattice}_{}", species.name()))
}

/// Iterate the cartesian product of per-sublattice index ranges.
fn for_each_combination(lens: &[usize], mut visit: impl FnMut(&[usize])) {
    if lens.iter().any(|&l| l == 0) {
        return;
    }
    let mut odometer = vec![0usize; lens.len()];
    loop {
        visit(&odometer);
        let mut pos = lens.len();
        loop {
            if pos == 0 {
                return;
            }
            pos -= 1;
            odometer[pos] += 1;
            if odometer[pos] < lens[pos] {
                break;
            }
            odometer[pos] = 0;
        }
    }
}

/// Sum over endmembers: for every one-species-per-sublattice combination with
/// a matching parameter, emit the product of site fractions times the
/// parameter AST. Missing parameters contribute zero.
fn endmember_sum(
    phase: &str,
    sublset: &SublatticeSet,
    params: &ParameterSet,
    kinds: &[ParameterKind],
) -> Expr {
    let species = sublset.species_per_sublattice(phase);
    let lens: Vec<usize> = species.iter().map(Vec::len).collect();
    let mut terms: Vec<Expr> = Vec::new();
    for_each_combination(&lens, |combo| {
        let selection: Vec<Vec<Species>> = combo
            .iter()
            .enumerate()
            .map(|(s, &i)| vec![species[s][i].clone()])
            .collect();
        let matches = params.matching(phase, kinds, &selection);
        if matches.is_empty() {
            return;
        }
        let mut factors: Vec<Expr> = combo
            .iter()
            .enumerate()
            .map(|(s, &i)| site_fraction(phase, s, &species[s][i]))
            .collect();
        let param_sum = Expr::add(matches.iter().map(|p| p.ast.clone()).collect());
        factors.push(param_sum);
        terms.push(Expr::mul(factors));
    });
    if terms.is_empty() {
        Expr::num(0.0)
    } else {
        Expr::add(terms)
    }
}

/// Sum over binary and ternary interactions: one sublattice carries the
/// interacting pair or triple, every other sublattice a single species.
///
/// A binary pair {i, j} contributes `y_i y_j sum_k L_k (y_i - y_j)^k` over
/// the matching orders k, with (i, j) in lexicographic species order so odd
/// polynomial orders have a deterministic sign. A ternary triple contributes
/// `y_i y_j y_k (sum L)/3` (Muggianu symmetric convention).
fn interaction_sum(
    phase: &str,
    sublset: &SublatticeSet,
    params: &ParameterSet,
    kinds: &[ParameterKind],
) -> Expr {
    let species = sublset.species_per_sublattice(phase);
    let lens: Vec<usize> = species.iter().map(Vec::len).collect();
    let mut terms: Vec<Expr> = Vec::new();

    for d in 0..species.len() {
        let mut interacting = species[d].clone();
        interacting.sort();
        let mut other_lens = lens.clone();
        other_lens[d] = 1; // placeholder; slot d is driven by the pair/triple

        // Binary interactions
        for i in 0..interacting.len() {
            for j in (i + 1)..interacting.len() {
                let pair = (&interacting[i], &interacting[j]);
                for_each_combination(&other_lens, |combo| {
                    let selection: Vec<Vec<Species>> = combo
                        .iter()
                        .enumerate()
                        .map(|(s, &idx)| {
                            if s == d {
                                vec![pair.0.clone(), pair.1.clone()]
                            } else {
                                vec![species[s][idx].clone()]
                            }
                        })
                        .collect();
                    let matches = params.matching(phase, kinds, &selection);
                    if matches.is_empty() {
                        return;
                    }
                    let yi = site_fraction(phase, d, pair.0);
                    let yj = site_fraction(phase, d, pair.1);
                    let difference = Expr::sub(yi.clone(), yj.clone());
                    let rk = Expr::add(
                        matches
                            .iter()
                            .map(|p| {
                                if p.order == 0 {
                                    p.ast.clone()
                                } else {
                                    Expr::mul(vec![
                                        p.ast.clone(),
                                        Expr::pow(difference.clone(), Expr::num(p.order as f64)),
                                    ])
                                }
                            })
                            .collect(),
                    );
                    let mut factors: Vec<Expr> = combo
                        .iter()
                        .enumerate()
                        .filter(|(s, _)| *s != d)
                        .map(|(s, &idx)| site_fraction(phase, s, &species[s][idx]))
                        .collect();
                    factors.push(yi);
                    factors.push(yj);
                    factors.push(rk);
                    terms.push(Expr::mul(factors));
                });
            }
        }

        // Ternary interactions
        for i in 0..interacting.len() {
            for j in (i + 1)..interacting.len() {
                for k in (j + 1)..interacting.len() {
                    let triple = [&interacting[i], &interacting[j], &interacting[k]];
                    for_each_combination(&other_lens, |combo| {
                        let selection: Vec<Vec<Species>> = combo
                            .iter()
                            .enumerate()
                            .map(|(s, &idx)| {
                                if s == d {
                                    triple.iter().map(|sp| (*sp).clone()).collect()
                                } else {
                                    vec![species[s][idx].clone()]
                                }
                            })
                            .collect();
                        let matches = params.matching(phase, kinds, &selection);
                        if matches.is_empty() {
                            return;
                        }
                        let param_sum =
                            Expr::add(matches.iter().map(|p| p.ast.clone()).collect());
                        let mut factors: Vec<Expr> = combo
                            .iter()
                            .enumerate()
                            .filter(|(s, _)| *s != d)
                            .map(|(s, &idx)| site_fraction(phase, s, &species[s][idx]))
                            .collect();
                        for sp in triple {
                            factors.push(site_fraction(phase, d, sp));
                        }
                        factors.push(Expr::div(param_sum, Expr::num(3.0)));
                        terms.push(Expr::mul(factors));
                    });
                }
            }
        }
    }

    if terms.is_empty() {
        Expr::num(0.0)
    } else {
        Expr::add(terms)
    }
}

fn normalize(ast: Expr, total_sites: f64) -> Expr {
    if total_sites == 1.0 {
        simplify(&ast)
    } else {
        simplify(&Expr::div(ast, Expr::num(total_sites)))
    }
}

/// Reference (endmember) Gibbs energy.
#[derive(Debug, Clone)]
pub struct PureCompoundEnergy {
    phase: String,
    ast: Expr,
    symbols: SymbolTable,
}

impl PureCompoundEnergy {
    pub fn new(phase: &str, sublset: &SublatticeSet, params: &ParameterSet) -> Self {
        let raw = endmember_sum(phase, sublset, params, &[ParameterKind::G]);
        let ast = normalize(raw, sublset.total_sites(phase));
        PureCompoundEnergy {
            phase: phase.to_string(),
            ast,
            symbols: params.symbols().clone(),
        }
    }
}

impl EnergyModel for PureCompoundEnergy {
    fn kind(&self) -> ModelKind {
        ModelKind::PureEnergy
    }

    fn ast(&self) -> &Expr {
        &self.ast
    }

    fn symbol_table(&self) -> &SymbolTable {
        &self.symbols
    }

    fn clone_with_renamed_phase(&self, old: &str, new: &str) -> Box<dyn EnergyModel> {
        Box::new(PureCompoundEnergy {
            phase: eq_expr::tree::rename_variable(&self.phase, old, new),
            ast: self.ast.rename_phase(old, new),
            symbols: renamed_symbols(&self.symbols, old, new),
        })
    }
}

/// Ideal entropy of mixing: `sum_s n_s R T sum_j y_j ln y_j`.
#[derive(Debug, Clone)]
pub struct IdealMixing {
    phase: String,
    ast: Expr,
    symbols: SymbolTable,
}

impl IdealMixing {
    pub fn new(phase: &str, sublset: &SublatticeSet) -> Self {
        let mut terms: Vec<Expr> = Vec::new();
        for s in 0..sublset.sublattice_count(phase) {
            let entries = sublset.sublattice_entries(phase, s);
            let Some(first) = entries.first() else {
                continue;
            };
            let site_count = first.site_count;
            let entropy = Expr::add(
                entries
                    .iter()
                    .map(|e| {
                        let y = site_fraction(phase, s, &e.species);
                        Expr::mul(vec![y.clone(), Expr::ln(y)])
                    })
                    .collect(),
            );
            terms.push(Expr::mul(vec![
                Expr::num(site_count * GAS_CONSTANT),
                Expr::sym("T"),
                entropy,
            ]));
        }
        let raw = if terms.is_empty() {
            Expr::num(0.0)
        } else {
            Expr::add(terms)
        };
        let ast = normalize(raw, sublset.total_sites(phase));
        IdealMixing {
            phase: phase.to_string(),
            ast,
            symbols: SymbolTable::new(),
        }
    }
}

impl EnergyModel for IdealMixing {
    fn kind(&self) -> ModelKind {
        ModelKind::IdealMix
    }

    fn ast(&self) -> &Expr {
        &self.ast
    }

    fn symbol_table(&self) -> &SymbolTable {
        &self.symbols
    }

    fn clone_with_renamed_phase(&self, old: &str, new: &str) -> Box<dyn EnergyModel> {
        Box::new(IdealMixing {
            phase: eq_expr::tree::rename_variable(&self.phase, old, new),
            ast: self.ast.rename_phase(old, new),
            symbols: renamed_symbols(&self.symbols, old, new),
        })
    }
}

/// Excess Gibbs energy via Redlich-Kister polynomials.
#[derive(Debug, Clone)]
pub struct RedlichKisterExcess {
    phase: String,
    ast: Expr,
    symbols: SymbolTable,
}

impl RedlichKisterExcess {
    pub fn new(phase: &str, sublset: &SublatticeSet, params: &ParameterSet) -> Self {
        // Interaction parameters appear under both G and L keywords.
        let raw = interaction_sum(
            phase,
            sublset,
            params,
            &[ParameterKind::G, ParameterKind::L],
        );
        let ast = normalize(raw, sublset.total_sites(phase));
        RedlichKisterExcess {
            phase: phase.to_string(),
            ast,
            symbols: params.symbols().clone(),
        }
    }
}

impl EnergyModel for RedlichKisterExcess {
    fn kind(&self) -> ModelKind {
        ModelKind::RedlichKister
    }

    fn ast(&self) -> &Expr {
        &self.ast
    }

    fn symbol_table(&self) -> &SymbolTable {
        &self.symbols
    }

    fn clone_with_renamed_phase(&self, old: &str, new: &str) -> Box<dyn EnergyModel> {
        Box::new(RedlichKisterExcess {
            phase: eq_expr::tree::rename_variable(&self.phase, old, new),
            ast: self.ast.rename_phase(old, new),
            symbols: renamed_symbols(&self.symbols, old, new),
        })
    }
}

/// Inden-Hillert-Jarl magnetic contribution: `R T ln(beta+1) g(tau)` with
/// tau = T/Tc. Curie temperature and Bohr magneton number are themselves
/// composition polynomials (endmembers plus interactions) built from TC and
/// BMAGN parameters. Negative Tc/beta are divided by the antiferromagnetic
/// factor; the short-range-order fraction p parameterizes g.
#[derive(Debug, Clone)]
pub struct IhjMagnetic {
    phase: String,
    ast: Expr,
    symbols: SymbolTable,
}

impl IhjMagnetic {
    pub fn new(phase_obj: &Phase, sublset: &SublatticeSet, params: &ParameterSet) -> Self {
        let phase = phase_obj.name.as_str();
        let tc = simplify(&Expr::add(vec![
            endmember_sum(phase, sublset, params, &[ParameterKind::Tc]),
            interaction_sum(phase, sublset, params, &[ParameterKind::Tc]),
        ]));
        let beta = simplify(&Expr::add(vec![
            endmember_sum(phase, sublset, params, &[ParameterKind::Bmagn]),
            interaction_sum(phase, sublset, params, &[ParameterKind::Bmagn]),
        ]));

        let ast = if tc.is_literal_zero() || beta.is_literal_zero() {
            // Non-magnetic phase
            Expr::num(0.0)
        } else {
            let afm = phase_obj.magnetic_afm_factor;
            let p = phase_obj.magnetic_sro_fraction;
            let tc_eff = Expr::if_less(
                tc.clone(),
                Expr::num(0.0),
                Expr::div(tc.clone(), Expr::num(afm)),
                tc,
            );
            let beta_eff = Expr::if_less(
                beta.clone(),
                Expr::num(0.0),
                Expr::div(beta.clone(), Expr::num(afm)),
                beta,
            );
            let tau = Expr::div(Expr::sym("T"), tc_eff);
            let g = Self::g_of_tau(&tau, p);
            let raw = Expr::mul(vec![
                Expr::num(GAS_CONSTANT),
                Expr::sym("T"),
                Expr::ln(Expr::add(vec![beta_eff, Expr::num(1.0)])),
                g,
            ]);
            normalize(raw, sublset.total_sites(phase))
        };

        IhjMagnetic {
            phase: phase.to_string(),
            ast,
            symbols: params.symbols().clone(),
        }
    }

    /// The IHJ g(tau) polynomial, split at tau = 1.
    fn g_of_tau(tau: &Expr, p: f64) -> Expr {
        let d = 518.0 / 1125.0 + (11692.0 / 15975.0) * (1.0 / p - 1.0);
        let tau_pow = |e: f64| Expr::pow(tau.clone(), Expr::num(e));
        let low = Expr::sub(
            Expr::num(1.0),
            Expr::div(
                Expr::add(vec![
                    Expr::mul(vec![Expr::num(79.0 / (140.0 * p)), tau_pow(-1.0)]),
                    Expr::mul(vec![
                        Expr::num(474.0 / 497.0 * (1.0 / p - 1.0)),
                        Expr::add(vec![
                            Expr::div(tau_pow(3.0), Expr::num(6.0)),
                            Expr::div(tau_pow(9.0), Expr::num(135.0)),
                            Expr::div(tau_pow(15.0), Expr::num(600.0)),
                        ]),
                    ]),
                ]),
                Expr::num(d),
            ),
        );
        let high = Expr::mul(vec![
            Expr::num(-1.0),
            Expr::div(
                Expr::add(vec![
                    Expr::div(tau_pow(-5.0), Expr::num(10.0)),
                    Expr::div(tau_pow(-15.0), Expr::num(315.0)),
                    Expr::div(tau_pow(-25.0), Expr::num(1500.0)),
                ]),
                Expr::num(d),
            ),
        ]);
        Expr::if_less(tau.clone(), Expr::num(1.0), low, high)
    }
}

impl EnergyModel for IhjMagnetic {
    fn kind(&self) -> ModelKind {
        ModelKind::IhjMagnetic
    }

    fn ast(&self) -> &Expr {
        &self.ast
    }

    fn symbol_table(&self) -> &SymbolTable {
        &self.symbols
    }

    fn clone_with_renamed_phase(&self, old: &str, new: &str) -> Box<dyn EnergyModel> {
        Box::new(IhjMagnetic {
            phase: eq_expr::tree::rename_variable(&self.phase, old, new),
            ast: self.ast.rename_phase(old, new),
            symbols: renamed_symbols(&self.symbols, old, new),
        })
    }
}
