//! Ground program to CNF translation
//!
//! Encodes a ground program under supported-model semantics (Clark
//! completion): an atom is true only if the body of some rule with the atom in
//! its head is true, and a true body enforces the head's cardinality bounds.
//! No unfounded-set reasoning is performed. Rule bodies become Tseitin AND
//! gates; bounds use a sequential counter.

use crate::ast::{GroundAtom, Literal, Program};
use rustc_hash::FxHashMap;

/// CNF representation
#[derive(Debug, Clone, Default)]
pub struct CNF {
    /// Number of variables
    pub num_variables: u32,
    /// CNF clauses (each clause is a vec of literals, negative = negated)
    pub clauses: Vec<Vec<i32>>,
}

impl CNF {
    /// Creates a new empty CNF
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a clause to the CNF
    pub fn add_clause(&mut self, clause: Vec<i32>) {
        for &lit in &clause {
            let var = lit.unsigned_abs();
            if var > self.num_variables {
                self.num_variables = var;
            }
        }
        self.clauses.push(clause);
    }

    /// Number of clauses
    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }
}

/// Allocates SAT variables: one per atom, plus auxiliary gate variables
///
/// Variables start at 1 (DIMACS convention).
#[derive(Debug, Clone)]
pub struct VariableAllocator {
    next_var: u32,
    atom_vars: FxHashMap<GroundAtom, u32>,
    atoms: Vec<GroundAtom>,
}

impl VariableAllocator {
    /// Creates a new variable allocator
    pub fn new() -> Self {
        Self {
            next_var: 1,
            atom_vars: FxHashMap::default(),
            atoms: Vec::new(),
        }
    }

    /// Returns the variable of `atom`, allocating it on first use
    pub fn atom_var(&mut self, atom: &GroundAtom) -> u32 {
        if let Some(&var) = self.atom_vars.get(atom) {
            return var;
        }
        let var = self.fresh();
        self.atom_vars.insert(atom.clone(), var);
        self.atoms.push(atom.clone());
        var
    }

    /// Allocates an auxiliary variable
    pub fn fresh(&mut self) -> u32 {
        let var = self.next_var;
        self.next_var += 1;
        var
    }

    /// Looks up the variable of an atom without allocating
    pub fn get(&self, atom: &GroundAtom) -> Option<u32> {
        self.atom_vars.get(atom).copied()
    }

    /// Atoms with a variable, in allocation order
    pub fn atoms(&self) -> &[GroundAtom] {
        &self.atoms
    }

    /// Returns the total number of variables allocated
    pub fn total_variables(&self) -> u32 {
        self.next_var - 1
    }
}

impl Default for VariableAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Translates a ground program to CNF under Clark completion
pub struct CompletionTranslator<'a> {
    cnf: CNF,
    vars: &'a mut VariableAllocator,
}

impl<'a> CompletionTranslator<'a> {
    /// Creates a translator that allocates into `vars`
    ///
    /// Sharing one allocator across translations keeps atom variables stable,
    /// which is what incremental loading relies on.
    pub fn new(vars: &'a mut VariableAllocator) -> Self {
        Self {
            cnf: CNF::new(),
            vars,
        }
    }

    /// Translates the program
    ///
    /// Every atom of the program gets a variable, including atoms that occur
    /// only in bodies (they have no support and are forced false).
    pub fn translate(mut self, program: &Program) -> CNF {
        for atom in program.herbrand_base() {
            self.vars.atom_var(&atom);
        }

        let mut supports: FxHashMap<u32, Vec<i32>> = FxHashMap::default();
        for rule in program.rules() {
            let body = self.translate_body(&rule.body);
            let heads: Vec<i32> = rule
                .head
                .atoms()
                .iter()
                .map(|atom| self.vars.atom_var(atom) as i32)
                .collect();
            for &head in &heads {
                supports.entry(head as u32).or_default().push(body);
            }
            self.translate_bounds(body, &heads, rule.head.lower_bound(), rule.head.upper_bound());
        }

        // support: an atom implies the disjunction of its rule bodies
        for atom in program.herbrand_base() {
            let var = self.vars.atom_var(&atom);
            let mut clause = vec![-(var as i32)];
            if let Some(bodies) = supports.get(&var) {
                clause.extend(bodies.iter().copied());
            }
            self.cnf.add_clause(clause);
        }

        self.cnf.num_variables = self.cnf.num_variables.max(self.vars.total_variables());
        self.cnf
    }

    fn literal_label(&mut self, literal: &Literal) -> i32 {
        let var = self.vars.atom_var(&literal.atom) as i32;
        if literal.positive {
            var
        } else {
            -var
        }
    }

    /// Returns a variable equivalent to the conjunction of the body
    fn translate_body(&mut self, body: &[Literal]) -> i32 {
        let output = self.vars.fresh() as i32;
        let inputs: Vec<i32> = body.iter().map(|l| self.literal_label(l)).collect();
        self.translate_and(output, &inputs);
        output
    }

    /// Translates AND gate: output = a1 ∧ a2 ∧ ... ∧ an
    ///
    /// CNF encoding:
    /// - (¬a1 ∨ ¬a2 ∨ ... ∨ ¬an ∨ output) - if all inputs true, output true
    /// - (a1 ∨ ¬output) - if output true, each input must be true
    /// - (a2 ∨ ¬output)
    /// - ...
    ///
    /// An empty conjunction makes the output a unit clause.
    fn translate_and(&mut self, output: i32, inputs: &[i32]) {
        let mut clause = inputs.iter().map(|&l| -l).collect::<Vec<_>>();
        clause.push(output);
        self.cnf.add_clause(clause);

        for &input in inputs {
            self.cnf.add_clause(vec![input, -output]);
        }
    }

    /// body → lower ≤ |true heads| ≤ upper
    fn translate_bounds(&mut self, body: i32, heads: &[i32], lower: usize, upper: usize) {
        let n = heads.len();
        if lower > n || lower > upper {
            self.cnf.add_clause(vec![-body]);
            return;
        }
        if lower > 0 {
            // at least `lower` heads true = at most `n - lower` heads false
            let negated: Vec<i32> = heads.iter().map(|&h| -h).collect();
            self.at_most(body, &negated, n - lower);
        }
        if upper < n {
            self.at_most(body, heads, upper);
        }
    }

    /// guard → at most `k` of `lits` are true (sequential counter)
    fn at_most(&mut self, guard: i32, lits: &[i32], k: usize) {
        let n = lits.len();
        if k >= n {
            return;
        }
        if k == 0 {
            for &lit in lits {
                self.cnf.add_clause(vec![-guard, -lit]);
            }
            return;
        }

        // registers[i][j]: at least j+1 of lits[0..=i] are true
        let mut registers: Vec<Vec<i32>> = Vec::with_capacity(n - 1);
        for i in 0..n - 1 {
            let row: Vec<i32> = (0..k).map(|_| self.vars.fresh() as i32).collect();
            if i == 0 {
                self.cnf.add_clause(vec![-guard, -lits[0], row[0]]);
                for &reg in &row[1..] {
                    self.cnf.add_clause(vec![-reg]);
                }
            } else {
                let prev = &registers[i - 1];
                self.cnf.add_clause(vec![-guard, -lits[i], row[0]]);
                for j in 0..k {
                    self.cnf.add_clause(vec![-prev[j], row[j]]);
                }
                for j in 1..k {
                    self.cnf.add_clause(vec![-guard, -lits[i], -prev[j - 1], row[j]]);
                }
                self.cnf.add_clause(vec![-guard, -lits[i], -prev[k - 1]]);
            }
            registers.push(row);
        }
        self.cnf.add_clause(vec![-guard, -lits[n - 1], -registers[n - 2][k - 1]]);
    }
}
