//! Assignments: variable valuations produced and consumed by searches.

#[cfg(test)]
#[path = "../../tests/unit/solver/assignment_test.rs"]
mod assignment_test;

use crate::solver::{IntVar, Solver};
use crate::utils::GenericResult;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A (partial) valuation: for every stored variable the bounds it had when
/// the assignment was captured, usually a single value, plus an objective.
#[derive(Clone, Debug, Default)]
pub struct Assignment {
    entries: HashMap<usize, (i64, i64)>,
    objective: Option<i64>,
}

/// The persisted shape of an [`Assignment`]: the objective and one record per
/// variable, sorted by variable identifier.
#[derive(Serialize, Deserialize)]
struct AssignmentRecord {
    objective: Option<i64>,
    variables: Vec<VariableRecord>,
}

#[derive(Serialize, Deserialize)]
struct VariableRecord {
    id: usize,
    min: i64,
    max: i64,
}

impl Assignment {
    /// Creates an empty assignment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the bounds of a variable.
    pub fn set_bounds(&mut self, var: IntVar, min: i64, max: i64) {
        debug_assert!(min <= max);
        self.entries.insert(var.index(), (min, max));
    }

    /// Stores a single value for a variable.
    pub fn set_value(&mut self, var: IntVar, value: i64) {
        self.set_bounds(var, value, value);
    }

    /// Captures the current bounds of a variable from the solver.
    pub fn store_var(&mut self, solver: &Solver, var: IntVar) {
        self.set_bounds(var, solver.min(var), solver.max(var));
    }

    /// Returns true when the assignment contains the variable.
    pub fn has_var(&self, var: IntVar) -> bool {
        self.entries.contains_key(&var.index())
    }

    /// Returns the bounds stored for a variable.
    pub fn bounds(&self, var: IntVar) -> Option<(i64, i64)> {
        self.entries.get(&var.index()).copied()
    }

    /// Returns the value stored for a variable when it is a single value.
    pub fn value(&self, var: IntVar) -> Option<i64> {
        self.bounds(var).filter(|(min, max)| min == max).map(|(min, _)| min)
    }

    /// Returns the objective value, if any.
    pub fn objective(&self) -> Option<i64> {
        self.objective
    }

    /// Sets the objective value.
    pub fn set_objective(&mut self, objective: i64) {
        self.objective = Some(objective);
    }

    /// Returns the number of variables stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no variable is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `(variable, min, max)` triples sorted by variable identifier.
    pub fn sorted_entries(&self) -> Vec<(IntVar, i64, i64)> {
        let mut entries: Vec<_> =
            self.entries.iter().map(|(&id, &(min, max))| (IntVar::from_index(id), min, max)).collect();
        entries.sort_by_key(|(var, _, _)| var.index());
        entries
    }

    /// Copies the entries of `other` into this assignment, overwriting the
    /// variables stored in both.
    pub fn copy_from(&mut self, other: &Assignment) {
        for (var, min, max) in other.sorted_entries() {
            self.set_bounds(var, min, max);
        }
        if let Some(objective) = other.objective {
            self.objective = Some(objective);
        }
    }

    /// Writes the assignment to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> GenericResult<()> {
        let record = AssignmentRecord {
            objective: self.objective,
            variables: self
                .sorted_entries()
                .into_iter()
                .map(|(var, min, max)| VariableRecord { id: var.index(), min, max })
                .collect(),
        };
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), &record)
            .map_err(|err| format!("cannot write assignment: {err}"))?;
        Ok(())
    }

    /// Reads an assignment back from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> GenericResult<Self> {
        let file = File::open(path)?;
        let record: AssignmentRecord = serde_json::from_reader(BufReader::new(file))
            .map_err(|err| format!("cannot read assignment: {err}"))?;
        let mut assignment = Assignment { objective: record.objective, ..Assignment::default() };
        for variable in record.variables {
            if variable.min > variable.max {
                return Err(format!("variable {} has inconsistent bounds", variable.id).into());
            }
            assignment.entries.insert(variable.id, (variable.min, variable.max));
        }
        Ok(assignment)
    }
}
