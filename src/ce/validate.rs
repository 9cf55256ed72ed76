//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Dap4.
//! The Dap4 project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! Checks a parsed constraint against a schema.
//!
//! Every projected name must denote a variable, nested segments must name
//! fields of a Structure or Sequence, slices must fit the dimensions they
//! apply to, and filter operands must resolve. Only legality is checked
//! here; evaluating the constraint is left to the caller.

use regex::Regex;

use crate::ce::ast::{Constant, Constraint, Filter, Operator, Primary, SegmentTree, Slice};
use crate::ce::parser::parse_ce;
use crate::dmr::{DapDataset, DimRef, Namespace};
use crate::errors::{DapError, Result};
use crate::ids::NodeId;

/// Parse `text` and validate it against `dataset`.
pub fn parse_ce_with(text: &str, dataset: &DapDataset) -> Result<Constraint> {
    let constraint = parse_ce(text)?;
    validate(&constraint, dataset)?;
    Ok(constraint)
}

pub fn validate(constraint: &Constraint, dataset: &DapDataset) -> Result<()> {
    for redef in &constraint.dim_redefs {
        let dim = dataset
            .resolve(Namespace::Dimension, &redef.name, dataset.root())
            .ok_or_else(|| {
                DapError::semantic(format!("'{}' does not name a shared dimension", redef.name))
            })?;
        let size = dataset.dimension(dim).map(|d| d.size).unwrap_or(0);
        check_slice(&redef.slice, Some(size), &redef.name)?;
    }
    for clause in &constraint.clauses {
        let name = &clause.projection.segment.name;
        let var = dataset
            .resolve(Namespace::Variable, name, dataset.root())
            .filter(|&id| dataset.is_top_level(id) || name.starts_with('/'))
            .ok_or_else(|| DapError::semantic(format!("'{name}' does not name a variable")))?;
        check_tree(&clause.projection, var, dataset)?;
        if let Some(filter) = &clause.filter {
            let target = deepest(&clause.projection, var, dataset);
            check_filter(filter, target, dataset)?;
        }
    }
    Ok(())
}

fn check_slice(slice: &Slice, size: Option<u64>, name: &str) -> Result<()> {
    let fits = match (slice, size) {
        (Slice::VarLength { count: Some(_) }, Some(_)) => false,
        (Slice::Range { stride: 0, .. }, _) => false,
        (Slice::Range { start, stop: Some(stop), .. }, None) => start <= stop,
        (_, None) => true,
        (slice, Some(size)) => slice.count(size).is_some(),
    };
    if fits {
        Ok(())
    } else {
        Err(DapError::semantic(format!(
            "slice {slice} does not fit dimension of '{name}'"
        )))
    }
}

fn check_tree(tree: &SegmentTree, var: NodeId, dataset: &DapDataset) -> Result<()> {
    let segment = &tree.segment;
    if !segment.slices.is_empty() {
        let variable = dataset
            .variable(var)
            .ok_or_else(|| DapError::internal("projection resolved to a non-variable"))?;
        if segment.slices.len() != variable.rank() {
            return Err(DapError::semantic(format!(
                "'{}' has rank {} but {} slice(s) were given",
                segment.name,
                variable.rank(),
                segment.slices.len()
            )));
        }
        for (slice, dim) in segment.slices.iter().zip(&variable.dims) {
            let size = match dim {
                DimRef::Node(id) => dataset.dimension(*id).map(|d| d.size),
                DimRef::VarLength => None,
            };
            check_slice(slice, size, &segment.name)?;
        }
    }
    if tree.children.is_empty() {
        return Ok(());
    }
    if !dataset.node(var).is_compound_variable() {
        return Err(DapError::semantic(format!(
            "'{}' is not a Structure or Sequence and has no fields",
            segment.name
        )));
    }
    for child in &tree.children {
        let field = field_named(dataset, var, &child.segment.name).ok_or_else(|| {
            DapError::semantic(format!(
                "'{}' is not a field of '{}'",
                child.segment.name, segment.name
            ))
        })?;
        check_tree(child, field, dataset)?;
    }
    Ok(())
}

fn field_named(dataset: &DapDataset, var: NodeId, name: &str) -> Option<NodeId> {
    dataset
        .fields(var)
        .iter()
        .copied()
        .find(|&f| dataset.node(f).name() == name)
}

/// The variable a filter applies to: the end of a single-path projection.
fn deepest(tree: &SegmentTree, var: NodeId, dataset: &DapDataset) -> NodeId {
    match tree.children.as_slice() {
        [only] => field_named(dataset, var, &only.segment.name)
            .map(|f| deepest(only, f, dataset))
            .unwrap_or(var),
        _ => var,
    }
}

fn resolve_field(path: &str, target: NodeId, dataset: &DapDataset) -> Option<NodeId> {
    if path.starts_with('/') {
        return dataset.find_variable(path);
    }
    let mut current = target;
    let mut found = None;
    for part in path.split('.') {
        let next = field_named(dataset, current, part)?;
        found = Some(next);
        current = next;
    }
    found
}

fn check_primary(primary: &Primary, target: NodeId, dataset: &DapDataset) -> Result<()> {
    match primary {
        Primary::Field(path) => {
            let resolved = resolve_field(path, target, dataset)
                .or_else(|| dataset.resolve(Namespace::Variable, path, dataset.root()));
            match resolved {
                Some(_) => Ok(()),
                None => Err(DapError::semantic(format!(
                    "filter field '{path}' does not resolve"
                ))),
            }
        }
        Primary::Constant(_) => Ok(()),
        Primary::Nested(inner) => check_filter(inner, target, dataset),
    }
}

fn check_filter(filter: &Filter, target: NodeId, dataset: &DapDataset) -> Result<()> {
    match filter {
        Filter::And(terms) => terms
            .iter()
            .try_for_each(|t| check_filter(t, target, dataset)),
        Filter::Not(inner) => check_filter(inner, target, dataset),
        Filter::Compare { op, lhs, rhs } => {
            check_primary(lhs, target, dataset)?;
            check_primary(rhs, target, dataset)?;
            if *op == Operator::Match {
                match rhs {
                    Primary::Constant(Constant::String(pattern)) => {
                        Regex::new(pattern).map_err(|err| {
                            DapError::semantic(format!("illegal pattern '{pattern}': {err}"))
                        })?;
                    }
                    _ => {
                        return Err(DapError::semantic(
                            "the right side of =~ must be a string pattern",
                        ))
                    }
                }
            }
            Ok(())
        }
        Filter::Range { lhs, mid, rhs, .. } => {
            check_primary(lhs, target, dataset)?;
            check_primary(mid, target, dataset)?;
            check_primary(rhs, target, dataset)
        }
    }
}
