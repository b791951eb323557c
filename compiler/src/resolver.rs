//! The Dependency Resolver: value-recursion checks, declaration order within a
//! schema and compilation order across schemas.

use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use crate::{
    compiler::ImportTable,
    error::CompileError,
    plan::{CodecPlan, EnumPlan, Origin, ServicePlan, StepShape, ValueStep},
    types::Schema,
    utils::quote,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclRef {
    Enum(usize),
    Message(usize),
}

/// The linear order in which declarations are emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmissionOrder {
    /// Import positions (into the schema's `imports`) that are actually used.
    pub imports: Vec<usize>,
    pub decls:   Vec<DeclRef>,
}

/// Local messages a plan holds by value, with the field holding each.
fn value_edges(plan: &CodecPlan) -> impl Iterator<Item = (&str, usize)> + '_ {
    plan.steps.iter().filter_map(|step| match step.shape {
        StepShape::Single(ValueStep::Nested(id)) if id.origin == Origin::Local => {
            Some((step.field.as_str(), id.index))
        }
        _ => None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Rejects any message that contains itself through required nested fields
/// only. Optional, repeated and map references break such cycles.
pub fn check_value_recursion(plans: &[CodecPlan]) -> Result<(), CompileError> {
    fn visit<'p>(
        index: usize,
        plans: &'p [CodecPlan],
        marks: &mut [Mark],
        path: &mut Vec<(usize, &'p str)>,
    ) -> Result<(), CompileError> {
        marks[index] = Mark::Visiting;
        for (field, target) in value_edges(&plans[index]) {
            path.push((index, field));
            match marks[target] {
                Mark::Visiting => {
                    let start = path.iter().position(|&(owner, _)| owner == target).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(|&(owner, _)| plans[owner].name.clone()).collect();
                    cycle.push(plans[target].name.clone());
                    return Err(CompileError::InvalidRecursion {
                        message: plans[target].name.clone(),
                        field:   path[start].1.to_owned(),
                        cycle,
                    });
                }
                Mark::Unvisited => visit(target, plans, marks, path)?,
                Mark::Done => {}
            }
            path.pop();
        }
        marks[index] = Mark::Done;
        Ok(())
    }

    let mut marks = vec![Mark::Unvisited; plans.len()];
    let mut path = Vec::new();
    for index in 0..plans.len() {
        if marks[index] == Mark::Unvisited {
            visit(index, plans, &mut marks, &mut path)?;
        }
    }
    Ok(())
}

/// Enums first in declaration order, then messages so that everything a
/// message holds by value comes before it. Assumes no value recursion.
pub fn emission_order(enums: &[EnumPlan], plans: &[CodecPlan]) -> Vec<DeclRef> {
    fn place(index: usize, plans: &[CodecPlan], placed: &mut [bool], out: &mut Vec<DeclRef>) {
        if placed[index] {
            return;
        }
        placed[index] = true;
        for (_, target) in value_edges(&plans[index]) {
            place(target, plans, placed, out);
        }
        out.push(DeclRef::Message(index));
    }

    let mut out: Vec<DeclRef> = (0..enums.len()).map(DeclRef::Enum).collect();
    let mut placed = vec![false; plans.len()];
    for index in 0..plans.len() {
        place(index, plans, &mut placed, &mut out);
    }
    out
}

/// Import positions referenced anywhere in the plans or services, ascending.
pub fn used_imports(plans: &[CodecPlan], services: &[ServicePlan]) -> Vec<usize> {
    let mut used = Vec::new();
    let mut mark = |origin: Origin| {
        if let Origin::Import(i) = origin {
            if !used.contains(&i) {
                used.push(i);
            }
        }
    };
    for step in plans.iter().flat_map(|plan| &plan.steps) {
        for value in step.values() {
            match value {
                ValueStep::Enum(id) => mark(id.origin),
                ValueStep::Nested(id) => mark(id.origin),
                ValueStep::Scalar(_) => {}
            }
        }
    }
    for method in services.iter().flat_map(|service| &service.methods) {
        mark(method.input.origin);
        mark(method.output.origin);
    }
    used.sort_unstable();
    used
}

/// Runs every resolver check for one schema and produces its emission order.
pub fn resolve(
    schema: &Schema,
    enums: &[EnumPlan],
    plans: &[CodecPlan],
    services: &[ServicePlan],
) -> Result<EmissionOrder, CompileError> {
    check_value_recursion(plans)?;
    let imports = used_imports(plans, services);
    for (i, name) in schema.imports.iter().enumerate() {
        if !imports.contains(&i) {
            warn!(schema = %schema.name, import = %name, "import is never used");
        }
    }
    Ok(EmissionOrder { imports, decls: emission_order(enums, plans) })
}

/// Orders a batch of schemas so every schema comes after the ones it imports.
/// Imports outside the batch must already be published.
pub fn order_schemas(schemas: &[Schema], published: &ImportTable) -> Result<Vec<usize>, CompileError> {
    fn visit(
        index: usize,
        schemas: &[Schema],
        by_name: &HashMap<&str, usize>,
        marks: &mut [Mark],
        stack: &mut Vec<usize>,
        out: &mut Vec<usize>,
    ) -> Result<(), CompileError> {
        marks[index] = Mark::Visiting;
        stack.push(index);
        for import in &schemas[index].imports {
            let Some(&target) = by_name.get(import.as_str()) else { continue };
            match marks[target] {
                Mark::Visiting => {
                    let start = stack.iter().position(|&i| i == target).unwrap_or(0);
                    let mut cycle: Vec<String> = stack[start..].iter().map(|&i| quote(&schemas[i].name)).collect();
                    cycle.push(quote(&schemas[target].name));
                    return Err(CompileError::consistency(
                        "imports",
                        format!("import cycle {}", cycle.join(" -> ")),
                    ));
                }
                Mark::Unvisited => visit(target, schemas, by_name, marks, stack, out)?,
                Mark::Done => {}
            }
        }
        stack.pop();
        marks[index] = Mark::Done;
        out.push(index);
        Ok(())
    }

    let mut by_name = HashMap::new();
    for (index, schema) in schemas.iter().enumerate() {
        if by_name.insert(schema.name.as_str(), index).is_some() || published.get(&schema.name).is_some() {
            return Err(CompileError::consistency(
                "imports",
                format!("schema {} is defined twice", quote(&schema.name)),
            ));
        }
    }
    for schema in schemas {
        for import in &schema.imports {
            if !by_name.contains_key(import.as_str()) && published.get(import).is_none() {
                return Err(CompileError::UnresolvedImport {
                    schema: schema.name.clone(),
                    import: import.clone(),
                });
            }
        }
    }

    let mut marks = vec![Mark::Unvisited; schemas.len()];
    let mut out = Vec::with_capacity(schemas.len());
    for index in 0..schemas.len() {
        if marks[index] == Mark::Unvisited {
            visit(index, schemas, &by_name, &mut marks, &mut Vec::new(), &mut out)?;
        }
    }
    Ok(out)
}
