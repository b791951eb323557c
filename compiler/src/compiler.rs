use std::{collections::BTreeMap, sync::Arc};

use serde::{Serialize, Serializer};
use tracing::{debug, debug_span};

use crate::{
    codec::{synthesize_enum, synthesize_message},
    error::CompileError,
    mapper::{ElementType, FieldMapping, TypeMapper},
    plan::{CodecPlan, EnumId, EnumPlan, MessageId, Origin, ServicePlan},
    resolver::{order_schemas, resolve, EmissionOrder},
    types::Schema,
    utils::quote,
    verifier::verify_schema,
};

/// The compiled form of one schema: plans, mapping decisions and emission
/// order. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledSchema {
    pub name:     String,
    pub package:  Option<String>,
    #[serde(serialize_with = "serialize_import_names")]
    pub imports:  Vec<Arc<CompiledSchema>>,
    pub enums:    Vec<EnumPlan>,
    pub messages: Vec<CodecPlan>,
    /// Type Mapper output, parallel to `messages`.
    pub mappings: Vec<Vec<FieldMapping>>,
    pub services: Vec<ServicePlan>,
    pub order:    EmissionOrder,
}

fn serialize_import_names<S: Serializer>(imports: &[Arc<CompiledSchema>], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(imports.iter().map(|import| &import.name))
}

impl CompiledSchema {
    pub fn message(&self, name: &str) -> Option<&CodecPlan> {
        self.messages.iter().find(|plan| plan.name == name)
    }

    pub fn enumeration(&self, name: &str) -> Option<&EnumPlan> {
        self.enums.iter().find(|plan| plan.name == name)
    }

    /// Finds a top-level declaration by its unqualified name, tagging the id
    /// with `origin`.
    pub fn find_type(&self, name: &str, origin: Origin) -> Option<ElementType> {
        if let Some(index) = self.messages.iter().position(|plan| plan.name == name) {
            return Some(ElementType::Message(MessageId { origin, index }));
        }
        self.enums
            .iter()
            .position(|plan| plan.name == name)
            .map(|index| ElementType::Enum(EnumId { origin, index }))
    }

    /// The schema that owns `origin` as seen from this one.
    pub fn owner(&self, origin: Origin) -> Option<&CompiledSchema> {
        match origin {
            Origin::Local => Some(self),
            Origin::Import(i) => self.imports.get(i).map(Arc::as_ref),
        }
    }

    /// Looks a message plan up, following imports. The returned schema is the
    /// one the plan's own ids are relative to.
    pub fn message_plan(&self, id: MessageId) -> Option<(&CompiledSchema, &CodecPlan)> {
        let owner = self.owner(id.origin)?;
        owner.messages.get(id.index).map(|plan| (owner, plan))
    }

    pub fn enum_plan(&self, id: EnumId) -> Option<&EnumPlan> {
        self.owner(id.origin)?.enums.get(id.index)
    }
}

/// Already-compiled schemas that others may import. Entries are never
/// replaced or removed.
#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    schemas: BTreeMap<String, Arc<CompiledSchema>>,
}

impl ImportTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<CompiledSchema>> {
        self.schemas.get(name)
    }

    pub fn publish(&mut self, schema: CompiledSchema) -> Result<Arc<CompiledSchema>, CompileError> {
        if self.schemas.contains_key(&schema.name) {
            return Err(CompileError::consistency(
                "imports",
                format!("schema {} is already published", quote(&schema.name)),
            ));
        }
        let schema = Arc::new(schema);
        self.schemas.insert(schema.name.clone(), Arc::clone(&schema));
        Ok(schema)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// Compiles one schema against already-published imports. Any error aborts
/// the whole schema.
pub fn compile(schema: &Schema, table: &ImportTable) -> Result<CompiledSchema, CompileError> {
    let span = debug_span!("compile", schema = %schema.name);
    let _enter = span.enter();

    verify_schema(schema, table)?;
    let imports = schema
        .imports
        .iter()
        .map(|name| {
            table.get(name).cloned().ok_or_else(|| CompileError::UnresolvedImport {
                schema: schema.name.clone(),
                import: name.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    debug!(imports = imports.len(), "verified");

    let mapper = TypeMapper::new(schema, &imports);
    let mappings = schema
        .messages
        .iter()
        .map(|message| mapper.map_message(message))
        .collect::<Result<Vec<_>, _>>()?;
    let services = schema
        .services
        .iter()
        .map(|service| mapper.map_service(service))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(messages = mappings.len(), services = services.len(), "mapped types");

    let enums: Vec<EnumPlan> = schema
        .enums
        .iter()
        .enumerate()
        .map(|(i, definition)| synthesize_enum(EnumId::local(i), definition))
        .collect();
    let messages: Vec<CodecPlan> = schema
        .messages
        .iter()
        .zip(&mappings)
        .enumerate()
        .map(|(i, (message, fields))| synthesize_message(MessageId::local(i), message, fields))
        .collect();
    debug!(plans = messages.len(), enums = enums.len(), "synthesized codecs");

    let order = resolve(schema, &enums, &messages, &services)?;
    debug!(decls = order.decls.len(), "resolved emission order");

    Ok(CompiledSchema {
        name: schema.name.clone(),
        package: schema.package.clone(),
        imports,
        enums,
        messages,
        mappings,
        services,
        order,
    })
}

/// Compiles a batch of schemas in import order, publishing each success.
/// A failing schema does not stop the others; schemas importing it fail with
/// an unresolved import.
pub fn compile_set(
    schemas: &[Schema],
    table: &mut ImportTable,
) -> Result<Vec<(String, Result<Arc<CompiledSchema>, CompileError>)>, CompileError> {
    let order = order_schemas(schemas, table)?;
    let mut results = Vec::with_capacity(order.len());
    for index in order {
        let schema = &schemas[index];
        let result = compile(schema, table).and_then(|compiled| table.publish(compiled));
        if let Err(err) = &result {
            debug!(schema = %schema.name, error = %err, "schema failed to compile");
        }
        results.push((schema.name.clone(), result));
    }
    Ok(results)
}
