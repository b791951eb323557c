use std::collections::HashSet;

use crate::{
    compiler::CompiledSchema,
    error::CompileError,
    plan::{CodecPlan, EnumId, EnumPlan, MessageId, Origin, PlanStep, ServicePlan, StepShape, ValueStep, ENUM_PRIMITIVE},
    resolver::DeclRef,
    traits::Emitter,
    utils::quote,
};
use polyglot_schema::SequenceLength;

/// Converts a string to PascalCase.
/// - Strings with underscores are split on them and each word is capitalized
///   with the rest lowercased.
/// - A fully uppercase word keeps only its first letter uppercase.
/// - Otherwise only the first letter is uppercased.
fn to_pascal_case(s: &str) -> String {
    fn capitalize(word: &str, lower_rest: bool) -> String {
        let mut chars = word.chars();
        match chars.next() {
            None => String::new(),
            Some(first) if lower_rest => first.to_uppercase().to_string() + &chars.as_str().to_lowercase(),
            Some(first) => first.to_uppercase().to_string() + chars.as_str(),
        }
    }

    if s.contains('_') {
        s.split('_').filter(|word| !word.is_empty()).map(|word| capitalize(word, true)).collect()
    } else {
        capitalize(s, s == s.to_uppercase())
    }
}

/// Converts a string to snake_case without splitting acronyms
/// (`sessionID` becomes `session_id`).
fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut snake = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                if prev != '_' && (!prev.is_uppercase() || chars.get(i + 1).map_or(false, |n| n.is_lowercase())) {
                    snake.push('_');
                }
            }
            snake.extend(c.to_lowercase());
        } else {
            snake.push(c);
        }
    }
    snake
}

/// Escapes Rust keywords, reserved words included, by suffixing an
/// underscore. `gen` is reserved from the 2024 edition on.
fn escape_rust_keyword(s: &str) -> String {
    const KEYWORDS: [&str; 52] = [
        "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else",
        "enum", "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop",
        "match", "mod", "move", "mut", "pub", "ref", "return", "self", "Self", "static",
        "struct", "super", "trait", "true", "type", "unsafe", "use", "where", "while", "yield",
        "abstract", "become", "box", "do", "final", "gen", "macro", "override", "priv", "try",
        "typeof", "unsized", "virtual",
    ];
    if KEYWORDS.contains(&s) {
        format!("{}_", s)
    } else {
        s.to_string()
    }
}

// Generated code spells out every std type so that schema types named
// `Option`, `Result`, `String` and the like cannot shadow them.
const OPTION: &str = "::core::option::Option";
const RESULT: &str = "::core::result::Result";
const DEFAULT: &str = "::core::default::Default";
const BOX: &str = "::std::boxed::Box";
const VEC: &str = "::std::vec::Vec";
const BTREE_MAP: &str = "::std::collections::BTreeMap";

/// Rust type of a primitive as generated code writes it.
fn primitive_type(rust_type: &str) -> String {
    match rust_type {
        "String" => "::std::string::String".to_string(),
        "Vec<u8>" => format!("{}<u8>", VEC),
        other => other.to_string(),
    }
}

fn type_ident(name: &str) -> String {
    escape_rust_keyword(&to_pascal_case(name))
}

fn field_ident(name: &str) -> String {
    escape_rust_keyword(&to_snake_case(name))
}

/// Module path of a schema: its package, or its file stem without one.
pub fn module_path(schema: &CompiledSchema) -> Vec<String> {
    match &schema.package {
        Some(package) => package.split('.').map(field_ident).collect(),
        None => {
            let file = schema.name.rsplit('/').next().unwrap_or(&schema.name);
            let stem = file.split('.').next().unwrap_or(file);
            let cleaned: String = stem.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }).collect();
            vec![field_ident(&cleaned)]
        }
    }
}

fn import_alias(schema: &CompiledSchema) -> String {
    module_path(schema).join("_")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RustOptions {
    /// Crate that generated code reaches the runtime through.
    pub runtime_crate: String,
    /// Derive `serde::Serialize` / `Deserialize` on generated types.
    pub serde:         bool,
}

impl Default for RustOptions {
    fn default() -> Self {
        RustOptions { runtime_crate: "polyglot".to_string(), serde: false }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RustEmitter {
    pub options: RustOptions,
}

impl RustEmitter {
    pub fn new(options: RustOptions) -> Self {
        RustEmitter { options }
    }
}

impl Emitter for RustEmitter {
    fn file_name(&self, schema: &CompiledSchema) -> String {
        format!("{}.rs", module_path(schema).join("/"))
    }

    fn emit(&self, schema: &CompiledSchema) -> Result<String, CompileError> {
        compile_schema_to_rust(schema, &self.options)
    }
}

/// Indented source lines.
#[derive(Default)]
struct Code {
    lines: Vec<String>,
    depth: usize,
}

impl Code {
    fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if text.is_empty() {
            self.lines.push(String::new());
        } else {
            self.lines.push(format!("{}{}", "    ".repeat(self.depth), text));
        }
    }

    fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.depth += 1;
    }

    fn close(&mut self, text: impl AsRef<str>) {
        self.depth = self.depth.saturating_sub(1);
        self.line(text);
    }
}

struct Generator<'a> {
    schema:  &'a CompiledSchema,
    options: &'a RustOptions,
    rt:      String,
}

/// Renders a compiled schema as a Rust module: declarations in resolver
/// order, each message with `Encode` / `Decode` impls that follow its plan.
pub fn compile_schema_to_rust(schema: &CompiledSchema, options: &RustOptions) -> Result<String, CompileError> {
    let generator = Generator { schema, options, rt: format!("::{}", options.runtime_crate) };
    generator.check_names()?;

    let mut code = Code::default();
    code.line("// Code generated by polyglot-compiler. DO NOT EDIT.");
    code.line(format!("// source: {}", schema.name));
    code.line("");

    if !schema.order.imports.is_empty() {
        for &i in &schema.order.imports {
            let import = generator.import(i)?;
            code.line(format!("use crate::{} as {};", module_path(import).join("::"), import_alias(import)));
        }
        code.line("");
    }

    for decl in &schema.order.decls {
        match *decl {
            DeclRef::Enum(index) => {
                let plan = schema.enums.get(index).ok_or_else(|| missing("enum", index))?;
                generator.generate_enum(&mut code, plan);
            }
            DeclRef::Message(index) => {
                let plan = schema.messages.get(index).ok_or_else(|| missing("message", index))?;
                generator.generate_struct(&mut code, plan)?;
            }
        }
        code.line("");
    }

    for service in &schema.services {
        generator.generate_service(&mut code, service)?;
        code.line("");
    }

    while code.lines.last().map_or(false, |line| line.is_empty()) {
        code.lines.pop();
    }
    Ok(code.lines.join("\n") + "\n")
}

fn missing(kind: &str, index: usize) -> CompileError {
    CompileError::Emit(format!("emission order names {} #{} which does not exist", kind, index))
}

fn check_unique(seen: &mut HashSet<String>, context: &str, ident: String, name: &str) -> Result<(), CompileError> {
    if seen.insert(ident.clone()) {
        Ok(())
    } else {
        Err(CompileError::Emit(format!(
            "{} {} becomes the Rust name {} which is already taken",
            context,
            quote(name),
            quote(&ident)
        )))
    }
}

impl<'a> Generator<'a> {
    fn import(&self, i: usize) -> Result<&'a CompiledSchema, CompileError> {
        self.schema
            .imports
            .get(i)
            .map(|import| import.as_ref())
            .ok_or_else(|| CompileError::Emit(format!("import #{} does not exist", i)))
    }

    /// Rust names must stay distinct after case conversion.
    fn check_names(&self) -> Result<(), CompileError> {
        let mut types = HashSet::new();
        for plan in &self.schema.enums {
            check_unique(&mut types, "enum", type_ident(&plan.name), &plan.name)?;
            let mut variants = HashSet::from(["Unrecognized".to_string()]);
            for symbol in &plan.values {
                check_unique(&mut variants, &format!("symbol of {}", plan.name), type_ident(&symbol.name), &symbol.name)?;
            }
        }
        for plan in &self.schema.messages {
            check_unique(&mut types, "message", type_ident(&plan.name), &plan.name)?;
            let mut fields = HashSet::new();
            for step in &plan.steps {
                check_unique(&mut fields, &format!("field of {}", plan.name), field_ident(&step.field), &step.field)?;
            }
        }
        for service in &self.schema.services {
            check_unique(&mut types, "service", type_ident(&service.name), &service.name)?;
            let mut methods = HashSet::new();
            for method in &service.methods {
                check_unique(&mut methods, &format!("method of {}", service.name), field_ident(&method.name), &method.name)?;
            }
        }
        for &i in &self.schema.order.imports {
            let import = self.import(i)?;
            check_unique(&mut types, "import", import_alias(import), &import.name)?;
        }
        Ok(())
    }

    fn type_path(&self, origin: Origin, name: &str) -> Result<String, CompileError> {
        match origin {
            Origin::Local => Ok(type_ident(name)),
            Origin::Import(i) => Ok(format!("{}::{}", import_alias(self.import(i)?), type_ident(name))),
        }
    }

    fn message_type(&self, id: MessageId) -> Result<String, CompileError> {
        let (_, plan) = self
            .schema
            .message_plan(id)
            .ok_or_else(|| CompileError::Emit(format!("unknown message {:?}", id)))?;
        self.type_path(id.origin, &plan.name)
    }

    fn enum_type(&self, id: EnumId) -> Result<String, CompileError> {
        let plan = self
            .schema
            .enum_plan(id)
            .ok_or_else(|| CompileError::Emit(format!("unknown enum {:?}", id)))?;
        self.type_path(id.origin, &plan.name)
    }

    fn value_type(&self, value: ValueStep) -> Result<String, CompileError> {
        match value {
            ValueStep::Scalar(primitive) => Ok(primitive_type(primitive.call().rust_type)),
            ValueStep::Enum(id) => self.enum_type(id),
            ValueStep::Nested(id) => self.message_type(id),
        }
    }

    fn field_type(&self, step: &PlanStep) -> Result<String, CompileError> {
        Ok(match step.shape {
            StepShape::Single(value) => self.value_type(value)?,
            StepShape::Optional(value @ ValueStep::Nested(_)) => {
                format!("{}<{}<{}>>", OPTION, BOX, self.value_type(value)?)
            }
            StepShape::Optional(value) => format!("{}<{}>", OPTION, self.value_type(value)?),
            StepShape::Repeated { element, .. } => format!("{}<{}>", VEC, self.value_type(element)?),
            StepShape::Map { key, value, .. } => {
                format!("{}<{}, {}>", BTREE_MAP, self.value_type(key)?, self.value_type(value)?)
            }
        })
    }

    fn derives(&self, code: &mut Code, base: &str) {
        code.line(format!("#[derive({})]", base));
        if self.options.serde {
            code.line("#[derive(::serde::Serialize, ::serde::Deserialize)]");
        }
    }

    fn generate_enum(&self, code: &mut Code, plan: &EnumPlan) {
        let name = type_ident(&plan.name);
        let variants: Vec<(String, i32)> = plan.values.iter().map(|v| (type_ident(&v.name), v.value)).collect();

        self.derives(code, "Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord");
        code.open(format!("pub enum {} {{", name));
        for (variant, _) in &variants {
            code.line(format!("{},", variant));
        }
        code.line("/// A value this version of the schema does not declare.");
        code.line("Unrecognized(i32),");
        code.close("}");
        code.line("");

        code.open(format!("impl {} {{", name));
        code.open("pub fn from_i32(value: i32) -> Self {");
        code.open("match value {");
        for (variant, value) in &variants {
            code.line(format!("{} => {}::{},", value, name, variant));
        }
        code.line(format!("other => {}::Unrecognized(other),", name));
        code.close("}");
        code.close("}");
        code.line("");
        code.open("pub fn as_i32(self) -> i32 {");
        code.open("match self {");
        for (variant, value) in &variants {
            code.line(format!("{}::{} => {},", name, variant, value));
        }
        code.line(format!("{}::Unrecognized(value) => value,", name));
        code.close("}");
        code.close("}");
        code.close("}");
        code.line("");

        let first = variants.first().map_or("Unrecognized(0)".to_string(), |(variant, _)| variant.clone());
        code.open(format!("impl {} for {} {{", DEFAULT, name));
        code.open("fn default() -> Self {");
        code.line(format!("{}::{}", name, first));
        code.close("}");
        code.close("}");
    }

    fn generate_struct(&self, code: &mut Code, plan: &CodecPlan) -> Result<(), CompileError> {
        let name = type_ident(&plan.name);
        let rt = &self.rt;

        self.derives(code, "Debug, Clone, PartialEq, Default");
        code.open(format!("pub struct {} {{", name));
        for step in &plan.steps {
            if step.deprecated {
                code.line("/// Deprecated: still written, skipped when read.");
            }
            code.line(format!("pub {}: {},", field_ident(&step.field), self.field_type(step)?));
        }
        code.close("}");
        code.line("");

        code.open(format!("impl {}::Encode for {} {{", rt, name));
        code.open(format!("fn encode_bb(&self, bb: &mut {}::ByteBufferMut) {{", rt));
        if plan.steps.is_empty() {
            code.line("let _ = bb;");
        }
        for step in &plan.steps {
            self.encode_step(code, step)?;
        }
        code.close("}");
        code.close("}");
        code.line("");

        code.open(format!("impl {}::Decode for {} {{", rt, name));
        code.open(format!(
            "fn decode_bb(bb: &mut {}::ByteBuffer<'_>) -> {}<Self, {}::WireError> {{",
            rt, RESULT, rt
        ));
        let default = format!("<Self as {}>::default()", DEFAULT);
        if plan.steps.is_empty() {
            code.line("let _ = bb;");
            code.line(format!("Ok({})", default));
        } else {
            let binding = if plan.steps.iter().any(|step| !step.deprecated) { "let mut message" } else { "let message" };
            code.line(format!("{} = {};", binding, default));
            for step in &plan.steps {
                code.line("if bb.is_empty() { return Ok(message); }");
                if step.deprecated {
                    self.skip_step(code, step);
                } else {
                    self.decode_step(code, step)?;
                }
            }
            code.line("Ok(message)");
        }
        code.close("}");
        code.close("}");
        Ok(())
    }

    /// A statement writing `expr` to `buf`. `place` is true when `expr` names
    /// a value, false when it is a reference.
    fn write_value(&self, value: ValueStep, buf: &str, expr: &str, place: bool) -> String {
        match value {
            ValueStep::Scalar(primitive) => {
                let call = primitive.call();
                let arg = match (call.by_ref, place) {
                    (true, true) => format!("&{}", expr),
                    (false, false) => format!("*{}", expr),
                    _ => expr.to_string(),
                };
                format!("{}.{}({});", buf, call.write, arg)
            }
            ValueStep::Enum(_) => format!("{}.{}({}.as_i32() as u32);", buf, ENUM_PRIMITIVE.call().write, expr),
            ValueStep::Nested(_) if place => format!("{}.write_message(&{});", buf, expr),
            ValueStep::Nested(_) => format!("{}.write_message({});", buf, expr),
        }
    }

    fn read_value(&self, value: ValueStep, buf: &str) -> Result<String, CompileError> {
        Ok(match value {
            ValueStep::Scalar(primitive) => format!("{}.{}()?", buf, primitive.call().read),
            ValueStep::Enum(id) => format!(
                "{}::from_i32({}.{}()? as i32)",
                self.enum_type(id)?,
                buf,
                ENUM_PRIMITIVE.call().read
            ),
            ValueStep::Nested(id) => format!("{}.read_message::<{}>()?", buf, self.message_type(id)?),
        })
    }

    fn encode_items(&self, code: &mut Code, field: &str, key: Option<ValueStep>, value: ValueStep) {
        match key {
            Some(key) => {
                code.open(format!("for (key, value) in &{} {{", field));
                code.line(self.write_value(key, "bb", "key", false));
                code.line(self.write_value(value, "bb", "value", false));
            }
            None => {
                code.open(format!("for item in &{} {{", field));
                code.line(self.write_value(value, "bb", "item", false));
            }
        }
        code.close("}");
    }

    fn encode_sequence(&self, code: &mut Code, field: &str, key: Option<ValueStep>, value: ValueStep, length: SequenceLength) {
        match length {
            SequenceLength::Elements => {
                code.line(format!("bb.write_len({}.len());", field));
                self.encode_items(code, field, key, value);
            }
            SequenceLength::Bytes => {
                code.open("bb.write_frame(|bb| {");
                self.encode_items(code, field, key, value);
                code.close("});");
            }
        }
    }

    fn encode_step(&self, code: &mut Code, step: &PlanStep) -> Result<(), CompileError> {
        let field = format!("self.{}", field_ident(&step.field));
        match step.shape {
            StepShape::Single(value) => code.line(self.write_value(value, "bb", &field, true)),
            StepShape::Optional(value) => {
                let view = if matches!(value, ValueStep::Nested(_)) { "as_deref" } else { "as_ref" };
                code.open(format!("match {}.{}() {{", field, view));
                code.open("Some(value) => {");
                code.line("bb.write_bool(true);");
                code.line(self.write_value(value, "bb", "value", false));
                code.close("}");
                code.line("None => bb.write_bool(false),");
                code.close("}");
            }
            StepShape::Repeated { element, length } => self.encode_sequence(code, &field, None, element, length),
            StepShape::Map { key, value, length } => self.encode_sequence(code, &field, Some(key), value, length),
        }
        Ok(())
    }

    fn decode_items(&self, code: &mut Code, target: &str, buf: &str, key: Option<ValueStep>, value: ValueStep) -> Result<(), CompileError> {
        match key {
            Some(key) => {
                code.line(format!("let key = {};", self.read_value(key, buf)?));
                code.line(format!("let value = {};", self.read_value(value, buf)?));
                code.line(format!("{}.insert(key, value);", target));
            }
            None => code.line(format!("{}.push({});", target, self.read_value(value, buf)?)),
        }
        Ok(())
    }

    fn decode_sequence(
        &self,
        code: &mut Code,
        target: &str,
        key: Option<ValueStep>,
        value: ValueStep,
        length: SequenceLength,
    ) -> Result<(), CompileError> {
        code.open("{");
        match length {
            SequenceLength::Elements => {
                code.line("let len = bb.read_len()?;");
                code.open("for _ in 0..len {");
                self.decode_items(code, target, "bb", key, value)?;
            }
            SequenceLength::Bytes => {
                code.line("let mut frame = bb.read_frame()?;");
                code.open("while !frame.is_empty() {");
                self.decode_items(code, target, "frame", key, value)?;
            }
        }
        code.close("}");
        code.close("}");
        Ok(())
    }

    fn decode_step(&self, code: &mut Code, step: &PlanStep) -> Result<(), CompileError> {
        let target = format!("message.{}", field_ident(&step.field));
        match step.shape {
            StepShape::Single(value) => code.line(format!("{} = {};", target, self.read_value(value, "bb")?)),
            StepShape::Optional(value) => {
                let read = self.read_value(value, "bb")?;
                let read = if matches!(value, ValueStep::Nested(_)) { format!("{}::new({})", BOX, read) } else { read };
                code.line(format!("{} = if bb.read_bool()? {{ Some({}) }} else {{ None }};", target, read));
            }
            StepShape::Repeated { element, length } => self.decode_sequence(code, &target, None, element, length)?,
            StepShape::Map { key, value, length } => self.decode_sequence(code, &target, Some(key), value, length)?,
        }
        Ok(())
    }

    fn skip_step(&self, code: &mut Code, step: &PlanStep) {
        let skip = |value: ValueStep| format!("bb.skip({}::WireKind::{:?})?;", self.rt, value.wire_kind());
        match step.shape {
            StepShape::Single(value) => code.line(skip(value)),
            StepShape::Optional(value) => {
                code.open("if bb.read_bool()? {");
                code.line(skip(value));
                code.close("}");
            }
            StepShape::Repeated { length: SequenceLength::Bytes, .. }
            | StepShape::Map { length: SequenceLength::Bytes, .. } => {
                code.line(format!("bb.skip({}::WireKind::LengthDelimitedBytes)?;", self.rt));
            }
            StepShape::Repeated { element, length: SequenceLength::Elements } => {
                code.open("for _ in 0..bb.read_len()? {");
                code.line(skip(element));
                code.close("}");
            }
            StepShape::Map { key, value, length: SequenceLength::Elements } => {
                code.open("for _ in 0..bb.read_len()? {");
                code.line(skip(key));
                code.line(skip(value));
                code.close("}");
            }
        }
    }

    fn generate_service(&self, code: &mut Code, service: &ServicePlan) -> Result<(), CompileError> {
        code.open(format!("pub trait {} {{", type_ident(&service.name)));
        for method in &service.methods {
            code.line(format!(
                "fn {}(&self, request: {}) -> {};",
                field_ident(&method.name),
                self.message_type(method.input)?,
                self.message_type(method.output)?
            ));
        }
        code.close("}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compiler::{compile, ImportTable},
        types::{Enum, Field, FieldType, Message, Method, Schema, Service},
    };
    use polyglot_schema::ScalarType;

    fn emit(schema: &Schema) -> String {
        let compiled = compile(schema, &ImportTable::new()).unwrap();
        compile_schema_to_rust(&compiled, &RustOptions::default()).unwrap()
    }

    #[test]
    fn case_conversions() {
        assert_eq!(to_pascal_case("COLOR_RED"), "ColorRed");
        assert_eq!(to_pascal_case("SIGNAL"), "Signal");
        assert_eq!(to_pascal_case("httpRequest"), "HttpRequest");
        assert_eq!(to_snake_case("sessionID"), "session_id");
        assert_eq!(to_snake_case("userName"), "user_name");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(field_ident("type"), "type_");
        assert_eq!(field_ident("final"), "final_");
        assert_eq!(field_ident("try"), "try_");
        assert_eq!(field_ident("box"), "box_");
        assert_eq!(field_ident("gen"), "gen_");
        assert_eq!(type_ident("self"), "Self_");
    }

    #[test]
    fn std_names_in_the_schema_do_not_shadow_generated_code() {
        let schema = Schema::new("a.proto")
            .with_message(Message::new(
                "Result",
                vec![
                    Field::new("final", 1, FieldType::scalar(ScalarType::Bool)),
                    Field::new("try", 2, FieldType::scalar(ScalarType::Bool)),
                    Field::new("box", 3, FieldType::scalar(ScalarType::Bool)),
                ],
            ))
            .with_message(Message::new(
                "Option",
                vec![
                    Field::new("inner", 1, FieldType::named("Result").optional()),
                    Field::new("text", 2, FieldType::scalar(ScalarType::String).optional()),
                    Field::new("blobs", 3, FieldType::scalar(ScalarType::Bytes).repeated()),
                ],
            ));
        let code = emit(&schema);
        assert!(code.contains("pub struct Result {\n    pub final_: bool,\n    pub try_: bool,\n    pub box_: bool,\n}"));
        assert!(code.contains("    pub inner: ::core::option::Option<::std::boxed::Box<Result>>,\n"));
        assert!(code.contains("    pub text: ::core::option::Option<::std::string::String>,\n"));
        assert!(code.contains("    pub blobs: ::std::vec::Vec<::std::vec::Vec<u8>>,\n"));
        assert!(code.contains(
            "fn decode_bb(bb: &mut ::polyglot::ByteBuffer<'_>) -> ::core::result::Result<Self, ::polyglot::WireError> {"
        ));
        assert!(code.contains("        bb.write_bool(self.final_);\n"));
        for line in code.lines() {
            let trimmed = line.trim_start();
            for bare in ["Option<", "Result<", "Box<", "Vec<", "Box::new", "impl Default"] {
                assert!(!trimmed.starts_with(bare) && !line.contains(&format!(" {}", bare)), "bare {} in {:?}", bare, line);
            }
        }
    }

    #[test]
    fn emits_point() {
        let schema = Schema::new("geo/point.proto").with_message(Message::new(
            "Point",
            vec![
                Field::new("x", 1, FieldType::scalar(ScalarType::Int32)),
                Field::new("y", 2, FieldType::scalar(ScalarType::Int32)),
            ],
        ));
        let code = emit(&schema);
        assert!(code.starts_with("// Code generated by polyglot-compiler. DO NOT EDIT.\n"));
        assert!(code.contains("pub struct Point {\n    pub x: i32,\n    pub y: i32,\n}"));
        assert!(code.contains("impl ::polyglot::Encode for Point {"));
        assert!(code.contains("        bb.write_var_int(self.x);\n        bb.write_var_int(self.y);\n"));
        assert!(code.contains("        message.y = bb.read_var_int()?;\n"));
        assert_eq!(RustEmitter::default().file_name(&compile(&schema, &ImportTable::new()).unwrap()), "point.rs");
    }

    #[test]
    fn emits_containers() {
        let schema = Schema::new("a.proto")
            .with_package("demo.v1")
            .with_enum(Enum::new("Color", &[("COLOR_RED", 0), ("COLOR_BLUE", -3)]))
            .with_message(Message::new(
                "Node",
                vec![
                    Field::new("name", 1, FieldType::scalar(ScalarType::String).optional()),
                    Field::new("children", 2, FieldType::named("Node").repeated()),
                    Field::new("parent", 3, FieldType::named("Node").optional()),
                    Field::new("weights", 4, FieldType::scalar(ScalarType::Float).repeated()),
                    Field::new("colors", 5, FieldType::map(FieldType::scalar(ScalarType::Uint32), FieldType::named("Color"))),
                ],
            ));
        let code = emit(&schema);
        assert!(code.contains("    Unrecognized(i32),\n"));
        assert!(code.contains("            -3 => Color::ColorBlue,\n"));
        assert!(code.contains("    pub name: ::core::option::Option<::std::string::String>,\n"));
        assert!(code.contains("    pub children: ::std::vec::Vec<Node>,\n"));
        assert!(code.contains("    pub parent: ::core::option::Option<::std::boxed::Box<Node>>,\n"));
        assert!(code.contains("    pub colors: ::std::collections::BTreeMap<u32, Color>,\n"));
        assert!(code.contains("        match self.parent.as_deref() {\n"));
        assert!(code.contains("                bb.write_string(value);\n"));
        assert!(code.contains("        bb.write_frame(|bb| {\n            for item in &self.children {\n                bb.write_message(item);\n"));
        assert!(code.contains("        bb.write_len(self.weights.len());\n        for item in &self.weights {\n            bb.write_float(*item);\n"));
        assert!(code.contains("                message.children.push(frame.read_message::<Node>()?);\n"));
        assert!(code.contains("message.parent = if bb.read_bool()? { Some(::std::boxed::Box::new(bb.read_message::<Node>()?)) } else { None };"));
        assert!(code.contains("                let value = Color::from_i32(bb.read_var_uint()? as i32);\n"));
        assert!(code.contains("            bb.write_var_uint(value.as_i32() as u32);\n"));
    }

    #[test]
    fn deprecated_fields_are_skipped_on_decode() {
        let schema = Schema::new("a.proto").with_message(Message::new(
            "Old",
            vec![
                Field::new("legacy", 1, FieldType::scalar(ScalarType::Fixed64)).deprecated(),
                Field::new("tags", 2, FieldType::scalar(ScalarType::String).repeated()).deprecated(),
            ],
        ));
        let code = emit(&schema);
        assert!(code.contains("bb.skip(::polyglot::WireKind::Fixed64)?;"));
        assert!(code.contains("bb.skip(::polyglot::WireKind::LengthDelimitedBytes)?;"));
        assert!(code.contains("let message = <Self as ::core::default::Default>::default();"));
    }

    #[test]
    fn emits_services_and_serde() {
        let schema = Schema::new("a.proto")
            .with_message(Message::new("Ping", vec![]))
            .with_service(Service {
                name:    "Health".into(),
                methods: vec![Method { name: "Check".into(), input: "Ping".into(), output: "Ping".into() }],
            });
        let compiled = compile(&schema, &ImportTable::new()).unwrap();
        let options = RustOptions { runtime_crate: "rt".into(), serde: true };
        let code = compile_schema_to_rust(&compiled, &options).unwrap();
        assert!(code.contains("pub trait Health {\n    fn check(&self, request: Ping) -> Ping;\n}"));
        assert!(code.contains("#[derive(::serde::Serialize, ::serde::Deserialize)]"));
        assert!(code.contains("impl ::rt::Decode for Ping {"));
    }

    #[test]
    fn rejects_colliding_names() {
        let schema = Schema::new("a.proto").with_enum(Enum::new("E", &[("UNRECOGNIZED", 0)]));
        let compiled = compile(&schema, &ImportTable::new()).unwrap();
        let err = compile_schema_to_rust(&compiled, &RustOptions::default()).unwrap_err();
        assert!(matches!(err, CompileError::Emit(_)), "got {:?}", err);

        let schema = Schema::new("a.proto").with_message(Message::new(
            "M",
            vec![
                Field::new("userName", 1, FieldType::scalar(ScalarType::Bool)),
                Field::new("user_name", 2, FieldType::scalar(ScalarType::Bool)),
            ],
        ));
        let compiled = compile(&schema, &ImportTable::new()).unwrap();
        assert!(compile_schema_to_rust(&compiled, &RustOptions::default()).is_err());
    }
}
