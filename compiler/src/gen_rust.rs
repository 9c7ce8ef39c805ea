use crate::{
    options::EmitOptions,
    type_table::TypeTable,
    types::{Enum, EnumValue, Field, FieldType, Label, Message, Nested, Oneof, SchemaUnit, TypeRef},
    utils::{artifact_path, const_ident, field_ident, import_module, module_ident, quote, type_ident},
};

const INDENT: &str = "    ";

/// Line buffer with indentation tracking.
#[derive(Default)]
struct CodeWriter {
    lines: Vec<String>,
    depth: usize,
}

impl CodeWriter {
    fn line(&mut self, text: impl AsRef<str>) {
        self.lines.push(format!("{}{}", INDENT.repeat(self.depth), text.as_ref()));
    }

    fn blank(&mut self) {
        if self.lines.last().is_some_and(|l| !l.is_empty()) {
            self.lines.push(String::new());
        }
    }

    fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.depth += 1;
    }

    fn close(&mut self) {
        while self.lines.last().is_some_and(|l| l.is_empty()) {
            self.lines.pop();
        }
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }

    fn finish(mut self) -> String {
        while self.lines.last().is_some_and(|l| l.is_empty()) {
            self.lines.pop();
        }
        let mut code = self.lines.join("\n");
        code.push('\n');
        code
    }
}

/// Compiles a parsed schema into one Rust source file.
///
/// The output contains, in order: the runtime import, one module mount per
/// schema import, every top-level enum, every top-level message (nested
/// types first, inside a module named after their parent) and finally one
/// `Reflect` implementation per message, nested ones included.
///
/// `table` must already hold the unit's enums (see [`TypeTable::register_enums`]).
pub fn compile_schema_to_rust(unit: &SchemaUnit, table: &TypeTable, options: &EmitOptions) -> String {
    let mut generator = RustGenerator {
        unit,
        table,
        options,
        runtime: options.reflection_path(),
        out: CodeWriter::default(),
    };

    generator.preamble();
    for en in unit.enums.values() {
        generator.emit_enum(en);
    }
    for message in unit.messages.values() {
        generator.emit_message(message);
    }
    for message in unit.messages.values() {
        generator.emit_reflection(message);
    }

    generator.out.finish()
}

struct RustGenerator<'a> {
    unit:    &'a SchemaUnit,
    table:   &'a TypeTable,
    options: &'a EmitOptions,
    runtime: String,
    out:     CodeWriter,
}

impl RustGenerator<'_> {
    fn preamble(&mut self) {
        if self.options.header {
            self.out.line("// @generated by lightprotoc. Do not edit.");
            if let Some(package) = &self.unit.package {
                self.out.line(format!("// package: {}", package));
            }
            self.out.blank();
        }
        self.out.line("#![allow(dead_code, non_camel_case_types, unused_imports, unused_variables, clippy::all)]");
        self.out.blank();
        self.out.line(format!("use {}::{{FieldMeta, Reflect, Visitor, VisitorMut}};", self.runtime));
        self.out.blank();

        for import in &self.unit.imports {
            let module = import_module(import);
            self.out.line(format!("#[path = {}]", quote(&artifact_path(import))));
            self.out.line(format!("mod {};", module));
            self.out.line(format!("use self::{}::*;", module));
            self.out.blank();
        }
    }

    fn emit_enum(&mut self, en: &Enum) {
        let name = type_ident(&en.name);

        if en.values.is_empty() {
            self.out.line("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]");
            self.out.line(format!("pub enum {} {{}}", name));
            self.out.blank();
            return;
        }

        // Aliased values (`allow_alias`) keep the first name as the variant;
        // later names become associated consts.
        let mut variants: Vec<&EnumValue> = Vec::new();
        let mut aliases: Vec<(&EnumValue, &EnumValue)> = Vec::new();
        for value in &en.values {
            match variants.iter().find(|v| v.value == value.value) {
                Some(&first) => aliases.push((value, first)),
                None         => variants.push(value),
            }
        }

        self.out.line("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]");
        self.out.line("#[repr(i32)]");
        self.out.open(format!("pub enum {} {{", name));
        for (i, value) in variants.iter().enumerate() {
            if i == 0 {
                self.out.line("#[default]");
            }
            self.out.line(format!("{} = {},", type_ident(&value.name), value.value));
        }
        self.out.close();
        self.out.blank();

        if !aliases.is_empty() {
            self.out.open(format!("impl {} {{", name));
            for (alias, first) in &aliases {
                self.out.line(format!(
                    "pub const {}: Self = Self::{};",
                    const_ident(&alias.name),
                    type_ident(&first.name)
                ));
            }
            self.out.close();
            self.out.blank();
        }

        self.out.open(format!("impl From<{}> for i32 {{", name));
        self.out.open(format!("fn from(value: {}) -> Self {{", name));
        self.out.line("value as i32");
        self.out.close();
        self.out.close();
        self.out.blank();

        self.out.open(format!("impl TryFrom<i32> for {} {{", name));
        self.out.line("type Error = i32;");
        self.out.blank();
        self.out.open("fn try_from(value: i32) -> Result<Self, Self::Error> {");
        self.out.open("match value {");
        for value in &variants {
            self.out.line(format!("{} => Ok(Self::{}),", value.value, type_ident(&value.name)));
        }
        self.out.line("other => Err(other),");
        self.out.close();
        self.out.close();
        self.out.close();
        self.out.blank();
    }

    fn emit_message(&mut self, message: &Message) {
        let name = type_ident(&message.name);
        let scope = scope_of(message);
        let oneofs: Vec<&Oneof> = message.oneofs.iter().filter(|o| !o.fields.is_empty()).collect();

        if !message.nested.is_empty() || !oneofs.is_empty() {
            self.out.open(format!("pub mod {} {{", module_ident(&message.name)));
            for nested in &message.nested {
                match nested {
                    Nested::Enum(en)     => self.emit_enum(en),
                    Nested::Message(msg) => self.emit_message(msg),
                }
            }
            for oneof in &oneofs {
                self.emit_oneof(message, oneof, &scope);
            }
            self.out.close();
            self.out.blank();
        }

        self.out.line("#[derive(Debug, Clone, PartialEq, Default)]");
        self.out.open(format!("pub struct {} {{", name));
        for field in &message.fields {
            let ty = self.member_type(field, &scope, &message.parents, false);
            self.out.line(format!("pub {}: {},", field_ident(&field.name), ty));
        }
        for oneof in &oneofs {
            self.out.line(format!(
                "pub {}: {}::{},",
                field_ident(&oneof.name),
                module_ident(&message.name),
                oneof_type_ident(message, oneof)
            ));
        }
        self.out.close();
        self.out.blank();

        self.emit_forwarding(&name);
    }

    /// Tagged union for a oneof, declared in the owning message's module.
    fn emit_oneof(&mut self, message: &Message, oneof: &Oneof, scope: &[String]) {
        self.out.line("#[derive(Debug, Clone, PartialEq, Default)]");
        self.out.open(format!("pub enum {} {{", oneof_type_ident(message, oneof)));
        self.out.line("#[default]");
        self.out.line("Unset,");
        for field in &oneof.fields {
            let ty = self.member_type(field, scope, scope, true);
            self.out.line(format!("{}({}),", type_ident(&field.name), ty));
        }
        self.out.close();
        self.out.blank();
    }

    fn emit_forwarding(&mut self, name: &str) {
        let rt = self.runtime.clone();
        self.out.open(format!("impl {} {{", name));
        self.out.open("pub fn byte_size(&self) -> usize {");
        self.out.line(format!("{}::serialized_size(self)", rt));
        self.out.close();
        self.out.blank();
        self.out.open("pub fn parse_from_slice(&mut self, buffer: &[u8]) -> bool {");
        self.out.line(format!("{}::parse_struct(self, buffer)", rt));
        self.out.close();
        self.out.blank();
        self.out.open("pub fn serialize_to_vec(&self) -> Vec<u8> {");
        self.out.line("let mut out = Vec::new();");
        self.out.line(format!("{}::serialize_struct(self, &mut out);", rt));
        self.out.line("out");
        self.out.close();
        self.out.close();
        self.out.blank();
    }

    /// One reflection table per message, then its nested messages.
    fn emit_reflection(&mut self, message: &Message) {
        let qualified = qualified_name(message);

        let mut entries: Vec<(String, String, &str)> = message
            .fields
            .iter()
            .map(|f| (field_ident(&f.name), f.number.to_string(), f.name.as_str()))
            .collect();
        for oneof in message.oneofs.iter().filter(|o| !o.fields.is_empty()) {
            let numbers: Vec<String> = oneof.fields.iter().map(|f| f.number.to_string()).collect();
            entries.push((field_ident(&oneof.name), numbers.join(", "), oneof.name.as_str()));
        }

        self.out.open(format!("impl Reflect for {} {{", qualified));
        self.out.open("fn for_each_field<V: Visitor>(&self, visitor: &mut V) {");
        for (ident, numbers, name) in &entries {
            self.out.line(format!(
                "visitor.visit(&self.{}, FieldMeta::new(&[{}], {}));",
                ident, numbers, quote(name)
            ));
        }
        self.out.close();
        self.out.blank();
        self.out.open("fn for_each_field_mut<V: VisitorMut>(&mut self, visitor: &mut V) {");
        for (ident, numbers, name) in &entries {
            self.out.line(format!(
                "visitor.visit_mut(&mut self.{}, FieldMeta::new(&[{}], {}));",
                ident, numbers, quote(name)
            ));
        }
        self.out.close();
        self.out.close();
        self.out.blank();

        for nested in message.nested_messages() {
            self.emit_reflection(nested);
        }
    }

    /// Rust type of a field declared in `scope`, written relative to `module`.
    /// Inside a oneof, `optional` collapses to the bare type.
    fn member_type(&self, field: &Field, scope: &[String], module: &[String], in_oneof: bool) -> String {
        match &field.type_ {
            FieldType::Map { key, value } => format!(
                "::std::collections::HashMap<{}, {}>",
                self.type_ref(key, scope, module),
                self.type_ref(value, scope, module)
            ),
            FieldType::Single(ty) => {
                let base = self.type_ref(ty, scope, module);
                match field.label {
                    Label::Repeated            => format!("Vec<{}>", base),
                    Label::Optional if !in_oneof => format!("Option<{}>", base),
                    _                          => base,
                }
            }
        }
    }

    fn type_ref(&self, ty: &TypeRef, scope: &[String], module: &[String]) -> String {
        match ty {
            TypeRef::Scalar(scalar) => scalar.rust_type().to_string(),
            TypeRef::Named(name)    => self.resolve(name, scope, module),
        }
    }

    /// Resolves a raw type name the way nested scopes shadow outer ones:
    /// the innermost enclosing message first, then outward to file scope.
    /// Names found nowhere are assumed to live at file scope (imports).
    fn resolve(&self, name: &str, scope: &[String], module: &[String]) -> String {
        let absolute = name.starts_with('.');
        let mut trimmed = name.trim_start_matches('.');
        if let Some(rest) = self
            .unit
            .package
            .as_deref()
            .and_then(|pkg| trimmed.strip_prefix(pkg))
            .and_then(|rest| rest.strip_prefix('.'))
        {
            trimmed = rest;
        }

        let segments: Vec<&str> = trimmed.split('.').filter(|s| !s.is_empty()).collect();
        let Some((first, rest)) = segments.split_first() else {
            return type_ident(name);
        };

        let innermost = if absolute { 0 } else { scope.len() };
        for depth in (0..=innermost).rev() {
            let base = &scope[..depth];
            if !self.scope_declares(base, first) {
                continue;
            }
            if let Some((target, leaf)) = self.descend(base, first, rest) {
                return relative_path(module, &target, leaf);
            }
            break;
        }

        // Other packages are mounted by glob import at file scope, so only
        // the leaf name is meaningful there.
        let leaf = segments.last().copied().unwrap_or(name);
        relative_path(module, &[], leaf)
    }

    /// Walks `rest` down through nested messages starting at `first` in `base`.
    fn descend<'n>(&self, base: &[String], first: &'n str, rest: &[&'n str]) -> Option<(Vec<String>, &'n str)> {
        let mut target = base.to_vec();
        let mut current = first;
        for &segment in rest {
            target.push(current.to_string());
            if !self.find_message(&target)?.declares(segment) {
                return None;
            }
            current = segment;
        }
        Some((target, current))
    }

    fn scope_declares(&self, scope: &[String], name: &str) -> bool {
        if scope.is_empty() {
            self.table.is_enum(name) || self.unit.messages.contains_key(name)
        } else {
            self.find_message(scope).is_some_and(|m| m.declares(name))
        }
    }

    fn find_message(&self, path: &[String]) -> Option<&Message> {
        let (first, rest) = path.split_first()?;
        let mut current = self.unit.messages.get(first)?;
        for segment in rest {
            current = current.nested_message(segment)?;
        }
        Some(current)
    }
}

/// Name of a oneof's union type. Gets an `Oneof` suffix when a nested type
/// of the same message already owns the plain name.
fn oneof_type_ident(message: &Message, oneof: &Oneof) -> String {
    let plain = type_ident(&oneof.name);
    if message.nested.iter().any(|n| type_ident(n.name()) == plain) {
        format!("{}Oneof", plain)
    } else {
        plain
    }
}

/// Lookup scope of a message's members: its parents plus itself.
fn scope_of(message: &Message) -> Vec<String> {
    let mut scope = message.parents.clone();
    scope.push(message.name.clone());
    scope
}

/// Path from file scope, e.g. `outer::middle::Inner`.
pub fn qualified_name(message: &Message) -> String {
    relative_path(&[], &message.parents, &message.name)
}

/// Path to type `name` living in the module for `scope`, as seen from
/// code written inside the module for `from`.
fn relative_path(from: &[String], scope: &[String], name: &str) -> String {
    let common = from.iter().zip(scope).take_while(|(a, b)| a == b).count();
    let mut path = "super::".repeat(from.len() - common);
    for segment in &scope[common..] {
        path.push_str(&module_ident(segment));
        path.push_str("::");
    }
    path.push_str(&type_ident(name));
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_schema;

    fn generate(text: &str) -> String {
        let unit = parse_schema(text);
        let mut table = TypeTable::new();
        table.register_enums(&unit);
        let options = EmitOptions { header: false, ..EmitOptions::default() };
        compile_schema_to_rust(&unit, &table, &options)
    }

    #[test]
    fn test_point_output_is_exact() {
        let expected = r#"#![allow(dead_code, non_camel_case_types, unused_imports, unused_variables, clippy::all)]

use ::lightproto::reflection::{FieldMeta, Reflect, Visitor, VisitorMut};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn byte_size(&self) -> usize {
        ::lightproto::reflection::serialized_size(self)
    }

    pub fn parse_from_slice(&mut self, buffer: &[u8]) -> bool {
        ::lightproto::reflection::parse_struct(self, buffer)
    }

    pub fn serialize_to_vec(&self) -> Vec<u8> {
        let mut out = Vec::new();
        ::lightproto::reflection::serialize_struct(self, &mut out);
        out
    }
}

impl Reflect for Point {
    fn for_each_field<V: Visitor>(&self, visitor: &mut V) {
        visitor.visit(&self.x, FieldMeta::new(&[1], "x"));
        visitor.visit(&self.y, FieldMeta::new(&[2], "y"));
    }

    fn for_each_field_mut<V: VisitorMut>(&mut self, visitor: &mut V) {
        visitor.visit_mut(&mut self.x, FieldMeta::new(&[1], "x"));
        visitor.visit_mut(&mut self.y, FieldMeta::new(&[2], "y"));
    }
}
"#;
        assert_eq!(generate("message Point { int32 x = 1; int32 y = 2; }"), expected);
    }

    #[test]
    fn test_enum_declaration() {
        let code = generate("enum OptEnumLight {\n  OPT_ZERO = 0;\n  OPT_ONE = 1;\n}\n");
        assert!(code.contains(
            "#[repr(i32)]\npub enum OptEnumLight {\n    #[default]\n    OptZero = 0,\n    OptOne = 1,\n}\n"
        ));
        assert!(code.contains("impl From<OptEnumLight> for i32 {"));
        assert!(code.contains("            1 => Ok(Self::OptOne),\n            other => Err(other),"));
    }

    #[test]
    fn test_labels_and_maps() {
        let code = generate(r#"
            enum Kind { K = 0; }
            message Val { int32 a = 1; }
            message Holder {
                repeated Val vals = 1;
                optional Kind kind = 2;
                optional string s = 3;
                map<string, Val> by_name = 4;
                repeated map<int64, bytes> raw = 5;
                double d = 6;
            }
        "#);
        assert!(code.contains("    pub vals: Vec<Val>,\n"));
        assert!(code.contains("    pub kind: Option<Kind>,\n"));
        assert!(code.contains("    pub s: Option<String>,\n"));
        assert!(code.contains("    pub by_name: ::std::collections::HashMap<String, Val>,\n"));
        assert!(code.contains("    pub raw: ::std::collections::HashMap<i64, Vec<u8>>,\n"));
        assert!(code.contains("    pub d: f64,\n"));
    }

    #[test]
    fn test_oneof_union() {
        let code = generate("message M { oneof u { int32 a = 1; string b = 2; } }");
        assert!(code.contains(
            "pub mod m {\n    #[derive(Debug, Clone, PartialEq, Default)]\n    pub enum U {\n        #[default]\n        Unset,\n        A(i32),\n        B(String),\n    }\n}\n"
        ));
        assert!(code.contains("pub struct M {\n    pub u: m::U,\n}\n"));
        assert!(code.contains("visitor.visit(&self.u, FieldMeta::new(&[1, 2], \"u\"));"));
        assert_eq!(code.matches("FieldMeta::new(").count(), 2);
    }

    #[test]
    fn test_nested_types_and_resolution() {
        let code = generate(r#"
            enum Top { T0 = 0; }
            message Outer {
                message Inner {
                    enum Kind { K0 = 0; }
                    Kind kind = 1;
                    Top top = 2;
                    Outer back = 3;
                }
                Inner inner = 1;
                repeated Inner.Kind kinds = 2;
                oneof pick {
                    Inner one = 3;
                    Top other = 4;
                }
            }
        "#);
        assert!(code.contains("pub mod outer {\n    pub mod inner {\n"));
        assert!(code.contains("        pub kind: inner::Kind,\n"));
        assert!(code.contains("        pub top: super::Top,\n"));
        assert!(code.contains("        pub back: super::Outer,\n"));
        assert!(code.contains("    pub inner: outer::Inner,\n"));
        assert!(code.contains("    pub kinds: Vec<outer::inner::Kind>,\n"));
        assert!(code.contains("        One(Inner),\n        Other(super::Top),\n"));
        assert!(code.contains("impl Reflect for outer::Inner {"));
        assert!(code.find("impl Reflect for Outer {") < code.find("impl Reflect for outer::Inner {"));
        // nested module comes before the parent's own members
        assert!(code.find("pub mod outer {") < code.find("pub struct Outer {"));
    }

    #[test]
    fn test_unknown_types_resolve_to_leaf() {
        let code = generate("message A { message B { Missing m = 1; } Foo.Bar fb = 1; }");
        assert!(code.contains("        pub m: super::Missing,\n"));
        assert!(code.contains("    pub fb: Bar,\n"));
    }

    #[test]
    fn test_own_package_prefix_is_stripped() {
        let code = generate("package demo;\nmessage A { int32 x = 1; }\nmessage B { demo.A a = 1; .demo.A b = 2; }\n");
        assert!(code.contains("    pub a: A,\n"));
        assert!(code.contains("    pub b: A,\n"));
    }

    #[test]
    fn test_imported_package_type_uses_glob_import() {
        let code = generate("import \"common/time.proto\";\nmessage Event {\n  common.Timestamp at = 1;\n}\n");
        assert!(code.contains("use self::time::*;\n"));
        assert!(code.contains("    pub at: Timestamp,\n"));
    }

    #[test]
    fn test_enum_aliases_become_consts() {
        let code = generate("enum S {\n  option allow_alias = true;\n  UNKNOWN = 0;\n  STARTED = 1;\n  RUNNING = 1;\n}\n");
        assert!(code.contains("pub enum S {\n    #[default]\n    Unknown = 0,\n    Started = 1,\n}\n"));
        assert!(code.contains("impl S {\n    pub const RUNNING: Self = Self::Started;\n}\n"));
        assert!(!code.contains("Running = 1"));
        assert_eq!(code.matches("1 => Ok(").count(), 1);
        assert!(code.contains("            1 => Ok(Self::Started),\n"));
    }

    #[test]
    fn test_oneof_name_clashing_with_nested_type() {
        let code = generate(r#"
            message M {
                message Choice { int32 x = 1; }
                oneof choice {
                    Choice c = 1;
                    int32 n = 2;
                }
            }
        "#);
        assert!(code.contains("    pub struct Choice {\n"));
        assert!(code.contains("    pub enum ChoiceOneof {\n        #[default]\n        Unset,\n        C(Choice),\n        N(i32),\n    }\n"));
        assert!(code.contains("pub struct M {\n    pub choice: m::ChoiceOneof,\n}\n"));
        assert!(!code.contains("pub enum Choice {"));
    }

    #[test]
    fn test_reserved_word_fields() {
        let code = generate("message Flags { bool final = 1; bool override = 2; string box = 3; }");
        assert!(code.contains("    pub final_: bool,\n"));
        assert!(code.contains("    pub override_: bool,\n"));
        assert!(code.contains("    pub box_: String,\n"));
        assert!(code.contains("visitor.visit(&self.final_, FieldMeta::new(&[1], \"final\"));"));
    }

    #[test]
    fn test_imports_become_module_mounts() {
        let code = generate("import \"common/a.proto\";\nmessage B { A a = 1; }\n");
        assert!(code.contains("#[path = \"common/a.rs\"]\nmod a;\nuse self::a::*;\n"));
        assert!(code.contains("    pub a: A,\n"));
    }

    #[test]
    fn test_custom_runtime_and_header() {
        let unit = parse_schema("package x.y;\nmessage E {}\n");
        let table = TypeTable::new();
        let options = EmitOptions::default().with_runtime("my_rt");
        let code = compile_schema_to_rust(&unit, &table, &options);
        assert!(code.starts_with("// @generated by lightprotoc. Do not edit.\n// package: x.y\n\n"));
        assert!(code.contains("use ::my_rt::reflection::{FieldMeta, Reflect, Visitor, VisitorMut};"));
        assert!(code.contains("::my_rt::reflection::serialized_size(self)"));
        assert!(code.contains("pub struct E {\n}\n"));
    }

    #[test]
    fn test_empty_oneof_is_not_emitted() {
        let code = generate("message M {\n  oneof nothing {\n  }\n  int32 a = 1;\n}\n");
        assert!(!code.contains("pub mod m"));
        assert!(!code.contains("nothing"));
    }
}
