use indexmap::IndexMap;
use serde::Serialize;

/// Result of parsing one schema file.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct SchemaUnit {
    pub package:  Option<String>,
    pub imports:  Vec<String>,
    pub messages: IndexMap<String, Message>,
    pub enums:    IndexMap<String, Enum>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scalar {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

impl Scalar {
    pub fn from_proto(name: &str) -> Option<Scalar> {
        let scalar = match name {
            "double"   => Scalar::Double,
            "float"    => Scalar::Float,
            "int32"    => Scalar::Int32,
            "int64"    => Scalar::Int64,
            "uint32"   => Scalar::Uint32,
            "uint64"   => Scalar::Uint64,
            "sint32"   => Scalar::Sint32,
            "sint64"   => Scalar::Sint64,
            "fixed32"  => Scalar::Fixed32,
            "fixed64"  => Scalar::Fixed64,
            "sfixed32" => Scalar::Sfixed32,
            "sfixed64" => Scalar::Sfixed64,
            "bool"     => Scalar::Bool,
            "string"   => Scalar::String,
            "bytes"    => Scalar::Bytes,
            _ => return None,
        };
        Some(scalar)
    }

    /// Native Rust representation, wire-compatible with the runtime.
    pub fn rust_type(self) -> &'static str {
        match self {
            Scalar::Double => "f64",
            Scalar::Float => "f32",
            Scalar::Int32 | Scalar::Sint32 | Scalar::Sfixed32 => "i32",
            Scalar::Int64 | Scalar::Sint64 | Scalar::Sfixed64 => "i64",
            Scalar::Uint32 | Scalar::Fixed32 => "u32",
            Scalar::Uint64 | Scalar::Fixed64 => "u64",
            Scalar::Bool => "bool",
            Scalar::String => "String",
            Scalar::Bytes => "Vec<u8>",
        }
    }
}

/// A single type reference: either a scalar or a raw, unresolved type name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum TypeRef {
    Scalar(Scalar),
    Named(String),
}

impl TypeRef {
    pub fn classify(name: &str) -> TypeRef {
        match Scalar::from_proto(name) {
            Some(scalar) => TypeRef::Scalar(scalar),
            None         => TypeRef::Named(name.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Single(TypeRef),
    Map { key: TypeRef, value: TypeRef },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    #[default]
    Singular,
    Optional,
    Repeated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name:   String,
    pub line:   usize,
    pub type_:  FieldType,
    pub label:  Label,
    pub number: u32,
}

impl Field {
    pub fn is_map(&self) -> bool {
        matches!(self.type_, FieldType::Map { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Oneof {
    pub name:   String,
    pub line:   usize,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumValue {
    pub name:  String,
    pub value: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enum {
    pub name:   String,
    pub line:   usize,
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Nested {
    Message(Message),
    Enum(Enum),
}

impl Nested {
    pub fn name(&self) -> &str {
        match self {
            Nested::Message(m) => &m.name,
            Nested::Enum(e)    => &e.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub name:    String,
    pub line:    usize,
    pub package: Option<String>,
    /// Names of the enclosing messages, outermost first.
    pub parents: Vec<String>,
    pub fields:  Vec<Field>,
    pub oneofs:  Vec<Oneof>,
    pub nested:  Vec<Nested>,
}

impl Message {
    pub fn nested_messages(&self) -> impl Iterator<Item = &Message> {
        self.nested.iter().filter_map(|n| match n {
            Nested::Message(m) => Some(m),
            Nested::Enum(_)    => None,
        })
    }

    /// True if a type called `name` is declared directly inside this message.
    pub fn declares(&self, name: &str) -> bool {
        self.nested.iter().any(|n| n.name() == name)
    }

    pub fn nested_message(&self, name: &str) -> Option<&Message> {
        self.nested_messages().find(|m| m.name == name)
    }
}

impl SchemaUnit {
    pub fn message_names(&self) -> Vec<&str> {
        self.messages.keys().map(String::as_str).collect()
    }

    pub fn enum_names(&self) -> Vec<&str> {
        self.enums.keys().map(String::as_str).collect()
    }
}
