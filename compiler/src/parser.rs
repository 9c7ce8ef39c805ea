use crate::{
    reader::read_schema,
    tokenizer::{tokenize_schema, Token, TokenKind},
    types::{Enum, EnumValue, Field, FieldType, Label, Message, Nested, Oneof, SchemaUnit, TypeRef},
};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::{debug, trace, warn};

lazy_static! {
    static ref FIELD_RX: Regex = Regex::new(r"(?x)
        (?:\b(?P<label>optional|required|repeated)\s+)?
        (?:
            \bmap\s*<\s*(?P<map_key>\.?[A-Za-z_][\w.]*)\s*,\s*(?P<map_value>\.?[A-Za-z_][\w.]*)\s*>
          | (?P<type>\.?[A-Za-z_][\w.]*)
        )\s+
        (?P<name>[A-Za-z_]\w*)\s*=\s*(?P<number>\d+)
    ").unwrap();
    static ref ENUM_VALUE_RX: Regex = Regex::new(r"(?P<name>[A-Za-z_]\w*)\s*=\s*(?P<value>-?\d+)").unwrap();
}

/// An open context on the nesting stack.
enum Frame {
    Message(Message),
    Enum(Enum),
    Oneof { oneof: Oneof, detached: bool },
    Block,
}

impl Frame {
    fn describe(&self) -> String {
        match self {
            Frame::Message(m)         => format!("message {}", m.name),
            Frame::Enum(e)            => format!("enum {}", e.name),
            Frame::Oneof { oneof, .. } => format!("oneof {}", oneof.name),
            Frame::Block              => "block".to_string(),
        }
    }
}

/// Parses schema text into a `SchemaUnit`.
///
/// Parsing is best effort and never fails: unsupported constructs are
/// skipped, declarations split across lines are not recognized, and type
/// names are stored unresolved.
pub fn parse_schema(text: &str) -> SchemaUnit {
    let read = read_schema(text);
    let tokens = tokenize_schema(&read.body);

    let mut parser = Parser {
        unit:  SchemaUnit {
            package: read.package,
            imports: read.imports,
            ..SchemaUnit::default()
        },
        stack: Vec::new(),
    };
    for token in &tokens {
        parser.step(token);
    }
    parser.finish()
}

struct Parser {
    unit:  SchemaUnit,
    stack: Vec<Frame>,
}

impl Parser {
    fn step(&mut self, token: &Token) {
        trace!(line = token.line, kind = ?token.kind, "structural event");
        match &token.kind {
            TokenKind::OpenMessage(name) => {
                let parents = match self.stack.last() {
                    Some(Frame::Message(parent)) => {
                        let mut chain = parent.parents.clone();
                        chain.push(parent.name.clone());
                        chain
                    }
                    _ => Vec::new(),
                };
                self.stack.push(Frame::Message(Message {
                    name:    name.clone(),
                    line:    token.line,
                    package: self.unit.package.clone(),
                    parents,
                    fields:  Vec::new(),
                    oneofs:  Vec::new(),
                    nested:  Vec::new(),
                }));
            }
            TokenKind::OpenEnum(name) => {
                self.stack.push(Frame::Enum(Enum {
                    name:   name.clone(),
                    line:   token.line,
                    values: Vec::new(),
                }));
            }
            TokenKind::OpenOneof(name) => {
                let detached = !matches!(self.stack.last(), Some(Frame::Message(_)));
                if detached {
                    debug!(line = token.line, oneof = %name, "oneof outside a message is ignored");
                }
                self.stack.push(Frame::Oneof {
                    oneof: Oneof { name: name.clone(), line: token.line, fields: Vec::new() },
                    detached,
                });
            }
            TokenKind::OpenBlock => self.stack.push(Frame::Block),
            TokenKind::Close => match self.stack.pop() {
                Some(frame) => self.close(frame),
                None => warn!(line = token.line, "unbalanced closing brace ignored"),
            },
            TokenKind::Content(text) => self.content(text, token.line),
        }
    }

    /// Attaches a finished frame to whatever is now on top of the stack.
    fn close(&mut self, frame: Frame) {
        match frame {
            Frame::Message(message) => {
                debug!(
                    message = %message.name,
                    fields = message.fields.len(),
                    oneofs = message.oneofs.len(),
                    nested = message.nested.len(),
                    "parsed message"
                );
                match self.stack.last_mut() {
                    Some(Frame::Message(parent)) => parent.nested.push(Nested::Message(message)),
                    _ => {
                        self.unit.messages.insert(message.name.clone(), message);
                    }
                }
            }
            Frame::Enum(en) => {
                debug!(name = %en.name, values = en.values.len(), "parsed enum");
                match self.stack.last_mut() {
                    Some(Frame::Message(parent)) => parent.nested.push(Nested::Enum(en)),
                    _ => {
                        self.unit.enums.insert(en.name.clone(), en);
                    }
                }
            }
            Frame::Oneof { oneof, detached: false } => {
                if let Some(Frame::Message(parent)) = self.stack.last_mut() {
                    parent.oneofs.push(oneof);
                }
            }
            Frame::Oneof { detached: true, .. } | Frame::Block => {}
        }
    }

    fn content(&mut self, text: &str, line: usize) {
        match self.stack.last_mut() {
            Some(Frame::Enum(en)) => {
                let before = en.values.len();
                en.values.extend(parse_enum_values(text));
                if en.values.len() == before {
                    debug!(line, text, "no enumerator recognized");
                }
            }
            Some(Frame::Message(Message { fields, .. }))
            | Some(Frame::Oneof { oneof: Oneof { fields, .. }, .. }) => {
                let found = parse_fields(text, line);
                if found.is_empty() {
                    debug!(line, text, "no field declaration recognized");
                }
                fields.extend(found);
            }
            Some(Frame::Block) => trace!(line, text, "content inside ignored block"),
            None => trace!(line, text, "file-level content"),
        }
    }

    fn finish(mut self) -> SchemaUnit {
        while let Some(frame) = self.stack.pop() {
            warn!(context = %frame.describe(), "context left open at end of input, closing it");
            self.close(frame);
        }
        self.unit
    }
}

/// Every `name = value` enumerator found in `text`.
pub fn parse_enum_values(text: &str) -> Vec<EnumValue> {
    ENUM_VALUE_RX
        .captures_iter(text)
        .filter_map(|caps| {
            let value = caps["value"].parse::<i32>().ok()?;
            Some(EnumValue { name: caps["name"].to_string(), value })
        })
        .collect()
}

/// Every field declaration found in `text`. A line may declare several.
pub fn parse_fields(text: &str, line: usize) -> Vec<Field> {
    FIELD_RX
        .captures_iter(text)
        .filter_map(|caps| field_from_captures(&caps, line))
        .collect()
}

fn field_from_captures(caps: &Captures, line: usize) -> Option<Field> {
    let name = caps["name"].to_string();
    let number = match caps["number"].parse::<u32>() {
        Ok(number) => number,
        Err(_) => {
            debug!(line, field = %name, "field number out of range, field skipped");
            return None;
        }
    };
    let label = match caps.name("label").map(|m| m.as_str()) {
        Some("optional") => Label::Optional,
        Some("repeated") => Label::Repeated,
        _                => Label::Singular,
    };

    let (type_, label) = match (caps.name("map_key"), caps.name("map_value"), caps.name("type")) {
        (Some(key), Some(value), _) => {
            if label != Label::Singular {
                debug!(line, field = %name, "label on map field ignored");
            }
            let type_ = FieldType::Map {
                key:   TypeRef::classify(key.as_str()),
                value: TypeRef::classify(value.as_str()),
            };
            (type_, Label::Singular)
        }
        (_, _, Some(ty)) => (FieldType::Single(TypeRef::classify(ty.as_str())), label),
        _ => return None,
    };

    Some(Field { name, line, type_, label, number })
}
