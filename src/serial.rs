//! Binary serialization and deserialization of compiled rules.
//!
//! This module provides a stable binary format for persisting a
//! [`CompiledRule`](crate::CompiledRule). The format consists of a 32-byte
//! fixed header followed by a bincode-encoded payload.
//!
//! ## Wire Format
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Magic bytes: b"TSRA"
//! 4       2     Format version (u16, little-endian)
//! 6       2     Engine version (u16, little-endian)
//! 8       4     Flags (u32, reserved)
//! 12      4     Payload length in bytes (u32, little-endian)
//! 16      16    BLAKE3 hash of the payload (truncated to 16 bytes)
//! 32..    var   Bincode-encoded payload
//! ```
//!
//! Operators are stored by name and looked up in the registry again on
//! decode, so a blob never carries function addresses.
//!
//! ## Versioning
//!
//! The format version in the header must match exactly. If it does not,
//! deserialization fails immediately with [`DeserializeError::IncompatibleVersion`].
//! The engine version is informational only.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::expr::{CompiledExpr, CompiledPath, NodeId, Span};
use crate::{CompiledRule, Operator, Path, Value, DEFAULT_MAX_DEPTH};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAGIC: &[u8; 4] = b"TSRA";
const FORMAT_VERSION: u16 = 1;
const ENGINE_VERSION: u16 = 1;
const HEADER_SIZE: usize = 32;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when serializing a [`CompiledRule`](crate::CompiledRule) to bytes.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("failed to encode rule: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("I/O error during serialization: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when deserializing a [`CompiledRule`](crate::CompiledRule) from bytes.
#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("not a tessera binary: invalid magic bytes")]
    BadMagic,

    #[error("incompatible format version: blob is v{blob}, engine supports v{supported}")]
    IncompatibleVersion { blob: u16, supported: u16 },

    #[error("integrity check failed: BLAKE3 checksum mismatch")]
    ChecksumMismatch,

    #[error("payload length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: u32, actual: usize },

    #[error("failed to decode payload: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("I/O error during deserialization: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Serialized type hierarchy
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct SerializedRule {
    metadata: RuleMetadata,
    nodes: Vec<SerializedNode>,
    edges: Vec<u32>,
    root: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct RuleMetadata {
    node_count: usize,
    edge_count: usize,
    depth: usize,
    source_digest: Option<[u8; 32]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum SerializedNode {
    Literal(SerializedValue),
    StaticVar {
        segments: Vec<String>,
        default: Option<u32>,
    },
    DynamicVar {
        key: u32,
        default: Option<u32>,
    },
    Op {
        operator: String,
        start: u32,
        len: u32,
    },
}

/// Externally tagged mirror of [`Value`]; bincode cannot drive the untagged
/// representation `Value` itself uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum SerializedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<SerializedValue>),
    Map(Vec<(String, SerializedValue)>),
}

// ---------------------------------------------------------------------------
// Value conversion
// ---------------------------------------------------------------------------

fn serialize_value(value: &Value) -> SerializedValue {
    match value {
        Value::Null => SerializedValue::Null,
        Value::Bool(v) => SerializedValue::Bool(*v),
        Value::Int(v) => SerializedValue::Int(*v),
        Value::Float(v) => SerializedValue::Float(*v),
        Value::String(v) => SerializedValue::Str(v.clone()),
        Value::Array(items) => SerializedValue::List(items.iter().map(serialize_value).collect()),
        Value::Object(map) => SerializedValue::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), serialize_value(v)))
                .collect(),
        ),
    }
}

fn deserialize_value(value: SerializedValue) -> Value {
    match value {
        SerializedValue::Null => Value::Null,
        SerializedValue::Bool(v) => Value::Bool(v),
        SerializedValue::Int(v) => Value::Int(v),
        SerializedValue::Float(v) => Value::Float(v),
        SerializedValue::Str(v) => Value::String(v),
        SerializedValue::List(items) => {
            Value::Array(items.into_iter().map(deserialize_value).collect())
        }
        SerializedValue::Map(entries) => Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k, deserialize_value(v)))
                .collect(),
        ),
    }
}

// ---------------------------------------------------------------------------
// Node conversion
// ---------------------------------------------------------------------------

fn serialize_node(node: &CompiledExpr) -> SerializedNode {
    match node {
        CompiledExpr::Literal(value) => SerializedNode::Literal(serialize_value(value)),
        CompiledExpr::Var {
            path: CompiledPath::Static(path),
            default,
        } => SerializedNode::StaticVar {
            segments: path.segments().to_vec(),
            default: default.map(|id| id.0),
        },
        CompiledExpr::Var {
            path: CompiledPath::Dynamic(key),
            default,
        } => SerializedNode::DynamicVar {
            key: key.0,
            default: default.map(|id| id.0),
        },
        CompiledExpr::Op { op, args } => SerializedNode::Op {
            operator: op.name().to_owned(),
            start: args.start,
            len: args.len,
        },
    }
}

fn deserialize_node(node: SerializedNode) -> Result<CompiledExpr, DeserializeError> {
    Ok(match node {
        SerializedNode::Literal(value) => CompiledExpr::Literal(deserialize_value(value)),
        SerializedNode::StaticVar { segments, default } => CompiledExpr::Var {
            path: CompiledPath::Static(Path::from_segments(segments)),
            default: default.map(NodeId),
        },
        SerializedNode::DynamicVar { key, default } => CompiledExpr::Var {
            path: CompiledPath::Dynamic(NodeId(key)),
            default: default.map(NodeId),
        },
        SerializedNode::Op {
            operator,
            start,
            len,
        } => CompiledExpr::Op {
            op: Operator::lookup(&operator).ok_or_else(|| {
                DeserializeError::Validation(format!("unknown operator '{operator}'"))
            })?,
            args: Span { start, len },
        },
    })
}

// ---------------------------------------------------------------------------
// CompiledRule <-> SerializedRule
// ---------------------------------------------------------------------------

fn rule_to_serialized(rule: &CompiledRule, source_text: Option<&str>) -> SerializedRule {
    let source_digest = source_text.map(|s| *blake3::hash(s.as_bytes()).as_bytes());

    SerializedRule {
        metadata: RuleMetadata {
            node_count: rule.nodes.len(),
            edge_count: rule.edges.len(),
            depth: rule.depth,
            source_digest,
        },
        nodes: rule.nodes.iter().map(serialize_node).collect(),
        edges: rule.edges.iter().map(|id| id.0).collect(),
        root: rule.root.0,
    }
}

fn serialized_to_rule(ser: SerializedRule) -> Result<CompiledRule, DeserializeError> {
    validate(&ser)?;

    let nodes = ser
        .nodes
        .into_iter()
        .map(deserialize_node)
        .collect::<Result<Vec<_>, _>>()?;
    let edges = ser.edges.into_iter().map(NodeId).collect();
    let rule = CompiledRule::from_parts(nodes, edges, NodeId(ser.root));

    if rule.depth != ser.metadata.depth {
        return Err(DeserializeError::Validation(format!(
            "metadata says depth {} but nodes measure {}",
            ser.metadata.depth, rule.depth
        )));
    }
    // evaluation recurses once per level, so the cap must hold here too
    if rule.depth > DEFAULT_MAX_DEPTH {
        return Err(DeserializeError::Validation(format!(
            "rule depth {} exceeds the maximum of {DEFAULT_MAX_DEPTH}",
            rule.depth
        )));
    }
    Ok(rule)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(ser: &SerializedRule) -> Result<(), DeserializeError> {
    let node_count = ser.nodes.len();
    let edge_count = ser.edges.len();

    if ser.metadata.node_count != node_count {
        return Err(DeserializeError::Validation(format!(
            "metadata says {} nodes but payload has {}",
            ser.metadata.node_count, node_count
        )));
    }
    if ser.metadata.edge_count != edge_count {
        return Err(DeserializeError::Validation(format!(
            "metadata says {} edges but payload has {}",
            ser.metadata.edge_count, edge_count
        )));
    }

    if ser.root as usize >= node_count {
        return Err(DeserializeError::Validation(format!(
            "root {} out of bounds (max {node_count})",
            ser.root
        )));
    }

    for (index, node) in ser.nodes.iter().enumerate() {
        validate_node(node, index, &ser.edges)?;
    }
    Ok(())
}

/// Every child id must name an earlier node; that keeps the arena acyclic.
fn validate_child(child: u32, parent: usize) -> Result<(), DeserializeError> {
    if child as usize >= parent {
        return Err(DeserializeError::Validation(format!(
            "node {parent} refers to node {child}, which does not precede it"
        )));
    }
    Ok(())
}

fn validate_node(node: &SerializedNode, index: usize, edges: &[u32]) -> Result<(), DeserializeError> {
    match node {
        SerializedNode::Literal(_) => Ok(()),
        SerializedNode::StaticVar { default, .. } => {
            default.map_or(Ok(()), |child| validate_child(child, index))
        }
        SerializedNode::DynamicVar { key, default } => {
            validate_child(*key, index)?;
            default.map_or(Ok(()), |child| validate_child(child, index))
        }
        SerializedNode::Op {
            operator,
            start,
            len,
        } => {
            if Operator::lookup(operator).is_none() {
                return Err(DeserializeError::Validation(format!(
                    "unknown operator '{operator}'"
                )));
            }
            let span = (*start as usize)..(*start as usize + *len as usize);
            let children = edges.get(span).ok_or_else(|| {
                DeserializeError::Validation(format!(
                    "edge span {start}+{len} out of bounds (max {})",
                    edges.len()
                ))
            })?;
            children
                .iter()
                .try_for_each(|&child| validate_child(child, index))
        }
    }
}

// ---------------------------------------------------------------------------
// Header I/O
// ---------------------------------------------------------------------------

fn write_header(buf: &mut Vec<u8>, payload: &[u8]) {
    let hash = blake3::hash(payload);
    let hash_bytes = hash.as_bytes();

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&ENGINE_VERSION.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // flags (reserved)
    #[allow(clippy::cast_possible_truncation)] // payload will never exceed 4 GiB
    let payload_len = payload.len() as u32;
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(&hash_bytes[..16]);
}

#[allow(clippy::cast_possible_truncation)] // HEADER_SIZE is 32, always fits in u32
fn read_header(bytes: &[u8]) -> Result<(u16, u32, [u8; 16]), DeserializeError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DeserializeError::LengthMismatch {
            expected: HEADER_SIZE as u32,
            actual: bytes.len(),
        });
    }

    if &bytes[0..4] != MAGIC {
        return Err(DeserializeError::BadMagic);
    }

    let format_version = u16::from_le_bytes([bytes[4], bytes[5]]);
    // bytes[6..8] is engine_version (informational, not used for checks)
    // bytes[8..12] is flags (reserved)
    let payload_len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

    let mut hash = [0u8; 16];
    hash.copy_from_slice(&bytes[16..32]);

    Ok((format_version, payload_len, hash))
}

// ---------------------------------------------------------------------------
// Public encode/decode
// ---------------------------------------------------------------------------

pub(crate) fn encode(
    rule: &CompiledRule,
    source_text: Option<&str>,
) -> Result<Vec<u8>, SerializeError> {
    let serialized = rule_to_serialized(rule, source_text);
    let payload = bincode::serde::encode_to_vec(&serialized, bincode::config::standard())?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    write_header(&mut buf, &payload);
    buf.extend_from_slice(&payload);
    Ok(buf)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<CompiledRule, DeserializeError> {
    let (format_version, payload_len, stored_hash) = read_header(bytes)?;

    if format_version != FORMAT_VERSION {
        return Err(DeserializeError::IncompatibleVersion {
            blob: format_version,
            supported: FORMAT_VERSION,
        });
    }

    let payload_start = HEADER_SIZE;
    let payload_end = payload_start + payload_len as usize;
    if bytes.len() < payload_end {
        return Err(DeserializeError::LengthMismatch {
            expected: payload_len,
            actual: bytes.len() - HEADER_SIZE,
        });
    }
    let payload = &bytes[payload_start..payload_end];

    let computed_hash = blake3::hash(payload);
    if computed_hash.as_bytes()[..16] != stored_hash {
        return Err(DeserializeError::ChecksumMismatch);
    }

    let (serialized, _): (SerializedRule, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard())?;

    serialized_to_rule(serialized)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
