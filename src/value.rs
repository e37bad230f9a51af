//! Property type codes and typed value columns.
//!
//! A property chunk stores one column: the values of a single property for every
//! instance of one class, in the order the instance chunk listed them. The core
//! keeps that column as raw bytes. This module is the layer above: it names the
//! type codes and pulls one instance's value out of a column for the types whose
//! layout is understood.
//!
//! Column layouts handled here:
//!
//! | type | layout |
//! |------|--------|
//! | string, bytecode | `count` length-prefixed byte strings |
//! | bool | one byte per value |
//! | int32 | interleaved big-endian, zigzag |
//! | float32 | interleaved big-endian, sign bit rotated into bit 0 |
//! | float64 | plain little-endian |
//! | enum, brickcolor, sharedstring | interleaved big-endian `u32` |
//! | referent | interleaved, zigzag, delta accumulated; `-1` is null |
//! | int64 | interleaved 8-byte big-endian, zigzag |
//! | color3uint8 | three byte planes (all R, all G, all B) |
//! | vector2, vector3, color3 | one float32 column per component, back to back |

use std::fmt;

use crate::error::{RbxError, Result};
use crate::interleave::{
    deinterleave, interleave, read_interleaved_i32, read_interleaved_u32, read_referent_ints,
    write_interleaved_i32, write_interleaved_u32, write_referent_ints, zigzag_decode64,
    zigzag_encode64,
};
use crate::io::{ByteReader, ByteWriter};
use crate::referent::Referent;

/// The type code carried by a property chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    /// `0x01`.
    String,
    /// `0x02`.
    Bool,
    /// `0x03`.
    Int32,
    /// `0x04`.
    Float32,
    /// `0x05`.
    Float64,
    /// `0x06`.
    UDim,
    /// `0x07`.
    UDim2,
    /// `0x08`.
    Ray,
    /// `0x09`.
    Faces,
    /// `0x0A`.
    Axes,
    /// `0x0B`.
    BrickColor,
    /// `0x0C`.
    Color3,
    /// `0x0D`.
    Vector2,
    /// `0x0E`.
    Vector3,
    /// `0x10`.
    CFrame,
    /// `0x12`.
    Enum,
    /// `0x13`.
    Referent,
    /// `0x14`.
    Vector3int16,
    /// `0x15`.
    NumberSequence,
    /// `0x16`.
    ColorSequence,
    /// `0x17`.
    NumberRange,
    /// `0x18`.
    Rect,
    /// `0x19`.
    PhysicalProperties,
    /// `0x1A`.
    Color3uint8,
    /// `0x1B`.
    Int64,
    /// `0x1C`.
    SharedString,
    /// `0x1D`.
    Bytecode,
    /// `0x1E`.
    OptionalCFrame,
    /// `0x1F`.
    UniqueId,
    /// A code this decoder does not recognise. The column is kept raw.
    Unknown(u8),
}

impl PropertyType {
    /// Classifies a wire code.
    pub fn from_code(code: u8) -> Self {
        match code {
            0x01 => Self::String,
            0x02 => Self::Bool,
            0x03 => Self::Int32,
            0x04 => Self::Float32,
            0x05 => Self::Float64,
            0x06 => Self::UDim,
            0x07 => Self::UDim2,
            0x08 => Self::Ray,
            0x09 => Self::Faces,
            0x0A => Self::Axes,
            0x0B => Self::BrickColor,
            0x0C => Self::Color3,
            0x0D => Self::Vector2,
            0x0E => Self::Vector3,
            0x10 => Self::CFrame,
            0x12 => Self::Enum,
            0x13 => Self::Referent,
            0x14 => Self::Vector3int16,
            0x15 => Self::NumberSequence,
            0x16 => Self::ColorSequence,
            0x17 => Self::NumberRange,
            0x18 => Self::Rect,
            0x19 => Self::PhysicalProperties,
            0x1A => Self::Color3uint8,
            0x1B => Self::Int64,
            0x1C => Self::SharedString,
            0x1D => Self::Bytecode,
            0x1E => Self::OptionalCFrame,
            0x1F => Self::UniqueId,
            other => Self::Unknown(other),
        }
    }

    /// The wire code.
    pub fn code(self) -> u8 {
        match self {
            Self::String => 0x01,
            Self::Bool => 0x02,
            Self::Int32 => 0x03,
            Self::Float32 => 0x04,
            Self::Float64 => 0x05,
            Self::UDim => 0x06,
            Self::UDim2 => 0x07,
            Self::Ray => 0x08,
            Self::Faces => 0x09,
            Self::Axes => 0x0A,
            Self::BrickColor => 0x0B,
            Self::Color3 => 0x0C,
            Self::Vector2 => 0x0D,
            Self::Vector3 => 0x0E,
            Self::CFrame => 0x10,
            Self::Enum => 0x12,
            Self::Referent => 0x13,
            Self::Vector3int16 => 0x14,
            Self::NumberSequence => 0x15,
            Self::ColorSequence => 0x16,
            Self::NumberRange => 0x17,
            Self::Rect => 0x18,
            Self::PhysicalProperties => 0x19,
            Self::Color3uint8 => 0x1A,
            Self::Int64 => 0x1B,
            Self::SharedString => 0x1C,
            Self::Bytecode => 0x1D,
            Self::OptionalCFrame => 0x1E,
            Self::UniqueId => 0x1F,
            Self::Unknown(code) => code,
        }
    }

    /// False only for [`PropertyType::Unknown`].
    pub fn is_known(self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "Unknown({code:#04x})"),
            known => write!(f, "{known:?}"),
        }
    }
}

/// One instance's decoded property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Byte string; not necessarily UTF-8.
    String(Vec<u8>),
    /// Compiled script bytes.
    Bytecode(Vec<u8>),
    /// Boolean.
    Bool(bool),
    /// 32-bit signed integer.
    Int32(i32),
    /// Single-precision float.
    Float32(f32),
    /// Double-precision float.
    Float64(f64),
    /// Enum item value.
    Enum(u32),
    /// Palette index.
    BrickColor(u32),
    /// `None` is the null reference.
    Referent(Option<Referent>),
    /// 64-bit signed integer.
    Int64(i64),
    /// Index into the shared-string table.
    SharedString(u32),
    /// RGB bytes.
    Color3uint8([u8; 3]),
    /// X and Y.
    Vector2([f32; 2]),
    /// X, Y and Z.
    Vector3([f32; 3]),
    /// RGB components in `0.0..=1.0`.
    Color3([f32; 3]),
}

impl PropertyValue {
    /// The column type this value belongs to.
    pub fn property_type(&self) -> PropertyType {
        match self {
            Self::String(_) => PropertyType::String,
            Self::Bytecode(_) => PropertyType::Bytecode,
            Self::Bool(_) => PropertyType::Bool,
            Self::Int32(_) => PropertyType::Int32,
            Self::Float32(_) => PropertyType::Float32,
            Self::Float64(_) => PropertyType::Float64,
            Self::Enum(_) => PropertyType::Enum,
            Self::BrickColor(_) => PropertyType::BrickColor,
            Self::Referent(_) => PropertyType::Referent,
            Self::Int64(_) => PropertyType::Int64,
            Self::SharedString(_) => PropertyType::SharedString,
            Self::Color3uint8(_) => PropertyType::Color3uint8,
            Self::Vector2(_) => PropertyType::Vector2,
            Self::Vector3(_) => PropertyType::Vector3,
            Self::Color3(_) => PropertyType::Color3,
        }
    }
}

fn pick<T: Copy>(column: &[T], slot: usize) -> Result<T> {
    column.get(slot).copied().ok_or(RbxError::CountMismatch {
        what: "property column",
        expected: slot + 1,
        actual: column.len(),
    })
}

fn f32_from_wire(word: u32) -> f32 {
    f32::from_bits(word.rotate_right(1))
}

fn f32_to_wire(value: f32) -> u32 {
    value.to_bits().rotate_left(1)
}

fn read_f32_column(reader: &mut ByteReader<'_>, count: usize) -> Vec<f32> {
    read_interleaved_u32(reader, count)
        .into_iter()
        .map(f32_from_wire)
        .collect()
}

fn read_f32_components<const N: usize>(raw: &[u8], slot: usize) -> Result<[f32; N]> {
    let count = raw.len() / (4 * N);
    let mut reader = ByteReader::new(raw);
    let mut out = [0f32; N];
    for component in &mut out {
        *component = pick(&read_f32_column(&mut reader, count), slot)?;
    }
    Ok(out)
}

/// Extracts the value at `slot` from a raw property column.
///
/// Returns `Ok(None)` for types whose layout this layer does not interpret; those
/// columns stay available raw. A slot past the end of the column fails with
/// [`RbxError::CountMismatch`] (or [`RbxError::Truncated`] for variable-width types).
pub fn decode_value(kind: PropertyType, raw: &[u8], slot: usize) -> Result<Option<PropertyValue>> {
    let mut reader = ByteReader::new(raw);
    let value = match kind {
        PropertyType::String | PropertyType::Bytecode => {
            for _ in 0..slot {
                reader.read_n_bytes()?;
            }
            let bytes = reader.read_n_bytes()?.to_vec();
            if kind == PropertyType::String {
                PropertyValue::String(bytes)
            } else {
                PropertyValue::Bytecode(bytes)
            }
        }
        PropertyType::Bool => {
            reader.read_bytes(slot)?;
            PropertyValue::Bool(reader.read_bool()?)
        }
        PropertyType::Int32 => {
            let column = read_interleaved_i32(&mut reader, raw.len() / 4);
            PropertyValue::Int32(pick(&column, slot)?)
        }
        PropertyType::Float32 => {
            let column = read_f32_column(&mut reader, raw.len() / 4);
            PropertyValue::Float32(pick(&column, slot)?)
        }
        PropertyType::Float64 => {
            reader.read_bytes(slot.saturating_mul(8))?;
            PropertyValue::Float64(reader.read_f64_le()?)
        }
        PropertyType::Enum | PropertyType::BrickColor | PropertyType::SharedString => {
            let word = pick(&read_interleaved_u32(&mut reader, raw.len() / 4), slot)?;
            match kind {
                PropertyType::Enum => PropertyValue::Enum(word),
                PropertyType::BrickColor => PropertyValue::BrickColor(word),
                _ => PropertyValue::SharedString(word),
            }
        }
        PropertyType::Referent => {
            let wire = pick(&read_referent_ints(&mut reader, raw.len() / 4), slot)?;
            PropertyValue::Referent((wire != -1).then(|| Referent::from_wire(wire)))
        }
        PropertyType::Int64 => {
            let natural = deinterleave(raw, 8);
            let column: Vec<i64> = natural
                .chunks_exact(8)
                .map(|w| {
                    let mut word = [0u8; 8];
                    word.copy_from_slice(w);
                    zigzag_decode64(u64::from_be_bytes(word))
                })
                .collect();
            PropertyValue::Int64(pick(&column, slot)?)
        }
        PropertyType::Color3uint8 => {
            let count = raw.len() / 3;
            let plane = |p: usize| pick(&raw[p * count..(p + 1) * count], slot);
            PropertyValue::Color3uint8([plane(0)?, plane(1)?, plane(2)?])
        }
        PropertyType::Vector2 => PropertyValue::Vector2(read_f32_components::<2>(raw, slot)?),
        PropertyType::Vector3 => PropertyValue::Vector3(read_f32_components::<3>(raw, slot)?),
        PropertyType::Color3 => PropertyValue::Color3(read_f32_components::<3>(raw, slot)?),
        PropertyType::UDim
        | PropertyType::UDim2
        | PropertyType::Ray
        | PropertyType::Faces
        | PropertyType::Axes
        | PropertyType::CFrame
        | PropertyType::Vector3int16
        | PropertyType::NumberSequence
        | PropertyType::ColorSequence
        | PropertyType::NumberRange
        | PropertyType::Rect
        | PropertyType::PhysicalProperties
        | PropertyType::OptionalCFrame
        | PropertyType::UniqueId
        | PropertyType::Unknown(_) => return Ok(None),
    };
    Ok(Some(value))
}

fn mismatch(kind: PropertyType, value: &PropertyValue) -> RbxError {
    RbxError::Unrepresentable(format!(
        "{} value in a {kind} column",
        value.property_type()
    ))
}

/// Builds a raw column of type `kind` from one value per instance.
///
/// The inverse of [`decode_value`] over every slot. Values must all be of the
/// column's type; types [`decode_value`] does not interpret are rejected.
pub fn encode_column(kind: PropertyType, values: &[PropertyValue]) -> Result<Vec<u8>> {
    let mut w = ByteWriter::new();

    macro_rules! collect {
        ($variant:ident) => {
            values
                .iter()
                .map(|v| match v {
                    PropertyValue::$variant(x) => Ok(*x),
                    other => Err(mismatch(kind, other)),
                })
                .collect::<Result<Vec<_>>>()?
        };
    }

    match kind {
        PropertyType::String | PropertyType::Bytecode => {
            for v in values {
                match (kind, v) {
                    (PropertyType::String, PropertyValue::String(b))
                    | (PropertyType::Bytecode, PropertyValue::Bytecode(b)) => w.write_n_bytes(b)?,
                    (_, other) => return Err(mismatch(kind, other)),
                }
            }
        }
        PropertyType::Bool => {
            for b in collect!(Bool) {
                w.write_bool(b);
            }
        }
        PropertyType::Int32 => write_interleaved_i32(&mut w, &collect!(Int32)),
        PropertyType::Float32 => {
            let words: Vec<u32> = collect!(Float32).into_iter().map(f32_to_wire).collect();
            write_interleaved_u32(&mut w, &words);
        }
        PropertyType::Float64 => {
            for f in collect!(Float64) {
                w.write_f64_le(f);
            }
        }
        PropertyType::Enum => write_interleaved_u32(&mut w, &collect!(Enum)),
        PropertyType::BrickColor => write_interleaved_u32(&mut w, &collect!(BrickColor)),
        PropertyType::SharedString => write_interleaved_u32(&mut w, &collect!(SharedString)),
        PropertyType::Referent => {
            let wire = collect!(Referent)
                .into_iter()
                .map(|r| match r {
                    None => Ok(-1),
                    Some(r) => r.to_wire().ok_or_else(|| {
                        RbxError::Unrepresentable(format!("referent {r} as a 32-bit wire id"))
                    }),
                })
                .collect::<Result<Vec<i32>>>()?;
            write_referent_ints(&mut w, &wire);
        }
        PropertyType::Int64 => {
            let mut natural = Vec::with_capacity(values.len() * 8);
            for v in collect!(Int64) {
                natural.extend_from_slice(&zigzag_encode64(v).to_be_bytes());
            }
            w.write_bytes(&interleave(&natural, 8));
        }
        PropertyType::Color3uint8 => {
            let colors = collect!(Color3uint8);
            for p in 0..3 {
                for c in &colors {
                    w.write_u8(c[p]);
                }
            }
        }
        PropertyType::Vector2 => write_f32_components(&mut w, &collect!(Vector2)),
        PropertyType::Vector3 => write_f32_components(&mut w, &collect!(Vector3)),
        PropertyType::Color3 => write_f32_components(&mut w, &collect!(Color3)),
        other => {
            return Err(RbxError::Unrepresentable(format!(
                "{other} columns from typed values"
            )));
        }
    }
    Ok(w.into_inner())
}

fn write_f32_components<const N: usize>(w: &mut ByteWriter, values: &[[f32; N]]) {
    for component in 0..N {
        let words: Vec<u32> = values.iter().map(|v| f32_to_wire(v[component])).collect();
        write_interleaved_u32(w, &words);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn all_slots(kind: PropertyType, values: &[PropertyValue]) -> Vec<PropertyValue> {
        let raw = encode_column(kind, values).unwrap();
        (0..values.len())
            .map(|slot| decode_value(kind, &raw, slot).unwrap().unwrap())
            .collect()
    }

    #[test]
    fn type_codes_cover_the_table() {
        for code in 0u8..=0x20 {
            let kind = PropertyType::from_code(code);
            assert_eq!(kind.code(), code);
        }
        assert_eq!(PropertyType::from_code(0x0F), PropertyType::Unknown(0x0F));
        assert_eq!(PropertyType::from_code(0x11), PropertyType::Unknown(0x11));
        assert_eq!(PropertyType::from_code(0x1C), PropertyType::SharedString);
    }

    #[test]
    fn string_column_picks_slot() {
        let values = vec![
            PropertyValue::String(b"Baseplate".to_vec()),
            PropertyValue::String(Vec::new()),
            PropertyValue::String(b"SpawnLocation".to_vec()),
        ];
        assert_eq!(all_slots(PropertyType::String, &values), values);
    }

    #[test]
    fn numeric_columns() {
        let ints = vec![
            PropertyValue::Int32(0),
            PropertyValue::Int32(-7),
            PropertyValue::Int32(i32::MAX),
        ];
        assert_eq!(all_slots(PropertyType::Int32, &ints), ints);

        let floats = vec![PropertyValue::Float32(1.5), PropertyValue::Float32(-0.25)];
        assert_eq!(all_slots(PropertyType::Float32, &floats), floats);

        let doubles = vec![PropertyValue::Float64(3.75)];
        assert_eq!(all_slots(PropertyType::Float64, &doubles), doubles);

        let longs = vec![PropertyValue::Int64(-1), PropertyValue::Int64(1 << 40)];
        assert_eq!(all_slots(PropertyType::Int64, &longs), longs);
    }

    #[test]
    fn float32_wire_rotates_sign_bit() {
        // -1.0 is 0xBF800000; rotated left it becomes 0x7F000001.
        assert_eq!(f32_to_wire(-1.0), 0x7F00_0001);
        assert_eq!(f32_from_wire(0x7F00_0001), -1.0);
    }

    #[test]
    fn referent_column_maps_minus_one_to_null() {
        let values = vec![
            PropertyValue::Referent(Some(Referent::from_wire(4))),
            PropertyValue::Referent(None),
            PropertyValue::Referent(Some(Referent::from_wire(2))),
        ];
        assert_eq!(all_slots(PropertyType::Referent, &values), values);
    }

    #[test]
    fn composite_columns() {
        let colors = vec![
            PropertyValue::Color3uint8([255, 0, 10]),
            PropertyValue::Color3uint8([1, 2, 3]),
        ];
        assert_eq!(all_slots(PropertyType::Color3uint8, &colors), colors);

        let vectors = vec![
            PropertyValue::Vector3([0.0, 10.5, -3.0]),
            PropertyValue::Vector3([1.0, 2.0, 3.0]),
        ];
        assert_eq!(all_slots(PropertyType::Vector3, &vectors), vectors);
    }

    #[test]
    fn bools_and_words() {
        let bools = vec![PropertyValue::Bool(true), PropertyValue::Bool(false)];
        assert_eq!(all_slots(PropertyType::Bool, &bools), bools);

        let enums = vec![PropertyValue::Enum(0), PropertyValue::Enum(256)];
        assert_eq!(all_slots(PropertyType::Enum, &enums), enums);
    }

    #[test]
    fn out_of_range_slot_fails() {
        let raw = encode_column(PropertyType::Int32, &[PropertyValue::Int32(1)]).unwrap();
        let err = decode_value(PropertyType::Int32, &raw, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CountMismatch);

        let raw = encode_column(PropertyType::String, &[PropertyValue::String(b"a".to_vec())])
            .unwrap();
        let err = decode_value(PropertyType::String, &raw, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Truncated);
    }

    #[test]
    fn uninterpreted_types_stay_raw() {
        assert!(decode_value(PropertyType::CFrame, &[0; 48], 0).unwrap().is_none());
        assert!(decode_value(PropertyType::Unknown(0x40), &[1, 2], 0).unwrap().is_none());
    }

    #[test]
    fn mixed_column_is_rejected() {
        let err = encode_column(
            PropertyType::Int32,
            &[PropertyValue::Int32(1), PropertyValue::Bool(true)],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unrepresentable);
    }
}
