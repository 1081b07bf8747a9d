//! Serde bridge: serialize flat Rust values into fact rows.
//!
//! [`to_row`] turns a struct, tuple or tuple struct of primitive fields into
//! a `Vec<Value>`, so hosts can seed extensional facts without writing rows
//! by hand. Field-level support covers booleans, integers, strings, unit and
//! newtype structs, enum unit/newtype variants (becoming constructor
//! values), and `Option` (becoming `Some(..)`/`None` constructors). Nested
//! rows, sequences and maps are rejected: a fact row is flat.

use std::fmt;

use fixlog_ir::{Tuple, Value, sym};
use serde::ser::{self, Impossible, Serialize};

/// Error type for row conversion.
#[derive(Debug)]
pub struct RowError(pub String);

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row conversion error: {}", self.0)
    }
}

impl std::error::Error for RowError {}

impl ser::Error for RowError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        RowError(msg.to_string())
    }
}

fn unsupported<T>(what: &str) -> Result<T, RowError> {
    Err(RowError(format!("{what} is not representable in a fact row")))
}

/// Serialize a flat Rust value into a fact row. Scalars become one-column
/// rows; structs, tuples and tuple structs contribute one column per field.
pub fn to_row<T: Serialize>(value: &T) -> Result<Tuple, RowError> {
    value.serialize(RowSerializer)
}

// ─── Field level: one Rust value → one Value ────────────────────────

struct FieldSerializer;

impl ser::Serializer for FieldSerializer {
    type Ok = Value;
    type Error = RowError;

    type SerializeSeq = Impossible<Value, RowError>;
    type SerializeTuple = Impossible<Value, RowError>;
    type SerializeTupleStruct = Impossible<Value, RowError>;
    type SerializeTupleVariant = Impossible<Value, RowError>;
    type SerializeMap = Impossible<Value, RowError>;
    type SerializeStruct = Impossible<Value, RowError>;
    type SerializeStructVariant = Impossible<Value, RowError>;

    fn serialize_bool(self, v: bool) -> Result<Value, RowError> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, RowError> {
        Ok(Value::I32(v as i32))
    }

    fn serialize_i16(self, v: i16) -> Result<Value, RowError> {
        Ok(Value::I32(v as i32))
    }

    fn serialize_i32(self, v: i32) -> Result<Value, RowError> {
        Ok(Value::I32(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Value, RowError> {
        Ok(Value::I64(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Value, RowError> {
        Ok(Value::I32(v as i32))
    }

    fn serialize_u16(self, v: u16) -> Result<Value, RowError> {
        Ok(Value::I32(v as i32))
    }

    fn serialize_u32(self, v: u32) -> Result<Value, RowError> {
        Ok(Value::I64(v as i64))
    }

    fn serialize_u64(self, v: u64) -> Result<Value, RowError> {
        i64::try_from(v)
            .map(Value::I64)
            .map_err(|_| RowError(format!("u64 value {v} overflows i64")))
    }

    fn serialize_f32(self, _v: f32) -> Result<Value, RowError> {
        unsupported("floating point")
    }

    fn serialize_f64(self, _v: f64) -> Result<Value, RowError> {
        unsupported("floating point")
    }

    fn serialize_char(self, v: char) -> Result<Value, RowError> {
        Ok(Value::str(&v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value, RowError> {
        Ok(Value::str(v))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<Value, RowError> {
        unsupported("byte string")
    }

    fn serialize_none(self) -> Result<Value, RowError> {
        Ok(Value::ctor("None", vec![]))
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Value, RowError> {
        Ok(Value::ctor("Some", vec![value.serialize(FieldSerializer)?]))
    }

    fn serialize_unit(self) -> Result<Value, RowError> {
        Ok(Value::Unit)
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<Value, RowError> {
        Ok(Value::Ctor(sym(name), vec![]))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Value, RowError> {
        Ok(Value::Ctor(sym(variant), vec![]))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<Value, RowError> {
        Ok(Value::Ctor(sym(name), vec![value.serialize(FieldSerializer)?]))
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, RowError> {
        Ok(Value::Ctor(sym(variant), vec![value.serialize(FieldSerializer)?]))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, RowError> {
        unsupported("sequence")
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, RowError> {
        unsupported("nested tuple")
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, RowError> {
        unsupported("nested tuple struct")
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, RowError> {
        unsupported("tuple enum variant")
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, RowError> {
        unsupported("map")
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, RowError> {
        unsupported("nested struct")
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, RowError> {
        unsupported("struct enum variant")
    }
}

// ─── Row level: one Rust value → one row ────────────────────────────

struct RowSerializer;

macro_rules! single_column {
    ($($method:ident: $ty:ty),* $(,)?) => {$(
        fn $method(self, v: $ty) -> Result<Tuple, RowError> {
            Ok(vec![FieldSerializer.$method(v)?])
        }
    )*};
}

impl ser::Serializer for RowSerializer {
    type Ok = Tuple;
    type Error = RowError;

    type SerializeSeq = Impossible<Tuple, RowError>;
    type SerializeTuple = RowFields;
    type SerializeTupleStruct = RowFields;
    type SerializeTupleVariant = Impossible<Tuple, RowError>;
    type SerializeMap = Impossible<Tuple, RowError>;
    type SerializeStruct = RowFields;
    type SerializeStructVariant = Impossible<Tuple, RowError>;

    single_column! {
        serialize_bool: bool,
        serialize_i8: i8,
        serialize_i16: i16,
        serialize_i32: i32,
        serialize_i64: i64,
        serialize_u8: u8,
        serialize_u16: u16,
        serialize_u32: u32,
        serialize_u64: u64,
        serialize_f32: f32,
        serialize_f64: f64,
        serialize_char: char,
        serialize_str: &str,
        serialize_bytes: &[u8],
    }

    fn serialize_none(self) -> Result<Tuple, RowError> {
        Ok(vec![FieldSerializer.serialize_none()?])
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Tuple, RowError> {
        Ok(vec![FieldSerializer.serialize_some(value)?])
    }

    fn serialize_unit(self) -> Result<Tuple, RowError> {
        Ok(vec![Value::Unit])
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<Tuple, RowError> {
        Ok(vec![FieldSerializer.serialize_unit_struct(name)?])
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        index: u32,
        variant: &'static str,
    ) -> Result<Tuple, RowError> {
        Ok(vec![FieldSerializer.serialize_unit_variant(name, index, variant)?])
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Tuple, RowError> {
        // transparent: the row shape comes from the payload
        value.serialize(RowSerializer)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Tuple, RowError> {
        Ok(vec![FieldSerializer.serialize_newtype_variant(name, index, variant, value)?])
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, RowError> {
        unsupported("sequence")
    }

    fn serialize_tuple(self, len: usize) -> Result<RowFields, RowError> {
        Ok(RowFields(Vec::with_capacity(len)))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<RowFields, RowError> {
        Ok(RowFields(Vec::with_capacity(len)))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, RowError> {
        unsupported("tuple enum variant")
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, RowError> {
        unsupported("map")
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<RowFields, RowError> {
        Ok(RowFields(Vec::with_capacity(len)))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, RowError> {
        unsupported("struct enum variant")
    }
}

/// Collects one `Value` per field.
struct RowFields(Vec<Value>);

impl ser::SerializeStruct for RowFields {
    type Ok = Tuple;
    type Error = RowError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), RowError> {
        self.0.push(value.serialize(FieldSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Tuple, RowError> {
        Ok(self.0)
    }
}

impl ser::SerializeTuple for RowFields {
    type Ok = Tuple;
    type Error = RowError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), RowError> {
        self.0.push(value.serialize(FieldSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Tuple, RowError> {
        Ok(self.0)
    }
}

impl ser::SerializeTupleStruct for RowFields {
    type Ok = Tuple;
    type Error = RowError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), RowError> {
        self.0.push(value.serialize(FieldSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Tuple, RowError> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Edge {
        src: i32,
        dst: i32,
    }

    #[derive(Serialize)]
    enum Sign {
        Neg,
        #[allow(dead_code)]
        Pos,
    }

    #[test]
    fn test_struct_row() {
        let row = to_row(&Edge { src: 1, dst: 2 }).unwrap();
        assert_eq!(row, vec![Value::I32(1), Value::I32(2)]);
    }

    #[test]
    fn test_tuple_row() {
        let row = to_row(&(7i64, "node", true)).unwrap();
        assert_eq!(
            row,
            vec![Value::I64(7), Value::str("node"), Value::Bool(true)]
        );
    }

    #[test]
    fn test_scalar_is_single_column() {
        assert_eq!(to_row(&5i32).unwrap(), vec![Value::I32(5)]);
        assert_eq!(to_row(&"x").unwrap(), vec![Value::str("x")]);
    }

    #[test]
    fn test_enum_variant_becomes_constructor() {
        let row = to_row(&("a", Sign::Neg)).unwrap();
        assert_eq!(row, vec![Value::str("a"), Value::ctor("Neg", vec![])]);
    }

    #[test]
    fn test_option_field() {
        let row = to_row(&(1i32, Some(2i32), None::<i32>)).unwrap();
        assert_eq!(
            row,
            vec![
                Value::I32(1),
                Value::ctor("Some", vec![Value::I32(2)]),
                Value::ctor("None", vec![]),
            ]
        );
    }

    #[test]
    fn test_float_field_rejected() {
        assert!(to_row(&(1i32, 2.5f64)).is_err());
    }

    #[test]
    fn test_nested_struct_rejected() {
        #[derive(Serialize)]
        struct Outer {
            inner: Edge,
        }
        let outer = Outer {
            inner: Edge { src: 1, dst: 2 },
        };
        assert!(to_row(&outer).is_err());
    }
}
