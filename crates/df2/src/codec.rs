//! Payload encoding shared by the sender and the receiver.
//!
//! A payload is written without its kind byte; the kind travels in the
//! command (`Value`) or is already known from the handle table
//! (`EditValueByHandle`). Arrays carry their element kind and a varuint
//! count followed by untagged elements. Lists tag every element and end
//! with a lone `ListTerminator` byte.

use std::io::Read;

use df2_buffers::{Reader, Writer};

use crate::error::{FormatError, Result};
use crate::kind::Kind;
use crate::value::{Array, Value};

/// Upper bound for speculative preallocation when decoding arrays.
const MAX_PREALLOC: usize = 4096;

/// Deepest list nesting either side accepts. A top-level list is depth 1.
pub const MAX_LIST_DEPTH: usize = 64;

pub fn write_payload(w: &mut Writer, value: &Value) {
    match value {
        Value::Byte(v) => w.u8(*v),
        Value::SByte(v) => w.i8(*v),
        Value::Short(v) => w.vi32(*v as i32),
        Value::UShort(v) => w.vu32(*v as u32),
        Value::Int(v) => w.vi32(*v),
        Value::UInt(v) => w.vu32(*v),
        Value::Long(v) => w.vi64(*v),
        Value::ULong(v) => w.vu64(*v),
        Value::Float(v) => w.f32(*v),
        Value::Double(v) => w.f64(*v),
        Value::String(v) => w.str0(v),
        Value::Array(array) => write_array(w, array),
        Value::List(items) => {
            for item in items {
                w.u8(item.kind().as_u8());
                write_payload(w, item);
            }
            w.u8(Kind::ListTerminator.as_u8());
        }
    }
}

fn write_array(w: &mut Writer, array: &Array) {
    w.u8(array.element_kind().as_u8());
    // Counts above u32::MAX are rejected before a value reaches the sender.
    w.vu32(array.len() as u32);
    match array {
        Array::Byte(v) => w.buf(v),
        Array::SByte(v) => v.iter().for_each(|x| w.i8(*x)),
        Array::Short(v) => v.iter().for_each(|x| w.vi32(*x as i32)),
        Array::UShort(v) => v.iter().for_each(|x| w.vu32(*x as u32)),
        Array::Int(v) => v.iter().for_each(|x| w.vi32(*x)),
        Array::UInt(v) => v.iter().for_each(|x| w.vu32(*x)),
        Array::Long(v) => v.iter().for_each(|x| w.vi64(*x)),
        Array::ULong(v) => v.iter().for_each(|x| w.vu64(*x)),
        Array::Float(v) => v.iter().for_each(|x| w.f32(*x)),
        Array::Double(v) => v.iter().for_each(|x| w.f64(*x)),
        Array::String(v) => v.iter().for_each(|x| w.str0(x)),
    }
}

/// Decodes one payload of the given kind.
pub fn read_payload<R: Read>(r: &mut Reader<R>, kind: Kind) -> Result<Value> {
    read_value(r, kind, 0)
}

/// `depth` counts the lists enclosing this payload.
fn read_value<R: Read>(r: &mut Reader<R>, kind: Kind, depth: usize) -> Result<Value> {
    Ok(match kind {
        Kind::Byte => Value::Byte(r.u8()?),
        Kind::SByte => Value::SByte(r.i8()?),
        Kind::Short => Value::Short(read_short(r)?),
        Kind::UShort => Value::UShort(read_ushort(r)?),
        Kind::Int => Value::Int(r.vi32()?),
        Kind::UInt => Value::UInt(r.vu32()?),
        Kind::Long => Value::Long(r.vi64()?),
        Kind::ULong => Value::ULong(r.vu64()?),
        Kind::Float => Value::Float(r.f32()?),
        Kind::Double => Value::Double(r.f64()?),
        Kind::String => Value::String(r.str0()?),
        Kind::Array => Value::Array(read_array(r)?),
        Kind::List => Value::List(read_list(r, depth + 1)?),
        Kind::Null | Kind::Group | Kind::ListTerminator => {
            return Err(FormatError::UnexpectedKind(kind).into())
        }
    })
}

fn read_short<R: Read>(r: &mut Reader<R>) -> Result<i16> {
    i16::try_from(r.vi32()?).map_err(|_| FormatError::IntegerOutOfRange(Kind::Short).into())
}

fn read_ushort<R: Read>(r: &mut Reader<R>) -> Result<u16> {
    u16::try_from(r.vu32()?).map_err(|_| FormatError::IntegerOutOfRange(Kind::UShort).into())
}

fn read_n<R: Read, T>(
    r: &mut Reader<R>,
    count: usize,
    mut read: impl FnMut(&mut Reader<R>) -> Result<T>,
) -> Result<Vec<T>> {
    let mut out = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        out.push(read(r)?);
    }
    Ok(out)
}

fn read_array<R: Read>(r: &mut Reader<R>) -> Result<Array> {
    let element = Kind::try_from(r.u8()?)?;
    if !element.is_scalar() {
        return Err(FormatError::InvalidElementKind(element).into());
    }
    let count = r.vu32()? as usize;
    Ok(match element {
        Kind::Byte => Array::Byte(read_n(r, count, |r| Ok(r.u8()?))?),
        Kind::SByte => Array::SByte(read_n(r, count, |r| Ok(r.i8()?))?),
        Kind::Short => Array::Short(read_n(r, count, read_short)?),
        Kind::UShort => Array::UShort(read_n(r, count, read_ushort)?),
        Kind::Int => Array::Int(read_n(r, count, |r| Ok(r.vi32()?))?),
        Kind::UInt => Array::UInt(read_n(r, count, |r| Ok(r.vu32()?))?),
        Kind::Long => Array::Long(read_n(r, count, |r| Ok(r.vi64()?))?),
        Kind::ULong => Array::ULong(read_n(r, count, |r| Ok(r.vu64()?))?),
        Kind::Float => Array::Float(read_n(r, count, |r| Ok(r.f32()?))?),
        Kind::Double => Array::Double(read_n(r, count, |r| Ok(r.f64()?))?),
        Kind::String => Array::String(read_n(r, count, |r| Ok(r.str0()?))?),
        other => return Err(FormatError::InvalidElementKind(other).into()),
    })
}

fn read_list<R: Read>(r: &mut Reader<R>, depth: usize) -> Result<Vec<Value>> {
    if depth > MAX_LIST_DEPTH {
        return Err(FormatError::ListTooDeep { max: MAX_LIST_DEPTH }.into());
    }
    let mut items = Vec::new();
    loop {
        let kind = Kind::try_from(r.u8()?)?;
        match kind {
            Kind::ListTerminator => return Ok(items),
            Kind::Null | Kind::Group | Kind::Array => {
                return Err(FormatError::InvalidListElement(kind).into())
            }
            _ => items.push(read_value(r, kind, depth)?),
        }
    }
}
