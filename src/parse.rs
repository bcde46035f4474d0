use byteorder::{ByteOrder, LittleEndian};

use crate::error::QueryError;

/// Borrow `len` bytes at `offset`, or fail with [QueryError::MalformedResponse].
fn take<'a>(data: &'a [u8], offset: usize, len: usize) -> Result<&'a [u8], QueryError> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or(QueryError::MalformedResponse {
            offset,
            needed: len,
            available: data.len().saturating_sub(offset),
        })
}

/// Get the value of a null-terminated string
/// with index 0 at `offset` in an array of bytes.
///
/// Each byte is read as a single character. An unterminated string
/// runs to the end of `data`.
///
/// Mutates `offset` to the index after the null-termination byte.
pub fn get_string(data: &[u8], offset: &mut usize) -> Result<String, QueryError> {
    let rest: &[u8] = take(data, *offset, 1).map(|_| &data[*offset..])?;

    let (raw, consumed) = match rest.iter().position(|&c| c == 0) {
        Some(end) => (&rest[..end], end + 1),
        None => (rest, rest.len()),
    };
    *offset += consumed;

    Ok(raw.iter().map(|&c| char::from(c)).collect())
}

/// Get the [u8] at index `offset` from `data`.
///
/// Mutates `offset` to the index after the byte.
pub fn get_u8(data: &[u8], offset: &mut usize) -> Result<u8, QueryError> {
    let byte: u8 = take(data, *offset, 1)?[0];
    *offset += 1;
    Ok(byte)
}

/// Get 4 little-endian bytes (as an [i32]) at index `offset` from `data`.
///
/// Mutates `offset` to the index after the bytes.
pub fn get_i32(data: &[u8], offset: &mut usize) -> Result<i32, QueryError> {
    let value: i32 = LittleEndian::read_i32(take(data, *offset, 4)?);
    *offset += 4;
    Ok(value)
}

/// Get 4 little-endian bytes (as an [f32]) at index `offset` from `data`.
///
/// Mutates `offset` to the index after the bytes.
pub fn get_f32(data: &[u8], offset: &mut usize) -> Result<f32, QueryError> {
    let value: f32 = LittleEndian::read_f32(take(data, *offset, 4)?);
    *offset += 4;
    Ok(value)
}

/// Get `N` raw bytes at index `offset` from `data`.
///
/// Mutates `offset` to the index after the bytes.
pub fn get_array<const N: usize>(data: &[u8], offset: &mut usize) -> Result<[u8; N], QueryError> {
    let mut bytes: [u8; N] = [0u8; N];
    bytes.copy_from_slice(take(data, *offset, N)?);
    *offset += N;
    Ok(bytes)
}

/// Step over `len` bytes that must still be present in `data`.
pub fn skip(data: &[u8], offset: &mut usize, len: usize) -> Result<(), QueryError> {
    take(data, *offset, len)?;
    *offset += len;
    Ok(())
}
