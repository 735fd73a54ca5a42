use shared::error::*;

use super::{UINT16LEN, UINT32LEN};

// pack_uint16 appends the wire format of field to msg.
pub(super) fn pack_uint16(mut msg: Vec<u8>, field: u16) -> Vec<u8> {
    msg.extend_from_slice(&field.to_be_bytes());
    msg
}

pub(super) fn unpack_uint16(msg: &[u8], off: usize) -> Result<(u16, usize)> {
    if off + UINT16LEN > msg.len() {
        return Err(Error::ErrBaseLen);
    }
    Ok((
        u16::from_be_bytes([msg[off], msg[off + 1]]),
        off + UINT16LEN,
    ))
}

pub(super) fn skip_uint16(msg: &[u8], off: usize) -> Result<usize> {
    if off + UINT16LEN > msg.len() {
        return Err(Error::ErrBaseLen);
    }
    Ok(off + UINT16LEN)
}

// pack_uint32 appends the wire format of field to msg.
pub(super) fn pack_uint32(mut msg: Vec<u8>, field: u32) -> Vec<u8> {
    msg.extend_from_slice(&field.to_be_bytes());
    msg
}

pub(super) fn unpack_uint32(msg: &[u8], off: usize) -> Result<(u32, usize)> {
    if off + UINT32LEN > msg.len() {
        return Err(Error::ErrBaseLen);
    }
    Ok((
        u32::from_be_bytes([msg[off], msg[off + 1], msg[off + 2], msg[off + 3]]),
        off + UINT32LEN,
    ))
}

// pack_bytes appends the wire format of field to msg.
pub(super) fn pack_bytes(mut msg: Vec<u8>, field: &[u8]) -> Vec<u8> {
    msg.extend_from_slice(field);
    msg
}

pub(super) fn unpack_bytes(msg: &[u8], off: usize, length: usize) -> Result<(Vec<u8>, usize)> {
    if off + length > msg.len() {
        return Err(Error::ErrCalcLen);
    }
    Ok((msg[off..off + length].to_vec(), off + length))
}

// pack_str appends the wire format of a length-prefixed character-string
// (RFC 1035 section 3.3) to msg.
pub(super) fn pack_str(mut msg: Vec<u8>, field: &[u8]) -> Result<Vec<u8>> {
    if field.len() > u8::MAX as usize {
        return Err(Error::ErrStringTooLong);
    }
    msg.push(field.len() as u8);
    msg.extend_from_slice(field);
    Ok(msg)
}

pub(super) fn unpack_str(msg: &[u8], off: usize) -> Result<(Vec<u8>, usize)> {
    if off >= msg.len() {
        return Err(Error::ErrBaseLen);
    }
    let begin_off = off + 1;
    let end_off = begin_off + msg[off] as usize;
    if end_off > msg.len() {
        return Err(Error::ErrCalcLen);
    }
    Ok((msg[begin_off..end_off].to_vec(), end_off))
}
