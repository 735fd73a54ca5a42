use std::collections::HashMap;
use std::fmt;

use shared::error::*;

// NAME_LEN is the maximum length of a full domain name, including dots.
const NAME_LEN: usize = 255;

// Maximum number of compression pointers followed while unpacking one name.
const MAX_PTR: usize = 10;

/// A fully qualified domain name in text form, always carrying the trailing
/// dot (e.g. `"alpha.local."`).
#[derive(Default, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Name {
    pub(crate) data: String,
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data)
    }
}

impl Name {
    /// Canonicalizes `data` with a trailing dot.
    pub(crate) fn new(data: &str) -> Result<Self> {
        let data = if data.ends_with('.') {
            data.to_owned()
        } else {
            format!("{data}.")
        };
        if data.len() > NAME_LEN {
            return Err(Error::ErrNameTooLong);
        }
        Ok(Name { data })
    }

    // pack appends the wire format of the Name to msg.
    //
    // Domain names are a sequence of counted strings split at the dots. They
    // end with a zero-length string. Compression can be used to reuse domain
    // suffixes.
    //
    // The compression map will be updated with new domain suffixes. If
    // compression is None, compression will not be used.
    pub(crate) fn pack(
        &self,
        mut msg: Vec<u8>,
        compression: &mut Option<HashMap<String, usize>>,
        compression_off: usize,
    ) -> Result<Vec<u8>> {
        let data = self.data.as_bytes();

        // Add a trailing dot to canonicalize name.
        if data.is_empty() || data[data.len() - 1] != b'.' {
            return Err(Error::ErrNonCanonicalName);
        }

        // Allow root domain.
        if data == b"." {
            msg.push(0);
            return Ok(msg);
        }

        // Emit sequence of counted strings, chopping at dots.
        let mut begin = 0;
        for i in 0..data.len() {
            // Check for the end of the segment.
            if data[i] == b'.' {
                // The two most significant bits have special meaning.
                // It isn't allowed for segments to be long enough to
                // need them.
                if i - begin >= 1 << 6 {
                    return Err(Error::ErrSegTooLong);
                }

                // Segments must have a non-zero length.
                if i - begin == 0 {
                    return Err(Error::ErrZeroSegLen);
                }

                msg.push((i - begin) as u8);
                msg.extend_from_slice(&data[begin..i]);

                begin = i + 1;
                continue;
            }

            // We can only compress domain suffixes starting with a new
            // segment. A pointer is two bytes with the two most significant
            // bits set to 1 to indicate that it is a pointer.
            if (i == 0 || data[i - 1] == b'.')
                && let Some(compression) = compression
            {
                let key = &self.data[i..];
                if let Some(&ptr) = compression.get(key) {
                    // Hit. Emit a pointer instead of the rest of the domain.
                    msg.push((ptr >> 8) as u8 | 0xC0);
                    msg.push(ptr as u8);
                    return Ok(msg);
                }

                // Miss. Add the suffix to the compression table if the
                // offset can be stored in the available 14 bits.
                let new_ptr = msg.len() - compression_off;
                if new_ptr <= (u16::MAX >> 2) as usize {
                    compression.insert(key.to_owned(), new_ptr);
                }
            }
        }

        msg.push(0);
        Ok(msg)
    }

    // unpack parses a domain name from msg at off, following compression
    // pointers, and returns the offset just past the name's first encoding.
    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize) -> Result<usize> {
        // curr_off is the current working offset.
        let mut curr_off = off;

        // new_off is the offset where the next record will start. Pointers
        // lead to data that belongs to other names and thus doesn't count
        // towards the usage of this name.
        let mut new_off = off;

        // ptr is the number of pointers followed.
        let mut ptr = 0;

        let mut name: Vec<u8> = Vec::with_capacity(NAME_LEN);

        loop {
            if curr_off >= msg.len() {
                return Err(Error::ErrBaseLen);
            }
            let c = msg[curr_off] as usize;
            curr_off += 1;
            match c & 0xC0 {
                0x00 => {
                    // String segment; a zero length signals the end of the name.
                    if c == 0 {
                        break;
                    }
                    let end_off = curr_off + c;
                    if end_off > msg.len() {
                        return Err(Error::ErrCalcLen);
                    }
                    name.extend_from_slice(&msg[curr_off..end_off]);
                    name.push(b'.');
                    curr_off = end_off;
                }
                0xC0 => {
                    // Pointer
                    if curr_off >= msg.len() {
                        return Err(Error::ErrInvalidPtr);
                    }
                    let c1 = msg[curr_off];
                    curr_off += 1;
                    if ptr == 0 {
                        new_off = curr_off;
                    }
                    // Don't follow too many pointers, maybe there's a loop.
                    ptr += 1;
                    if ptr > MAX_PTR {
                        return Err(Error::ErrTooManyPtr);
                    }
                    curr_off = (c ^ 0xC0) << 8 | c1 as usize;
                }
                _ => {
                    // Prefixes 0x80 and 0x40 are reserved.
                    return Err(Error::ErrReserved);
                }
            }
        }

        if name.is_empty() {
            name.push(b'.');
        }
        if name.len() > NAME_LEN {
            return Err(Error::ErrNameTooLong);
        }
        self.data = String::from_utf8(name)?;

        if ptr == 0 {
            new_off = curr_off;
        }
        Ok(new_off)
    }

    pub(crate) fn skip(msg: &[u8], off: usize) -> Result<usize> {
        // new_off is the offset where the next record will start.
        let mut new_off = off;

        loop {
            if new_off >= msg.len() {
                return Err(Error::ErrBaseLen);
            }
            let c = msg[new_off] as usize;
            new_off += 1;
            match c & 0xC0 {
                0x00 => {
                    if c == 0 {
                        // A zero length signals the end of the name.
                        break;
                    }
                    // literal string
                    new_off += c;
                    if new_off > msg.len() {
                        return Err(Error::ErrCalcLen);
                    }
                }
                0xC0 => {
                    // Pointer to somewhere else in msg.

                    // Pointers are two bytes.
                    new_off += 1;

                    // Don't follow the pointer as the data here has ended.
                    break;
                }
                _ => {
                    // Prefixes 0x80 and 0x40 are reserved.
                    return Err(Error::ErrReserved);
                }
            }
        }

        Ok(new_off)
    }
}
