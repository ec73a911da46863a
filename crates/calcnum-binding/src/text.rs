//! Moving text and small scalars across the linear-memory boundary.

use crate::binding::{Binding, Ptr};
use crate::error::{BindingError, BindingResult};

/// Copy `text` into freshly allocated linear memory with a NUL terminator.
///
/// The caller owns the returned buffer and must free it.
pub fn write_cstr(binding: &mut dyn Binding, text: &str) -> BindingResult<Ptr> {
    let bytes = text.as_bytes();
    let ptr = binding.malloc(bytes.len() + 1)?;
    let start = ptr as usize;
    let mem = binding.mem_mut();
    mem[start..start + bytes.len()].copy_from_slice(bytes);
    mem[start + bytes.len()] = 0;
    Ok(ptr)
}

/// Decode the NUL-terminated UTF-8 string starting at `ptr`.
pub fn read_cstr(binding: &dyn Binding, ptr: Ptr) -> BindingResult<String> {
    let mem = binding.mem();
    let start = ptr as usize;
    let tail = mem
        .get(start..)
        .ok_or(BindingError::UnterminatedString { ptr })?;
    let len = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or(BindingError::UnterminatedString { ptr })?;
    std::str::from_utf8(&tail[..len])
        .map(ToOwned::to_owned)
        .map_err(|_| BindingError::InvalidUtf8 { ptr })
}

/// Read a little-endian `i32` at `ptr`.
pub fn read_i32(binding: &dyn Binding, ptr: Ptr) -> BindingResult<i32> {
    let start = ptr as usize;
    let bytes = binding
        .mem()
        .get(start..start + 4)
        .ok_or(BindingError::OutOfBounds { ptr, len: 4 })?;
    Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
