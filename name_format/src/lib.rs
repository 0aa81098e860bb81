//! # Name Format
//!
//! Bounded, truncating name formatter for fixed-capacity name buffers.
//!
//! ## Philosophy
//!
//! - **Truncation is not an error**: names are diagnostics; a clipped name
//!   is better than a failed operation
//! - **Empty names are an error**: an object with no name cannot be told
//!   apart in diagnostics, so an empty format is rejected before any byte
//!   is written
//! - **Buffers stay valid UTF-8**: truncation backs off to a character
//!   boundary

use core::fmt::{self, Write};
use thiserror::Error;

/// Errors from rendering a name
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum NameError {
    /// Format was empty or rendered to an empty name
    #[error("name format is empty")]
    EmptyFormat,

    /// A `Display` implementation in the format arguments failed
    #[error("name formatter failed")]
    Format,
}

/// `fmt::Write` sink over a fixed buffer that truncates instead of failing.
struct BoundedWriter<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl Write for BoundedWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let remaining = self.buf.len() - self.len;
        if remaining == 0 {
            return Ok(());
        }
        let take = if s.len() <= remaining {
            s.len()
        } else {
            let mut end = remaining;
            while !s.is_char_boundary(end) {
                end -= 1;
            }
            end
        };
        self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        Ok(())
    }
}

/// Renders `args` into `buf`, truncating to the buffer's capacity.
///
/// Returns the number of bytes written. The written prefix of `buf` is
/// always valid UTF-8. An empty format is rejected before any write; a
/// format that renders to zero bytes is rejected after.
pub fn format_name(buf: &mut [u8], args: fmt::Arguments<'_>) -> Result<usize, NameError> {
    if args.as_str().is_some_and(str::is_empty) {
        return Err(NameError::EmptyFormat);
    }
    let mut writer = BoundedWriter { buf, len: 0 };
    fmt::write(&mut writer, args).map_err(|_| NameError::Format)?;
    if writer.len == 0 {
        return Err(NameError::EmptyFormat);
    }
    Ok(writer.len)
}
