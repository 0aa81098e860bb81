//! Fixed-capacity object names

use core::fmt;

use name_format::NameError;
use serde::{Serialize, Serializer};

/// Capacity of an object's name buffer, in bytes.
pub const OBJECT_NAME_CAPACITY: usize = 32;

/// A fixed-capacity, always-valid-UTF-8 object name.
///
/// Names are rendered through the bounded formatter and truncate at
/// [`OBJECT_NAME_CAPACITY`] on a character boundary. Copyable value type;
/// reading an object's name hands out a snapshot, never a reference into
/// the object.
#[derive(Clone, Copy)]
pub struct ObjectName {
    buf: [u8; OBJECT_NAME_CAPACITY],
    len: u8,
}

impl ObjectName {
    pub const fn empty() -> Self {
        Self {
            buf: [0; OBJECT_NAME_CAPACITY],
            len: 0,
        }
    }

    pub fn as_str(&self) -> &str {
        // The buffer is only ever written by the bounded formatter, which
        // truncates on character boundaries.
        core::str::from_utf8(&self.buf[..self.len as usize]).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn render(args: fmt::Arguments<'_>) -> Result<Self, NameError> {
        let mut name = Self::empty();
        let len = name_format::format_name(&mut name.buf, args)?;
        name.len = len as u8;
        Ok(name)
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectName({:?})", self.as_str())
    }
}

impl PartialEq for ObjectName {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for ObjectName {}

impl PartialEq<&str> for ObjectName {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl Serialize for ObjectName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
