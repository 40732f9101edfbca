//! Byte layouts of component payloads.
//!
//! The core never interprets component bytes. A [`Layout`] is the whole
//! contract between the storage layer and whoever owns the native type.

use std::fmt;

use crate::error::{Error, ErrorKind, Result};

/// Largest alignment a column can honor.
///
/// Columns are backed by `u128` words, so this is the platform alignment of
/// `u128` (16 on mainstream 64-bit targets).
pub const MAX_ALIGN: usize = std::mem::align_of::<u128>();

/// Size and alignment of one component value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Layout {
    size: usize,
    align: usize,
}

impl Layout {
    /// Layout of a tag: no bytes.
    pub const TAG: Layout = Layout { size: 0, align: 1 };

    /// Creates a validated layout.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLayout` if `align` is not a power of two, exceeds
    /// [`MAX_ALIGN`], or does not divide `size`.
    pub fn new(size: usize, align: usize) -> Result<Self> {
        if !align.is_power_of_two() || align > MAX_ALIGN || size % align != 0 {
            return Err(Error::new(ErrorKind::InvalidLayout { size, align }));
        }
        Ok(Self { size, align })
    }

    /// Byte size of one value.
    #[must_use]
    pub const fn size(self) -> usize {
        self.size
    }

    /// Required alignment of one value.
    #[must_use]
    pub const fn align(self) -> usize {
        self.align
    }

    /// Returns true if values of this layout carry no bytes.
    #[must_use]
    pub const fn is_tag(self) -> bool {
        self.size == 0
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "size {} align {}", self.size, self.align)
    }
}
