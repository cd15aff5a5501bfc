// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use derive_more::Display;

/// Identifies one transfer buffer of one endpoint within a [`Context`][crate::Context].
///
/// The key travels through the kernel as the opaque user data of each operation and comes back
/// in the matching completion record. It is the only link from a completion to the buffer that
/// produced it.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("ep{endpoint}/buf{buffer}")]
pub struct SlotKey {
    endpoint: u32,
    buffer: u32,
}

impl SlotKey {
    pub(crate) const fn new(endpoint: u32, buffer: u32) -> Self {
        Self { endpoint, buffer }
    }

    /// Index of the endpoint that owns the buffer.
    #[must_use]
    pub const fn endpoint(self) -> usize {
        self.endpoint as usize
    }

    /// Index of the buffer within its endpoint.
    #[must_use]
    pub const fn buffer(self) -> usize {
        self.buffer as usize
    }

    pub(crate) const fn to_user_data(self) -> u64 {
        ((self.endpoint as u64) << 32) | self.buffer as u64
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "each half is masked or shifted down to 32 bits first"
    )]
    pub(crate) const fn from_user_data(data: u64) -> Self {
        Self {
            endpoint: (data >> 32) as u32,
            buffer: (data & 0xFFFF_FFFF) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_data_keeps_both_indexes() {
        let key = SlotKey::new(3, 17);

        assert_eq!(key.to_user_data(), (3 << 32) | 17);
        assert_eq!(SlotKey::from_user_data(key.to_user_data()), key);

        let key = SlotKey::new(u32::MAX, 0);
        assert_eq!(SlotKey::from_user_data(key.to_user_data()), key);
        assert_eq!(key.endpoint(), u32::MAX as usize);
        assert_eq!(key.buffer(), 0);
    }

    #[test]
    fn display() {
        assert_eq!(SlotKey::new(1, 2).to_string(), "ep1/buf2");
    }
}
