// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::num::NonZeroUsize;

/// Allocates a zero-filled region from the global allocator, reporting failure instead of
/// aborting.
pub fn allocate_zeroed_region(len: NonZeroUsize) -> Option<Box<[u8]>> {
    let mut region = Vec::new();
    region.try_reserve_exact(len.get()).ok()?;
    region.resize(len.get(), 0);

    Some(region.into_boxed_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_is_zeroed_and_exact() {
        let region = allocate_zeroed_region(NonZeroUsize::new(4096).unwrap()).unwrap();

        assert_eq!(region.len(), 4096);
        assert!(region.iter().all(|b| *b == 0));
    }

    #[test]
    fn impossible_size_is_reported() {
        assert!(allocate_zeroed_region(NonZeroUsize::new(usize::MAX).unwrap()).is_none());
    }
}
