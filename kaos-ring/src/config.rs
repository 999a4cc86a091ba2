//! Ring geometry and behavior.

use crate::backoff::BackoffKind;
use crate::error::{RingError, Result};

/// Smallest ring: two slots, one of which is always kept empty.
pub const MIN_SLOTS: usize = 2;

/// Largest ring. Any power of two up to 2^31 divides 2^32, so masking the
/// wrapping 32-bit counters stays consistent across counter overflow.
pub const MAX_SLOTS: usize = 1 << 31;

/// Configuration for a ring over fixed-stride elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingConfig {
    /// Byte stride of every element
    pub elem_size: usize,
    /// Total slot count (power of 2). `None` derives it from the storage length.
    pub slots: Option<usize>,
    /// Initial value of all four head/tail counters
    pub start_index: u32,
    /// Spin policy for CAS retries and the publish wait
    pub backoff: BackoffKind,
}

impl RingConfig {
    /// Create a configuration for elements of `elem_size` bytes
    pub fn new(elem_size: usize) -> Result<Self> {
        if elem_size == 0 {
            return Err(RingError::config("Element size must be greater than 0"));
        }
        Ok(Self {
            elem_size,
            slots: None,
            start_index: 0,
            backoff: BackoffKind::default(),
        })
    }

    /// Pin the total slot count
    pub fn with_slots(mut self, slots: usize) -> Result<Self> {
        check_slots(slots, self.elem_size)?;
        self.slots = Some(slots);
        Ok(self)
    }

    /// Check the whole configuration, including one built by struct literal.
    pub fn validate(&self) -> Result<()> {
        if self.elem_size == 0 {
            return Err(RingError::config("Element size must be greater than 0"));
        }
        match self.slots {
            Some(slots) => check_slots(slots, self.elem_size),
            None => Ok(()),
        }
    }

    /// Start all counters at `index` instead of 0
    pub fn with_start_index(mut self, index: u32) -> Self {
        self.start_index = index;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffKind) -> Self {
        self.backoff = backoff;
        self
    }

    /// Bytes needed for the configured slot count, if pinned.
    pub fn required_bytes(&self) -> Option<usize> {
        self.slots.map(|s| s * self.elem_size)
    }

    /// Resolve the slot count for a storage block of `storage_len` bytes.
    ///
    /// A pinned slot count must fit. Otherwise the largest power of two that
    /// fits is taken (capped at `MAX_SLOTS`); trailing bytes stay unused.
    pub fn for_storage(&self, storage_len: usize) -> Result<usize> {
        self.validate()?;
        if let Some(slots) = self.slots {
            let required = slots * self.elem_size;
            if storage_len < required {
                return Err(RingError::BufferTooSmall {
                    required,
                    actual: storage_len,
                });
            }
            return Ok(slots);
        }

        let fit = storage_len / self.elem_size;
        if fit < MIN_SLOTS {
            return Err(RingError::BufferTooSmall {
                required: MIN_SLOTS * self.elem_size,
                actual: storage_len,
            });
        }
        let slots = prev_power_of_two(fit).min(MAX_SLOTS);
        if slots != fit {
            trace_debug!(
                storage_len,
                fit,
                slots,
                "storage budget rounded down to a power-of-2 slot count"
            );
        }
        Ok(slots)
    }
}

fn check_slots(slots: usize, elem_size: usize) -> Result<()> {
    if !slots.is_power_of_two() {
        return Err(RingError::config("Slot count must be power of 2"));
    }
    if slots < MIN_SLOTS {
        return Err(RingError::config("Slot count must be at least 2"));
    }
    if slots > MAX_SLOTS {
        return Err(RingError::config("Slot count cannot exceed 2^31"));
    }
    if slots.checked_mul(elem_size).is_none() {
        return Err(RingError::config("Slot count * element size overflows"));
    }
    Ok(())
}

fn prev_power_of_two(n: usize) -> usize {
    debug_assert!(n > 0);
    1usize << (usize::BITS - 1 - n.leading_zeros())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = RingConfig::new(4).unwrap();
        assert_eq!(config.elem_size, 4);
        assert_eq!(config.slots, None);
        assert_eq!(config.start_index, 0);
        assert_eq!(config.backoff, BackoffKind::Spin);
    }

    #[test]
    fn test_zero_element_size_rejected() {
        assert!(matches!(
            RingConfig::new(0),
            Err(RingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_invalid_slot_counts() {
        let config = RingConfig::new(4).unwrap();
        assert!(config.clone().with_slots(0).is_err());
        assert!(config.clone().with_slots(1).is_err());
        assert!(config.clone().with_slots(1023).is_err()); // Not power of 2
        assert!(config.with_slots(1024).is_ok());
    }

    #[test]
    fn test_validate_catches_literal_configs() {
        let base = RingConfig::new(4).unwrap();
        assert!(base.validate().is_ok());

        for slots in [0, 1, 6, 1023] {
            let config = RingConfig {
                slots: Some(slots),
                ..base.clone()
            };
            assert!(matches!(
                config.validate(),
                Err(RingError::InvalidConfig(_))
            ));
        }

        let zero = RingConfig {
            elem_size: 0,
            ..base.clone()
        };
        assert!(matches!(zero.validate(), Err(RingError::InvalidConfig(_))));
        // no division by the zero stride
        assert!(matches!(
            zero.for_storage(64),
            Err(RingError::InvalidConfig(_))
        ));

        let overflow = RingConfig {
            elem_size: usize::MAX,
            slots: Some(4),
            ..base
        };
        assert!(overflow.validate().is_err());
    }

    #[test]
    fn test_builder() {
        let config = RingConfig::new(16)
            .unwrap()
            .with_slots(64)
            .unwrap()
            .with_start_index(u32::MAX - 3)
            .with_backoff(BackoffKind::Exponential);

        assert_eq!(config.slots, Some(64));
        assert_eq!(config.required_bytes(), Some(1024));
        assert_eq!(config.start_index, u32::MAX - 3);
        assert_eq!(config.backoff, BackoffKind::Exponential);
    }

    #[test]
    fn test_derive_rounds_down() {
        let config = RingConfig::new(4).unwrap();
        assert_eq!(config.for_storage(32).unwrap(), 8);
        assert_eq!(config.for_storage(35).unwrap(), 8); // partial element ignored
        assert_eq!(config.for_storage(60).unwrap(), 8); // 15 slots -> 8
        assert_eq!(config.for_storage(64).unwrap(), 16);
        // 1024 * 6 byte budget of 4-byte ints: 1536 fit, 1024 used
        assert_eq!(config.for_storage(1024 * 6).unwrap(), 1024);
    }

    #[test]
    fn test_derive_too_small() {
        let config = RingConfig::new(4).unwrap();
        assert_eq!(
            config.for_storage(7),
            Err(RingError::BufferTooSmall {
                required: 8,
                actual: 7
            })
        );
        assert!(config.for_storage(0).is_err());
    }

    #[test]
    fn test_pinned_slots_must_fit() {
        let config = RingConfig::new(8).unwrap().with_slots(16).unwrap();
        assert_eq!(config.for_storage(128).unwrap(), 16);
        assert_eq!(config.for_storage(4096).unwrap(), 16);
        assert_eq!(
            config.for_storage(127),
            Err(RingError::BufferTooSmall {
                required: 128,
                actual: 127
            })
        );
    }

    #[test]
    fn test_prev_power_of_two() {
        assert_eq!(prev_power_of_two(1), 1);
        assert_eq!(prev_power_of_two(2), 2);
        assert_eq!(prev_power_of_two(3), 2);
        assert_eq!(prev_power_of_two(1536), 1024);
        assert_eq!(prev_power_of_two(4096), 4096);
    }
}
