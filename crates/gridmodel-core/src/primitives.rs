//! # Model Primitives
//!
//! Hardcoded bit layouts, format constants and limits for the gridmodel CORE.
//!
//! These values are compiled into the binary and are immutable at runtime.
//! Changing any of the masks invalidates every persisted delta log.

// =============================================================================
// GLOBAL IDENTIFIER LAYOUT
// =============================================================================

/// Bits 48..64 of a GID: system (partition) segment, reserved.
pub const GID_SYSTEM_SHIFT: u32 = 48;

/// Bits 32..48 of a GID: the DMS type code of the entity.
pub const GID_TYPE_SHIFT: u32 = 32;

/// Mask selecting the DMS type code after shifting.
pub const GID_TYPE_MASK: u64 = 0xFFFF;

/// Mask selecting the per-type index (low 32 bits, signed).
pub const GID_INDEX_MASK: u64 = 0xFFFF_FFFF;

// =============================================================================
// MODEL CODE LAYOUT
// =============================================================================

/// Inheritance path: one nibble per hierarchy level.
pub const MODEL_CODE_INHERITANCE_MASK: u64 = 0xFFFF_FFFF_0000_0000;

/// DMS type of the defining concrete class (0 for abstract classes).
pub const MODEL_CODE_TYPE_MASK: u64 = 0x0000_0000_FFFF_0000;

/// Per-class attribute index.
pub const MODEL_CODE_ATTRIBUTE_INDEX_MASK: u64 = 0x0000_0000_0000_FF00;

/// Attribute kind tag.
pub const MODEL_CODE_ATTRIBUTE_TYPE_MASK: u64 = 0x0000_0000_0000_00FF;

/// Bit set in the kind tag of every vector kind.
pub const VECTOR_KIND_FLAG: u8 = 0x10;

// =============================================================================
// DELTA LOG FORMAT
// =============================================================================

/// Magic bytes prefixed to every serialized delta payload.
pub const DELTA_MAGIC: &[u8; 4] = b"GDLT";

/// Current delta payload format version.
///
/// Increment this when making breaking changes to the payload encoding.
pub const DELTA_FORMAT_VERSION: u8 = 1;

/// Size of the payload header (magic + version).
pub const DELTA_HEADER_SIZE: usize = 5;

/// Size of the leading record count and of each record length prefix.
pub const LOG_WORD_SIZE: usize = 4;

/// Maximum size of one serialized delta (64 MB).
///
/// Validated before decoding so a corrupted length prefix cannot trigger
/// a huge allocation.
pub const MAX_DELTA_PAYLOAD_SIZE: usize = 64 * 1024 * 1024;

// =============================================================================
// QUERY LIMITS
// =============================================================================

/// Default number of resources returned by one cursor page.
pub const DEFAULT_ITERATOR_BATCH: usize = 100;

/// Upper bound for a single cursor page.
pub const MAX_ITERATOR_BATCH: usize = 10_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_do_not_overlap() {
        assert_eq!(
            MODEL_CODE_INHERITANCE_MASK
                & (MODEL_CODE_TYPE_MASK
                    | MODEL_CODE_ATTRIBUTE_INDEX_MASK
                    | MODEL_CODE_ATTRIBUTE_TYPE_MASK),
            0
        );
        assert_eq!((GID_TYPE_MASK << GID_TYPE_SHIFT) & GID_INDEX_MASK, 0);
    }

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(DELTA_MAGIC, b"GDLT");
        assert_eq!(DELTA_HEADER_SIZE, DELTA_MAGIC.len() + 1);
    }
}
