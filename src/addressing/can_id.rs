//! CAN identifier layouts used by the addressing formats
//!
//! Normal fixed and mixed 29bit addressing encode the addressing type, target address and
//! source address into a 29bit identifier:
//!
//! | bits  | 28..26   | 25..16               | 15..8          | 7..0           |
//! |-------|----------|----------------------|----------------|----------------|
//! | value | priority | format + target type | target address | source address |

use crate::{
    UdsError, UdsResult,
    channel::{EXTENDED_ID_MAX, STANDARD_ID_MAX},
};

use super::{AddressingType, CanAddressingFormat};

/// Priority used when an identifier is derived from target and source addresses
pub const DEFAULT_PRIORITY: u8 = 6;

const PRIORITY_BIT_OFFSET: u32 = 26;
const TARGET_ADDRESS_BIT_OFFSET: u32 = 8;
const SOURCE_ADDRESS_BIT_OFFSET: u32 = 0;
const ADDRESSING_MASK: u32 = 0x03FF_0000;

const NORMAL_FIXED_PHYSICAL: u32 = 0x00DA_0000;
const NORMAL_FIXED_FUNCTIONAL: u32 = 0x00DB_0000;
const MIXED_29BIT_PHYSICAL: u32 = 0x00CE_0000;
const MIXED_29BIT_FUNCTIONAL: u32 = 0x00CD_0000;

/// Checks a value is a valid CAN identifier of either length
pub fn validate_can_id(can_id: u32) -> UdsResult<()> {
    if can_id > EXTENDED_ID_MAX {
        Err(UdsError::InvalidValue(format!(
            "CAN ID {can_id:#X} is greater than {EXTENDED_ID_MAX:#X}"
        )))
    } else {
        Ok(())
    }
}

/// True if the identifier fits into 11 bits
pub fn is_standard_id(can_id: u32) -> bool {
    can_id <= STANDARD_ID_MAX
}

/// True if the identifier needs 29 bits. Identifiers which fit into 11 bits are sent as
/// standard frames
pub fn is_extended_id(can_id: u32) -> bool {
    can_id > STANDARD_ID_MAX && can_id <= EXTENDED_ID_MAX
}

fn addressing_offset(format: CanAddressingFormat, addressing_type: AddressingType) -> Option<u32> {
    match (format, addressing_type) {
        (CanAddressingFormat::NormalFixed, AddressingType::Physical) => Some(NORMAL_FIXED_PHYSICAL),
        (CanAddressingFormat::NormalFixed, AddressingType::Functional) => {
            Some(NORMAL_FIXED_FUNCTIONAL)
        }
        (CanAddressingFormat::Mixed29Bit, AddressingType::Physical) => Some(MIXED_29BIT_PHYSICAL),
        (CanAddressingFormat::Mixed29Bit, AddressingType::Functional) => {
            Some(MIXED_29BIT_FUNCTIONAL)
        }
        _ => None,
    }
}

/// Builds the identifier of a normal fixed or mixed 29bit format from its addressing values
pub fn encode_fixed_can_id(
    format: CanAddressingFormat,
    addressing_type: AddressingType,
    target_address: u8,
    source_address: u8,
    priority: u8,
) -> UdsResult<u32> {
    let offset = addressing_offset(format, addressing_type).ok_or_else(|| {
        UdsError::InconsistentArguments(format!(
            "{format} does not derive CAN IDs from target and source addresses"
        ))
    })?;
    if priority > 7 {
        return Err(UdsError::InvalidValue(format!(
            "CAN ID priority must be in range 0-7, got {priority}"
        )));
    }
    Ok(((priority as u32) << PRIORITY_BIT_OFFSET)
        | offset
        | ((target_address as u32) << TARGET_ADDRESS_BIT_OFFSET)
        | ((source_address as u32) << SOURCE_ADDRESS_BIT_OFFSET))
}

/// Splits the identifier of a normal fixed or mixed 29bit format into
/// (addressing type, target address, source address)
pub fn decode_fixed_can_id(
    format: CanAddressingFormat,
    can_id: u32,
) -> UdsResult<(AddressingType, u8, u8)> {
    validate_can_id(can_id)?;
    let addressing_type = [AddressingType::Physical, AddressingType::Functional]
        .into_iter()
        .find(|t| addressing_offset(format, *t) == Some(can_id & ADDRESSING_MASK))
        .ok_or_else(|| {
            UdsError::InconsistentArguments(format!(
                "CAN ID {can_id:#X} is not a valid {format} identifier"
            ))
        })?;
    if !is_extended_id(can_id) {
        return Err(UdsError::InconsistentArguments(format!(
            "{format} requires a 29bit CAN ID, got {can_id:#X}"
        )));
    }
    let target_address = ((can_id >> TARGET_ADDRESS_BIT_OFFSET) & 0xFF) as u8;
    let source_address = ((can_id >> SOURCE_ADDRESS_BIT_OFFSET) & 0xFF) as u8;
    Ok((addressing_type, target_address, source_address))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_ids() {
        assert_eq!(
            encode_fixed_can_id(
                CanAddressingFormat::NormalFixed,
                AddressingType::Physical,
                0x12,
                0xF1,
                DEFAULT_PRIORITY
            )
            .unwrap(),
            0x18DA12F1
        );
        assert_eq!(
            encode_fixed_can_id(
                CanAddressingFormat::Mixed29Bit,
                AddressingType::Functional,
                0x33,
                0xF1,
                DEFAULT_PRIORITY
            )
            .unwrap(),
            0x18CD33F1
        );
        assert!(
            encode_fixed_can_id(
                CanAddressingFormat::Normal,
                AddressingType::Physical,
                0x12,
                0xF1,
                DEFAULT_PRIORITY
            )
            .is_err()
        );
    }

    #[test]
    fn decode_ignores_priority() {
        let (t, ta, sa) = decode_fixed_can_id(CanAddressingFormat::NormalFixed, 0x00DB33F1).unwrap();
        assert_eq!((t, ta, sa), (AddressingType::Functional, 0x33, 0xF1));
        let (t, ..) = decode_fixed_can_id(CanAddressingFormat::NormalFixed, 0x1CDA0102).unwrap();
        assert_eq!(t, AddressingType::Physical);
    }

    #[test]
    fn decode_rejects_foreign_ids() {
        assert!(matches!(
            decode_fixed_can_id(CanAddressingFormat::NormalFixed, 0x18CE12F1),
            Err(UdsError::InconsistentArguments(_))
        ));
        assert!(matches!(
            decode_fixed_can_id(CanAddressingFormat::Mixed29Bit, 0x7E0),
            Err(UdsError::InconsistentArguments(_))
        ));
        assert!(matches!(
            decode_fixed_can_id(CanAddressingFormat::Mixed29Bit, 0x2000_0000),
            Err(UdsError::InvalidValue(_))
        ));
    }
}
