//! Module for CAN addressing information
//!
//! ISO 15765-2 defines 5 ways of addressing a node on a CAN network. Depending on the format,
//! the addressing values are carried in the CAN identifier, in the first data byte of every
//! frame, or both.
//!
//! | Format         | CAN ID          | First data byte   |
//! |----------------|-----------------|-------------------|
//! | Normal         | any 11bit       | -                 |
//! | Normal fixed   | 29bit, TA + SA  | -                 |
//! | Extended       | any 11 or 29bit | target address    |
//! | Mixed 11bit    | any 11bit       | address extension |
//! | Mixed 29bit    | 29bit, TA + SA  | address extension |

use strum_macros::{Display, EnumIter};

use crate::{UdsError, UdsResult, channel::CanFrame};

pub mod can_id;

pub use can_id::{
    DEFAULT_PRIORITY, decode_fixed_can_id, encode_fixed_can_id, is_extended_id, is_standard_id,
    validate_can_id,
};

/// Addressing type of a transmission
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AddressingType {
    /// 1 to 1 communication
    Physical,
    /// 1 to many communication
    Functional,
}

/// CAN addressing format
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CanAddressingFormat {
    /// 11bit CAN ID only
    #[strum(serialize = "Normal addressing")]
    Normal,
    /// 29bit CAN ID containing target and source address
    #[strum(serialize = "Normal fixed addressing")]
    NormalFixed,
    /// Any CAN ID, first data byte is the target address
    #[strum(serialize = "Extended addressing")]
    Extended,
    /// 11bit CAN ID, first data byte is the address extension
    #[strum(serialize = "Mixed 11bit addressing")]
    Mixed11Bit,
    /// 29bit CAN ID containing target and source address, first data byte is the
    /// address extension
    #[strum(serialize = "Mixed 29bit addressing")]
    Mixed29Bit,
}

/// Addressing values of a single node/direction. Which values must be present depends
/// on the [CanAddressingFormat].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AddressingParams {
    /// CAN identifier
    pub can_id: Option<u32>,
    /// Target address
    pub target_address: Option<u8>,
    /// Source address
    pub source_address: Option<u8>,
    /// Address extension
    pub address_extension: Option<u8>,
}

impl AddressingParams {
    /// Params with only a CAN identifier
    pub fn from_can_id(can_id: u32) -> Self {
        Self {
            can_id: Some(can_id),
            ..Default::default()
        }
    }

    /// Params with only a target and source address
    pub fn from_addresses(target_address: u8, source_address: u8) -> Self {
        Self {
            target_address: Some(target_address),
            source_address: Some(source_address),
            ..Default::default()
        }
    }

    /// Sets the CAN identifier
    pub fn with_can_id(mut self, can_id: u32) -> Self {
        self.can_id = Some(can_id);
        self
    }

    /// Sets the target address
    pub fn with_target_address(mut self, target_address: u8) -> Self {
        self.target_address = Some(target_address);
        self
    }

    /// Sets the source address
    pub fn with_source_address(mut self, source_address: u8) -> Self {
        self.source_address = Some(source_address);
        self
    }

    /// Sets the address extension
    pub fn with_address_extension(mut self, address_extension: u8) -> Self {
        self.address_extension = Some(address_extension);
        self
    }
}

fn require<T>(value: Option<T>, name: &str, format: CanAddressingFormat) -> UdsResult<T> {
    value.ok_or_else(|| UdsError::InconsistentArguments(format!("{format} requires {name}")))
}

fn forbid<T>(value: Option<T>, name: &str, format: CanAddressingFormat) -> UdsResult<()> {
    match value {
        Some(_) => Err(UdsError::InconsistentArguments(format!(
            "{format} does not use {name}"
        ))),
        None => Ok(()),
    }
}

impl CanAddressingFormat {
    /// Number of leading data bytes which carry addressing information
    pub const fn ai_data_bytes_number(self) -> usize {
        match self {
            CanAddressingFormat::Normal | CanAddressingFormat::NormalFixed => 0,
            CanAddressingFormat::Extended
            | CanAddressingFormat::Mixed11Bit
            | CanAddressingFormat::Mixed29Bit => 1,
        }
    }

    /// Validates addressing values for a transmission of the given addressing type and fills
    /// in the values which can be derived (CAN ID from target/source address, or the other
    /// way round).
    pub fn encode(
        self,
        addressing_type: AddressingType,
        params: AddressingParams,
    ) -> UdsResult<PacketAddressing> {
        if let Some(can_id) = params.can_id {
            validate_can_id(can_id)?;
        }
        let (can_id, target_address, source_address, address_extension) = match self {
            CanAddressingFormat::Normal => {
                let can_id = require(params.can_id, "CAN ID", self)?;
                forbid(params.target_address, "target address", self)?;
                forbid(params.source_address, "source address", self)?;
                forbid(params.address_extension, "address extension", self)?;
                if !is_standard_id(can_id) {
                    return Err(UdsError::InconsistentArguments(format!(
                        "{self} requires an 11bit CAN ID, got {can_id:#X}"
                    )));
                }
                (can_id, None, None, None)
            }
            CanAddressingFormat::NormalFixed | CanAddressingFormat::Mixed29Bit => {
                let address_extension = if self == CanAddressingFormat::Mixed29Bit {
                    Some(require(params.address_extension, "address extension", self)?)
                } else {
                    forbid(params.address_extension, "address extension", self)?;
                    None
                };
                let (can_id, ta, sa) = self.encode_fixed(addressing_type, params)?;
                (can_id, Some(ta), Some(sa), address_extension)
            }
            CanAddressingFormat::Extended => {
                let can_id = require(params.can_id, "CAN ID", self)?;
                let ta = require(params.target_address, "target address", self)?;
                forbid(params.source_address, "source address", self)?;
                forbid(params.address_extension, "address extension", self)?;
                (can_id, Some(ta), None, None)
            }
            CanAddressingFormat::Mixed11Bit => {
                let can_id = require(params.can_id, "CAN ID", self)?;
                let ae = require(params.address_extension, "address extension", self)?;
                forbid(params.target_address, "target address", self)?;
                forbid(params.source_address, "source address", self)?;
                if !is_standard_id(can_id) {
                    return Err(UdsError::InconsistentArguments(format!(
                        "{self} requires an 11bit CAN ID, got {can_id:#X}"
                    )));
                }
                (can_id, None, None, Some(ae))
            }
        };
        Ok(PacketAddressing {
            format: self,
            addressing_type,
            can_id,
            target_address,
            source_address,
            address_extension,
        })
    }

    fn encode_fixed(
        self,
        addressing_type: AddressingType,
        params: AddressingParams,
    ) -> UdsResult<(u32, u8, u8)> {
        match params.can_id {
            Some(can_id) => {
                let (decoded_type, ta, sa) = decode_fixed_can_id(self, can_id)?;
                if decoded_type != addressing_type {
                    return Err(UdsError::InconsistentArguments(format!(
                        "CAN ID {can_id:#X} is a {decoded_type} identifier, {addressing_type} expected"
                    )));
                }
                if params.target_address.is_some_and(|x| x != ta)
                    || params.source_address.is_some_and(|x| x != sa)
                {
                    return Err(UdsError::InconsistentArguments(format!(
                        "target/source address do not match CAN ID {can_id:#X}"
                    )));
                }
                Ok((can_id, ta, sa))
            }
            None => {
                let ta = require(params.target_address, "CAN ID or target address", self)?;
                let sa = require(params.source_address, "CAN ID or source address", self)?;
                let can_id = encode_fixed_can_id(self, addressing_type, ta, sa, DEFAULT_PRIORITY)?;
                Ok((can_id, ta, sa))
            }
        }
    }

    /// Builds the addressing information data bytes which prefix every frame
    pub fn encode_ai_data_bytes(
        self,
        target_address: Option<u8>,
        address_extension: Option<u8>,
    ) -> UdsResult<Vec<u8>> {
        match self {
            CanAddressingFormat::Normal | CanAddressingFormat::NormalFixed => Ok(Vec::new()),
            CanAddressingFormat::Extended => {
                Ok(vec![require(target_address, "target address", self)?])
            }
            CanAddressingFormat::Mixed11Bit | CanAddressingFormat::Mixed29Bit => {
                Ok(vec![require(address_extension, "address extension", self)?])
            }
        }
    }

    /// Decodes the addressing values carried by a CAN identifier and the addressing
    /// information data bytes of a frame.
    ///
    /// ## Parameters
    /// * can_id - CAN identifier of the frame
    /// * ai_data_bytes - Leading data bytes of the frame. Only the first
    ///   [CanAddressingFormat::ai_data_bytes_number] bytes are used
    pub fn decode(self, can_id: u32, ai_data_bytes: &[u8]) -> UdsResult<AddressingParams> {
        validate_can_id(can_id)?;
        let ai_len = self.ai_data_bytes_number();
        if ai_data_bytes.len() < ai_len {
            return Err(UdsError::InconsistentArguments(format!(
                "{self} requires {ai_len} addressing information byte(s)"
            )));
        }
        let mut params = AddressingParams::from_can_id(can_id);
        match self {
            CanAddressingFormat::Normal => {
                if !is_standard_id(can_id) {
                    return Err(UdsError::InconsistentArguments(format!(
                        "{can_id:#X} is not a valid {self} identifier"
                    )));
                }
            }
            CanAddressingFormat::NormalFixed => {
                let (_, ta, sa) = decode_fixed_can_id(self, can_id)?;
                params.target_address = Some(ta);
                params.source_address = Some(sa);
            }
            CanAddressingFormat::Extended => {
                params.target_address = Some(ai_data_bytes[0]);
            }
            CanAddressingFormat::Mixed11Bit => {
                if !is_standard_id(can_id) {
                    return Err(UdsError::InconsistentArguments(format!(
                        "{can_id:#X} is not a valid {self} identifier"
                    )));
                }
                params.address_extension = Some(ai_data_bytes[0]);
            }
            CanAddressingFormat::Mixed29Bit => {
                let (_, ta, sa) = decode_fixed_can_id(self, can_id)?;
                params.target_address = Some(ta);
                params.source_address = Some(sa);
                params.address_extension = Some(ai_data_bytes[0]);
            }
        }
        Ok(params)
    }

    /// Addressing type encoded in a CAN identifier. Only the fixed formats encode it,
    /// so other formats return `None`
    pub fn decode_addressing_type(self, can_id: u32) -> Option<AddressingType> {
        match self {
            CanAddressingFormat::NormalFixed | CanAddressingFormat::Mixed29Bit => {
                decode_fixed_can_id(self, can_id).ok().map(|(t, _, _)| t)
            }
            _ => None,
        }
    }
}

/// Validated addressing of one transmission direction. Created by [CanAddressingFormat::encode]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PacketAddressing {
    format: CanAddressingFormat,
    addressing_type: AddressingType,
    can_id: u32,
    target_address: Option<u8>,
    source_address: Option<u8>,
    address_extension: Option<u8>,
}

impl PacketAddressing {
    /// Addressing format
    pub fn format(&self) -> CanAddressingFormat {
        self.format
    }

    /// Addressing type
    pub fn addressing_type(&self) -> AddressingType {
        self.addressing_type
    }

    /// CAN identifier
    pub fn can_id(&self) -> u32 {
        self.can_id
    }

    /// True if the identifier has to be sent as a 29bit identifier
    pub fn is_extended_id(&self) -> bool {
        is_extended_id(self.can_id)
    }

    /// Target address, if the format uses one
    pub fn target_address(&self) -> Option<u8> {
        self.target_address
    }

    /// Source address, if the format uses one
    pub fn source_address(&self) -> Option<u8> {
        self.source_address
    }

    /// Address extension, if the format uses one
    pub fn address_extension(&self) -> Option<u8> {
        self.address_extension
    }

    /// The addressing values as params
    pub fn params(&self) -> AddressingParams {
        AddressingParams {
            can_id: Some(self.can_id),
            target_address: self.target_address,
            source_address: self.source_address,
            address_extension: self.address_extension,
        }
    }

    /// Data bytes which prefix every frame with this addressing
    pub fn ai_data_bytes(&self) -> Vec<u8> {
        // Encoding validated that the format's addressing bytes are present
        self.format
            .encode_ai_data_bytes(self.target_address, self.address_extension)
            .unwrap_or_default()
    }

    /// True if a frame with this identifier and data was sent with this addressing
    pub fn matches(&self, can_id: u32, data: &[u8]) -> bool {
        can_id == self.can_id && data.starts_with(&self.ai_data_bytes())
    }

    /// Like [PacketAddressing::matches], but the identifier length of the frame must match too
    pub fn matches_frame(&self, frame: &CanFrame) -> bool {
        frame.is_extended() == self.is_extended_id()
            && self.matches(frame.get_address(), frame.get_data())
    }

    /// Builds the addressing from values decoded out of a frame
    pub(crate) fn from_decoded(
        format: CanAddressingFormat,
        addressing_type: AddressingType,
        params: AddressingParams,
    ) -> UdsResult<Self> {
        format.encode(addressing_type, params)
    }
}

/// Addressing configuration of a node, covering both directions and both addressing types.
///
/// Build one with [AddressingInformation::builder]. The configuration of the node on the
/// other end of the link can be derived with [AddressingInformation::other_end].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AddressingInformation {
    format: CanAddressingFormat,
    rx_physical: PacketAddressing,
    tx_physical: PacketAddressing,
    rx_functional: PacketAddressing,
    tx_functional: PacketAddressing,
}

impl AddressingInformation {
    /// Starts building addressing information for the given format
    pub fn builder(format: CanAddressingFormat) -> AddressingInformationBuilder {
        AddressingInformationBuilder {
            format,
            rx_physical: None,
            tx_physical: None,
            rx_functional: None,
            tx_functional: None,
        }
    }

    /// Creates and validates addressing information
    pub fn new(
        format: CanAddressingFormat,
        rx_physical: AddressingParams,
        tx_physical: AddressingParams,
        rx_functional: AddressingParams,
        tx_functional: AddressingParams,
    ) -> UdsResult<Self> {
        let rx_physical = format.encode(AddressingType::Physical, rx_physical)?;
        let tx_physical = format.encode(AddressingType::Physical, tx_physical)?;
        let rx_functional = format.encode(AddressingType::Functional, rx_functional)?;
        let tx_functional = format.encode(AddressingType::Functional, tx_functional)?;
        if (rx_physical.can_id, rx_physical.ai_data_bytes())
            == (rx_functional.can_id, rx_functional.ai_data_bytes())
        {
            return Err(UdsError::InconsistentArguments(
                "physical and functional receive addressing cannot be told apart".into(),
            ));
        }
        for rx in [&rx_physical, &rx_functional] {
            for tx in [&tx_physical, &tx_functional] {
                if (rx.can_id, rx.ai_data_bytes()) == (tx.can_id, tx.ai_data_bytes()) {
                    return Err(UdsError::InconsistentArguments(format!(
                        "{} receive addressing equals {} transmit addressing",
                        rx.addressing_type, tx.addressing_type
                    )));
                }
            }
        }
        Ok(Self {
            format,
            rx_physical,
            tx_physical,
            rx_functional,
            tx_functional,
        })
    }

    /// Addressing format
    pub fn format(&self) -> CanAddressingFormat {
        self.format
    }

    /// Number of leading data bytes which carry addressing information
    pub fn ai_data_bytes_number(&self) -> usize {
        self.format.ai_data_bytes_number()
    }

    /// Addressing of incoming physically addressed packets
    pub fn rx_physical(&self) -> &PacketAddressing {
        &self.rx_physical
    }

    /// Addressing of outgoing physically addressed packets
    pub fn tx_physical(&self) -> &PacketAddressing {
        &self.tx_physical
    }

    /// Addressing of incoming functionally addressed packets
    pub fn rx_functional(&self) -> &PacketAddressing {
        &self.rx_functional
    }

    /// Addressing of outgoing functionally addressed packets
    pub fn tx_functional(&self) -> &PacketAddressing {
        &self.tx_functional
    }

    /// Addressing used to transmit packets of the given addressing type
    pub fn tx_addressing(&self, addressing_type: AddressingType) -> &PacketAddressing {
        match addressing_type {
            AddressingType::Physical => &self.tx_physical,
            AddressingType::Functional => &self.tx_functional,
        }
    }

    /// Addressing expected on received packets of the given addressing type
    pub fn rx_addressing(&self, addressing_type: AddressingType) -> &PacketAddressing {
        match addressing_type {
            AddressingType::Physical => &self.rx_physical,
            AddressingType::Functional => &self.rx_functional,
        }
    }

    /// Classifies a received frame. Returns `None` if the frame is not addressed to this node
    pub fn is_input_packet(&self, can_id: u32, data: &[u8]) -> Option<AddressingType> {
        if self.rx_physical.matches(can_id, data) {
            Some(AddressingType::Physical)
        } else if self.rx_functional.matches(can_id, data) {
            Some(AddressingType::Functional)
        } else {
            None
        }
    }

    /// Classifies a received bus frame, taking the identifier length into account
    pub fn is_input_frame(&self, frame: &CanFrame) -> Option<AddressingType> {
        if self.rx_physical.matches_frame(frame) {
            Some(AddressingType::Physical)
        } else if self.rx_functional.matches_frame(frame) {
            Some(AddressingType::Functional)
        } else {
            None
        }
    }

    /// Addressing information of the node this node talks to. Received and transmitted
    /// addressing swap roles.
    pub fn other_end(&self) -> Self {
        Self {
            format: self.format,
            rx_physical: self.tx_physical,
            tx_physical: self.rx_physical,
            rx_functional: self.tx_functional,
            tx_functional: self.rx_functional,
        }
    }
}

/// Builder for [AddressingInformation]
#[derive(Debug, Clone)]
pub struct AddressingInformationBuilder {
    format: CanAddressingFormat,
    rx_physical: Option<AddressingParams>,
    tx_physical: Option<AddressingParams>,
    rx_functional: Option<AddressingParams>,
    tx_functional: Option<AddressingParams>,
}

impl AddressingInformationBuilder {
    /// Addressing of incoming physically addressed packets
    pub fn rx_physical(mut self, params: AddressingParams) -> Self {
        self.rx_physical = Some(params);
        self
    }

    /// Addressing of outgoing physically addressed packets
    pub fn tx_physical(mut self, params: AddressingParams) -> Self {
        self.tx_physical = Some(params);
        self
    }

    /// Addressing of incoming functionally addressed packets
    pub fn rx_functional(mut self, params: AddressingParams) -> Self {
        self.rx_functional = Some(params);
        self
    }

    /// Addressing of outgoing functionally addressed packets
    pub fn tx_functional(mut self, params: AddressingParams) -> Self {
        self.tx_functional = Some(params);
        self
    }

    /// Validates the collected values
    pub fn build(self) -> UdsResult<AddressingInformation> {
        let missing = |name: &str| {
            UdsError::InconsistentArguments(format!("{name} addressing was not provided"))
        };
        AddressingInformation::new(
            self.format,
            self.rx_physical.ok_or_else(|| missing("rx physical"))?,
            self.tx_physical.ok_or_else(|| missing("tx physical"))?,
            self.rx_functional.ok_or_else(|| missing("rx functional"))?,
            self.tx_functional.ok_or_else(|| missing("tx functional"))?,
        )
    }
}
