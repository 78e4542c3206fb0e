//! The hardware module contains [CanBus](crate::channel::CanBus) implementations
//! for bench setups and real adapters

pub mod simulation;

#[cfg(all(target_os = "linux", feature = "socketcan"))]
pub mod socketcan;
