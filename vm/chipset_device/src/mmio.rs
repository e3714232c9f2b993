// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! MMIO intercepts

use crate::ChipsetDevice;
use crate::io::IoResult;
use std::ops::RangeInclusive;

/// Implemented by devices which use MMIO intercepts.
///
/// Bus-master accesses the device itself makes (e.g: a DMA engine moving
/// data) do not go through this trait. Those go through the device's own
/// handles to the relevant address spaces.
pub trait MmioIntercept: ChipsetDevice {
    /// Dispatch an MMIO read to the device with the given address.
    fn mmio_read(&mut self, addr: u64, data: &mut [u8]) -> IoResult;
    /// Dispatch an MMIO write to the device with the given address.
    fn mmio_write(&mut self, addr: u64, data: &[u8]) -> IoResult;

    /// Report a set of static mmio regions (region_name, gpa_range) that
    /// cannot be remapped at runtime and are always registered.
    ///
    /// SoC peripherals sit at fixed, board-defined addresses, so this is the
    /// usual way for them to claim their register window.
    fn get_static_regions(&mut self) -> &[(&str, RangeInclusive<u64>)] {
        &[]
    }
}
