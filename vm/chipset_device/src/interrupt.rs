// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Input line support.

use std::ops::RangeInclusive;

/// Implemented by devices that accept level-triggered input lines from other
/// devices, such as interrupt controllers or a DMA controller's peripheral
/// request (handshake) inputs.
///
/// Devices should not drive other devices' lines through this trait directly.
/// The emulator routes a source device's line to the target's `set_irq`.
pub trait LineInterruptTarget {
    /// Set an input line's level.
    fn set_irq(&mut self, n: u32, high: bool);

    /// Return the ranges of lines the device accepts.
    fn valid_lines(&self) -> &[RangeInclusive<u32>];
}
