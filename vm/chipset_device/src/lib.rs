// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Types and traits to model memory-mapped SoC peripherals, and the services
//! the surrounding emulator offers them.

#![forbid(unsafe_code)]

/// Implemented by any device that sits on one of the emulated system busses.
//
// DEVNOTE: keep this trait free of bounds like `Debug` or save/restore. Test
// devices and wrappers should be able to implement it with nothing more than
// the capability hooks below.
pub trait ChipsetDevice: 'static + Send {
    /// Optionally returns a trait object to send MMIO intercepts to.
    #[inline(always)]
    fn supports_mmio(&mut self) -> Option<&mut dyn mmio::MmioIntercept> {
        None
    }

    /// Optionally returns a trait object to send poll requests to.
    #[inline(always)]
    fn supports_poll_device(&mut self) -> Option<&mut dyn poll_device::PollDevice> {
        None
    }

    /// Optionally returns a trait object to send input line changes to.
    #[inline(always)]
    fn supports_line_interrupt_target(
        &mut self,
    ) -> Option<&mut dyn interrupt::LineInterruptTarget> {
        None
    }
}

pub mod interrupt;
pub mod io;
pub mod mmio;
pub mod poll_device;
