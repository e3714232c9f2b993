// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Device poll services.
//!
//! A device that has deferred work (for example, a DMA engine that should run
//! shortly after the guest enables a channel) registers to be polled. The
//! device stores the waker from the most recent poll, and wakes it whenever
//! new work becomes runnable. The emulator then calls back into
//! [`PollDevice::poll_device`] on the device's own dispatch context.
//!
//! Because the poll function gets `&mut self`, it runs serially with the
//! device's MMIO handlers and needs no internal locking.

use std::task::Context;

/// Implemented by devices which register themselves to be polled whenever the
/// associated waker is called.
pub trait PollDevice {
    /// Poll the device for asynchronous work.
    ///
    /// This is called whenever the device enters the running state, and then
    /// whenever [`wake_by_ref`](std::task::Waker::wake_by_ref) is called on
    /// the waker passed in `cx.waker()`.
    fn poll_device(&mut self, cx: &mut Context<'_>);
}
