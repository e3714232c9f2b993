// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Trait definition for device state transitions.

use std::future::Future;

/// Trait for transitioning device state.
pub trait ChangeDeviceState {
    /// Starts a device, allowing it to run deferred work (for example, polled
    /// DMA processing).
    ///
    /// Callers must ensure that the device is in a stopped state before calling
    /// this method.
    ///
    /// This is a notification only. Devices should kick off whatever needs to
    /// run and return without waiting.
    fn start(&mut self);

    /// Stops a device's deferred work.
    ///
    /// After this returns, the device must not process any additional work.
    ///
    /// Callers must ensure that the device is in a started state before calling
    /// this method.
    fn stop(&mut self) -> impl Send + Future<Output = ()>;

    /// Resets the device state to its power-on state.
    ///
    /// Callers must ensure that the device is in a stopped state before calling
    /// this method.
    fn reset(&mut self) -> impl Send + Future<Output = ()>;
}
