// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Raw/mask/status bookkeeping for the five interrupt classes.

use crate::spec::ByteEnableWrite;
use crate::spec::InterruptClass;

const CHANNEL_BITS: u32 = 0xff;

#[derive(Debug, Default, Clone)]
pub(crate) struct InterruptState {
    raw: [u32; 5],
    mask: [u32; 5],
}

impl InterruptState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, class: InterruptClass) -> u32 {
        self.raw[class.index()]
    }

    pub fn mask(&self, class: InterruptClass) -> u32 {
        self.mask[class.index()]
    }

    pub fn status(&self, class: InterruptClass) -> u32 {
        self.raw(class) & self.mask(class)
    }

    pub fn raise(&mut self, class: InterruptClass, channel: usize) {
        self.raw[class.index()] |= 1 << channel;
    }

    /// Clears the raw bits set in the low byte of `value`.
    pub fn clear(&mut self, class: InterruptClass, value: u32) {
        self.raw[class.index()] &= !(value & CHANNEL_BITS);
    }

    pub fn write_mask(&mut self, class: InterruptClass, value: u32) {
        let mask = &mut self.mask[class.index()];
        *mask = ByteEnableWrite::from(value).apply(*mask);
    }

    /// The `StatusInt` value: one bit per class with any unmasked raw bit.
    pub fn combined(&self) -> u32 {
        InterruptClass::ALL
            .iter()
            .filter(|&&class| self.status(class) != 0)
            .fold(0, |acc, class| acc | 1 << class.index())
    }

    pub fn pending(&self) -> bool {
        self.combined() != 0
    }
}
