// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Emulator for the Synopsys DesignWare AHB DMA controller (DW_ahb_dmac).
//!
//! The controller has eight channels, four AHB master ports, sixteen
//! hardware handshake inputs, and a single combined interrupt output. Each
//! channel moves data one transfer unit at a time, either for a block
//! programmed directly through its registers or for a chain of linked-list
//! descriptors in guest memory.
//!
//! Peripheral flow control and software handshaking are not modeled. A
//! channel that asks for either is stopped and reports an error interrupt.

#![forbid(unsafe_code)]

mod channel;
mod engine;
mod interrupt;
pub mod spec;

use crate::channel::Channel;
use crate::interrupt::InterruptState;
use crate::spec::ByteEnableWrite;
use crate::spec::CHANNEL_REGION_END;
use crate::spec::CHANNEL_STRIDE;
use crate::spec::COMPONENT_ID_VALUE;
use crate::spec::ChannelRegister;
use crate::spec::DMA_ID_VALUE;
use crate::spec::DmaCfg;
use crate::spec::GlobalRegister;
use crate::spec::LP_TIMEOUT_VALUE;
use crate::spec::MMIO_REGION_SIZE;
use crate::spec::NUM_CHANNELS;
use crate::spec::NUM_HANDSHAKE_LINES;
use crate::spec::NUM_MASTERS;
use chipset_device::ChipsetDevice;
use chipset_device::interrupt::LineInterruptTarget;
use chipset_device::io::IoError;
use chipset_device::io::IoResult;
use chipset_device::mmio::MmioIntercept;
use chipset_device::poll_device::PollDevice;
use guestmem::GuestMemory;
use std::ops::RangeInclusive;
use std::task::Context;
use std::task::Waker;
use thiserror::Error;
use vmcore::device_state::ChangeDeviceState;
use vmcore::line_interrupt::LineInterrupt;

/// What to do with a register write to a channel that is currently enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveChannelWrites {
    /// Apply the write and log a warning. Lets drivers reprogram a live
    /// channel, at their own risk.
    #[default]
    Apply,
    /// Log a warning and drop the write.
    Reject,
}

/// How a tick shares time between enabled channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelScheduling {
    /// Run each channel, in index order, until it finishes or stalls.
    #[default]
    RunToCompletion,
    /// Move at most `units_per_turn` units per channel per turn, cycling
    /// through the channels while any of them makes progress.
    RoundRobin {
        /// Units one channel may move before yielding. Zero is treated as one.
        units_per_turn: usize,
    },
}

/// Configuration for [`DwAhbDmac`].
#[derive(Debug, Clone)]
pub struct DwAhbDmacConfig {
    /// Guest physical address of the register window.
    pub base_address: u64,
    /// Number of implemented channels, 1 through 8.
    pub channels: usize,
    /// Policy for writes to enabled channels.
    pub active_channel_writes: ActiveChannelWrites,
    /// Policy for sharing a tick between channels.
    pub scheduling: ChannelScheduling,
    /// Write `CTL_H` back to a descriptor's control word when the block it
    /// described completes.
    pub control_write_back: bool,
}

impl Default for DwAhbDmacConfig {
    fn default() -> Self {
        Self {
            base_address: 0,
            channels: NUM_CHANNELS,
            active_channel_writes: ActiveChannelWrites::default(),
            scheduling: ChannelScheduling::default(),
            control_write_back: true,
        }
    }
}

/// Error returned by [`DwAhbDmac::new`].
#[derive(Debug, Error)]
pub enum NewDmacError {
    /// AHB master port 0 carries the descriptor and default data traffic and
    /// must be connected.
    #[error("ahb master port 0 is not connected")]
    MissingMaster0,
    /// The channel count is outside 1 through 8.
    #[error("invalid channel count {0}, expected 1 through 8")]
    InvalidChannelCount(usize),
}

/// A DesignWare AHB DMA controller.
pub struct DwAhbDmac {
    // Static configuration
    config: DwAhbDmacConfig,
    static_regions: [(&'static str, RangeInclusive<u64>); 1],

    // Runtime glue
    masters: [GuestMemory; NUM_MASTERS],
    irq: LineInterrupt,
    waker: Option<Waker>,
    running: bool,

    // Volatile state
    channels: Vec<Channel>,
    interrupts: InterruptState,
    dma_enabled: bool,
    channel_enable: u8,
    handshake: [bool; NUM_HANDSHAKE_LINES],
    tick_requested: bool,
}

impl DwAhbDmac {
    /// Creates a new controller.
    ///
    /// `masters` are the address spaces behind the four AHB master ports.
    /// Port 0 is required. A disconnected port fails every access, which the
    /// channel using it reports as a bus error.
    ///
    /// The controller is created stopped. Register accesses work right away,
    /// but no transfers run from [`PollDevice::poll_device`] until
    /// [`ChangeDeviceState::start`] is called.
    pub fn new(
        config: DwAhbDmacConfig,
        masters: [Option<GuestMemory>; NUM_MASTERS],
        irq: LineInterrupt,
    ) -> Result<Self, NewDmacError> {
        if masters[0].is_none() {
            return Err(NewDmacError::MissingMaster0);
        }
        if !(1..=NUM_CHANNELS).contains(&config.channels) {
            return Err(NewDmacError::InvalidChannelCount(config.channels));
        }

        let masters = masters.map(|master| master.unwrap_or_else(GuestMemory::empty));
        let static_regions = [(
            "mmio",
            config.base_address..=config.base_address + MMIO_REGION_SIZE - 1,
        )];
        Ok(Self {
            channels: (0..config.channels).map(|_| Channel::new()).collect(),
            config,
            static_regions,
            masters,
            irq,
            waker: None,
            running: false,
            interrupts: InterruptState::new(),
            dma_enabled: false,
            channel_enable: 0,
            handshake: [false; NUM_HANDSHAKE_LINES],
            tick_requested: false,
        })
    }

    /// Drives the interrupt line from the current masked status.
    fn update_irq(&self) {
        self.irq.set_level(self.interrupts.pending());
    }

    fn request_tick(&mut self) {
        self.tick_requested = true;
        if let Some(waker) = &self.waker {
            waker.wake_by_ref();
        }
    }

    fn implemented_channels(&self) -> u8 {
        ((1u32 << self.channels.len()) - 1) as u8
    }

    fn decode(&self, address: u64, len: usize) -> Result<u64, IoError> {
        let offset = address.wrapping_sub(self.config.base_address);
        if offset >= MMIO_REGION_SIZE {
            return Err(IoError::InvalidRegister);
        }
        if len != 4 {
            return Err(IoError::InvalidAccessSize);
        }
        if offset % 4 != 0 {
            return Err(IoError::UnalignedAccess);
        }
        Ok(offset)
    }

    fn read_register(&self, offset: u64) -> u32 {
        if offset < CHANNEL_REGION_END {
            return self.read_channel_register(offset);
        }
        let Some(reg) = GlobalRegister::from_offset(offset) else {
            tracelimit::warn_ratelimited!(offset, "read of unknown register");
            return 0;
        };
        match reg {
            GlobalRegister::Raw(class) => self.interrupts.raw(class),
            GlobalRegister::Status(class) => self.interrupts.status(class),
            GlobalRegister::Mask(class) => self.interrupts.mask(class),
            GlobalRegister::Clear(class) => {
                tracelimit::warn_ratelimited!(
                    ?class,
                    "read of write-only interrupt clear register"
                );
                0
            }
            GlobalRegister::StatusInt => self.interrupts.combined(),
            GlobalRegister::SoftwareHandshake(name) => {
                tracelimit::warn_ratelimited!(name, "software handshake is not supported");
                0
            }
            GlobalRegister::DmaCfg => DmaCfg::new().with_dma_en(self.dma_enabled).into(),
            GlobalRegister::ChEn => self.channel_enable.into(),
            GlobalRegister::DmaId => DMA_ID_VALUE,
            GlobalRegister::DmaTest => 0,
            GlobalRegister::LpTimeout => LP_TIMEOUT_VALUE,
            GlobalRegister::ComponentParams(params) => params.value(self.channels.len()),
            GlobalRegister::ComponentId => COMPONENT_ID_VALUE,
        }
    }

    fn read_channel_register(&self, offset: u64) -> u32 {
        let index = (offset / CHANNEL_STRIDE) as usize;
        let Some(channel) = self.channels.get(index) else {
            tracelimit::warn_ratelimited!(channel = index, "read of unimplemented channel");
            return 0;
        };
        let Some(reg) = ChannelRegister::from_offset(offset % CHANNEL_STRIDE) else {
            tracelimit::warn_ratelimited!(
                channel = index,
                offset,
                "read of reserved channel register"
            );
            return 0;
        };
        channel.read(reg, self.channel_enabled(index))
    }

    fn write_register(&mut self, offset: u64, value: u32) {
        if offset < CHANNEL_REGION_END {
            self.write_channel_register(offset, value);
            return;
        }
        let Some(reg) = GlobalRegister::from_offset(offset) else {
            tracelimit::warn_ratelimited!(offset, value, "write to unknown register");
            return;
        };
        match reg {
            GlobalRegister::Mask(class) => {
                self.interrupts.write_mask(class, value);
                self.update_irq();
            }
            GlobalRegister::Clear(class) => {
                self.interrupts.clear(class, value);
                self.update_irq();
            }
            GlobalRegister::SoftwareHandshake(name) => {
                tracelimit::warn_ratelimited!(name, value, "software handshake is not supported");
            }
            GlobalRegister::DmaCfg => {
                self.dma_enabled = DmaCfg::from(value).dma_en();
                if !self.dma_enabled {
                    self.channel_enable = 0;
                }
            }
            GlobalRegister::ChEn => self.write_channel_enable(value),
            GlobalRegister::Raw(_)
            | GlobalRegister::Status(_)
            | GlobalRegister::StatusInt
            | GlobalRegister::DmaId
            | GlobalRegister::DmaTest
            | GlobalRegister::LpTimeout
            | GlobalRegister::ComponentParams(_)
            | GlobalRegister::ComponentId => {
                tracelimit::warn_ratelimited!(?reg, value, "write to read-only register");
            }
        }
    }

    fn write_channel_register(&mut self, offset: u64, value: u32) {
        let index = (offset / CHANNEL_STRIDE) as usize;
        if index >= self.channels.len() {
            tracelimit::warn_ratelimited!(channel = index, value, "write to unimplemented channel");
            return;
        }
        let Some(reg) = ChannelRegister::from_offset(offset % CHANNEL_STRIDE) else {
            tracelimit::warn_ratelimited!(
                channel = index,
                offset,
                value,
                "write to reserved channel register"
            );
            return;
        };
        if self.channel_enabled(index) {
            tracelimit::warn_ratelimited!(
                channel = index,
                ?reg,
                value,
                policy = ?self.config.active_channel_writes,
                "write to enabled channel"
            );
            if self.config.active_channel_writes == ActiveChannelWrites::Reject {
                return;
            }
        }
        self.channels[index].write(reg, value);
    }

    fn write_channel_enable(&mut self, value: u32) {
        if !self.dma_enabled {
            tracelimit::warn_ratelimited!(
                value,
                "channel enable write while the controller is disabled"
            );
            return;
        }
        let requested = ByteEnableWrite::from(value).apply(self.channel_enable.into()) as u8;
        let implemented = self.implemented_channels();
        if requested & !implemented != 0 {
            tracelimit::warn_ratelimited!(
                requested,
                implemented,
                "enable of unimplemented channel"
            );
        }
        // Enabling a channel resumes its current block. The unit count only
        // restarts when the block is reprogrammed or reloaded.
        let enable = requested & implemented;
        self.channel_enable = enable;
        if enable != 0 {
            self.request_tick();
        }
    }
}

impl ChangeDeviceState for DwAhbDmac {
    fn start(&mut self) {
        self.running = true;
        if self.tick_requested {
            if let Some(waker) = &self.waker {
                waker.wake_by_ref();
            }
        }
    }

    async fn stop(&mut self) {
        self.running = false;
    }

    async fn reset(&mut self) {
        let Self {
            config: _,
            static_regions: _,
            masters: _,
            irq: _,
            waker: _,
            running: _,
            channels,
            interrupts,
            dma_enabled,
            channel_enable,
            handshake,
            tick_requested,
        } = self;
        channels.fill_with(Channel::new);
        *interrupts = InterruptState::new();
        *dma_enabled = false;
        *channel_enable = 0;
        *handshake = [false; NUM_HANDSHAKE_LINES];
        *tick_requested = false;
        self.update_irq();
    }
}

impl ChipsetDevice for DwAhbDmac {
    fn supports_mmio(&mut self) -> Option<&mut dyn MmioIntercept> {
        Some(self)
    }

    fn supports_poll_device(&mut self) -> Option<&mut dyn PollDevice> {
        Some(self)
    }

    fn supports_line_interrupt_target(&mut self) -> Option<&mut dyn LineInterruptTarget> {
        Some(self)
    }
}

impl MmioIntercept for DwAhbDmac {
    fn mmio_read(&mut self, address: u64, data: &mut [u8]) -> IoResult {
        let offset = match self.decode(address, data.len()) {
            Ok(offset) => offset,
            Err(err) => return IoResult::Err(err),
        };
        let value = self.read_register(offset);
        tracing::trace!(offset, value, "dmac read");
        data.copy_from_slice(&value.to_ne_bytes());
        IoResult::Ok
    }

    fn mmio_write(&mut self, address: u64, data: &[u8]) -> IoResult {
        let offset = match self.decode(address, data.len()) {
            Ok(offset) => offset,
            Err(err) => return IoResult::Err(err),
        };
        let Ok(bytes) = data.try_into() else {
            return IoResult::Err(IoError::InvalidAccessSize);
        };
        let value = u32::from_ne_bytes(bytes);
        tracing::trace!(offset, value, "dmac write");
        self.write_register(offset, value);
        IoResult::Ok
    }

    fn get_static_regions(&mut self) -> &[(&str, RangeInclusive<u64>)] {
        &self.static_regions
    }
}

impl PollDevice for DwAhbDmac {
    fn poll_device(&mut self, cx: &mut Context<'_>) {
        self.waker = Some(cx.waker().clone());
        // A tick requested while stopped stays pending until start.
        if self.running && std::mem::take(&mut self.tick_requested) {
            self.process();
        }
    }
}

impl LineInterruptTarget for DwAhbDmac {
    /// Sets the level of handshake input `n`. A rising level schedules a tick
    /// so that channels waiting on the line can proceed.
    fn set_irq(&mut self, n: u32, high: bool) {
        let Some(level) = self.handshake.get_mut(n as usize) else {
            tracelimit::warn_ratelimited!(line = n, "handshake line out of range");
            return;
        };
        *level = high;
        tracing::trace!(line = n, high, "handshake");
        if high {
            self.request_tick();
        }
    }

    fn valid_lines(&self) -> &[RangeInclusive<u32>] {
        &[0..=15]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MAX_CHAINED_EMPTY_BLOCKS;
    use crate::spec::CtlLow;
    use crate::spec::Lli;
    use futures::executor::block_on;
    use futures::task::ArcWake;
    use guestmem::GuestMemoryAccess;
    use guestmem::GuestMemoryBackingError;
    use guestmem::HeapMemory;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use tracing::metadata::LevelFilter;
    use tracing_subscriber::filter::Targets;
    use tracing_subscriber::prelude::*;
    use vmcore::line_interrupt::test_helpers::TestLineInterruptTarget;

    const BASE: u64 = 0xf830_0000;
    const IRQ_VECTOR: u32 = 9;
    const MEMORY_SIZE: usize = 0x10000;

    const SAR: u64 = 0x00;
    const DAR: u64 = 0x08;
    const LLP: u64 = 0x10;
    const CTL_L: u64 = 0x18;
    const CTL_H: u64 = 0x1c;
    const CFG_L: u64 = 0x40;
    const CFG_H: u64 = 0x44;

    const RAW_TFR: u64 = 0x2c0;
    const RAW_BLOCK: u64 = 0x2c8;
    const RAW_SRC_TRAN: u64 = 0x2d0;
    const RAW_DST_TRAN: u64 = 0x2d8;
    const RAW_ERR: u64 = 0x2e0;
    const STATUS_ERR: u64 = 0x308;
    const MASK_TFR: u64 = 0x310;
    const MASK_ERR: u64 = 0x330;
    const CLEAR_ERR: u64 = 0x358;
    const STATUS_INT: u64 = 0x360;
    const REQ_SRC: u64 = 0x368;
    const DMA_CFG: u64 = 0x398;
    const CH_EN: u64 = 0x3a0;
    const DMA_ID: u64 = 0x3a8;
    const DMA_LP_TIMEOUT: u64 = 0x3b8;
    const COMP_PARAMS_6_L: u64 = 0x3c8;
    const COMP_PARAMS_1_L: u64 = 0x3f0;
    const COMP_PARAMS_1_H: u64 = 0x3f4;
    const DMA_COMP_ID: u64 = 0x3f8;

    const CFG_L_CH_SUSP: u32 = 1 << 8;
    const CFG_L_FIFO_EMPTY: u32 = 1 << 9;
    const CFG_L_HS_SEL_DST: u32 = 1 << 10;
    const CFG_L_HS_SEL_SRC: u32 = 1 << 11;
    const CTL_H_DONE: u32 = 1 << 12;

    fn init_tracing() {
        static ONCE: std::sync::Once = std::sync::Once::new();

        ONCE.call_once(|| {
            let targets = if let Ok(var) = std::env::var("RUST_LOG") {
                var.parse().unwrap()
            } else {
                Targets::new().with_default(LevelFilter::DEBUG)
            };
            tracing_subscriber::fmt()
                .with_ansi(false)
                .with_test_writer()
                .with_max_level(LevelFilter::TRACE)
                .finish()
                .with(targets)
                .init();
        });
    }

    fn reg(channel: usize, offset: u64) -> u64 {
        channel as u64 * CHANNEL_STRIDE + offset
    }

    /// A block for one channel, programmed through its registers.
    struct Block {
        sar: u32,
        dar: u32,
        llp: u32,
        ctl_l: CtlLow,
        block_ts: u32,
        cfg_l: u32,
        cfg_h: u32,
    }

    impl Block {
        fn m2m(sar: u32, dar: u32, block_ts: u32) -> Self {
            Self {
                sar,
                dar,
                llp: 0,
                ctl_l: CtlLow::new().with_int_en(true),
                block_ts,
                cfg_l: 0,
                cfg_h: 0,
            }
        }
    }

    struct TestDmac {
        dmac: DwAhbDmac,
        memory: GuestMemory,
        intcon: Arc<TestLineInterruptTarget>,
    }

    impl TestDmac {
        fn new() -> Self {
            Self::with_config(DwAhbDmacConfig {
                base_address: BASE,
                ..Default::default()
            })
        }

        fn with_config(config: DwAhbDmacConfig) -> Self {
            Self::with_memory(config, GuestMemory::allocate(MEMORY_SIZE))
        }

        fn with_memory(config: DwAhbDmacConfig, memory: GuestMemory) -> Self {
            init_tracing();
            let intcon = TestLineInterruptTarget::new_arc();
            let irq = LineInterrupt::new_with_target("dmac", intcon.clone(), IRQ_VECTOR);
            // Master 2 and 3 are left unconnected.
            let mut dmac = DwAhbDmac::new(
                config,
                [Some(memory.clone()), Some(memory.clone()), None, None],
                irq,
            )
            .unwrap();
            dmac.start();
            Self {
                dmac,
                memory,
                intcon,
            }
        }

        fn read(&mut self, offset: u64) -> u32 {
            let mut data = [0; 4];
            self.dmac.mmio_read(BASE + offset, &mut data).unwrap();
            u32::from_ne_bytes(data)
        }

        fn write(&mut self, offset: u64, value: u32) {
            self.dmac
                .mmio_write(BASE + offset, &value.to_ne_bytes())
                .unwrap();
        }

        fn program(&mut self, channel: usize, block: Block) {
            self.write(reg(channel, SAR), block.sar);
            self.write(reg(channel, DAR), block.dar);
            self.write(reg(channel, LLP), block.llp);
            self.write(reg(channel, CTL_L), block.ctl_l.into());
            self.write(reg(channel, CTL_H), block.block_ts);
            self.write(reg(channel, CFG_L), block.cfg_l);
            self.write(reg(channel, CFG_H), block.cfg_h);
        }

        /// Unmasks every interrupt class for every channel.
        fn unmask_all(&mut self) {
            for class in 0..5 {
                self.write(MASK_TFR + class * 8, 0xffff);
            }
        }

        fn enable(&mut self, channels: u8) {
            self.write(DMA_CFG, 1);
            self.write(CH_EN, (u32::from(channels) << 8) | u32::from(channels));
        }

        fn poll(&mut self) {
            self.dmac
                .poll_device(&mut Context::from_waker(futures::task::noop_waker_ref()));
        }

        fn irq_high(&self) -> bool {
            self.intcon.is_high(IRQ_VECTOR)
        }

        fn fill(&self, address: u64, len: usize) -> Vec<u8> {
            let data: Vec<u8> = (0..len).map(|i| (i as u8).wrapping_mul(7) ^ 0x5a).collect();
            self.memory.write_at(address, &data).unwrap();
            data
        }

        fn bytes(&self, address: u64, len: usize) -> Vec<u8> {
            let mut data = vec![0; len];
            self.memory.read_at(address, &mut data).unwrap();
            data
        }
    }

    #[test]
    fn memory_to_memory() {
        let mut t = TestDmac::new();
        t.unmask_all();
        let src = t.fill(0x1000, 4);
        t.program(0, Block::m2m(0x1000, 0x2000, 4));
        t.enable(0x01);
        t.poll();

        assert_eq!(t.bytes(0x2000, 4), src);
        assert_eq!(t.read(CH_EN), 0);
        assert_eq!(t.read(RAW_TFR), 1);
        assert_eq!(t.read(RAW_BLOCK), 1);
        assert_eq!(t.read(RAW_ERR), 0);
        assert_eq!(t.read(STATUS_INT), 0b11);
        assert!(t.irq_high());
        assert_eq!(t.dmac.channels[0].transfer_count, 0);
        assert_eq!(t.read(reg(0, CTL_H)), 4 | CTL_H_DONE);
        assert_eq!(t.read(reg(0, SAR)), 0x1004);
        assert_eq!(t.read(reg(0, DAR)), 0x2004);
    }

    #[test]
    fn completion_without_interrupts() {
        let mut t = TestDmac::new();
        t.unmask_all();
        let src = t.fill(0x1000, 2);
        let mut block = Block::m2m(0x1000, 0x2000, 2);
        block.ctl_l.set_int_en(false);
        t.program(0, block);
        t.enable(0x01);
        t.poll();

        assert_eq!(t.bytes(0x2000, 2), src);
        assert_eq!(t.read(CH_EN), 0);
        assert_eq!(t.read(RAW_TFR), 0);
        assert!(!t.irq_high());
    }

    #[test]
    fn independent_address_updates() {
        let mut t = TestDmac::new();
        let src = t.fill(0x1000, 16);
        let mut block = Block::m2m(0x1000, 0x2008, 2);
        // 8-byte units, source increments, destination decrements.
        block.ctl_l = block
            .ctl_l
            .with_src_tr_width(3)
            .with_dst_tr_width(3)
            .with_sinc(0)
            .with_dinc(1);
        t.program(0, block);
        t.enable(0x01);
        t.poll();

        assert_eq!(t.read(reg(0, SAR)), 0x1010);
        assert_eq!(t.read(reg(0, DAR)), 0x1ff8);
        assert_eq!(t.bytes(0x2008, 8), src[..8]);
        assert_eq!(t.bytes(0x2000, 8), src[8..]);
    }

    #[test]
    fn fixed_destination() {
        let mut t = TestDmac::new();
        let src = t.fill(0x1000, 4);
        let mut block = Block::m2m(0x1000, 0x2000, 4);
        block.ctl_l.set_dinc(2);
        t.program(0, block);
        t.enable(0x01);
        t.poll();

        assert_eq!(t.read(reg(0, DAR)), 0x2000);
        assert_eq!(t.bytes(0x2000, 2), [src[3], 0]);
    }

    #[test]
    fn mask_byte_enable() {
        let mut t = TestDmac::new();
        t.write(MASK_ERR, 0x0f0f);
        assert_eq!(t.read(MASK_ERR), 0x0f);
        // No write enable: unchanged.
        t.write(MASK_ERR, 0x00ff);
        assert_eq!(t.read(MASK_ERR), 0x0f);
        t.write(MASK_ERR, 0xff00);
        assert_eq!(t.read(MASK_ERR), 0);
        t.write(MASK_ERR, 0x3030);
        assert_eq!(t.read(MASK_ERR), 0x30);
    }

    #[test]
    fn channel_enable_ignored_while_disabled() {
        let mut t = TestDmac::new();
        t.write(DMA_CFG, 0);
        t.write(CH_EN, 0xff01);
        assert_eq!(t.read(CH_EN), 0);
    }

    #[test]
    fn global_disable_clears_channels() {
        let mut t = TestDmac::new();
        t.enable(0x05);
        assert_eq!(t.read(CH_EN), 0x05);
        assert_eq!(t.read(DMA_CFG), 1);
        t.write(DMA_CFG, 0);
        assert_eq!(t.read(CH_EN), 0);
        t.poll();
        assert_eq!(t.read(reg(0, SAR)), 0);
    }

    #[test]
    fn channel_enable_byte_enable() {
        let mut t = TestDmac::new();
        t.enable(0x03);
        // Only channel 1 is write-enabled.
        t.write(CH_EN, 0x0200);
        assert_eq!(t.read(CH_EN), 0x01);
    }

    #[test]
    fn descriptor_chain_with_write_back() {
        let mut t = TestDmac::new();
        t.unmask_all();
        let src = t.fill(0x1000, 12);
        let int_llp = CtlLow::new()
            .with_int_en(true)
            .with_llp_src_en(true)
            .with_llp_dst_en(true);
        t.memory
            .write_plain(
                0x3000,
                &Lli {
                    sar: 0x1004,
                    dar: 0x2004,
                    llp: 0x3020,
                    ctl_l: int_llp.into(),
                    ctl_h: 4,
                    sstat: 0,
                    dstat: 0,
                },
            )
            .unwrap();
        t.memory
            .write_plain(
                0x3020,
                &Lli {
                    sar: 0x1008,
                    dar: 0x2008,
                    llp: 0,
                    ctl_l: int_llp.into(),
                    ctl_h: 4,
                    sstat: 0,
                    dstat: 0,
                },
            )
            .unwrap();

        let mut block = Block::m2m(0x1000, 0x2000, 4);
        block.ctl_l = int_llp;
        block.llp = 0x3000;
        t.program(0, block);
        t.enable(0x01);
        t.poll();

        assert_eq!(t.bytes(0x2000, 12), src);
        assert_eq!(t.read(CH_EN), 0);
        assert_eq!(t.read(RAW_BLOCK), 1);
        assert_eq!(t.read(RAW_TFR), 1);
        assert_eq!(t.read(RAW_ERR), 0);
        assert_eq!(t.read(reg(0, CTL_H)), 4 | CTL_H_DONE);

        // Both descriptor-loaded blocks report done in their control word.
        let ctl_h: u32 = t.memory.read_plain(0x3010).unwrap();
        assert_eq!(ctl_h, 4 | CTL_H_DONE);
        let ctl_h: u32 = t.memory.read_plain(0x3030).unwrap();
        assert_eq!(ctl_h, 4 | CTL_H_DONE);
    }

    #[test]
    fn write_back_disabled() {
        let mut t = TestDmac::with_config(DwAhbDmacConfig {
            base_address: BASE,
            control_write_back: false,
            ..Default::default()
        });
        t.memory
            .write_plain(
                0x3000,
                &Lli {
                    sar: 0x1000,
                    dar: 0x2000,
                    llp: 0,
                    ctl_l: 0,
                    ctl_h: 1,
                    sstat: 0,
                    dstat: 0,
                },
            )
            .unwrap();
        let mut block = Block::m2m(0, 0, 0);
        block.llp = 0x3000;
        t.program(0, block);
        t.enable(0x01);
        t.poll();

        assert_eq!(t.read(CH_EN), 0);
        let ctl_h: u32 = t.memory.read_plain(0x3010).unwrap();
        assert_eq!(ctl_h, 1);
    }

    #[test]
    fn descriptor_read_failure() {
        let mut t = TestDmac::new();
        t.unmask_all();
        let mut block = Block::m2m(0x1000, 0x2000, 0);
        block.llp = 0x2_0000;
        t.program(0, block);
        t.enable(0x01);
        t.poll();

        assert_eq!(t.read(CH_EN), 0);
        assert_eq!(t.read(RAW_ERR), 1);
        assert_eq!(t.read(RAW_TFR), 0);
        assert_eq!(t.read(STATUS_ERR), 1);
        assert!(t.irq_high());
    }

    #[test]
    fn source_read_failure() {
        let mut t = TestDmac::new();
        t.unmask_all();
        let mut block = Block::m2m(0x2_0000, 0x2000, 4);
        block.ctl_l.set_int_en(false);
        t.program(0, block);
        t.enable(0x01);
        t.poll();

        // No interrupt without int_en, but the channel still stops.
        assert_eq!(t.read(CH_EN), 0);
        assert_eq!(t.read(RAW_ERR), 0);
        assert_eq!(t.read(reg(0, SAR)), 0x2_0000);
        assert_eq!(t.read(reg(0, DAR)), 0x2000);
        assert!(!t.irq_high());
    }

    #[test]
    fn destination_failure_keeps_source_progress() {
        let mut t = TestDmac::new();
        t.fill(0x1000, 4);
        t.program(0, Block::m2m(0x1000, 0x2_0000, 4));
        t.enable(0x01);
        t.poll();

        assert_eq!(t.read(CH_EN), 0);
        assert_eq!(t.read(RAW_ERR), 1);
        assert_eq!(t.read(reg(0, SAR)), 0x1001);
        assert_eq!(t.read(reg(0, DAR)), 0x2_0000);
        assert_eq!(t.dmac.channels[0].transfer_count, 0);
    }

    #[test]
    fn unconnected_master() {
        let mut t = TestDmac::new();
        t.fill(0x1000, 4);
        let mut block = Block::m2m(0x1000, 0x2000, 4);
        block.ctl_l.set_dms(2);
        t.program(0, block);
        t.enable(0x01);
        t.poll();

        assert_eq!(t.read(CH_EN), 0);
        assert_eq!(t.read(RAW_ERR), 1);
    }

    #[test]
    fn second_master() {
        let mut t = TestDmac::new();
        let src = t.fill(0x1000, 4);
        let mut block = Block::m2m(0x1000, 0x2000, 4);
        block.ctl_l = block.ctl_l.with_sms(1).with_dms(1);
        t.program(0, block);
        t.enable(0x01);
        t.poll();

        assert_eq!(t.read(RAW_ERR), 0);
        assert_eq!(t.bytes(0x2000, 4), src);
    }

    #[test]
    fn suspend() {
        let mut t = TestDmac::new();
        t.fill(0x1000, 4);
        let mut block = Block::m2m(0x1000, 0x2000, 4);
        block.cfg_l = CFG_L_CH_SUSP;
        t.program(0, block);
        t.enable(0x01);
        t.poll();

        assert_eq!(t.read(CH_EN), 0);
        assert_eq!(t.read(RAW_ERR), 1);
        assert_eq!(t.bytes(0x2000, 4), [0; 4]);
    }

    #[test]
    fn resume_after_suspend_finishes_block() {
        let mut t = TestDmac::new();
        let src = t.fill(0x1000, 8);
        t.program(0, Block::m2m(0x1000, 0x2000, 4));
        t.enable(0x01);
        assert_eq!(t.dmac.run_channel(0, Some(2)), 2);
        assert_eq!(t.read(reg(0, CTL_H)), 2);

        // Suspending a live channel stops it before the next unit.
        t.write(reg(0, CFG_L), CFG_L_CH_SUSP);
        t.poll();
        assert_eq!(t.read(CH_EN), 0);
        assert_eq!(t.read(RAW_ERR), 1);
        assert_eq!(t.bytes(0x2000, 4), [src[0], src[1], 0, 0]);

        // Re-enabling moves only the units left in the block.
        t.write(reg(0, CFG_L), 0);
        t.enable(0x01);
        t.poll();
        assert_eq!(t.read(CH_EN), 0);
        assert_eq!(t.read(RAW_TFR), 1);
        let mut expected = src[..4].to_vec();
        expected.extend([0; 4]);
        assert_eq!(t.bytes(0x2000, 8), expected);
        assert_eq!(t.read(reg(0, SAR)), 0x1004);
        assert_eq!(t.read(reg(0, DAR)), 0x2004);
    }

    #[test]
    fn peripheral_flow_control_unsupported() {
        let mut t = TestDmac::new();
        let mut block = Block::m2m(0x1000, 0x2000, 4);
        block.ctl_l.set_tt_fc(4);
        t.program(0, block);
        t.enable(0x01);
        t.poll();

        assert_eq!(t.read(CH_EN), 0);
        assert_eq!(t.read(RAW_ERR), 1);
        assert_eq!(t.read(reg(0, SAR)), 0x1000);
    }

    #[test]
    fn software_handshake_unsupported() {
        let mut t = TestDmac::new();
        let mut block = Block::m2m(0x1000, 0x2000, 4);
        // Memory to peripheral, DMAC flow control.
        block.ctl_l.set_tt_fc(1);
        block.cfg_l = CFG_L_HS_SEL_DST;
        t.program(0, block);
        t.enable(0x01);
        t.poll();

        assert_eq!(t.read(CH_EN), 0);
        assert_eq!(t.read(RAW_ERR), 1);
        assert_eq!(t.read(reg(0, SAR)), 0x1000);

        // The software handshake registers themselves are inert.
        t.write(REQ_SRC, 0x0101);
        assert_eq!(t.read(REQ_SRC), 0);
    }

    #[test]
    fn source_software_handshake_unsupported() {
        let mut t = TestDmac::new();
        t.fill(0x1000, 4);
        let mut block = Block::m2m(0x1000, 0x2000, 4);
        // Peripheral to memory, DMAC flow control.
        block.ctl_l.set_tt_fc(2);
        block.cfg_l = CFG_L_HS_SEL_SRC;
        t.program(0, block);
        t.enable(0x01);
        t.poll();

        assert_eq!(t.read(CH_EN), 0);
        assert_eq!(t.read(RAW_ERR), 1);
        assert_eq!(t.read(RAW_SRC_TRAN), 0);
        assert_eq!(t.read(reg(0, SAR)), 0x1000);
        assert_eq!(t.read(reg(0, DAR)), 0x2000);
        assert_eq!(t.bytes(0x2000, 4), [0; 4]);
    }

    struct CountingWaker(AtomicUsize);

    impl ArcWake for CountingWaker {
        fn wake_by_ref(arc_self: &Arc<Self>) {
            arc_self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn hardware_handshake_gates_transfer() {
        let mut t = TestDmac::new();
        let src = t.fill(0x1000, 2);
        let mut block = Block::m2m(0x1000, 0x2000, 2);
        block.ctl_l.set_tt_fc(1);
        block.cfg_h = 5 << 11;
        t.program(0, block);

        let wakes = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let waker = futures::task::waker(wakes.clone());
        let mut cx = Context::from_waker(&waker);
        t.dmac.poll_device(&mut cx);

        t.enable(0x01);
        assert_eq!(wakes.0.load(Ordering::SeqCst), 1);
        t.dmac.poll_device(&mut cx);

        // Destination not requesting: nothing moves, the channel stays on.
        assert_eq!(t.read(CH_EN), 1);
        assert_eq!(t.read(reg(0, CTL_H)), 0);
        assert_eq!(t.bytes(0x2000, 2), [0, 0]);

        // Lowering a line does not schedule work.
        t.dmac.set_irq(5, false);
        assert_eq!(wakes.0.load(Ordering::SeqCst), 1);

        t.dmac.set_irq(5, true);
        assert_eq!(wakes.0.load(Ordering::SeqCst), 2);
        t.dmac.poll_device(&mut cx);

        assert_eq!(t.bytes(0x2000, 2), src);
        assert_eq!(t.read(CH_EN), 0);
        assert_eq!(t.read(RAW_DST_TRAN), 1);
        assert_eq!(t.read(RAW_SRC_TRAN), 0);
        assert_eq!(t.read(RAW_TFR), 1);
    }

    #[test]
    fn peripheral_source_raises_source_transaction() {
        let mut t = TestDmac::new();
        t.fill(0x1000, 3);
        let mut block = Block::m2m(0x1000, 0x2000, 3);
        // Peripheral to memory, DMAC flow control, source on line 2.
        block.ctl_l.set_tt_fc(2);
        block.cfg_h = 2 << 7;
        t.program(0, block);
        t.dmac.set_irq(2, true);
        t.enable(0x01);
        t.poll();

        assert_eq!(t.read(CH_EN), 0);
        assert_eq!(t.read(RAW_SRC_TRAN), 1);
        assert_eq!(t.read(RAW_DST_TRAN), 0);
    }

    #[test]
    fn ctl_high_reads_progress_while_enabled() {
        let mut t = TestDmac::new();
        let mut block = Block::m2m(0x1000, 0x2000, 4);
        block.ctl_l.set_tt_fc(1);
        t.program(0, block);
        assert_eq!(t.read(reg(0, CTL_H)), 4);
        t.enable(0x01);
        t.poll();
        assert_eq!(t.read(CH_EN), 1);
        assert_eq!(t.read(reg(0, CTL_H)), 0);
    }

    #[test]
    fn cfg_low_reads_fifo_empty() {
        let mut t = TestDmac::new();
        t.write(reg(3, CFG_L), 0);
        assert_eq!(t.read(reg(3, CFG_L)), CFG_L_FIFO_EMPTY);
    }

    #[test]
    fn channel_count_limit() {
        let mut t = TestDmac::with_config(DwAhbDmacConfig {
            base_address: BASE,
            channels: 4,
            ..Default::default()
        });
        t.write(reg(5, SAR), 0x1234);
        assert_eq!(t.read(reg(5, SAR)), 0);
        t.write(reg(3, SAR), 0x1234);
        assert_eq!(t.read(reg(3, SAR)), 0x1234);

        t.enable(0xff);
        assert_eq!(t.read(CH_EN), 0x0f);
        assert_eq!((t.read(COMP_PARAMS_1_H) >> 8) & 7, 3);
    }

    #[test]
    fn interrupt_registers() {
        let mut t = TestDmac::new();
        t.program(0, Block::m2m(0x2_0000, 0x2000, 1));
        t.enable(0x01);
        t.poll();
        assert_eq!(t.read(RAW_ERR), 1);
        assert_eq!(t.read(STATUS_ERR), 0);
        assert!(!t.irq_high());

        t.write(MASK_ERR, 0x0101);
        assert_eq!(t.read(STATUS_ERR), 1);
        assert_eq!(t.read(STATUS_INT), 1 << 4);
        assert!(t.irq_high());

        // Read-only and write-only registers.
        assert_eq!(t.read(CLEAR_ERR), 0);
        t.write(STATUS_ERR, 0);
        t.write(RAW_ERR, 0);
        assert_eq!(t.read(RAW_ERR), 1);
        assert!(t.irq_high());

        t.write(CLEAR_ERR, 0x01);
        assert_eq!(t.read(RAW_ERR), 0);
        assert_eq!(t.read(STATUS_INT), 0);
        assert!(!t.irq_high());
    }

    #[test]
    fn unknown_registers() {
        let mut t = TestDmac::new();
        t.write(0x3c0, 0xffff_ffff);
        assert_eq!(t.read(0x3c0), 0);
        // Upper half of a 64-bit channel register slot.
        t.write(reg(0, SAR + 4), 0xffff_ffff);
        assert_eq!(t.read(reg(0, SAR + 4)), 0);
        assert_eq!(t.read(reg(0, SAR)), 0);
    }

    #[test]
    fn active_channel_writes() {
        let mut t = TestDmac::new();
        let mut block = Block::m2m(0x1000, 0x2000, 4);
        block.ctl_l.set_tt_fc(1);
        t.program(0, block);
        t.enable(0x01);
        t.write(reg(0, SAR), 0x1100);
        assert_eq!(t.read(reg(0, SAR)), 0x1100);

        let mut t = TestDmac::with_config(DwAhbDmacConfig {
            base_address: BASE,
            active_channel_writes: ActiveChannelWrites::Reject,
            ..Default::default()
        });
        let mut block = Block::m2m(0x1000, 0x2000, 4);
        block.ctl_l.set_tt_fc(1);
        t.program(0, block);
        t.enable(0x01);
        t.write(reg(0, SAR), 0x1100);
        assert_eq!(t.read(reg(0, SAR)), 0x1000);
    }

    struct RecordingMemory {
        memory: HeapMemory,
        writes: Arc<Mutex<Vec<u64>>>,
    }

    impl GuestMemoryAccess for RecordingMemory {
        fn read_at(&self, gpa: u64, dest: &mut [u8]) -> Result<(), GuestMemoryBackingError> {
            self.memory.read_at(gpa, dest)
        }

        fn write_at(&self, gpa: u64, src: &[u8]) -> Result<(), GuestMemoryBackingError> {
            self.writes.lock().push(gpa);
            self.memory.write_at(gpa, src)
        }
    }

    fn write_order(scheduling: ChannelScheduling) -> Vec<u64> {
        let writes = Arc::new(Mutex::new(Vec::new()));
        let memory = GuestMemory::new(
            "recording",
            RecordingMemory {
                memory: HeapMemory::new(MEMORY_SIZE),
                writes: writes.clone(),
            },
        );
        let mut t = TestDmac::with_memory(
            DwAhbDmacConfig {
                base_address: BASE,
                scheduling,
                ..Default::default()
            },
            memory,
        );
        t.program(0, Block::m2m(0x1000, 0x2000, 2));
        t.program(1, Block::m2m(0x1000, 0x3000, 2));
        t.enable(0x03);
        t.poll();
        assert_eq!(t.read(CH_EN), 0);
        writes.lock().clone()
    }

    #[test]
    fn run_to_completion_order() {
        assert_eq!(
            write_order(ChannelScheduling::RunToCompletion),
            [0x2000, 0x2001, 0x3000, 0x3001]
        );
    }

    #[test]
    fn round_robin_order() {
        assert_eq!(
            write_order(ChannelScheduling::RoundRobin { units_per_turn: 1 }),
            [0x2000, 0x3000, 0x2001, 0x3001]
        );
    }

    #[test]
    fn self_referencing_empty_descriptor() {
        let mut t = TestDmac::new();
        t.memory
            .write_plain(
                0x3000,
                &Lli {
                    sar: 0,
                    dar: 0,
                    llp: 0x3000,
                    ctl_l: 0,
                    ctl_h: 0,
                    sstat: 0,
                    dstat: 0,
                },
            )
            .unwrap();
        let mut block = Block::m2m(0, 0, 0);
        block.llp = 0x3000;
        t.program(0, block);
        t.enable(0x01);
        t.poll();

        assert_eq!(t.read(CH_EN), 0);
        // The loaded descriptor turned interrupts off.
        assert_eq!(t.read(RAW_ERR), 0);
    }

    #[test]
    fn self_referencing_empty_descriptor_reports_error() {
        let mut t = TestDmac::new();
        t.memory
            .write_plain(
                0x3000,
                &Lli {
                    sar: 0,
                    dar: 0,
                    llp: 0x3000,
                    ctl_l: CtlLow::new().with_int_en(true).into(),
                    ctl_h: 0,
                    sstat: 0,
                    dstat: 0,
                },
            )
            .unwrap();
        let mut block = Block::m2m(0, 0, 0);
        block.llp = 0x3000;
        t.program(0, block);
        t.enable(0x01);
        t.poll();

        assert_eq!(t.read(CH_EN), 0);
        assert_eq!(t.read(RAW_ERR), 1);
        assert_eq!(t.read(RAW_BLOCK), 1);
        assert_eq!(t.read(RAW_TFR), 0);
    }

    /// Runs a one-unit block whose `LLP` leads into `len` empty descriptors.
    fn empty_descriptor_chain(len: usize) -> TestDmac {
        let mut t = TestDmac::with_memory(
            DwAhbDmacConfig {
                base_address: BASE,
                ..Default::default()
            },
            GuestMemory::allocate(0x40000),
        );
        t.fill(0x1000, 1);
        for i in 0..len {
            let address = 0x1_0000 + i as u32 * 0x20;
            let llp = if i + 1 == len { 0 } else { address + 0x20 };
            t.memory
                .write_plain(
                    address.into(),
                    &Lli {
                        sar: 0,
                        dar: 0,
                        llp,
                        ctl_l: CtlLow::new().with_int_en(true).into(),
                        ctl_h: 0,
                        sstat: 0,
                        dstat: 0,
                    },
                )
                .unwrap();
        }
        let mut block = Block::m2m(0x1000, 0x2000, 1);
        block.llp = 0x1_0000;
        t.program(0, block);
        t.enable(0x01);
        t.poll();
        t
    }

    #[test]
    fn empty_descriptor_chain_limit() {
        let mut t = empty_descriptor_chain(MAX_CHAINED_EMPTY_BLOCKS);
        assert_eq!(t.read(CH_EN), 0);
        assert_eq!(t.read(RAW_TFR), 1);
        assert_eq!(t.read(RAW_ERR), 0);

        let mut t = empty_descriptor_chain(MAX_CHAINED_EMPTY_BLOCKS + 1);
        assert_eq!(t.read(CH_EN), 0);
        assert_eq!(t.read(RAW_TFR), 0);
        assert_eq!(t.read(RAW_ERR), 1);
    }

    #[test]
    fn stopped_device_defers_transfers() {
        let mut t = TestDmac::new();
        let src = t.fill(0x1000, 4);
        t.program(0, Block::m2m(0x1000, 0x2000, 4));
        block_on(t.dmac.stop());

        let wakes = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let waker = futures::task::waker(wakes.clone());
        let mut cx = Context::from_waker(&waker);
        t.dmac.poll_device(&mut cx);
        t.enable(0x01);
        t.dmac.poll_device(&mut cx);
        assert_eq!(t.read(CH_EN), 1);
        assert_eq!(t.bytes(0x2000, 4), [0; 4]);

        // Starting again picks up the pending tick.
        t.dmac.start();
        assert_eq!(wakes.0.load(Ordering::SeqCst), 2);
        t.dmac.poll_device(&mut cx);
        assert_eq!(t.read(CH_EN), 0);
        assert_eq!(t.bytes(0x2000, 4), src);
    }

    #[test]
    fn reset() {
        let mut t = TestDmac::new();
        t.unmask_all();
        t.program(0, Block::m2m(0x2_0000, 0x2000, 1));
        t.program(1, Block::m2m(0x1000, 0x2000, 1));
        t.dmac.set_irq(7, true);
        t.enable(0x01);
        t.poll();
        assert!(t.irq_high());

        block_on(t.dmac.reset());

        assert!(!t.irq_high());
        assert!(!t.dmac.handshake[7]);
        for offset in [RAW_ERR, MASK_ERR, STATUS_INT, DMA_CFG, CH_EN] {
            assert_eq!(t.read(offset), 0, "{offset:#x}");
        }
        for offset in [SAR, DAR, LLP, CTL_L, CTL_H, CFG_L, CFG_H] {
            assert_eq!(t.read(reg(1, offset)), 0, "{offset:#x}");
        }
    }

    #[test]
    fn identification_registers() {
        let mut t = TestDmac::new();
        assert_eq!(t.read(DMA_ID), 0x0208_0901);
        assert_eq!(t.read(DMA_LP_TIMEOUT), 0x08);
        assert_eq!(t.read(DMA_COMP_ID), 0x4457_1110);
        assert_eq!(t.read(COMP_PARAMS_6_L), 0);
        assert_eq!(t.read(COMP_PARAMS_1_L), 0xaaaa_aaaa);
        let params = t.read(COMP_PARAMS_1_H);
        assert_eq!((params >> 8) & 7, 7);
        assert_eq!((params >> 23) & 0x1f, 16);

        t.write(DMA_ID, 0);
        assert_eq!(t.read(DMA_ID), 0x0208_0901);
    }

    #[test]
    fn access_checks() {
        let mut t = TestDmac::new();
        let mut narrow = [0; 2];
        assert_eq!(
            t.dmac.mmio_read(BASE, &mut narrow).now_or_never(),
            Err(IoError::InvalidAccessSize)
        );
        let mut data = [0; 4];
        assert_eq!(
            t.dmac.mmio_read(BASE + 2, &mut data).now_or_never(),
            Err(IoError::UnalignedAccess)
        );
        assert_eq!(
            t.dmac
                .mmio_write(BASE + MMIO_REGION_SIZE, &data)
                .now_or_never(),
            Err(IoError::InvalidRegister)
        );
        assert_eq!(
            t.dmac.get_static_regions(),
            &[("mmio", BASE..=BASE + 0x3ff)]
        );
    }

    #[test]
    fn construction_errors() {
        let memory = GuestMemory::allocate(0x1000);
        let result = DwAhbDmac::new(
            DwAhbDmacConfig::default(),
            [None, Some(memory.clone()), None, None],
            LineInterrupt::detached(),
        );
        assert!(matches!(result, Err(NewDmacError::MissingMaster0)));

        for channels in [0, 9] {
            let result = DwAhbDmac::new(
                DwAhbDmacConfig {
                    channels,
                    ..Default::default()
                },
                [Some(memory.clone()), None, None, None],
                LineInterrupt::detached(),
            );
            assert!(matches!(
                result,
                Err(NewDmacError::InvalidChannelCount(n)) if n == channels
            ));
        }
    }
}
