// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The channel transfer engine.
//!
//! Each tick walks the enabled channels. For every channel the engine
//! alternates between the flow-control gate (block completion, descriptor
//! chaining), the handshake gate, and moving one transfer unit, until the
//! channel finishes, stalls on a handshake line, or fails.

use crate::ChannelScheduling;
use crate::DwAhbDmac;
use crate::channel::DescriptorRef;
use crate::spec::CtlHigh;
use crate::spec::InterruptClass;
use crate::spec::LLI_CTL_H_OFFSET;
use crate::spec::Lli;
use crate::spec::MAX_TRANSFER_WIDTH;
use guestmem::GuestMemory;
use guestmem::GuestMemoryError;
use std::fmt;
use thiserror::Error;

/// Consecutive zero-length descriptors the flow-control gate follows in one
/// evaluation. Loading one more stops the channel.
pub(crate) const MAX_CHAINED_EMPTY_BLOCKS: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BusOp {
    DescriptorRead,
    DescriptorWriteBack,
    SourceRead,
    DestinationWrite,
}

impl fmt::Display for BusOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            BusOp::DescriptorRead => "descriptor read",
            BusOp::DescriptorWriteBack => "descriptor write-back",
            BusOp::SourceRead => "source read",
            BusOp::DestinationWrite => "destination write",
        })
    }
}

/// Why a channel stopped. Every variant disables the channel and, when the
/// channel has interrupts enabled, raises its error bit.
#[derive(Debug, Error)]
pub(crate) enum ChannelError {
    #[error("channel suspended")]
    Suspended,
    #[error("{0} is not supported")]
    Unsupported(&'static str),
    #[error("{op} of {size} bytes at {address:#010x} on master {master} failed")]
    Bus {
        op: BusOp,
        master: usize,
        address: u32,
        size: usize,
        #[source]
        err: GuestMemoryError,
    },
    #[error("descriptor list chained {0} empty blocks without moving data")]
    DescriptorLoop(usize),
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Source,
    Destination,
}

impl DwAhbDmac {
    /// Runs one scheduler tick over all enabled channels.
    ///
    /// Normally driven from [`PollDevice::poll_device`](chipset_device::poll_device::PollDevice)
    /// after a tick was requested. Boards that drive the controller from
    /// their own scheduler can call this directly.
    pub fn process(&mut self) {
        match self.config.scheduling {
            ChannelScheduling::RunToCompletion => {
                for index in 0..self.channels.len() {
                    if self.channel_enabled(index) {
                        self.channels[index].trace_dump(index);
                        self.run_channel(index, None);
                    }
                }
            }
            ChannelScheduling::RoundRobin { units_per_turn } => {
                let budget = units_per_turn.max(1);
                loop {
                    let mut progress = 0;
                    for index in 0..self.channels.len() {
                        if self.channel_enabled(index) {
                            self.channels[index].trace_dump(index);
                            progress += self.run_channel(index, Some(budget));
                        }
                    }
                    if progress == 0 {
                        break;
                    }
                }
            }
        }
    }

    pub(crate) fn channel_enabled(&self, index: usize) -> bool {
        self.dma_enabled && self.channel_enable & (1 << index) != 0
    }

    fn disable_channel(&mut self, index: usize) {
        self.channel_enable &= !(1 << index);
    }

    /// Moves units on one channel until it stops, stalls, or uses up
    /// `budget`. Returns the number of units moved.
    pub(crate) fn run_channel(&mut self, index: usize, budget: Option<usize>) -> usize {
        let mut units = 0;
        // The enable bit is the cancellation point: a channel disabled by a
        // failure, by completion, or by the guest stops here.
        while self.channel_enabled(index) && budget.is_none_or(|budget| units < budget) {
            match self.ready(index) {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => {
                    self.abort_channel(index, err);
                    break;
                }
            }
            if let Err(err) = self.transfer_unit(index) {
                self.abort_channel(index, err);
                break;
            }
            units += 1;
        }
        units
    }

    fn ready(&mut self, index: usize) -> Result<bool, ChannelError> {
        Ok(self.check_channel(index)?
            && self.side_ready(index, Side::Source)?
            && self.side_ready(index, Side::Destination)?)
    }

    /// The flow-control gate. Returns `Ok(false)` when the channel's transfer
    /// has finished and the channel has been disabled.
    fn check_channel(&mut self, index: usize) -> Result<bool, ChannelError> {
        let channel = &self.channels[index];
        if channel.cfg_l.ch_susp() {
            return Err(ChannelError::Suspended);
        }
        if channel.transfer_type().peripheral_flow_control() {
            return Err(ChannelError::Unsupported("peripheral flow control"));
        }

        let mut empty_blocks = 0;
        while self.channels[index].block_exhausted() {
            let channel = &mut self.channels[index];
            channel.ctl_h.set_done(true);
            if let Some(descriptor) = channel.descriptor {
                if self.config.control_write_back {
                    let memory = &self.masters[descriptor.master];
                    write_back_control(memory, descriptor, channel.ctl_h)?;
                }
            }

            if channel.llp.loc() == 0 {
                tracing::debug!(channel = index, "transfer complete");
                channel.transfer_count = 0;
                if channel.ctl_l.int_en() {
                    self.interrupts.raise(InterruptClass::Block, index);
                    self.interrupts.raise(InterruptClass::Transfer, index);
                    self.update_irq();
                }
                self.disable_channel(index);
                return Ok(false);
            }

            let descriptor = DescriptorRef {
                master: channel.llp.lms().into(),
                address: channel.llp.address(),
            };
            let lli: Lli = self.masters[descriptor.master]
                .read_plain(descriptor.address.into())
                .map_err(|err| ChannelError::Bus {
                    op: BusOp::DescriptorRead,
                    master: descriptor.master,
                    address: descriptor.address,
                    size: size_of::<Lli>(),
                    err,
                })?;
            tracing::debug!(
                channel = index,
                master = descriptor.master,
                address = format_args!("{:#010x}", descriptor.address),
                "loaded descriptor"
            );
            channel.load(&lli, descriptor);
            let empty = channel.block_exhausted();
            if channel.ctl_l.int_en() {
                self.interrupts.raise(InterruptClass::Block, index);
                self.update_irq();
            }
            if empty {
                if empty_blocks == MAX_CHAINED_EMPTY_BLOCKS {
                    return Err(ChannelError::DescriptorLoop(empty_blocks));
                }
                empty_blocks += 1;
            }
        }
        Ok(true)
    }

    /// The handshake gate for one side of the channel.
    fn side_ready(&self, index: usize, side: Side) -> Result<bool, ChannelError> {
        let channel = &self.channels[index];
        let transfer_type = channel.transfer_type();
        let (is_memory, software, line, what) = match side {
            Side::Source => (
                transfer_type.source_is_memory(),
                channel.cfg_l.hs_sel_src(),
                channel.cfg_h.src_per(),
                "source software handshake",
            ),
            Side::Destination => (
                transfer_type.destination_is_memory(),
                channel.cfg_l.hs_sel_dst(),
                channel.cfg_h.dst_per(),
                "destination software handshake",
            ),
        };
        if is_memory {
            return Ok(true);
        }
        if software {
            return Err(ChannelError::Unsupported(what));
        }
        Ok(self.handshake[usize::from(line)])
    }

    /// Moves one unit: a source read followed by a destination write.
    ///
    /// A failed destination write leaves the source address advanced.
    fn transfer_unit(&mut self, index: usize) -> Result<(), ChannelError> {
        let channel = &mut self.channels[index];
        let mut data = [0; MAX_TRANSFER_WIDTH];

        let size = channel.src_width();
        let master = usize::from(channel.ctl_l.sms());
        self.masters[master]
            .read_at(channel.sar.into(), &mut data[..size])
            .map_err(|err| ChannelError::Bus {
                op: BusOp::SourceRead,
                master,
                address: channel.sar,
                size,
                err,
            })?;
        channel.advance_source();

        let size = channel.dst_width();
        let master = usize::from(channel.ctl_l.dms());
        self.masters[master]
            .write_at(channel.dar.into(), &data[..size])
            .map_err(|err| ChannelError::Bus {
                op: BusOp::DestinationWrite,
                master,
                address: channel.dar,
                size,
                err,
            })?;
        channel.advance_destination();

        channel.transfer_count += 1;
        tracing::trace!(
            channel = index,
            sar = format_args!("{:#010x}", channel.sar),
            dar = format_args!("{:#010x}", channel.dar),
            transfer_count = channel.transfer_count,
            "unit transferred"
        );

        if channel.ctl_l.int_en() {
            let transfer_type = channel.transfer_type();
            let mut raised = false;
            if !transfer_type.source_is_memory() {
                self.interrupts.raise(InterruptClass::SourceTransaction, index);
                raised = true;
            }
            if !transfer_type.destination_is_memory() {
                self.interrupts
                    .raise(InterruptClass::DestinationTransaction, index);
                raised = true;
            }
            if raised {
                self.update_irq();
            }
        }
        Ok(())
    }

    fn abort_channel(&mut self, index: usize, err: ChannelError) {
        match &err {
            ChannelError::Suspended => {
                tracing::debug!(channel = index, "channel suspended, disabling");
            }
            ChannelError::Bus { .. } => {
                tracelimit::error_ratelimited!(
                    channel = index,
                    error = &err as &dyn std::error::Error,
                    "dma bus error"
                );
            }
            ChannelError::Unsupported(_) | ChannelError::DescriptorLoop(_) => {
                tracelimit::warn_ratelimited!(
                    channel = index,
                    error = &err as &dyn std::error::Error,
                    "channel stopped"
                );
            }
        }
        if self.channels[index].ctl_l.int_en() {
            self.interrupts.raise(InterruptClass::Error, index);
            self.update_irq();
        }
        self.disable_channel(index);
    }
}

fn write_back_control(
    memory: &GuestMemory,
    descriptor: DescriptorRef,
    ctl_h: CtlHigh,
) -> Result<(), ChannelError> {
    let address = descriptor.address.wrapping_add(LLI_CTL_H_OFFSET as u32);
    memory
        .write_plain(address.into(), &u32::from(ctl_h))
        .map_err(|err| ChannelError::Bus {
            op: BusOp::DescriptorWriteBack,
            master: descriptor.master,
            address,
            size: size_of::<u32>(),
            err,
        })
}
