// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-channel register state.

use crate::spec::AddressUpdate;
use crate::spec::CFG_HIGH_FIELDS;
use crate::spec::CFG_LOW_FIELDS;
use crate::spec::CTL_HIGH_FIELDS;
use crate::spec::CTL_LOW_FIELDS;
use crate::spec::CfgHigh;
use crate::spec::CfgLow;
use crate::spec::ChannelRegister;
use crate::spec::CtlHigh;
use crate::spec::CtlLow;
use crate::spec::Dsr;
use crate::spec::FieldDump;
use crate::spec::LLP_FIELDS;
use crate::spec::Lli;
use crate::spec::Llp;
use crate::spec::Sgr;
use crate::spec::TRANSFER_WIDTHS;
use crate::spec::TransferType;

/// Where the current block's parameters were loaded from, for control word
/// write-back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DescriptorRef {
    pub master: usize,
    pub address: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct Channel {
    pub sar: u32,
    pub dar: u32,
    pub llp: Llp,
    pub ctl_l: CtlLow,
    pub ctl_h: CtlHigh,
    pub cfg_l: CfgLow,
    pub cfg_h: CfgHigh,
    pub sgr: Sgr,
    pub dsr: Dsr,
    /// Units moved in the current block.
    pub transfer_count: u32,
    pub descriptor: Option<DescriptorRef>,
}

impl Channel {
    pub fn new() -> Self {
        Self {
            sar: 0,
            dar: 0,
            llp: Llp::new(),
            ctl_l: CtlLow::new(),
            ctl_h: CtlHigh::new(),
            cfg_l: CfgLow::new(),
            cfg_h: CfgHigh::new(),
            sgr: Sgr::new(),
            dsr: Dsr::new(),
            transfer_count: 0,
            descriptor: None,
        }
    }

    /// Reads a channel register. While the channel is enabled, `CTL_H`
    /// reports the number of units moved so far in the current block.
    pub fn read(&self, reg: ChannelRegister, enabled: bool) -> u32 {
        match reg {
            ChannelRegister::Sar => self.sar,
            ChannelRegister::Dar => self.dar,
            ChannelRegister::Llp => self.llp.into(),
            ChannelRegister::CtlLow => self.ctl_l.into(),
            ChannelRegister::CtlHigh => {
                if enabled {
                    self.transfer_count
                } else {
                    self.ctl_h.into()
                }
            }
            ChannelRegister::Sstat
            | ChannelRegister::Dstat
            | ChannelRegister::Sstatar
            | ChannelRegister::Dstatar => 0,
            ChannelRegister::CfgLow => self.cfg_l.into(),
            ChannelRegister::CfgHigh => self.cfg_h.into(),
            ChannelRegister::Sgr => self.sgr.into(),
            ChannelRegister::Dsr => self.dsr.into(),
        }
    }

    /// Writes a channel register. Writing `CTL_H` starts a new block: the
    /// unit count restarts and the block no longer belongs to a descriptor.
    pub fn write(&mut self, reg: ChannelRegister, value: u32) {
        match reg {
            ChannelRegister::Sar => self.sar = value,
            ChannelRegister::Dar => self.dar = value,
            ChannelRegister::Llp => self.llp = value.into(),
            ChannelRegister::CtlLow => {
                self.ctl_l = value.into();
                self.descriptor = None;
            }
            ChannelRegister::CtlHigh => {
                self.ctl_h = value.into();
                self.transfer_count = 0;
                self.descriptor = None;
            }
            ChannelRegister::Sstat
            | ChannelRegister::Dstat
            | ChannelRegister::Sstatar
            | ChannelRegister::Dstatar => {
                tracelimit::warn_ratelimited!(
                    ?reg,
                    value,
                    "write to unimplemented status register"
                );
            }
            // The model has no FIFO.
            ChannelRegister::CfgLow => self.cfg_l = CfgLow::from(value).with_fifo_empty(true),
            ChannelRegister::CfgHigh => self.cfg_h = value.into(),
            ChannelRegister::Sgr => self.sgr = value.into(),
            ChannelRegister::Dsr => self.dsr = value.into(),
        }
    }

    /// Replaces the block parameters with those of a linked-list item read
    /// from `descriptor`.
    pub fn load(&mut self, lli: &Lli, descriptor: DescriptorRef) {
        self.sar = lli.sar;
        self.dar = lli.dar;
        self.llp = lli.llp.into();
        self.ctl_l = lli.ctl_l.into();
        self.ctl_h = lli.ctl_h.into();
        self.transfer_count = 0;
        self.descriptor = Some(descriptor);
    }

    pub fn transfer_type(&self) -> TransferType {
        TransferType::from_bits(self.ctl_l.tt_fc())
    }

    pub fn block_exhausted(&self) -> bool {
        self.transfer_count >= u32::from(self.ctl_h.block_ts())
    }

    pub fn src_width(&self) -> usize {
        TRANSFER_WIDTHS[usize::from(self.ctl_l.src_tr_width())]
    }

    pub fn dst_width(&self) -> usize {
        TRANSFER_WIDTHS[usize::from(self.ctl_l.dst_tr_width())]
    }

    pub fn advance_source(&mut self) {
        self.sar = AddressUpdate::from_bits(self.ctl_l.sinc()).apply(self.sar, self.src_width());
    }

    pub fn advance_destination(&mut self) {
        self.dar = AddressUpdate::from_bits(self.ctl_l.dinc()).apply(self.dar, self.dst_width());
    }

    pub fn trace_dump(&self, index: usize) {
        tracing::trace!(
            channel = index,
            sar = format_args!("{:#010x}", self.sar),
            dar = format_args!("{:#010x}", self.dar),
            llp = %FieldDump { fields: LLP_FIELDS, value: self.llp.into() },
            ctl_l = %FieldDump { fields: CTL_LOW_FIELDS, value: self.ctl_l.into() },
            ctl_h = %FieldDump { fields: CTL_HIGH_FIELDS, value: self.ctl_h.into() },
            cfg_l = %FieldDump { fields: CFG_LOW_FIELDS, value: self.cfg_l.into() },
            cfg_h = %FieldDump { fields: CFG_HIGH_FIELDS, value: self.cfg_h.into() },
            sgr = format_args!("{:#010x}", u32::from(self.sgr)),
            dsr = format_args!("{:#010x}", u32::from(self.dsr)),
            transfer_count = self.transfer_count,
            "channel state"
        );
    }
}
