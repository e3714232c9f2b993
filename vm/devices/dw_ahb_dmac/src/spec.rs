// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Register layout of the DesignWare AHB DMA controller (DW_ahb_dmac), as
//! configured on the GX SoCs.

#![expect(missing_docs)] // register names follow the databook

use bitfield_struct::bitfield;
use static_assertions::const_assert_eq;
use std::fmt;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;

pub const NUM_CHANNELS: usize = 8;
pub const NUM_HANDSHAKE_LINES: usize = 16;
pub const NUM_MASTERS: usize = 4;

pub const MMIO_REGION_SIZE: u64 = 0x400;

/// Distance between two channels' register blocks.
pub const CHANNEL_STRIDE: u64 = 0x58;
/// End of the per-channel register blocks.
pub const CHANNEL_REGION_END: u64 = CHANNEL_STRIDE * NUM_CHANNELS as u64;

/// Transfer width in bytes, indexed by the 3-bit `SRC_TR_WIDTH`/`DST_TR_WIDTH`
/// encodings. Encodings 6 and 7 alias to 32 bytes.
pub const TRANSFER_WIDTHS: [usize; 8] = [1, 2, 4, 8, 16, 32, 32, 32];
pub const MAX_TRANSFER_WIDTH: usize = 32;

pub const DMA_ID_VALUE: u32 = 0x0208_0901;
pub const LP_TIMEOUT_VALUE: u32 = 0x08;
pub const COMPONENT_ID_VALUE: u32 = 0x4457_1110;

/// A field within a 32-bit register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterField {
    pub name: &'static str,
    pub offset: u32,
    pub width: u32,
}

impl RegisterField {
    const fn new(name: &'static str, offset: u32, width: u32) -> Self {
        Self {
            name,
            offset,
            width,
        }
    }

    pub const fn mask(&self) -> u32 {
        (((1u64 << self.width) - 1) as u32) << self.offset
    }

    pub const fn extract(&self, value: u32) -> u32 {
        (value & self.mask()) >> self.offset
    }
}

/// Formats a register value as `name=value` pairs, for trace dumps.
pub struct FieldDump {
    pub fields: &'static [RegisterField],
    pub value: u32,
}

impl fmt::Display for FieldDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.value)?;
        for field in self.fields {
            write!(f, " {}={}", field.name, field.extract(self.value))?;
        }
        Ok(())
    }
}

#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct Llp {
    /// List master select.
    #[bits(2)]
    pub lms: u8,
    /// Word address of the next linked-list item, or 0 for none.
    #[bits(30)]
    pub loc: u32,
}

impl Llp {
    /// Byte address of the linked-list item.
    pub fn address(&self) -> u32 {
        self.loc() << 2
    }
}

pub const LLP_FIELDS: &[RegisterField] = &[
    RegisterField::new("lms", 0, 2),
    RegisterField::new("loc", 2, 30),
];

#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct CtlLow {
    pub int_en: bool,
    #[bits(3)]
    pub dst_tr_width: u8,
    #[bits(3)]
    pub src_tr_width: u8,
    #[bits(2)]
    pub dinc: u8,
    #[bits(2)]
    pub sinc: u8,
    #[bits(3)]
    pub dest_msize: u8,
    #[bits(3)]
    pub src_msize: u8,
    pub src_gather_en: bool,
    pub dst_scatter_en: bool,
    #[bits(1)]
    __: u8,
    #[bits(3)]
    pub tt_fc: u8,
    #[bits(2)]
    pub dms: u8,
    #[bits(2)]
    pub sms: u8,
    pub llp_dst_en: bool,
    pub llp_src_en: bool,
    #[bits(3)]
    __: u8,
}

pub const CTL_LOW_FIELDS: &[RegisterField] = &[
    RegisterField::new("int_en", 0, 1),
    RegisterField::new("dst_tr_width", 1, 3),
    RegisterField::new("src_tr_width", 4, 3),
    RegisterField::new("dinc", 7, 2),
    RegisterField::new("sinc", 9, 2),
    RegisterField::new("dest_msize", 11, 3),
    RegisterField::new("src_msize", 14, 3),
    RegisterField::new("src_gather_en", 17, 1),
    RegisterField::new("dst_scatter_en", 18, 1),
    RegisterField::new("tt_fc", 20, 3),
    RegisterField::new("dms", 23, 2),
    RegisterField::new("sms", 25, 2),
    RegisterField::new("llp_dst_en", 27, 1),
    RegisterField::new("llp_src_en", 28, 1),
];

#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct CtlHigh {
    #[bits(12)]
    pub block_ts: u16,
    pub done: bool,
    #[bits(19)]
    __: u32,
}

pub const CTL_HIGH_FIELDS: &[RegisterField] = &[
    RegisterField::new("block_ts", 0, 12),
    RegisterField::new("done", 12, 1),
];

#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct CfgLow {
    #[bits(5)]
    __: u8,
    #[bits(3)]
    pub ch_prior: u8,
    pub ch_susp: bool,
    /// Read-only. The model has no FIFO, so this always reads as empty.
    pub fifo_empty: bool,
    /// Destination handshake select: 0 = hardware, 1 = software.
    pub hs_sel_dst: bool,
    /// Source handshake select: 0 = hardware, 1 = software.
    pub hs_sel_src: bool,
    #[bits(2)]
    pub lock_ch_l: u8,
    #[bits(2)]
    pub lock_b_l: u8,
    pub lock_ch: bool,
    pub lock_b: bool,
    pub dst_hs_pol: bool,
    pub src_hs_pol: bool,
    #[bits(10)]
    pub max_abrst: u16,
    pub reload_src: bool,
    pub reload_dst: bool,
}

pub const CFG_LOW_FIELDS: &[RegisterField] = &[
    RegisterField::new("ch_prior", 5, 3),
    RegisterField::new("ch_susp", 8, 1),
    RegisterField::new("fifo_empty", 9, 1),
    RegisterField::new("hs_sel_dst", 10, 1),
    RegisterField::new("hs_sel_src", 11, 1),
    RegisterField::new("lock_ch_l", 12, 2),
    RegisterField::new("lock_b_l", 14, 2),
    RegisterField::new("lock_ch", 16, 1),
    RegisterField::new("lock_b", 17, 1),
    RegisterField::new("dst_hs_pol", 18, 1),
    RegisterField::new("src_hs_pol", 19, 1),
    RegisterField::new("max_abrst", 20, 10),
    RegisterField::new("reload_src", 30, 1),
    RegisterField::new("reload_dst", 31, 1),
];

#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct CfgHigh {
    pub fcmode: bool,
    pub fifo_mode: bool,
    #[bits(3)]
    pub protctl: u8,
    pub ds_upd_en: bool,
    pub ss_upd_en: bool,
    /// Handshake line for the source peripheral.
    #[bits(4)]
    pub src_per: u8,
    /// Handshake line for the destination peripheral.
    #[bits(4)]
    pub dst_per: u8,
    #[bits(17)]
    __: u32,
}

pub const CFG_HIGH_FIELDS: &[RegisterField] = &[
    RegisterField::new("fcmode", 0, 1),
    RegisterField::new("fifo_mode", 1, 1),
    RegisterField::new("protctl", 2, 3),
    RegisterField::new("ds_upd_en", 5, 1),
    RegisterField::new("ss_upd_en", 6, 1),
    RegisterField::new("src_per", 7, 4),
    RegisterField::new("dst_per", 11, 4),
];

/// Source gather register.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct Sgr {
    #[bits(20)]
    pub sgi: u32,
    #[bits(12)]
    pub sgc: u16,
}

/// Destination scatter register.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct Dsr {
    #[bits(20)]
    pub dsi: u32,
    #[bits(12)]
    pub dsc: u16,
}

/// Layout shared by the interrupt mask registers and `ChEnReg`: the upper
/// byte write-enables the corresponding bits of the lower byte.
#[bitfield(u32)]
pub struct ByteEnableWrite {
    pub value: u8,
    pub write_enable: u8,
    #[bits(16)]
    __: u16,
}

impl ByteEnableWrite {
    /// Merges this write into `old`. Bits without a write enable keep their
    /// old value.
    pub fn apply(self, old: u32) -> u32 {
        let enable = u32::from(self.write_enable());
        (!enable & old) | (enable & u32::from(self.value()))
    }
}

#[bitfield(u32)]
pub struct DmaCfg {
    pub dma_en: bool,
    #[bits(31)]
    __: u32,
}

/// Transfer type and flow controller (`CTL_L.TT_FC`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    MemToMemDmac,
    MemToPerDmac,
    PerToMemDmac,
    PerToPerDmac,
    PerToMemPeripheral,
    PerToPerSourcePeripheral,
    MemToPerPeripheral,
    PerToPerDestinationPeripheral,
}

impl TransferType {
    pub fn from_bits(tt_fc: u8) -> Self {
        match tt_fc & 7 {
            0 => Self::MemToMemDmac,
            1 => Self::MemToPerDmac,
            2 => Self::PerToMemDmac,
            3 => Self::PerToPerDmac,
            4 => Self::PerToMemPeripheral,
            5 => Self::PerToPerSourcePeripheral,
            6 => Self::MemToPerPeripheral,
            _ => Self::PerToPerDestinationPeripheral,
        }
    }

    /// A peripheral, not the DMAC, decides when the block ends.
    pub fn peripheral_flow_control(self) -> bool {
        matches!(
            self,
            Self::PerToMemPeripheral
                | Self::PerToPerSourcePeripheral
                | Self::MemToPerPeripheral
                | Self::PerToPerDestinationPeripheral
        )
    }

    /// The source is memory, so it never waits on a handshake.
    pub fn source_is_memory(self) -> bool {
        matches!(
            self,
            Self::MemToMemDmac | Self::MemToPerDmac | Self::MemToPerPeripheral
        )
    }

    /// The destination is memory, so it never waits on a handshake.
    pub fn destination_is_memory(self) -> bool {
        matches!(
            self,
            Self::MemToMemDmac | Self::PerToMemDmac | Self::PerToMemPeripheral
        )
    }
}

/// Address update policy for one side of a channel (`CTL_L.SINC`/`DINC`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressUpdate {
    Increment,
    Decrement,
    Fixed,
}

impl AddressUpdate {
    pub fn from_bits(inc: u8) -> Self {
        match inc {
            0 => Self::Increment,
            1 => Self::Decrement,
            _ => Self::Fixed,
        }
    }

    pub fn apply(self, address: u32, width: usize) -> u32 {
        // Widths are at most 32 bytes.
        let width = width as u32;
        match self {
            Self::Increment => address.wrapping_add(width),
            Self::Decrement => address.wrapping_sub(width),
            Self::Fixed => address,
        }
    }
}

/// A linked-list item, as laid out in guest memory.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, Immutable, KnownLayout)]
pub struct Lli {
    pub sar: u32,
    pub dar: u32,
    pub llp: u32,
    pub ctl_l: u32,
    pub ctl_h: u32,
    pub sstat: u32,
    pub dstat: u32,
}

const_assert_eq!(size_of::<Lli>(), 28);

/// Offset of the `CTL_H` word written back on block completion.
pub const LLI_CTL_H_OFFSET: u64 = std::mem::offset_of!(Lli, ctl_h) as u64;

/// Registers within one channel's block, by offset from the block start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRegister {
    Sar,
    Dar,
    Llp,
    CtlLow,
    CtlHigh,
    Sstat,
    Dstat,
    Sstatar,
    Dstatar,
    CfgLow,
    CfgHigh,
    Sgr,
    Dsr,
}

impl ChannelRegister {
    pub fn from_offset(offset: u64) -> Option<Self> {
        let reg = match offset {
            0x00 => Self::Sar,
            0x08 => Self::Dar,
            0x10 => Self::Llp,
            0x18 => Self::CtlLow,
            0x1c => Self::CtlHigh,
            0x20 => Self::Sstat,
            0x28 => Self::Dstat,
            0x30 => Self::Sstatar,
            0x38 => Self::Dstatar,
            0x40 => Self::CfgLow,
            0x44 => Self::CfgHigh,
            0x48 => Self::Sgr,
            0x50 => Self::Dsr,
            _ => return None,
        };
        Some(reg)
    }
}

/// The five interrupt event classes, in `StatusInt` bit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptClass {
    Transfer,
    Block,
    SourceTransaction,
    DestinationTransaction,
    Error,
}

impl InterruptClass {
    pub const ALL: [Self; 5] = [
        Self::Transfer,
        Self::Block,
        Self::SourceTransaction,
        Self::DestinationTransaction,
        Self::Error,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

const RAW_TFR: u64 = 0x2c0;
const STATUS_TFR: u64 = 0x2e8;
const MASK_TFR: u64 = 0x310;
const CLEAR_TFR: u64 = 0x338;
/// Distance between the same register of two interrupt classes.
const INTERRUPT_CLASS_STRIDE: u64 = 8;

const STATUS_INT: u64 = 0x360;
const REQ_SRC: u64 = 0x368;
const REQ_DST: u64 = 0x370;
const SGL_RQ_SRC: u64 = 0x378;
const SGL_RQ_DST: u64 = 0x380;
const LST_SRC: u64 = 0x388;
const LST_DST: u64 = 0x390;
const DMA_CFG: u64 = 0x398;
const CH_EN: u64 = 0x3a0;
const DMA_ID: u64 = 0x3a8;
const DMA_TEST: u64 = 0x3b0;
const DMA_LP_TIMEOUT: u64 = 0x3b8;
const COMP_PARAMS_6_L: u64 = 0x3c8;
const COMP_PARAMS_2_H: u64 = 0x3ec;
const COMP_PARAMS_1_L: u64 = 0x3f0;
const COMP_PARAMS_1_H: u64 = 0x3f4;
const DMA_COMP_ID: u64 = 0x3f8;

const_assert_eq!(CHANNEL_REGION_END, RAW_TFR);

/// Registers outside the per-channel blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalRegister {
    Raw(InterruptClass),
    Status(InterruptClass),
    Mask(InterruptClass),
    Clear(InterruptClass),
    StatusInt,
    SoftwareHandshake(&'static str),
    DmaCfg,
    ChEn,
    DmaId,
    DmaTest,
    LpTimeout,
    ComponentParams(ComponentParams),
    ComponentId,
}

impl GlobalRegister {
    pub fn from_offset(offset: u64) -> Option<Self> {
        let reg = match offset {
            RAW_TFR..STATUS_TFR => Self::Raw(interrupt_class(offset - RAW_TFR)?),
            STATUS_TFR..MASK_TFR => Self::Status(interrupt_class(offset - STATUS_TFR)?),
            MASK_TFR..CLEAR_TFR => Self::Mask(interrupt_class(offset - MASK_TFR)?),
            CLEAR_TFR..STATUS_INT => Self::Clear(interrupt_class(offset - CLEAR_TFR)?),
            STATUS_INT => Self::StatusInt,
            REQ_SRC => Self::SoftwareHandshake("ReqSrcReg"),
            REQ_DST => Self::SoftwareHandshake("ReqDstReg"),
            SGL_RQ_SRC => Self::SoftwareHandshake("SglRqSrcReg"),
            SGL_RQ_DST => Self::SoftwareHandshake("SglRqDstReg"),
            LST_SRC => Self::SoftwareHandshake("LstSrcReg"),
            LST_DST => Self::SoftwareHandshake("LstDstReg"),
            DMA_CFG => Self::DmaCfg,
            CH_EN => Self::ChEn,
            DMA_ID => Self::DmaId,
            DMA_TEST => Self::DmaTest,
            DMA_LP_TIMEOUT => Self::LpTimeout,
            COMP_PARAMS_6_L..=COMP_PARAMS_1_H => Self::ComponentParams(match offset {
                COMP_PARAMS_6_L => ComponentParams::Reserved,
                COMP_PARAMS_2_H => ComponentParams::MultiBlockType,
                COMP_PARAMS_1_L => ComponentParams::MaxBlockSize,
                COMP_PARAMS_1_H => ComponentParams::Controller,
                _ => ComponentParams::Channel,
            }),
            DMA_COMP_ID => Self::ComponentId,
            _ => return None,
        };
        Some(reg)
    }
}

fn interrupt_class(offset: u64) -> Option<InterruptClass> {
    if offset % INTERRUPT_CLASS_STRIDE != 0 {
        return None;
    }
    InterruptClass::ALL
        .get((offset / INTERRUPT_CLASS_STRIDE) as usize)
        .copied()
}

/// The read-only `DMA_COMP_PARAMS_*` capability words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentParams {
    /// `DMA_COMP_PARAMS_6_L`, always zero.
    Reserved,
    /// `DMA_COMP_PARAMS_6_H` through `DMA_COMP_PARAMS_2_L`: one
    /// [`CompParamChannel`] per channel, all identical here.
    Channel,
    /// `DMA_COMP_PARAMS_2_H`: multi-block type per channel.
    MultiBlockType,
    /// `DMA_COMP_PARAMS_1_L`: max block size per channel.
    MaxBlockSize,
    /// `DMA_COMP_PARAMS_1_H`: controller-wide parameters.
    Controller,
}

impl ComponentParams {
    pub fn value(self, channel_count: usize) -> u32 {
        match self {
            Self::Reserved => 0,
            Self::Channel => CHANNEL_PARAMS.0,
            Self::MultiBlockType => replicate_nibble(MULTI_BLK_TYPE_PROGRAMMABLE),
            Self::MaxBlockSize => replicate_nibble(MAX_BLK_SIZE_4095),
            Self::Controller => CONTROLLER_PARAMS
                .with_num_channels((channel_count - 1) as u8)
                .0,
        }
    }
}

/// Repeats a 4-bit per-channel parameter across all eight channels.
const fn replicate_nibble(value: u32) -> u32 {
    (value & 0xf) * 0x1111_1111
}

const MULTI_BLK_TYPE_PROGRAMMABLE: u32 = 0;
const MAX_BLK_SIZE_4095: u32 = 0xa;

#[bitfield(u32)]
pub struct CompParamChannel {
    #[bits(3)]
    pub dtw: u8,
    #[bits(3)]
    pub stw: u8,
    pub stat_dst: bool,
    pub stat_src: bool,
    pub dst_sca_en: bool,
    pub src_gat_en: bool,
    pub lock_en: bool,
    pub multi_blk_en: bool,
    pub ctl_wb_en: bool,
    pub hc_llp: bool,
    #[bits(2)]
    pub fc: u8,
    #[bits(3)]
    pub max_mult_size: u8,
    #[bits(3)]
    pub dms: u8,
    #[bits(3)]
    pub lms: u8,
    #[bits(3)]
    pub sms: u8,
    #[bits(3)]
    pub fifo_depth: u8,
    #[bits(1)]
    __: u8,
}

const FC_ANY: u8 = 3;
const MAX_MULT_SIZE_16: u8 = 2;
const MASTER_SELECT_PROGRAMMABLE: u8 = 4;
const FIFO_DEPTH_128: u8 = 4;

const CHANNEL_PARAMS: CompParamChannel = CompParamChannel::new()
    .with_dst_sca_en(true)
    .with_src_gat_en(true)
    .with_multi_blk_en(true)
    .with_ctl_wb_en(true)
    .with_fc(FC_ANY)
    .with_max_mult_size(MAX_MULT_SIZE_16)
    .with_dms(MASTER_SELECT_PROGRAMMABLE)
    .with_lms(MASTER_SELECT_PROGRAMMABLE)
    .with_sms(MASTER_SELECT_PROGRAMMABLE)
    .with_fifo_depth(FIFO_DEPTH_128);

#[bitfield(u32)]
pub struct CompParam1High {
    pub big_endian: bool,
    #[bits(2)]
    pub intr_io: u8,
    pub max_abrst: bool,
    #[bits(4)]
    __: u8,
    /// Channel count minus one.
    #[bits(3)]
    pub num_channels: u8,
    /// Master interface count minus one.
    #[bits(2)]
    pub num_master_int: u8,
    #[bits(2)]
    pub s_hdata_width: u8,
    #[bits(2)]
    pub m4_hdata_width: u8,
    #[bits(2)]
    pub m3_hdata_width: u8,
    #[bits(2)]
    pub m2_hdata_width: u8,
    #[bits(2)]
    pub m1_hdata_width: u8,
    #[bits(5)]
    pub num_hs_int: u8,
    pub add_encoded_params: bool,
    pub static_endian_select: bool,
    #[bits(2)]
    __: u8,
}

const INTR_IO_COMBINED: u8 = 2;
const HDATA_WIDTH_32: u8 = 0;
const HDATA_WIDTH_64: u8 = 1;

const CONTROLLER_PARAMS: CompParam1High = CompParam1High::new()
    .with_intr_io(INTR_IO_COMBINED)
    .with_max_abrst(true)
    .with_num_channels(NUM_CHANNELS as u8 - 1)
    .with_num_master_int(2)
    .with_s_hdata_width(HDATA_WIDTH_32)
    .with_m4_hdata_width(HDATA_WIDTH_32)
    .with_m3_hdata_width(HDATA_WIDTH_32)
    .with_m2_hdata_width(HDATA_WIDTH_32)
    .with_m1_hdata_width(HDATA_WIDTH_64)
    .with_num_hs_int(NUM_HANDSHAKE_LINES as u8)
    .with_add_encoded_params(true)
    .with_static_endian_select(true);
