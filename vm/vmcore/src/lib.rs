// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Core device-emulation definitions shared by the peripheral models: the
//! output interrupt wire and the device lifecycle contract.

#![forbid(unsafe_code)]

pub mod device_state;
pub mod line_interrupt;
