//! Entities Layer: Socket Identities and Addresses
//!
//! Provides the plain data types shared by every layer of the socket stack:
//! handle identities, the family/type/protocol triple, handle lifecycle states,
//! Bluetooth device addresses and the typed socket address.
//!
//! ## Overview
//!
//! Nothing in this crate touches a descriptor. The types here are inert values
//! that the infrastructure, adapters and facade crates pass between each other.
//!
//! - **Identities**: [`HandleId`], allocated by the handle registry
//! - **Classification**: [`AddressFamily`], [`SocketType`], [`Protocol`]
//! - **Lifecycle**: [`SocketState`]
//! - **Addresses**: [`Address`], [`BdAddr`], [`AddressPurpose`]
//!
//! ## See Also
//!
//! - `infrastructure_handle_registry`: allocates [`HandleId`] values
//! - `adapters_socket`: encodes [`Address`] into native socket addresses

/*
 * %CopyrightBegin%
 *
 * SPDX-License-Identifier: Apache-2.0
 *
 * Copyright Lee Barney 2025. All Rights Reserved.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 *
 * %CopyrightEnd%
 */

pub mod address;
pub mod bdaddr;
pub mod family;
pub mod handle;

pub use address::{ipv6_full, Address, AddressPurpose, SOCKADDR_SIZE_MAX};
pub use bdaddr::{BdAddr, BdAddrParseError};
pub use family::{AddressFamily, Protocol, SocketType};
pub use handle::{HandleId, SocketState};
