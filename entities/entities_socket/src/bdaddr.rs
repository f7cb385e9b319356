//! Bluetooth device addresses

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

use std::fmt;
use std::str::FromStr;

/// 48-bit Bluetooth device address
///
/// Stored least-significant byte first, which is the order the kernel
/// socket structures use: `"AA:BB:CC:DD:EE:01"` is held as
/// `[0x01, 0xEE, 0xDD, 0xCC, 0xBB, 0xAA]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BdAddr([u8; 6]);

/// Error parsing a textual Bluetooth address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BdAddrParseError(pub String);

impl fmt::Display for BdAddrParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid bluetooth address: {}", self.0)
    }
}

impl std::error::Error for BdAddrParseError {}

impl BdAddr {
    /// Build from bytes in storage (little-endian) order
    pub const fn from_le_bytes(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Bytes in storage (little-endian) order
    pub const fn to_le_bytes(self) -> [u8; 6] {
        self.0
    }

    /// Pack into the low 48 bits of a `u64`, as `SOCKADDR_BTH` holds it
    pub fn to_u64(self) -> u64 {
        let mut wide = [0u8; 8];
        wide[..6].copy_from_slice(&self.0);
        u64::from_le_bytes(wide)
    }

    /// Inverse of [`BdAddr::to_u64`]; the upper 16 bits are ignored
    pub fn from_u64(value: u64) -> Self {
        let wide = value.to_le_bytes();
        let mut bytes = [0u8; 6];
        bytes.copy_from_slice(&wide[..6]);
        Self(bytes)
    }
}

impl FromStr for BdAddr {
    type Err = BdAddrParseError;

    /// Parse six colon-separated hex octets, most significant first
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut groups = text.trim().split(':');
        for slot in (0..6).rev() {
            let group = groups
                .next()
                .ok_or_else(|| BdAddrParseError(text.to_string()))?;
            if group.is_empty() || group.len() > 2 {
                return Err(BdAddrParseError(text.to_string()));
            }
            bytes[slot] =
                u8::from_str_radix(group, 16).map_err(|_| BdAddrParseError(text.to_string()))?;
        }
        if groups.next().is_some() {
            return Err(BdAddrParseError(text.to_string()));
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[5], b[4], b[3], b[2], b[1], b[0]
        )
    }
}
