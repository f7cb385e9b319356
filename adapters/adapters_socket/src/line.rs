//! Line Reader Module
//!
//! Peek-based line extraction. Bytes are inspected with a non-destructive
//! peek and only the bytes of the returned line (plus its delimiter) are
//! removed from the connection, so nothing after the delimiter is lost.
//!
//! A line ends at CR, LF or NUL. CR LF counts as one delimiter, including
//! when the two bytes straddle a peek window or arrive separately.

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

use std::io;
use std::mem::MaybeUninit;

use infrastructure_socket_errors::is_would_block;
use socket2::Socket as Socket2;

/// Initial peek window
pub const PEEK_WINDOW: usize = 256;
/// Largest peek window the reader grows to
pub const PEEK_WINDOW_MAX: usize = 64 * 1024;

/// Byte source supporting non-destructive peeks
#[cfg_attr(test, mockall::automock)]
pub trait PeekSource {
    /// Copy pending bytes into `buf` without consuming them
    fn peek(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    /// Remove up to `buf.len()` pending bytes, copying them into `buf`
    fn consume(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// [`PeekSource`] over a socket descriptor
pub struct DescriptorSource<'a>(pub &'a Socket2);

impl PeekSource for DescriptorSource<'_> {
    fn peek(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.peek(as_uninit(buf))
    }

    fn consume(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.recv(as_uninit(buf))
    }
}

/// View an initialized buffer as the uninitialized slice socket2 reads into
pub(crate) fn as_uninit(buf: &mut [u8]) -> &mut [MaybeUninit<u8>] {
    // SAFETY: MaybeUninit<u8> has the layout of u8, and the kernel only ever
    // writes initialized bytes into the slice.
    unsafe { std::slice::from_raw_parts_mut(buf.as_mut_ptr().cast::<MaybeUninit<u8>>(), buf.len()) }
}

/// Result of one [`LineBuffer::read_line`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// A complete line of the given length (delimiter excluded)
    Line(usize),
    /// Bytes without a delimiter; no more data was available
    Partial(usize),
    /// Nothing available on a non-blocking source
    WouldBlock,
    /// Orderly end of stream before any byte
    Closed,
}

/// Per-handle receive buffer used by the line reader
#[derive(Debug, Default)]
pub struct LineBuffer {
    data: Vec<u8>,
    /// The last line ended at a CR whose LF had not arrived yet
    skip_lf: bool,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of the line reported by the last [`LineBuffer::read_line`]
    pub fn line(&self, len: usize) -> &[u8] {
        &self.data[..len.min(self.data.len())]
    }

    /// Current buffer size
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Forget any pending CR state, e.g. after the connection is replaced
    pub fn reset(&mut self) {
        self.skip_lf = false;
    }

    /// Read one line from `source`
    ///
    /// # Returns
    ///
    /// * `Ok(LineOutcome)` - See [`LineOutcome`]
    /// * `Err(io::Error)` - Source failure with nothing accumulated
    pub fn read_line<S: PeekSource + ?Sized>(&mut self, source: &mut S) -> io::Result<LineOutcome> {
        if self.skip_lf {
            self.drop_pending_lf(source)?;
        }

        let mut pos = 0;
        let mut window = PEEK_WINDOW;
        loop {
            self.reserve(pos + window);
            let got = match source.peek(&mut self.data[pos..pos + window]) {
                Ok(n) => n,
                Err(_) if pos > 0 => return Ok(LineOutcome::Partial(pos)),
                Err(e) if is_would_block(&e) => return Ok(LineOutcome::WouldBlock),
                Err(e) => return Err(e),
            };
            if got == 0 {
                return Ok(if pos > 0 {
                    LineOutcome::Partial(pos)
                } else {
                    LineOutcome::Closed
                });
            }

            let scanned = &self.data[pos..pos + got];
            if let Some(i) = scanned.iter().position(|&b| matches!(b, b'\r' | b'\n' | 0)) {
                let mut take = i + 1;
                if scanned[i] == b'\r' {
                    take += self.trailing_lf(source, pos, i, got, window);
                }
                tracing::trace!(offset = pos + i, "line delimiter found");
                consume_exact(source, &mut self.data[pos..pos + take])?;
                return Ok(LineOutcome::Line(pos + i));
            }

            consume_exact(source, &mut self.data[pos..pos + got])?;
            pos += got;
            if got < window {
                return Ok(LineOutcome::Partial(pos));
            }
            window = (window * 2).min(PEEK_WINDOW_MAX);
        }
    }

    /// 1 when the CR at `pos + i` is followed by LF, else 0
    fn trailing_lf<S: PeekSource + ?Sized>(
        &mut self,
        source: &mut S,
        pos: usize,
        i: usize,
        got: usize,
        window: usize,
    ) -> usize {
        if i + 1 < got {
            return usize::from(self.data[pos + i + 1] == b'\n');
        }
        if got == window {
            // CR closes the window; the byte after it may already be queued.
            self.reserve(pos + got + 1);
            if let Ok(n) = source.peek(&mut self.data[pos..pos + got + 1]) {
                if n > got {
                    return usize::from(self.data[pos + got] == b'\n');
                }
            }
        }
        self.skip_lf = true;
        0
    }

    fn drop_pending_lf<S: PeekSource + ?Sized>(&mut self, source: &mut S) -> io::Result<()> {
        let mut one = [0u8; 1];
        match source.peek(&mut one) {
            Ok(1) => {
                self.skip_lf = false;
                if one[0] == b'\n' {
                    source.consume(&mut one)?;
                }
            }
            Ok(_) => self.skip_lf = false,
            // Nothing queued yet; the main loop reports the condition.
            Err(_) => {}
        }
        Ok(())
    }

    fn reserve(&mut self, len: usize) {
        if self.data.len() < len {
            self.data.resize(len, 0);
        }
    }
}

fn consume_exact<S: PeekSource + ?Sized>(source: &mut S, buf: &mut [u8]) -> io::Result<()> {
    let mut done = 0;
    while done < buf.len() {
        match source.consume(&mut buf[done..])? {
            0 => break,
            n => done += n,
        }
    }
    Ok(())
}
