// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use super::buffer::{BufferState, ReadBuffer};
use crate::storage::client::{BlobClient, RemoteError, TransferOptions};
use crate::storage::config::ReadOptions;
use crate::storage::error::{StorageError, StorageResult};

/// Flags a file is opened with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    pub read: bool,
    pub write: bool,
    /// Never buffer, every read is one ranged fetch
    pub direct_io: bool,
}

impl OpenFlags {
    pub const READ: OpenFlags = OpenFlags {
        read: true,
        write: false,
        direct_io: false,
    };

    pub const WRITE: OpenFlags = OpenFlags {
        read: false,
        write: true,
        direct_io: false,
    };

    pub fn with_direct_io(mut self) -> Self {
        self.direct_io = true;
        self
    }
}

/// An open blob.
///
/// Length and modification time are captured at open. Reads go through a
/// read-ahead window of `buffer_size` bytes; requests that would not fit in a
/// refill are fetched directly into the caller's buffer.
///
/// A handle is used by one caller at a time, hence `&mut self` on every read.
#[derive(Debug)]
pub struct AzureFileHandle {
    path: String,
    flags: OpenFlags,
    length: u64,
    last_modified: Option<DateTime<Utc>>,
    buffer: ReadBuffer,
    file_offset: u64,
    blob_client: Arc<dyn BlobClient>,
    read_options: ReadOptions,
}

impl AzureFileHandle {
    /// Open `path` by fetching its properties once.
    ///
    /// # Errors
    ///
    /// Returns `Io` carrying the service's code and reason when the metadata fetch
    /// is rejected, `InvalidFormat` when the blob name is not a valid object path,
    /// or an `Io` hinting at bad credentials for any other failure.
    pub(crate) async fn open(
        path: &str,
        flags: OpenFlags,
        blob_client: Arc<dyn BlobClient>,
        read_options: ReadOptions,
    ) -> StorageResult<Self> {
        let properties = blob_client.properties().await.map_err(|e| match e {
            RemoteError::Service { .. } | RemoteError::InvalidPath(_) => {
                StorageError::from_remote(format!("AzureStorageFileSystem open file '{}'", path), e)
            }
            RemoteError::Other(message) => StorageError::io(format!(
                "AzureStorageFileSystem could not open file: '{}', unknown error occurred, this could mean \
                 the credentials used were wrong. Original error message: '{}'",
                path, message
            )),
        })?;

        debug!(
            "Opened path={} length={} direct_io={}",
            path, properties.size, flags.direct_io
        );
        Ok(Self {
            path: path.to_string(),
            flags,
            length: properties.size,
            last_modified: properties.last_modified,
            buffer: ReadBuffer::new(read_options.buffer_size),
            file_offset: 0,
            blob_client,
            read_options,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    pub fn file_size(&self) -> u64 {
        self.length
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    /// Current logical offset.
    pub fn position(&self) -> u64 {
        self.file_offset
    }

    pub fn buffer_state(&self) -> BufferState {
        self.buffer.state()
    }

    pub fn read_options(&self) -> &ReadOptions {
        &self.read_options
    }

    /// Move the logical offset. No I/O.
    pub fn seek(&mut self, location: u64) {
        self.file_offset = location;
    }

    /// Read up to `buf.len()` bytes at the current offset, clamped to the end of the blob.
    ///
    /// Returns the number of bytes read; `0` at or past end of file, including after
    /// a seek beyond it.
    pub async fn read(&mut self, buf: &mut [u8]) -> StorageResult<usize> {
        let max_read = self.length.saturating_sub(self.file_offset);
        let count = (buf.len() as u64).min(max_read) as usize;
        if count == 0 {
            return Ok(0);
        }
        let offset = self.file_offset;
        self.read_at(&mut buf[..count], offset).await?;
        Ok(count)
    }

    /// Fill `buf` with the bytes at `offset`.
    ///
    /// # Errors
    ///
    /// Returns `Io` without touching the network if the range ends past the blob,
    /// or if a ranged fetch fails.
    pub async fn read_at(&mut self, buf: &mut [u8], offset: u64) -> StorageResult<()> {
        let length = buf.len() as u64;
        if offset.checked_add(length).map_or(true, |end| end > self.length) {
            return Err(StorageError::io(format!(
                "Read of {} bytes at offset {} is out of bounds for '{}' of length {}",
                length, offset, self.path, self.length
            )));
        }

        if self.flags.direct_io && length > 0 {
            let data = self.read_range(offset, length).await?;
            buf.copy_from_slice(&data);
            self.buffer.reset();
            self.file_offset = offset + length;
            return Ok(());
        }

        self.buffer.position_at(offset);
        self.file_offset = offset;

        let mut filled = 0;
        while filled < buf.len() {
            let copied = self.buffer.copy_to(&mut buf[filled..]);
            filled += copied;
            self.file_offset += copied as u64;
            if filled == buf.len() {
                break;
            }

            let remaining = (buf.len() - filled) as u64;
            let refill_len = self
                .buffer
                .capacity()
                .min(self.length - self.file_offset);

            if remaining > refill_len {
                debug!(
                    "Bypassing buffer for path={} offset={} length={}",
                    self.path, self.file_offset, remaining
                );
                let data = self.read_range(self.file_offset, remaining).await?;
                buf[filled..].copy_from_slice(&data);
                self.buffer.bypass();
                self.file_offset += remaining;
                break;
            }

            debug!(
                "Refilling buffer for path={} offset={} length={}",
                self.path, self.file_offset, refill_len
            );
            let data = self.read_range(self.file_offset, refill_len).await?;
            self.buffer.refill(self.file_offset, data);
        }
        Ok(())
    }

    /// One ranged fetch of exactly `length` bytes.
    async fn read_range(&self, offset: u64, length: u64) -> StorageResult<Bytes> {
        let data = self
            .blob_client
            .download_range(offset, length, TransferOptions::from(&self.read_options))
            .await
            .map_err(|e| {
                StorageError::from_remote(format!("AzureStorageFileSystem Read to '{}'", self.path), e)
            })?;

        if data.len() as u64 != length {
            return Err(StorageError::io(format!(
                "AzureStorageFileSystem Read to '{}' returned {} bytes, expected {}",
                self.path,
                data.len(),
                length
            )));
        }
        Ok(data)
    }
}
