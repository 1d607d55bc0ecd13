//! # Block Files
//!
//! Append-only `blk#####.dat` files. Each block is written as its bincode
//! header immediately followed by its bincode transactions, one after the
//! other with no length prefix. A transaction's [`DiskTxPos`] records where
//! its block starts and how far past the end of the header the transaction
//! begins, so a reader can seek straight to it:
//!
//! ```text
//! blk00000.dat
//! ┌────────────┬──────┬──────┬──────┬────────────┬──────┬───
//! │ header (0) │ tx 0 │ tx 1 │ tx 2 │ header (1) │ tx 0 │ ...
//! └────────────┴──────┴──────┴──────┴────────────┴──────┴───
//! ^ block_offset       ^ block_offset + header_len + tx_offset
//! ```
//!
//! Files roll over once they exceed [`MAX_BLOCK_FILE_SIZE`].

use bincode::Options;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::block::{Block, BlockHeader};
use crate::config::MAX_TX_SIZE;
use crate::error::StoreError;
use crate::transaction::Transaction;

/// Roll over to a new file once the current one passes this size.
pub const MAX_BLOCK_FILE_SIZE: u64 = 128 * 1024 * 1024;

/// Upper bound on an encoded [`BlockHeader`]. The real one is 112 bytes.
const MAX_HEADER_SIZE: u64 = 256;

/// Decode one record from `reader`, reading at most `limit` bytes.
///
/// Same wire format as `bincode::serialize`, but a length prefix that claims
/// more than `limit` fails as `SizeLimit` before anything is allocated.
fn decode_bounded<T: DeserializeOwned, R: Read>(reader: R, limit: u64) -> bincode::Result<T> {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(limit)
        .deserialize_from(reader)
}

#[derive(Debug, Error)]
pub enum BlockFileError {
    #[error("block file I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("block file decode error: {0}")]
    Decode(#[from] bincode::Error),
}

impl From<BlockFileError> for StoreError {
    fn from(e: BlockFileError) -> Self {
        match e {
            BlockFileError::Io { .. } => StoreError::BlockFile(e.to_string()),
            BlockFileError::Decode(inner) => StoreError::Decode(inner.to_string()),
        }
    }
}

/// Where a transaction lives on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskTxPos {
    /// File number: `blk<file:05>.dat`.
    pub file: u32,
    /// Offset of the block header within the file.
    pub block_offset: u64,
    /// Offset of the transaction, counted from the end of the header.
    pub tx_offset: u64,
}

/// Reader/writer over a directory of block files.
#[derive(Debug)]
pub struct BlockFiles {
    dir: PathBuf,
    /// `(current file number, its length)`, guarded so appends serialize.
    cursor: Mutex<(u32, u64)>,
}

impl BlockFiles {
    /// Open (creating if needed) the block-file directory and position the
    /// write cursor at the end of the newest file.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, BlockFileError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| BlockFileError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut file = 0u32;
        while Self::file_path(&dir, file + 1).exists() {
            file += 1;
        }
        let path = Self::file_path(&dir, file);
        let len = match fs::metadata(&path) {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };

        Ok(Self {
            dir,
            cursor: Mutex::new((file, len)),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_path(dir: &Path, file: u32) -> PathBuf {
        dir.join(format!("blk{:05}.dat", file))
    }

    /// Append a block and return one position per transaction, in order.
    pub fn append_block(&self, block: &Block) -> Result<Vec<DiskTxPos>, BlockFileError> {
        let header = bincode::serialize(&block.header)?;
        let mut body = Vec::new();
        let mut tx_offsets = Vec::with_capacity(block.transactions.len());
        for tx in &block.transactions {
            tx_offsets.push(body.len() as u64);
            bincode::serialize_into(&mut body, tx)?;
        }

        let mut cursor = self.cursor.lock();
        if cursor.1 > 0 && cursor.1 + (header.len() + body.len()) as u64 > MAX_BLOCK_FILE_SIZE {
            *cursor = (cursor.0 + 1, 0);
        }
        let (file, block_offset) = *cursor;

        let path = Self::file_path(&self.dir, file);
        let io_err = |source| BlockFileError::Io {
            path: path.clone(),
            source,
        };
        let mut handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;
        handle.write_all(&header).map_err(io_err)?;
        handle.write_all(&body).map_err(io_err)?;
        handle.sync_data().map_err(io_err)?;

        cursor.1 += (header.len() + body.len()) as u64;

        Ok(tx_offsets
            .into_iter()
            .map(|tx_offset| DiskTxPos {
                file,
                block_offset,
                tx_offset,
            })
            .collect())
    }

    /// Read the header of the block containing `pos` and the one
    /// transaction `pos` points at.
    pub fn read_tx_at(&self, pos: &DiskTxPos) -> Result<(BlockHeader, Transaction), BlockFileError> {
        let path = Self::file_path(&self.dir, pos.file);
        let io_err = |source| BlockFileError::Io {
            path: path.clone(),
            source,
        };

        let file = File::open(&path).map_err(io_err)?;
        let mut reader = BufReader::new(file);
        reader
            .seek(SeekFrom::Start(pos.block_offset))
            .map_err(io_err)?;
        let header: BlockHeader = decode_bounded(&mut reader, MAX_HEADER_SIZE)?;
        let tx_offset = i64::try_from(pos.tx_offset).map_err(|_| {
            io_err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "tx offset out of range",
            ))
        })?;
        reader.seek(SeekFrom::Current(tx_offset)).map_err(io_err)?;
        let tx: Transaction = decode_bounded(&mut reader, MAX_TX_SIZE)?;
        Ok((header, tx))
    }
}
