//! AOF replay
//!
//! Reads the log back from the start and hands every command to a callback.
//! Unlike a connection, replay has nobody to report to: a malformed record
//! means the log is corrupt and the caller must refuse to start.

use super::Aof;
use crate::error::{Error, Result};
use crate::protocol::{RespReader, RespValue};
use std::io::{Seek, SeekFrom};
use tracing::{error, info};

impl Aof {
    /// Replay every record in append order
    ///
    /// Stops at the first clean end of stream and returns the number of
    /// records handed to `handler`. Any protocol error, including a record cut
    /// short at the end of the file, is returned as is.
    pub fn replay<F>(&self, mut handler: F) -> Result<usize>
    where
        F: FnMut(RespValue),
    {
        let mut guard = self.lock();
        let file = guard.as_mut().ok_or(Error::Closed)?;

        file.seek(SeekFrom::Start(0))?;
        let mut reader = RespReader::new(&mut *file);

        let mut count = 0;
        loop {
            match reader.read_value() {
                Ok(Some(value)) => {
                    handler(value);
                    count += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    error!(
                        "AOF {:?} is corrupt after {} records: {}",
                        self.path(),
                        count,
                        e
                    );
                    return Err(e);
                }
            }
        }

        info!("AOF loaded successfully: {} entries", count);
        Ok(count)
    }
}
