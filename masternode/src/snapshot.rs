//! On-disk registry cache (`mncache.dat`).
//!
//! Layout: magic string, 4-byte network magic, bincode registry payload,
//! then a trailing double-SHA256 of everything before it. Saves go to a
//! temp file, fsync, then rename. A checksum or format failure wipes the
//! in-memory registry; the next save rewrites the file. Loading never
//! aborts the process.

use crate::chain::ChainView;
use crate::error::SnapshotError;
use crate::registry::{Registry, RegistryState};
use ember_core::codec::{Reader, Writer};
use ember_core::hash::sha256d;
use ember_core::NetworkType;
use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const MAGIC: &[u8] = b"MasternodeCache";
const CHECKSUM_LEN: usize = 32;

pub struct SnapshotFile {
    path: PathBuf,
    network: NetworkType,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>, network: NetworkType) -> Self {
        SnapshotFile {
            path: path.into(),
            network,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize the registry and write it atomically.
    pub fn save(&self, registry: &Registry) -> Result<(), SnapshotError> {
        // clone under the lock, serialize outside it
        let state = registry.export_state();
        let entries = state.entries.len();

        let payload = bincode::serialize(&state).map_err(|_| SnapshotError::BadFormat)?;
        let mut w = Writer::new();
        w.put_var_bytes(MAGIC);
        w.put_raw(&self.network.magic());
        w.put_raw(&payload);
        let mut buf = w.into_bytes();
        let checksum = sha256d(&buf);
        buf.extend_from_slice(checksum.as_bytes());

        let tmp = self.path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&buf)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        info!(path = %self.path.display(), entries, "wrote masternode cache");
        Ok(())
    }

    /// Read the cache back into `registry`, then sweep what expired while
    /// the node was down.
    pub fn load(
        &self,
        registry: &Registry,
        chain: &dyn ChainView,
        now: i64,
    ) -> Result<(), SnapshotError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(SnapshotError::FileMissing)
            }
            Err(err) => return Err(err.into()),
        };

        match self.parse(&bytes) {
            Ok(state) => {
                registry.replace_state(state);
                registry.sweep(now, chain);
                info!(path = %self.path.display(), entries = registry.len(), "loaded masternode cache");
                Ok(())
            }
            Err(err) => {
                if matches!(err, SnapshotError::HashMismatch | SnapshotError::BadFormat) {
                    warn!(path = %self.path.display(), %err, "discarding corrupt masternode cache");
                    registry.clear();
                }
                Err(err)
            }
        }
    }

    fn parse(&self, bytes: &[u8]) -> Result<RegistryState, SnapshotError> {
        if bytes.len() < CHECKSUM_LEN {
            return Err(SnapshotError::HashMismatch);
        }
        let (body, stored) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
        if sha256d(body).as_bytes() != stored {
            return Err(SnapshotError::HashMismatch);
        }

        let mut r = Reader::new(body);
        let magic = r.get_var_bytes().map_err(|_| SnapshotError::BadFormat)?;
        if magic != MAGIC {
            return Err(SnapshotError::BadMagic);
        }
        let network = r.get_raw(4).map_err(|_| SnapshotError::BadFormat)?;
        if network != self.network.magic() {
            return Err(SnapshotError::BadNetwork);
        }
        bincode::deserialize(r.rest()).map_err(|_| SnapshotError::BadFormat)
    }
}
