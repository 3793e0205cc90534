use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use block_codec::{BlockRecord, BlockStatus};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{check_transition, BlockStore, StoreError};
use crate::fs::{generate_block_proof_file_name, read_proof_from_dir, write_proof_to_dir};
use crate::proof_types::ProofArtifact;

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(20);

/// A [`BlockStore`] backed by a JSON array of block records on disk, with
/// one `b{height}.zkproof` file per proof.
///
/// The block file is re-read on every call, so records appended by block
/// production are picked up without a restart. Writers rewrite it through a
/// temporary file and a rename.
///
/// Every rewrite happens while holding `<blocks file>.lock`, created
/// exclusively and removed afterwards. Other processes that modify the block
/// file, block production included, must hold the same lock file while they
/// do, or their changes may be overwritten. A lock left behind by a crashed
/// process has to be removed by hand.
///
/// [`store_proof`](BlockStore::store_proof) writes the proof file before the
/// status change and removes it again if the status change fails. A crash in
/// between leaves a proof without the `Proved` status, which the orchestrator
/// heals without proving again.
#[derive(Debug)]
pub struct JsonFileBlockStore {
    blocks_path: PathBuf,
    lock_path: PathBuf,
    proof_dir: PathBuf,
    lock_timeout: Duration,
    write_lock: Mutex<()>,
}

/// Exclusive hold on the block file, released on drop.
#[derive(Debug)]
struct BlockFileLock {
    path: PathBuf,
}

impl BlockFileLock {
    async fn acquire(path: &Path, timeout: Duration) -> Result<Self, StoreError> {
        let deadline = Instant::now() + timeout;
        loop {
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
                .await
            {
                Ok(_) => {
                    return Ok(Self {
                        path: path.to_owned(),
                    })
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        return Err(StoreError::Locked(path.to_owned()));
                    }
                    tokio::time::sleep(LOCK_RETRY_INTERVAL).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Drop for BlockFileLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), "cannot release block file lock: {e}");
        }
    }
}

impl JsonFileBlockStore {
    pub fn new(blocks_path: impl Into<PathBuf>, proof_dir: impl Into<PathBuf>) -> Self {
        let blocks_path = blocks_path.into();
        let mut lock_path = OsString::from(blocks_path.as_os_str());
        lock_path.push(".lock");
        Self {
            blocks_path,
            lock_path: lock_path.into(),
            proof_dir: proof_dir.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            write_lock: Mutex::new(()),
        }
    }

    /// How long a writer waits for another holder of the lock file before
    /// giving up with [`StoreError::Locked`].
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn blocks_path(&self) -> &Path {
        &self.blocks_path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    pub fn proof_dir(&self) -> &Path {
        &self.proof_dir
    }

    async fn lock_file(&self) -> Result<BlockFileLock, StoreError> {
        BlockFileLock::acquire(&self.lock_path, self.lock_timeout).await
    }

    async fn load(&self) -> Result<BTreeMap<u64, BlockRecord>, StoreError> {
        let bytes = tokio::fs::read(&self.blocks_path).await?;
        let des = &mut serde_json::Deserializer::from_slice(&bytes);
        let records: Vec<BlockRecord> =
            serde_path_to_error::deserialize(des).map_err(|source| StoreError::Malformed {
                path: self.blocks_path.clone(),
                source,
            })?;

        let mut blocks = BTreeMap::new();
        for record in records {
            let height = record.height;
            if blocks.insert(height, record).is_some() {
                return Err(StoreError::DuplicateHeight(height));
            }
        }
        Ok(blocks)
    }

    async fn save(&self, blocks: &BTreeMap<u64, BlockRecord>) -> Result<(), StoreError> {
        let records: Vec<&BlockRecord> = blocks.values().collect();
        let serialized = serde_json::to_vec_pretty(&records)?;

        let tmp_path = self.blocks_path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, serialized).await?;
        tokio::fs::rename(&tmp_path, &self.blocks_path).await?;
        debug!(path = %self.blocks_path.display(), "rewrote block file");
        Ok(())
    }

    /// Moves block `height` to `status` on a fresh read of the block file.
    /// The caller holds both locks.
    async fn set_status_locked(&self, height: u64, status: BlockStatus) -> Result<(), StoreError> {
        let mut blocks = self.load().await?;
        let block = blocks
            .get_mut(&height)
            .ok_or(StoreError::UnknownBlock(height))?;
        check_transition(height, block.status, status)?;
        if block.status == status {
            return Ok(());
        }
        block.status = status;
        self.save(&blocks).await
    }

    async fn read_proof(&self, height: u64) -> Result<Option<ProofArtifact>, StoreError> {
        read_proof_from_dir(&self.proof_dir, height)
            .await
            .map_err(StoreError::ProofFile)
    }

    async fn put_proof_locked(&self, proof: &ProofArtifact) -> Result<(), StoreError> {
        if self.read_proof(proof.block_height).await?.is_some() {
            return Err(StoreError::ProofExists(proof.block_height));
        }
        write_proof_to_dir(&self.proof_dir, proof)
            .await
            .map_err(StoreError::ProofFile)
    }
}

impl BlockStore for JsonFileBlockStore {
    async fn list_blocks(
        &self,
        status: BlockStatus,
        from_height: u64,
    ) -> Result<Vec<BlockRecord>, StoreError> {
        Ok(self
            .load()
            .await?
            .into_values()
            .filter(|block| block.height >= from_height && block.status == status)
            .collect())
    }

    async fn get_block(&self, height: u64) -> Result<Option<BlockRecord>, StoreError> {
        Ok(self.load().await?.remove(&height))
    }

    async fn update_status(&self, height: u64, status: BlockStatus) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let _file_lock = self.lock_file().await?;
        self.set_status_locked(height, status).await
    }

    async fn get_proof(&self, height: u64) -> Result<Option<ProofArtifact>, StoreError> {
        self.read_proof(height).await
    }

    async fn put_proof(&self, proof: ProofArtifact) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.put_proof_locked(&proof).await
    }

    async fn store_proof(&self, proof: ProofArtifact) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let _file_lock = self.lock_file().await?;
        let height = proof.block_height;
        let from = self
            .load()
            .await?
            .get(&height)
            .ok_or(StoreError::UnknownBlock(height))?
            .status;
        check_transition(height, from, BlockStatus::Proved)?;

        self.put_proof_locked(&proof).await?;
        if let Err(e) = self.set_status_locked(height, BlockStatus::Proved).await {
            warn!(height, "status update failed, removing the new proof: {e}");
            let path = generate_block_proof_file_name(&self.proof_dir, height);
            if let Err(remove) = tokio::fs::remove_file(&path).await {
                warn!(height, path = %path.display(), "cannot remove proof file: {remove}");
            }
            return Err(e);
        }
        Ok(())
    }
}
