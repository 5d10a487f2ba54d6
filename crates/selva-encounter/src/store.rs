//! Behavior profile persistence.
//!
//! Features:
//! - JSON file with whole-file atomic overwrite (temp file + rename)
//! - Loading never fails: missing or corrupt files yield a default profile
//! - Background writer that never blocks the frame loop

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Sender, TrySendError};
use selva_common::ProfileError;
use tracing::{debug, info, warn};

use crate::profile::BehaviorProfile;

/// Default profile file name.
pub const PROFILE_FILE: &str = "behavior.json";

/// Destination for profile flushes.
pub trait ProfileSink {
    /// Persists a snapshot of `profile`. Must not block for long.
    fn persist(&mut self, profile: &BehaviorProfile) -> Result<(), ProfileError>;
}

/// Discards every flush.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProfileSink for NullSink {
    fn persist(&mut self, _profile: &BehaviorProfile) -> Result<(), ProfileError> {
        Ok(())
    }
}

/// Synchronous JSON profile storage.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    /// Creates a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for `behavior.json` inside `dir`.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(PROFILE_FILE))
    }

    /// File backing this store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the profile, falling back to the default on any failure.
    #[must_use]
    pub fn load(&self) -> BehaviorProfile {
        if !self.path.exists() {
            info!("No behavior profile at {}, starting fresh", self.path.display());
            return BehaviorProfile::default();
        }

        match self.try_load() {
            Ok(profile) => {
                info!("Loaded behavior profile from {}", self.path.display());
                profile
            },
            Err(e) => {
                warn!("Failed to load behavior profile: {e}");
                BehaviorProfile::default()
            },
        }
    }

    /// Reads and repairs the profile, reporting why a read failed.
    pub fn try_load(&self) -> Result<BehaviorProfile, ProfileError> {
        let contents = fs::read_to_string(&self.path)?;
        let value: serde_json::Value = serde_json::from_str(&contents)
            .map_err(|e| ProfileError::Deserialization(e.to_string()))?;
        Ok(BehaviorProfile::from_value_lossy(&value))
    }

    /// Overwrites the file with `profile`.
    pub fn save(&self, profile: &BehaviorProfile) -> Result<(), ProfileError> {
        write_atomic(&self.path, profile)?;
        debug!("Saved behavior profile to {}", self.path.display());
        Ok(())
    }
}

impl ProfileSink for ProfileStore {
    fn persist(&mut self, profile: &BehaviorProfile) -> Result<(), ProfileError> {
        self.save(profile)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| PROFILE_FILE.into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes pretty JSON to a temp file, then renames it over `path`.
fn write_atomic(path: &Path, profile: &BehaviorProfile) -> Result<(), ProfileError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp = temp_path(path);
    {
        let file = File::create(&temp)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, profile)
            .map_err(|e| ProfileError::Serialization(e.to_string()))?;
        writer.flush()?;
    }

    fs::rename(&temp, path).map_err(|e| {
        let _ = fs::remove_file(&temp);
        ProfileError::AtomicWriteFailed(e.to_string())
    })
}

/// Writes profiles on a dedicated thread.
///
/// `persist` hands a snapshot over a one-slot channel and returns at once.
/// When a write is still queued the new snapshot is rejected with
/// [`ProfileError::WriterBusy`]; the next flush carries newer data anyway.
#[derive(Debug)]
pub struct BackgroundProfileWriter {
    sender: Option<Sender<BehaviorProfile>>,
    handle: Option<JoinHandle<()>>,
    failures: Arc<AtomicU32>,
    written: Arc<AtomicU32>,
}

impl BackgroundProfileWriter {
    /// Spawns the writer thread for `store`.
    pub fn spawn(store: ProfileStore) -> Result<Self, ProfileError> {
        let (sender, receiver) = bounded::<BehaviorProfile>(1);
        let failures = Arc::new(AtomicU32::new(0));
        let written = Arc::new(AtomicU32::new(0));

        let thread_failures = Arc::clone(&failures);
        let thread_written = Arc::clone(&written);
        let handle = thread::Builder::new()
            .name("selva-profile-writer".to_string())
            .spawn(move || {
                for profile in &receiver {
                    match store.save(&profile) {
                        Ok(()) => {
                            thread_written.fetch_add(1, Ordering::Relaxed);
                        },
                        Err(e) => {
                            thread_failures.fetch_add(1, Ordering::Relaxed);
                            warn!("Background profile write failed: {e}");
                        },
                    }
                }
                debug!("Profile writer thread exiting");
            })?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
            failures,
            written,
        })
    }

    /// Writes that failed on the writer thread.
    #[must_use]
    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Writes that completed on the writer thread.
    #[must_use]
    pub fn written(&self) -> u32 {
        self.written.load(Ordering::Relaxed)
    }

    /// Closes the channel and waits for queued writes to finish.
    pub fn shutdown(&mut self) {
        self.sender = None;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Profile writer thread panicked");
            }
        }
    }
}

impl ProfileSink for BackgroundProfileWriter {
    fn persist(&mut self, profile: &BehaviorProfile) -> Result<(), ProfileError> {
        let Some(sender) = &self.sender else {
            return Err(ProfileError::WriterClosed);
        };
        match sender.try_send(profile.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(ProfileError::WriterBusy),
            Err(TrySendError::Disconnected(_)) => Err(ProfileError::WriterClosed),
        }
    }
}

impl Drop for BackgroundProfileWriter {
    fn drop(&mut self) {
        self.shutdown();
    }
}
