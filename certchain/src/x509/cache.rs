//! Per-certificate cache of the decoded frame and public key
//!
//! The frame and the key are cached independently, each behind its own lock, so that decoding
//! a key (comparatively expensive, and often never needed) is deferred until something verifies
//! a signature with it. Access goes through scoped guards: while a [`FrameGuard`] or [`PkGuard`]
//! is alive the corresponding slot cannot be flushed or repopulated by another thread.

use alloc::sync::Arc;
use core::ops::Deref;
use std::sync::{Mutex, MutexGuard};

use log::debug;

use crate::util::error::{Error, Result};
use crate::x509::frame::{parse_frame, Frame};
use crate::x509::pk::PublicKey;

/// Lazily populated holder of a certificate's [`Frame`] and [`PublicKey`].
#[derive(Debug, Default)]
pub struct CertCache {
    frame: Mutex<Option<Frame>>,
    pk: Mutex<Option<Arc<PublicKey>>>,
}

/// Scoped access to a cached [`Frame`]. Dropping the guard releases the frame lock.
pub struct FrameGuard<'a> {
    _lock: MutexGuard<'a, Option<Frame>>,
    frame: Frame,
}

impl Deref for FrameGuard<'_> {
    type Target = Frame;

    fn deref(&self) -> &Frame {
        &self.frame
    }
}

/// Scoped access to a cached [`PublicKey`]. Dropping the guard releases the key lock.
pub struct PkGuard<'a> {
    _lock: MutexGuard<'a, Option<Arc<PublicKey>>>,
    pk: Arc<PublicKey>,
}

impl Deref for PkGuard<'_> {
    type Target = PublicKey;

    fn deref(&self) -> &PublicKey {
        &self.pk
    }
}

impl Clone for CertCache {
    /// The clone starts out empty.
    fn clone(&self) -> Self {
        CertCache::default()
    }
}

impl CertCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        CertCache::default()
    }

    fn lock_frame(&self) -> Result<MutexGuard<'_, Option<Frame>>> {
        self.frame.lock().map_err(|_| Error::Poisoned)
    }

    fn lock_pk(&self) -> Result<MutexGuard<'_, Option<Arc<PublicKey>>>> {
        self.pk.lock().map_err(|_| Error::Poisoned)
    }

    fn fill_frame(slot: &mut Option<Frame>, raw: &[u8]) -> Result<Frame> {
        match slot {
            Some(frame) => Ok(*frame),
            None => {
                let frame = parse_frame(raw)?;
                debug!("Cached frame of {}-byte certificate", frame.raw.len);
                *slot = Some(frame);
                Ok(frame)
            }
        }
    }

    fn fill_pk(slot: &mut Option<Arc<PublicKey>>, spki: &[u8]) -> Result<Arc<PublicKey>> {
        match slot {
            Some(pk) => Ok(pk.clone()),
            None => {
                let pk = Arc::new(PublicKey::from_spki_der(spki)?);
                *slot = Some(pk.clone());
                Ok(pk)
            }
        }
    }

    /// Decodes the frame of the certificate `raw` unless one is already cached.
    pub fn provide_frame(&self, raw: &[u8]) -> Result<()> {
        let mut slot = self.lock_frame()?;
        Self::fill_frame(&mut slot, raw).map(|_| ())
    }

    /// Decodes the SubjectPublicKeyInfo `spki` unless a key is already cached.
    pub fn provide_pk(&self, spki: &[u8]) -> Result<()> {
        let mut slot = self.lock_pk()?;
        Self::fill_pk(&mut slot, spki).map(|_| ())
    }

    /// Returns a guard on the frame, decoding it from `raw` first if necessary.
    pub fn acquire_frame(&self, raw: &[u8]) -> Result<FrameGuard<'_>> {
        let mut slot = self.lock_frame()?;
        let frame = Self::fill_frame(&mut slot, raw)?;
        Ok(FrameGuard { _lock: slot, frame })
    }

    /// Returns a guard on the public key, decoding it from `spki` first if necessary.
    pub fn acquire_pk(&self, spki: &[u8]) -> Result<PkGuard<'_>> {
        let mut slot = self.lock_pk()?;
        let pk = Self::fill_pk(&mut slot, spki)?;
        Ok(PkGuard { _lock: slot, pk })
    }

    /// Drops the cached frame.
    pub fn flush_frame(&self) -> Result<()> {
        *self.lock_frame()? = None;
        Ok(())
    }

    /// Drops the cached public key.
    pub fn flush_pk(&self) -> Result<()> {
        *self.lock_pk()? = None;
        Ok(())
    }

    /// Drops everything cached.
    pub fn flush_all(&self) -> Result<()> {
        self.flush_frame()?;
        self.flush_pk()
    }

    /// True if a frame is cached.
    pub fn has_frame(&self) -> Result<bool> {
        Ok(self.lock_frame()?.is_some())
    }

    /// True if a public key is cached.
    pub fn has_pk(&self) -> Result<bool> {
        Ok(self.lock_pk()?.is_some())
    }
}
