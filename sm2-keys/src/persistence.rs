//! PEM files on disk.
//!
//! Every write goes to `<file>.tmp` first and is renamed into place once
//! flushed, so a reader never observes a half-written file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sm2_common::Logger;

use crate::certificate::{CertRequest, Certificate};
use crate::config::{EngineConfig, DEFAULT_PBKDF2_ITERATIONS};
use crate::error::Result;
use crate::keys::{
    decode_private_pem, decode_public_pem, encode_private_pem_with, encode_public_pem, PrivateKey,
    PublicKey,
};

pub struct PemStore {
    logger: Arc<Logger>,
    pbkdf2_iterations: u32,
}

impl PemStore {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self {
            logger,
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }

    pub fn with_config(logger: Arc<Logger>, config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            logger,
            pbkdf2_iterations: config.pbkdf2_iterations,
        })
    }

    /// Write a private key, sealed when `passphrase` is given. On unix the
    /// file is readable by its owner only.
    pub fn write_private_key(
        &self,
        path: impl AsRef<Path>,
        key: &PrivateKey,
        passphrase: Option<&[u8]>,
    ) -> Result<()> {
        let pem = encode_private_pem_with(key, passphrase, self.pbkdf2_iterations)?;
        write_atomic(path.as_ref(), pem.as_bytes(), true)?;
        self.logger.info(format!(
            "Private key written to {} (encrypted: {})",
            path.as_ref().display(),
            passphrase.is_some()
        ));
        Ok(())
    }

    pub fn read_private_key(
        &self,
        path: impl AsRef<Path>,
        passphrase: Option<&[u8]>,
    ) -> Result<PrivateKey> {
        let data = fs::read(path.as_ref())?;
        let key = decode_private_pem(&data, passphrase)?;
        self.logger
            .debug(format!("Private key loaded from {}", path.as_ref().display()));
        Ok(key)
    }

    pub fn write_public_key(&self, path: impl AsRef<Path>, key: &PublicKey) -> Result<()> {
        write_atomic(path.as_ref(), encode_public_pem(key)?.as_bytes(), false)?;
        self.logger
            .info(format!("Public key written to {}", path.as_ref().display()));
        Ok(())
    }

    pub fn read_public_key(&self, path: impl AsRef<Path>) -> Result<PublicKey> {
        let data = fs::read(path.as_ref())?;
        decode_public_pem(&data)
    }

    pub fn write_certificate(&self, path: impl AsRef<Path>, cert: &Certificate) -> Result<()> {
        write_atomic(path.as_ref(), cert.to_pem().as_bytes(), false)?;
        self.logger.info(format!(
            "Certificate for {} written to {}",
            cert.subject(),
            path.as_ref().display()
        ));
        Ok(())
    }

    pub fn read_certificate(&self, path: impl AsRef<Path>) -> Result<Certificate> {
        let data = fs::read(path.as_ref())?;
        Certificate::from_pem(&data)
    }

    pub fn write_csr(&self, path: impl AsRef<Path>, csr: &CertRequest) -> Result<()> {
        write_atomic(path.as_ref(), csr.to_pem().as_bytes(), false)?;
        self.logger.info(format!(
            "Certificate request for {} written to {}",
            csr.subject(),
            path.as_ref().display()
        ));
        Ok(())
    }

    pub fn read_csr(&self, path: impl AsRef<Path>) -> Result<CertRequest> {
        let data = fs::read(path.as_ref())?;
        CertRequest::from_pem(&data)
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_atomic(path: &Path, contents: &[u8], private: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp_path = tmp_path_for(path);
    {
        let mut f = open_for_write(&tmp_path, private)?;
        f.write_all(contents)?;
        f.flush()?;
        f.sync_all()?;
    }
    fs::rename(tmp_path, path)?;
    Ok(())
}

#[cfg(unix)]
fn open_for_write(path: &Path, private: bool) -> std::io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mode = if private { 0o600 } else { 0o644 };
    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)?;
    // a leftover tmp file keeps its old mode
    file.set_permissions(fs::Permissions::from_mode(mode))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_for_write(path: &Path, _private: bool) -> std::io::Result<fs::File> {
    fs::File::create(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Sm2Error;
    use sm2_common::Component;
    use tempfile::tempdir;

    fn store() -> PemStore {
        let config = EngineConfig::new().with_pbkdf2_iterations(1000);
        PemStore::with_config(Arc::new(Logger::new_root(Component::Storage, "test")), &config)
            .unwrap()
    }

    #[test]
    fn private_key_round_trips_with_and_without_passphrase() {
        let dir = tempdir().unwrap();
        let store = store();
        let key = PrivateKey::generate().unwrap();

        let plain = dir.path().join("keys/plain.pem");
        store.write_private_key(&plain, &key, None).unwrap();
        assert_eq!(store.read_private_key(&plain, None).unwrap(), key);
        assert!(!tmp_path_for(&plain).exists());

        let sealed = dir.path().join("sealed.pem");
        let secret = b"secret".as_slice();
        store.write_private_key(&sealed, &key, Some(secret)).unwrap();
        assert_eq!(store.read_private_key(&sealed, Some(secret)).unwrap(), key);
        assert!(matches!(
            store.read_private_key(&sealed, Some(b"wrong".as_slice())),
            Err(Sm2Error::AuthFailure(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn private_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("key.pem");
        store()
            .write_private_key(&path, &PrivateKey::generate().unwrap(), None)
            .unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn public_key_round_trips_and_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let store = store();
        let key = PrivateKey::generate().unwrap();
        let path = dir.path().join("pub.pem");
        store.write_public_key(&path, key.public_key()).unwrap();
        assert_eq!(&store.read_public_key(&path).unwrap(), key.public_key());

        assert!(matches!(
            store.read_public_key(dir.path().join("missing.pem")),
            Err(Sm2Error::Io(_))
        ));
    }
}
