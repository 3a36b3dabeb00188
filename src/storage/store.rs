use crate::error::{Result, StorageError};
use crate::storage::records::{verification_key, VerifyRecord};
use crate::utils::hex::{parse_address, parse_b256};
use alloy::primitives::{Address, B256};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const VERIFY_FILE: &str = "verify.json";
const BYTECODE_DIR: &str = "bytecode";
const DOCUMENT_INDENT: &[u8] = b"    ";

/// String-valued tables. Verification records and bytecode blobs have their
/// own typed accessors on [`VanityStore`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Table {
    Addresses,
    Secrets,
}

impl Table {
    fn file_name(self) -> &'static str {
        match self {
            Table::Addresses => "addresses.json",
            Table::Secrets => "secrets.json",
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Table::Addresses => "addresses",
            Table::Secrets => "secrets",
        }
    }
}

/// File-backed key/value store under a single root directory.
///
/// Single writer, single process. Nothing here locks: two processes sharing a
/// root will lose writes.
#[derive(Clone, Debug)]
pub struct VanityStore {
    root: PathBuf,
}

impl VanityStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn read_all(&self, table: Table) -> Result<BTreeMap<String, String>> {
        self.read_document(table.file_name())
    }

    pub fn find(&self, table: Table, key: &str) -> Result<Option<String>> {
        Ok(self.read_all(table)?.remove(key))
    }

    /// Case-folds `value` before persisting.
    pub fn save(&self, table: Table, key: &str, value: &str) -> Result<()> {
        let mut all = self.read_all(table)?;
        all.insert(key.to_string(), value.to_ascii_lowercase());
        self.write_document(table.file_name(), &all)?;
        tracing::debug!("[STORE] saved {}/{}", table.as_str(), key);
        Ok(())
    }

    pub fn save_all(&self, table: Table, data: &BTreeMap<String, String>) -> Result<()> {
        let folded: BTreeMap<&str, String> = data
            .iter()
            .map(|(k, v)| (k.as_str(), v.to_ascii_lowercase()))
            .collect();
        self.write_document(table.file_name(), &folded)
    }

    pub fn find_address(&self, key: &str) -> Result<Option<Address>> {
        self.find(Table::Addresses, key)?
            .map(|raw| {
                parse_address(&raw).ok_or_else(|| malformed(key, "not a 20-byte hex address"))
            })
            .transpose()
    }

    pub fn save_address(&self, key: &str, address: &Address) -> Result<()> {
        self.save(Table::Addresses, key, &format!("{address:#x}"))
    }

    pub fn find_secret(&self, key: &str) -> Result<Option<B256>> {
        self.find(Table::Secrets, key)?
            .map(|raw| parse_b256(&raw).ok_or_else(|| malformed(key, "not a 32-byte hex value")))
            .transpose()
    }

    pub fn save_secret(&self, key: &str, secret: &B256) -> Result<()> {
        self.save(Table::Secrets, key, &format!("{secret:#x}"))
    }

    pub fn read_verifications(&self) -> Result<BTreeMap<String, VerifyRecord>> {
        self.read_document(VERIFY_FILE)
    }

    pub fn find_verification(&self, address: &Address) -> Result<Option<VerifyRecord>> {
        Ok(self.read_verifications()?.remove(&verification_key(address)))
    }

    pub fn save_verification(&self, record: &VerifyRecord) -> Result<()> {
        let mut all = self.read_verifications()?;
        all.insert(record.storage_key(), record.clone());
        self.write_document(VERIFY_FILE, &all)
    }

    pub fn save_all_verifications(&self, data: &BTreeMap<String, VerifyRecord>) -> Result<()> {
        self.write_document(VERIFY_FILE, data)
    }

    /// Writes one blob per name and returns its path.
    pub fn save_bytecode(&self, name: &str, contents: &[u8]) -> Result<PathBuf> {
        let dir = self.root.join(BYTECODE_DIR);
        ensure_dir(&dir)?;
        let path = dir.join(sanitize_file_name(name));
        fs::write(&path, contents).map_err(|source| io_error(&path, source))?;
        Ok(path)
    }

    pub fn read_bytecode(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.root.join(BYTECODE_DIR).join(sanitize_file_name(name));
        match fs::read(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(io_error(&path, source).into()),
        }
    }

    fn read_document<T: DeserializeOwned>(&self, file: &str) -> Result<BTreeMap<String, T>> {
        let path = self.root.join(file);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                self.initialize_document(&path)?;
                fs::read(&path).map_err(|source| io_error(&path, source))?
            }
            Err(source) => return Err(io_error(&path, source).into()),
        };
        serde_json::from_slice(&raw).map_err(|source| StorageError::Corrupt { path, source }.into())
    }

    fn initialize_document(&self, path: &Path) -> Result<()> {
        ensure_dir(&self.root)?;
        tracing::debug!("[STORE] initializing {}", path.display());
        fs::write(path, b"{}\n").map_err(|source| io_error(path, source).into())
    }

    fn write_document<T: Serialize>(&self, file: &str, data: &T) -> Result<()> {
        ensure_dir(&self.root)?;
        let path = self.root.join(file);

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(DOCUMENT_INDENT);
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        data.serialize(&mut serializer)
            .map_err(|source| StorageError::Corrupt {
                path: path.clone(),
                source,
            })?;
        buf.push(b'\n');

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &buf).map_err(|source| io_error(&tmp, source))?;
        fs::rename(&tmp, &path).map_err(|source| io_error(&path, source))?;
        Ok(())
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| io_error(dir, source).into())
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn malformed(key: &str, reason: &str) -> crate::error::VanityError {
    StorageError::MalformedValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            other => other,
        })
        .collect()
}
