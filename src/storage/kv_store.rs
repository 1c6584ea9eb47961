// src/storage/kv_store.rs

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use crate::common::error::AppError;

// Armazenamento durável chave/valor do cliente (o "localStorage").
// Escritas em lote são atômicas: ou todas as chaves mudam, ou nenhuma.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    fn set_many(&self, entries: &[(&str, String)]) -> Result<(), AppError>;

    fn remove_many(&self, keys: &[&str]) -> Result<(), AppError>;

    fn set(&self, key: &str, value: String) -> Result<(), AppError> {
        self.set_many(&[(key, value)])
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        self.remove_many(&[key])
    }
}

// Mutex envenenado só acontece se outro thread entrou em pânico no meio
// de uma escrita; o mapa continua utilizável.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---
// Memória (testes e sessões efêmeras)
// ---
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self { entries: Mutex::new(map) }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set_many(&self, entries: &[(&str, String)]) -> Result<(), AppError> {
        let mut map = lock(&self.entries);
        for (key, value) in entries {
            map.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), AppError> {
        let mut map = lock(&self.entries);
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

// ---
// Arquivo JSON em disco
// ---
// Um objeto JSON { "chave": "valor" }. Cada escrita regrava o arquivo
// inteiro via arquivo temporário + rename.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    cache: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let cache = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(
            path = %path.display(),
            keys = cache.len(),
            "Armazenamento local carregado"
        );
        Ok(Self { path, cache: Mutex::new(cache) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, snapshot: &BTreeMap<String, String>) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    // Aplica a mudança numa cópia e só troca o cache se o disco aceitou
    fn update<F>(&self, change: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut cache = lock(&self.cache);
        let mut next = cache.clone();
        change(&mut next);
        self.flush(&next)?;
        *cache = next;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(lock(&self.cache).get(key).cloned())
    }

    fn set_many(&self, entries: &[(&str, String)]) -> Result<(), AppError> {
        self.update(|map| {
            for (key, value) in entries {
                map.insert((*key).to_string(), value.clone());
            }
        })
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), AppError> {
        self.update(|map| {
            for key in keys {
                map.remove(*key);
            }
        })
    }
}
