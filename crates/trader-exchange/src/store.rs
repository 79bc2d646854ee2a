//! 세션 키-값 저장소.
//!
//! 액세스 토큰과 OAuth state nonce만 저장합니다. 동시 접근은 마지막 쓰기가 이깁니다.

use crate::error::ExchangeError;
use crate::traits::ExchangeResult;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// 액세스 토큰 키.
pub const ACCESS_TOKEN_KEY: &str = "coinbase_access_token";

/// OAuth state nonce 키.
pub const OAUTH_STATE_KEY: &str = "coinbase_oauth_state";

/// 키-값 저장소 인터페이스.
pub trait SessionStore: Send + Sync {
    /// 값 조회.
    fn get(&self, key: &str) -> ExchangeResult<Option<String>>;

    /// 값 저장 (덮어쓰기).
    fn set(&self, key: &str, value: &str) -> ExchangeResult<()>;

    /// 값 삭제. 키가 없어도 성공합니다.
    fn remove(&self, key: &str) -> ExchangeResult<()>;
}

fn poisoned() -> ExchangeError {
    ExchangeError::Storage("session store lock poisoned".to_string())
}

/// 메모리 저장소 (테스트용).
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> ExchangeResult<Option<String>> {
        let values = self.values.lock().map_err(|_| poisoned())?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ExchangeResult<()> {
        let mut values = self.values.lock().map_err(|_| poisoned())?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ExchangeResult<()> {
        let mut values = self.values.lock().map_err(|_| poisoned())?;
        values.remove(key);
        Ok(())
    }
}

/// JSON 파일 저장소.
///
/// 매 연산마다 파일 전체를 읽고 씁니다. 파일이 없으면 빈 저장소로 취급하고,
/// 첫 쓰기에서 상위 디렉터리를 생성합니다.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> ExchangeResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            ExchangeError::Storage(format!("corrupt session file {}: {}", self.path.display(), e))
        })
    }

    fn save(&self, values: &BTreeMap<String, String>) -> ExchangeResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(values)
            .map_err(|e| ExchangeError::Storage(e.to_string()))?;
        std::fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), keys = values.len(), "Session file written");
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> ExchangeResult<Option<String>> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> ExchangeResult<()> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let mut values = self.load()?;
        values.insert(key.to_string(), value.to_string());
        self.save(&values)
    }

    fn remove(&self, key: &str) -> ExchangeResult<()> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let mut values = self.load()?;
        if values.remove(key).is_some() {
            self.save(&values)?;
        }
        Ok(())
    }
}
