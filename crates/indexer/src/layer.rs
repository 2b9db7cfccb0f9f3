//! 컨테이너 이미지 레이어
//!
//! [`Layer`]는 압축이 풀린 레이어의 루트 디렉토리와 다이제스트를 나타냅니다.
//! 스캐너는 [`Layer::files`]로 레이어 루트 기준 상대 경로의 파일을 읽습니다.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::IndexerError;

/// 레이어 파일 최대 크기 (10 MB)
const MAX_LAYER_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// 레이어에서 읽은 파일
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerFile {
    /// 레이어 루트 기준 상대 경로
    pub path: String,
    /// 파일 내용
    pub contents: Vec<u8>,
}

/// 압축이 풀린 이미지 레이어
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    /// 레이어 다이제스트 (예: `sha256:...`)
    pub digest: String,
    /// 레이어 루트 디렉토리
    pub root: PathBuf,
}

impl Layer {
    /// 새 레이어를 생성합니다.
    pub fn new(digest: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            digest: digest.into(),
            root: root.into(),
        }
    }

    /// 요청한 상대 경로 중 존재하는 파일만 요청 순서대로 읽습니다.
    ///
    /// 없는 파일은 건너뛰며, 모두 없으면 빈 목록을 반환합니다.
    /// `..`나 절대 경로로 레이어 밖을 가리키면 `PathTraversal` 에러입니다.
    /// 심볼릭 링크는 따라가되, 최종 경로가 레이어 루트 밖이면 없는 파일로 취급합니다.
    ///
    /// blocking I/O이므로 async 컨텍스트에서는 `spawn_blocking`으로 감싸세요.
    pub fn files(&self, paths: &[&str]) -> Result<Vec<LayerFile>, IndexerError> {
        let mut found = Vec::with_capacity(paths.len());

        for rel in paths {
            if Path::new(rel)
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
            {
                return Err(IndexerError::PathTraversal((*rel).to_owned()));
            }
        }

        let root = match std::fs::canonicalize(&self.root) {
            Ok(root) => root,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(layer = %self.digest, "layer root does not exist");
                return Ok(found);
            }
            Err(e) => {
                return Err(IndexerError::LayerRead {
                    path: self.root.display().to_string(),
                    source: e,
                });
            }
        };

        for rel in paths {
            let resolved = match std::fs::canonicalize(root.join(rel)) {
                Ok(p) => p,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(layer = %self.digest, path = rel, "file not present in layer");
                    continue;
                }
                Err(e) => {
                    return Err(IndexerError::LayerRead {
                        path: (*rel).to_owned(),
                        source: e,
                    });
                }
            };
            if !resolved.starts_with(&root) {
                warn!(
                    layer = %self.digest,
                    path = rel,
                    target = %resolved.display(),
                    "symlink resolves outside layer root, skipping"
                );
                continue;
            }

            let metadata = std::fs::metadata(&resolved).map_err(|e| IndexerError::LayerRead {
                path: (*rel).to_owned(),
                source: e,
            })?;

            if !metadata.is_file() {
                continue;
            }
            if metadata.len() > MAX_LAYER_FILE_SIZE {
                return Err(IndexerError::FileTooBig {
                    path: (*rel).to_owned(),
                    size: metadata.len(),
                    max: MAX_LAYER_FILE_SIZE,
                });
            }

            let contents = std::fs::read(&resolved).map_err(|e| IndexerError::LayerRead {
                path: (*rel).to_owned(),
                source: e,
            })?;
            found.push(LayerFile {
                path: (*rel).to_owned(),
                contents,
            });
        }

        Ok(found)
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.digest, self.root.display())
    }
}
