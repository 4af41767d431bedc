use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SceneError>;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("无法解析文件名 {filename}: {reason}")]
    MalformedFilename { filename: String, reason: &'static str },

    #[error("无效的采样间隔 {0}，必须 >= 1")]
    InvalidStride(usize),

    #[error("场景路径不是目录: {0}")]
    NotADirectory(PathBuf),

    #[error("读写 {path} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SceneError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
