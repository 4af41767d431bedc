use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntrinsicsError {
    #[error("读取内参文件失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("内参应为 6 个数值，实际为 {0} 个")]
    FieldCount(usize),

    #[error("无法解析内参字段 `{0}`")]
    Field(String),
}

/// `.pincam` 相机内参：`width height fx fy cx cy`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraIntrinsics {
    pub width: u32,
    pub height: u32,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IntrinsicsError> {
        std::fs::read_to_string(path)?.parse()
    }
}

impl FromStr for CameraIntrinsics {
    type Err = IntrinsicsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.lines().next().unwrap_or_default();
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [width, height, fx, fy, cx, cy] = fields[..] else {
            return Err(IntrinsicsError::FieldCount(fields.len()));
        };

        fn parse<T: FromStr>(v: &str) -> Result<T, IntrinsicsError> {
            v.parse().map_err(|_| IntrinsicsError::Field(v.to_owned()))
        }

        Ok(Self {
            width: parse(width)?,
            height: parse(height)?,
            fx: parse(fx)?,
            fy: parse(fy)?,
            cx: parse(cx)?,
            cy: parse(cy)?,
        })
    }
}
