use std::ops::{Index, IndexMut};
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::timestamp::Modality;

/// 按模态索引的三元组容器
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModalityMap<T> {
    pub rgb: T,
    pub depth: T,
    pub intrinsics: T,
}

impl<T> ModalityMap<T> {
    pub fn from_fn(mut f: impl FnMut(Modality) -> T) -> Self {
        Self {
            rgb: f(Modality::Rgb),
            depth: f(Modality::Depth),
            intrinsics: f(Modality::Intrinsics),
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(Modality, &T) -> U) -> ModalityMap<U> {
        ModalityMap::from_fn(|m| f(m, &self[m]))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Modality, &T)> {
        Modality::ALL.into_iter().map(move |m| (m, &self[m]))
    }
}

impl<T> Index<Modality> for ModalityMap<T> {
    type Output = T;

    fn index(&self, modality: Modality) -> &T {
        match modality {
            Modality::Rgb => &self.rgb,
            Modality::Depth => &self.depth,
            Modality::Intrinsics => &self.intrinsics,
        }
    }
}

impl<T> IndexMut<Modality> for ModalityMap<T> {
    fn index_mut(&mut self, modality: Modality) -> &mut T {
        match modality {
            Modality::Rgb => &mut self.rgb,
            Modality::Depth => &mut self.depth,
            Modality::Intrinsics => &mut self.intrinsics,
        }
    }
}

/// 单个模态在场景目录下的存放方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalityDir {
    pub dir: String,
    pub extension: String,
}

/// 场景目录结构：每个模态一个子目录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneLayout {
    pub dirs: ModalityMap<ModalityDir>,
}

impl SceneLayout {
    pub fn new(rgb: &str, depth: &str, intrinsics: &str) -> Self {
        let dir = |dir: &str, extension: &str| ModalityDir {
            dir: dir.to_owned(),
            extension: extension.to_owned(),
        };
        Self {
            dirs: ModalityMap {
                rgb: dir(rgb, "png"),
                depth: dir(depth, "png"),
                intrinsics: dir(intrinsics, "pincam"),
            },
        }
    }

    /// 高分辨率深度 + 超广角 RGB
    pub fn highres() -> Self {
        Self::new("ultrawide", "highres_depth", "ultrawide_intrinsics")
    }

    /// 低分辨率深度 + 广角 RGB
    pub fn lowres() -> Self {
        Self::new("lowres_wide", "lowres_depth", "lowres_wide_intrinsics")
    }

    pub fn modality_dir(&self, scene: &Path, modality: Modality) -> PathBuf {
        scene.join(&self.dirs[modality].dir)
    }

    pub fn extension(&self, modality: Modality) -> &str {
        &self.dirs[modality].extension
    }

    pub fn is_modality_dir(&self, name: &str) -> bool {
        self.dirs.iter().any(|(_, d)| d.dir == name)
    }

    /// 判断一个目录是否像场景目录（至少存在一个模态子目录）
    pub fn looks_like_scene(&self, path: &Path) -> bool {
        Modality::ALL.into_iter().any(|m| self.modality_dir(path, m).is_dir())
    }
}

impl Default for SceneLayout {
    fn default() -> Self {
        Self::highres()
    }
}
