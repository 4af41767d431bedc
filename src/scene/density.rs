use serde::Serialize;

use super::matcher::MatchedFrame;
use super::timestamp::ticks_to_secs;

/// 根据匹配帧的密度判断场景的采样状态
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Density {
    /// 帧数少于 2，无法也无需判断
    Sparse,
    /// 存在无法计算间隔的时间戳
    Unknown,
    /// 相邻帧间隔的中位数，单位秒
    MedianGap { secs: f64 },
}

impl Density {
    pub fn measure(matched: &[MatchedFrame]) -> Self {
        if matched.len() < 2 {
            return Density::Sparse;
        }
        let Some(ticks) = matched.iter().map(|f| f.key.ticks()).collect::<Option<Vec<_>>>() else {
            return Density::Unknown;
        };
        let mut gaps: Vec<u64> = ticks.windows(2).map(|w| w[0].abs_diff(w[1])).collect();
        gaps.sort_unstable();
        Density::MedianGap { secs: ticks_to_secs(gaps[gaps.len() / 2]) }
    }

    pub fn median_gap_secs(&self) -> Option<f64> {
        match *self {
            Density::MedianGap { secs } => Some(secs),
            _ => None,
        }
    }

    /// 中位间隔折合的标称帧数
    pub fn nominal_frames(&self, capture_fps: f64) -> Option<f64> {
        self.median_gap_secs().filter(|_| capture_fps > 0.0).map(|secs| secs * capture_fps)
    }

    /// 当前密度是否正好是按 `stride` 采样后的结果
    ///
    /// 中位间隔需落在 `[stride - 0.5, stride + 0.5]` 个标称帧内。
    /// 更稀疏的场景说明时间戳单位或帧率与 `capture_fps` 不符，不能据此判断。
    pub fn is_subsampled(&self, stride: usize, capture_fps: f64) -> bool {
        match self.nominal_frames(capture_fps) {
            Some(frames) if stride > 1 => (frames - stride as f64).abs() <= 0.5,
            _ => false,
        }
    }

    /// 中位间隔超过 `stride + 0.5` 个标称帧，与 `capture_fps` 不一致
    pub fn is_sparser_than(&self, stride: usize, capture_fps: f64) -> bool {
        self.nominal_frames(capture_fps).is_some_and(|frames| frames > stride as f64 + 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::layout::ModalityMap;
    use crate::scene::timestamp::Timestamp;

    fn frames(times: impl IntoIterator<Item = f64>) -> Vec<MatchedFrame> {
        times
            .into_iter()
            .map(|t| {
                let ts = Timestamp::from_secs_f64(t);
                MatchedFrame { key: ts.clone(), timestamps: ModalityMap::from_fn(|_| ts.clone()) }
            })
            .collect()
    }

    #[test]
    fn test_median_gap() {
        let d = Density::measure(&frames([0.0, 0.1, 0.2, 0.35, 0.45]));
        let Density::MedianGap { secs } = d else { panic!("{d:?}") };
        assert!((secs - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_is_subsampled() {
        // 10 fps 原始采集
        let raw = Density::measure(&frames((0..100).map(|i| i as f64 * 0.1)));
        assert!(!raw.is_subsampled(10, 10.0));
        // 每 10 帧保留一帧后
        let reduced = Density::measure(&frames((0..10).map(|i| i as f64 * 1.0)));
        assert!(reduced.is_subsampled(10, 10.0));
        assert!(!reduced.is_subsampled(1, 10.0));
    }

    #[test]
    fn test_sparser_than_nominal_rate() {
        // 10 fps 的原始场景按 60 fps 看是每 6 帧一帧，不能当作已按 5 或 10 采样
        let raw = Density::measure(&frames((0..100).map(|i| i as f64 * 0.1)));
        assert!(!raw.is_subsampled(5, 60.0));
        assert!(raw.is_sparser_than(5, 60.0));
        assert!(!raw.is_subsampled(10, 60.0));
        assert!(!raw.is_sparser_than(10, 60.0));

        // 整数时间戳
        let integers = Density::measure(&frames((1..=20).map(f64::from)));
        assert!(!integers.is_subsampled(10, 60.0));
        assert!(integers.is_sparser_than(10, 60.0));
    }

    #[test]
    fn test_sparse_and_unknown() {
        assert_eq!(Density::measure(&frames([1.0])), Density::Sparse);
        let ts = Timestamp::parse("frame");
        let opaque = vec![
            MatchedFrame { key: ts.clone(), timestamps: ModalityMap::from_fn(|_| ts.clone()) },
            MatchedFrame {
                key: Timestamp::parse("1"),
                timestamps: ModalityMap::from_fn(|_| Timestamp::parse("1")),
            },
        ];
        assert_eq!(Density::measure(&opaque), Density::Unknown);
        assert!(!Density::Unknown.is_subsampled(10, 60.0));
    }
}
