use super::error::{Result, SceneError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsampleResult<T> {
    /// 保留的元素，保持输入顺序
    pub kept: Vec<T>,
    pub dropped: Vec<T>,
}

/// 按下标等间隔采样：保留第 0, N, 2N, ... 个元素
///
/// 按下标而不是按时间间隔采样，保证缩减比例固定为 `ceil(len / stride)`，不受采集帧率抖动影响。
/// 输入需已按时间戳升序排列。
pub fn subsample<T: Clone>(matched: &[T], stride: usize) -> Result<SubsampleResult<T>> {
    if stride < 1 {
        return Err(SceneError::InvalidStride(stride));
    }
    let (kept, dropped) = matched.iter().enumerate().fold(
        (Vec::with_capacity(matched.len().div_ceil(stride)), vec![]),
        |(mut kept, mut dropped), (i, item)| {
            if i % stride == 0 {
                kept.push(item.clone());
            } else {
                dropped.push(item.clone());
            }
            (kept, dropped)
        },
    );
    Ok(SubsampleResult { kept, dropped })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stride_one_keeps_everything() {
        let r = subsample(&[1, 2, 3], 1).unwrap();
        assert_eq!(r.kept, vec![1, 2, 3]);
        assert!(r.dropped.is_empty());
    }

    #[test]
    fn test_stride_ten_of_twenty() {
        let matched: Vec<u32> = (1..=20).collect();
        let r = subsample(&matched, 10).unwrap();
        assert_eq!(r.kept, vec![1, 11]);
        assert_eq!(r.dropped.len(), 18);
        assert!(!r.dropped.contains(&1) && !r.dropped.contains(&11));
    }

    #[test]
    fn test_kept_size_is_ceil() {
        for len in 0..40usize {
            for stride in 1..8usize {
                let matched: Vec<usize> = (0..len).collect();
                let r = subsample(&matched, stride).unwrap();
                assert_eq!(r.kept.len(), len.div_ceil(stride));
                assert_eq!(r.kept.len() + r.dropped.len(), len);
            }
        }
    }

    #[test]
    fn test_invalid_stride() {
        let err = subsample(&[1, 2], 0).unwrap_err();
        assert!(matches!(err, SceneError::InvalidStride(0)));
    }
}
