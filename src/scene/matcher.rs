use std::collections::BTreeSet;

use serde::Serialize;

use super::layout::ModalityMap;
use super::timestamp::{Modality, Timestamp};

/// 一组跨模态匹配的时间戳
///
/// `key` 取 RGB 的时间戳；容差为 0 时三个模态的时间戳完全相同。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedFrame {
    pub key: Timestamp,
    pub timestamps: ModalityMap<Timestamp>,
}

impl MatchedFrame {
    fn exact(ts: Timestamp) -> Self {
        Self { key: ts.clone(), timestamps: ModalityMap::from_fn(|_| ts.clone()) }
    }
}

/// 每个模态中没有匹配的时间戳
pub type OrphanMap = ModalityMap<BTreeSet<Timestamp>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    /// 按 `key` 升序排列
    pub matched: Vec<MatchedFrame>,
    pub orphans: OrphanMap,
}

impl MatchResult {
    pub fn orphan_count(&self) -> usize {
        self.orphans.iter().map(|(_, s)| s.len()).sum()
    }

    pub fn is_exact(&self) -> bool {
        self.orphan_count() == 0
    }
}

/// 计算三个模态的匹配集合与孤立时间戳
///
/// `epsilon` 单位为 tick。为 0 时直接求交集，否则使用排序归并扫描：
/// 每次比较三个模态当前最早的时间戳，两两差值都不超过 `epsilon` 时配对，
/// 否则最早的那个不可能再与其他模态配对，记为孤立。每个文件最多参与一次匹配。
pub fn match_timestamps(
    rgb: &BTreeSet<Timestamp>,
    depth: &BTreeSet<Timestamp>,
    intrinsics: &BTreeSet<Timestamp>,
    epsilon: u64,
) -> MatchResult {
    let sets = ModalityMap { rgb, depth, intrinsics };
    if epsilon == 0 {
        match_exact(&sets)
    } else {
        match_sweep(&sets, epsilon)
    }
}

fn match_exact(sets: &ModalityMap<&BTreeSet<Timestamp>>) -> MatchResult {
    let common: BTreeSet<Timestamp> = sets
        .rgb
        .intersection(sets.depth)
        .filter(|t| sets.intrinsics.contains(*t))
        .cloned()
        .collect();
    let orphans = sets.map(|_, set| set.difference(&common).cloned().collect());
    let matched = common.into_iter().map(MatchedFrame::exact).collect();
    MatchResult { matched, orphans }
}

fn match_sweep(sets: &ModalityMap<&BTreeSet<Timestamp>>, epsilon: u64) -> MatchResult {
    let lists = sets.map(|_, set| set.iter().collect::<Vec<_>>());
    let mut cursor = ModalityMap::<usize>::default();
    let mut result = MatchResult::default();

    loop {
        let heads = Modality::ALL.map(|m| lists[m].get(cursor[m]).copied());
        let [Some(r), Some(d), Some(i)] = heads else {
            break;
        };

        // 三者中的最早者；并列时按模态顺序取第一个
        let earliest = Modality::ALL
            .into_iter()
            .min_by(|a, b| lists[*a][cursor[*a]].cmp(lists[*b][cursor[*b]]))
            .unwrap_or(Modality::Rgb);
        let within =
            |a: &Timestamp, b: &Timestamp| a.distance(b).is_some_and(|dis| dis <= epsilon);

        if within(r, d) && within(r, i) && within(d, i) {
            result.matched.push(MatchedFrame {
                key: r.clone(),
                timestamps: ModalityMap { rgb: r.clone(), depth: d.clone(), intrinsics: i.clone() },
            });
            for m in Modality::ALL {
                cursor[m] += 1;
            }
        } else {
            result.orphans[earliest].insert(lists[earliest][cursor[earliest]].clone());
            cursor[earliest] += 1;
        }
    }

    for m in Modality::ALL {
        result.orphans[m].extend(lists[m][cursor[m]..].iter().map(|t| (*t).clone()));
    }
    result.matched.sort_by(|a, b| a.key.cmp(&b.key));
    result
}
