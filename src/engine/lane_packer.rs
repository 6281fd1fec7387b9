// ==========================================
// 生产排程甘特图 - 泳道打包引擎
// ==========================================
// 职责: 把同一资源上的工序分配到互不重叠的泳道
// 算法: 按开始时间稳定排序 → 贪心放入第一个 "末尾结束 <= 开始" 的泳道
// 性质: 泳道数 == 任一时刻同时重叠的最大工序数（区间图着色最优）
// 红线: 纯函数，不修改输入
// ==========================================

use crate::domain::{Operation, Timestamp};

/// 半开时间区间 [start, end)
pub trait Interval {
    fn start(&self) -> Timestamp;
    fn end(&self) -> Timestamp;
}

impl Interval for Operation {
    fn start(&self) -> Timestamp {
        self.start_time
    }

    fn end(&self) -> Timestamp {
        self.end_time
    }
}

impl<T: Interval + ?Sized> Interval for &T {
    fn start(&self) -> Timestamp {
        (**self).start()
    }

    fn end(&self) -> Timestamp {
        (**self).end()
    }
}

struct OpenLane<'a, T> {
    items: Vec<&'a T>,
    end: Timestamp,
}

/// 打包为泳道（每条泳道内按开始时间有序）
///
/// 开始时间相同的工序保持输入顺序，因此同一输入总得到同一结果。
pub fn pack<T: Interval>(items: &[T]) -> Vec<Vec<&T>> {
    let mut sorted: Vec<&T> = items.iter().collect();
    // sort_by_key 是稳定排序
    sorted.sort_by_key(|item| item.start());

    let mut lanes: Vec<OpenLane<'_, T>> = Vec::new();
    for item in sorted {
        let start = item.start();
        match lanes.iter_mut().find(|lane| lane.end <= start) {
            Some(lane) => {
                lane.end = lane.end.max(item.end());
                lane.items.push(item);
            }
            None => lanes.push(OpenLane {
                items: vec![item],
                end: item.end(),
            }),
        }
    }

    lanes.into_iter().map(|lane| lane.items).collect()
}

/// 任一时刻同时重叠的最大区间数
///
/// 扫描线: 同一时刻先处理结束事件再处理开始事件（半开区间）。
/// 零长度区间不占据任何时刻，不计入。
pub fn max_overlap<T: Interval>(items: &[T]) -> usize {
    let mut events: Vec<(Timestamp, i32)> = items
        .iter()
        .filter(|item| item.end() > item.start())
        .flat_map(|item| [(item.start(), 1), (item.end(), -1)])
        .collect();
    events.sort();

    let (mut current, mut best) = (0i32, 0i32);
    for (_, delta) in events {
        current += delta;
        best = best.max(current);
    }
    best as usize
}
