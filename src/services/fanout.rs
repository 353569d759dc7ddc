//! 并发扇出 - 业务能力层
//!
//! "跑 N 个独立操作，全部结束后返回各自结果"，从不因为单个失败而中断。
//! 批量可生成性检查、批量生成、轮询都用它。

use futures::stream::{self, StreamExt};
use std::future::Future;

/// 单个操作的结算结果，保留输入项
#[derive(Debug)]
pub struct Settled<I, T, E> {
    pub item: I,
    pub outcome: Result<T, E>,
}

/// 并发执行 `op`，同时最多 `limit` 个，结果按输入顺序返回
pub async fn settle_all<I, T, E, F, Fut>(items: Vec<I>, limit: usize, op: F) -> Vec<Settled<I, T, E>>
where
    I: Clone,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let limit = limit.max(1);
    stream::iter(items)
        .map(|item| {
            let fut = op(item.clone());
            async move {
                Settled {
                    item,
                    outcome: fut.await,
                }
            }
        })
        .buffered(limit)
        .collect()
        .await
}

/// 拆分为 (成功, 失败)
pub fn partition<I, T, E>(settled: Vec<Settled<I, T, E>>) -> (Vec<T>, Vec<(I, E)>) {
    let mut successes = Vec::new();
    let mut failures = Vec::new();
    for Settled { item, outcome } in settled {
        match outcome {
            Ok(value) => successes.push(value),
            Err(e) => failures.push((item, e)),
        }
    }
    (successes, failures)
}
