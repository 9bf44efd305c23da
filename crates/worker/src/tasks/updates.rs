//! Category listing diff broadcast
//!
//! Runs on the periodic listing-crawl callback: loads the two most
//! recent finished snapshots, diffs them, and pushes the added-categories
//! view to every subscribed user. The snapshot loader fails loudly when
//! fewer than two finished runs exist, so a half-initialized backend can
//! never masquerade as "everything was removed".

use super::TaskContext;
use sellerscope_common::catalog::export::export_partition;
use sellerscope_common::catalog::SnapshotDiffer;
use sellerscope_common::errors::Result;
use sellerscope_common::{messages, metrics};
use std::time::Instant;
use tracing::{error, info};

/// Diff the two latest category snapshots and notify subscribers
pub async fn compare_category_snapshots(ctx: &TaskContext) -> Result<()> {
    let (previous, latest) = ctx.crawl.fetch_category_snapshots().await?;

    let started = Instant::now();
    let diff = SnapshotDiffer::new().diff(&previous, &latest);
    metrics::record_diff_run(started.elapsed().as_secs_f64());

    let subscribers = ctx.store.list_subscribed_users().await?;
    info!(
        added = diff.added.count(),
        removed = diff.removed.count(),
        full = diff.full.count(),
        subscribers = subscribers.len(),
        "Category snapshot diff computed"
    );

    if diff.added.count() == 0 {
        for user in &subscribers {
            ctx.notifier
                .send_text(user.chat_id, messages::CATEGORIES_UNCHANGED)
                .await?;
        }
        return Ok(());
    }

    let text = messages::categories_updated(diff.added.count(), diff.added.unique_count());
    let export = export_partition(&diff.added)?;
    let filename = export
        .path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "added_categories.csv".to_string());

    for user in &subscribers {
        ctx.notifier.send_text(user.chat_id, &text).await?;
        if let Err(e) = ctx
            .notifier
            .send_file(user.chat_id, export.path(), &filename, messages::REPORT_CAPTION)
            .await
        {
            error!(chat_id = user.chat_id, error = %e, "Error while sending diff export");
        }
        metrics::record_notification("category_update");
    }

    // The export handle drops here, discarding the transient artifact.
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::support::harness;
    use sellerscope_common::catalog::{CategoryRecord, CategorySnapshot, SnapshotRank};
    use sellerscope_common::db::CatalogStore;
    use sellerscope_common::db::ChatIdentity;
    use sellerscope_common::errors::AppError;
    use sellerscope_common::notify::recording::Sent;

    async fn subscribe(h: &crate::tasks::support::TestHarness, chat_id: i64) {
        let mut user = h
            .store
            .find_or_create_user(&ChatIdentity {
                chat_id,
                user_name: None,
                full_name: "Subscriber".to_string(),
            })
            .await
            .unwrap();
        user.subscribed_to_category_updates = true;
        h.store.put_user(user);
    }

    fn snapshot(rank: SnapshotRank, names: &[&str]) -> CategorySnapshot {
        CategorySnapshot::new(
            rank,
            names
                .iter()
                .map(|n| {
                    CategoryRecord::new(
                        n.to_string(),
                        format!("https://www.wildberries.ru/catalog/{}", n),
                    )
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_added_categories_are_broadcast_with_export() {
        let h = harness();
        subscribe(&h, 1234).await;
        subscribe(&h, 4321).await;
        h.crawl.set_snapshots(
            snapshot(SnapshotRank::Previous, &["a"]),
            snapshot(SnapshotRank::Latest, &["a", "b", "c"]),
        );

        compare_category_snapshots(&h.ctx).await.unwrap();

        let texts = h.notifier.texts();
        assert_eq!(texts.len(), 2);
        assert!(texts[0].contains("добавилось 2 категорий, из них 2 уникальных"));

        // Both subscribers got the document, named by the partition prefix
        let files: Vec<Sent> = h
            .notifier
            .sent()
            .into_iter()
            .filter(|s| matches!(s, Sent::File { .. }))
            .collect();
        assert_eq!(files.len(), 2);
        for file in files {
            let Sent::File { filename, .. } = file else {
                unreachable!()
            };
            assert!(filename.starts_with("added_categories_"));
        }
    }

    #[tokio::test]
    async fn test_unchanged_listing_sends_quiet_notice() {
        let h = harness();
        subscribe(&h, 1234).await;
        h.crawl.set_snapshots(
            snapshot(SnapshotRank::Previous, &["a", "b"]),
            snapshot(SnapshotRank::Latest, &["a", "b"]),
        );

        compare_category_snapshots(&h.ctx).await.unwrap();

        assert_eq!(
            h.notifier.texts(),
            vec![messages::CATEGORIES_UNCHANGED.to_string()]
        );
        assert!(!h
            .notifier
            .sent()
            .iter()
            .any(|s| matches!(s, Sent::File { .. })));
    }

    #[tokio::test]
    async fn test_missing_snapshots_fail_loudly() {
        let h = harness();
        subscribe(&h, 1234).await;

        let result = compare_category_snapshots(&h.ctx).await;
        assert!(matches!(result, Err(AppError::Crawl { .. })));
        assert!(h.notifier.texts().is_empty());
    }

    #[tokio::test]
    async fn test_no_subscribers_is_a_no_op_delivery() {
        let h = harness();
        h.crawl.set_snapshots(
            snapshot(SnapshotRank::Previous, &[]),
            snapshot(SnapshotRank::Latest, &["a"]),
        );

        compare_category_snapshots(&h.ctx).await.unwrap();
        assert!(h.notifier.sent().is_empty());
    }
}
