use std::time::Duration;

use chrono::Utc;
use handyhub_core::{AppConfig, Notification, PageRequest, StatusFilter};
use handyhub_db::{DbError, PgNotificationStore};
use handyhub_notify::{BatchOutcome, NotificationCenter, NotifyError, SortOrder, ViewFilter};
use sqlx::PgPool;
use uuid::Uuid;

/// Pause between refetches while the change feed is down.
const RETRY_INTERVAL: Duration = Duration::from_secs(15);

type Center = NotificationCenter<PgNotificationStore>;

fn center(pool: &PgPool, request: PageRequest) -> Center {
    NotificationCenter::new(PgNotificationStore::new(pool.clone()), request)
}

/// Everything the user could act on, up to the page cap.
fn actionable(user: Uuid, status: StatusFilter) -> PageRequest {
    PageRequest {
        status,
        ..PageRequest::first_page(user, PageRequest::MAX_LIMIT)
    }
}

pub(crate) fn format_notification(n: &Notification) -> String {
    let marker = if n.is_unread() { "●" } else { " " };
    format!(
        "{marker} {id}  {at}  [{kind}] {title}: {message}",
        id = n.id,
        at = n.created_at.format("%Y-%m-%d %H:%M"),
        kind = n.kind,
        title = n.title,
        message = n.message,
    )
}

async fn print_view(center: &Center, filter: &ViewFilter) {
    let view = center.view(filter).await;
    let unread = center.unread_count().await;
    println!("-- {} shown, {unread} unread --", view.len());
    for n in &view {
        println!("{}", format_notification(n));
    }
}

fn report_batch(verb: &str, outcome: &BatchOutcome) {
    println!("{verb} {}", outcome.confirmed.len());
    for e in &outcome.failed {
        eprintln!("error: {e}");
    }
}

pub(crate) async fn run_list(
    pool: &PgPool,
    user: Uuid,
    page: u32,
    limit: u32,
    status: StatusFilter,
    search: Option<String>,
    sort: SortOrder,
) -> anyhow::Result<()> {
    let request = PageRequest {
        user_id: user,
        page: page.max(1),
        limit: limit.clamp(1, PageRequest::MAX_LIMIT),
        status,
    };
    let center = center(pool, request);
    let total = center.refresh().await?;

    let filter = ViewFilter {
        search_text: search.unwrap_or_default(),
        status,
        sort,
    };
    print_view(&center, &filter).await;
    println!("page {} of {total} total", center.request().page);
    Ok(())
}

pub(crate) async fn run_read(pool: &PgPool, user: Uuid, id: Uuid) -> anyhow::Result<()> {
    let center = center(pool, actionable(user, StatusFilter::Unread));
    center.refresh().await?;

    if center.mark_read(id).await? {
        println!("marked {id} read");
        return Ok(());
    }

    // outside the loaded unread page: older, already read, or someone else's
    match handyhub_db::mark_user_notification_read(pool, user, id, Utc::now()).await {
        Ok(_) => println!("marked {id} read"),
        Err(DbError::NotFound) => println!("{id} is not a notification for this user"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub(crate) async fn run_read_all(pool: &PgPool, user: Uuid) -> anyhow::Result<()> {
    let center = center(pool, actionable(user, StatusFilter::Unread));
    center.refresh().await?;

    let outcome = center.mark_all_read().await;
    report_batch("marked read:", &outcome);
    anyhow::ensure!(
        outcome.is_complete(),
        "{} notifications could not be marked read",
        outcome.failed.len()
    );
    Ok(())
}

pub(crate) async fn run_delete(pool: &PgPool, user: Uuid, ids: &[Uuid]) -> anyhow::Result<()> {
    let center = center(pool, actionable(user, StatusFilter::All));
    center.refresh().await?;

    let outcome = center.delete_many(ids).await;
    report_batch("deleted:", &outcome);
    let skipped = ids
        .len()
        .saturating_sub(outcome.confirmed.len() + outcome.failed.len());
    if skipped > 0 {
        println!("skipped {skipped} ids not shown for this user");
    }
    anyhow::ensure!(
        outcome.is_complete(),
        "{} notifications could not be deleted",
        outcome.failed.len()
    );
    Ok(())
}

/// Print the view, then reprint it on every change until Ctrl-C.
///
/// While the change feed is down the view is refetched every
/// [`RETRY_INTERVAL`] and the feed is resubscribed.
pub(crate) async fn run_watch(
    pool: &PgPool,
    config: &AppConfig,
    user: Uuid,
    status: StatusFilter,
) -> anyhow::Result<()> {
    let center = center(pool, actionable(user, status));
    let filter = ViewFilter {
        status,
        ..ViewFilter::default()
    };
    let mut changes = center.changes();
    center.refresh().await?;
    changes.borrow_and_update();
    print_view(&center, &filter).await;

    let printer = async {
        while changes.changed().await.is_ok() {
            print_view(&center, &filter).await;
        }
        std::future::pending::<()>().await;
    };
    tokio::pin!(printer);

    loop {
        match handyhub_db::subscribe_notification_feed(pool, user, config.feed_channel_capacity).await
        {
            Ok(subscription) => {
                println!("(live)");
                tokio::select! {
                    result = center.follow(subscription, ctrl_c_signal()) => match result {
                        Ok(()) => return Ok(()),
                        Err(NotifyError::SubscriptionLost) => {
                            eprintln!("live updates lost; polling every {}s", RETRY_INTERVAL.as_secs());
                        }
                        Err(e) => return Err(e.into()),
                    },
                    () = &mut printer => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not subscribe to notification feed");
                eprintln!("live updates unavailable: {e}");
            }
        }

        tokio::select! {
            () = ctrl_c_signal() => return Ok(()),
            () = tokio::time::sleep(RETRY_INTERVAL) => {}
            () = &mut printer => {}
        }
        if let Err(e) = center.refresh().await {
            tracing::warn!(error = %e, "polling refetch failed");
        }
    }
}

async fn ctrl_c_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
