use std::collections::HashMap;

use chrono::{Days, NaiveDate};

use crate::{
    config::BREAKDOWN_PAGE_SIZE,
    error::AppError,
    models::{
        comment::{CommentAnalytics, DailyCount},
        page::{Page, PageParams},
    },
    services::store::CommentStore,
};

/// Created and blocked comment counts per day of `[from, to]`, ascending and
/// paginated by `BREAKDOWN_PAGE_SIZE` days. Days without comments are reported
/// as zeros. Only the days of the requested page are built.
pub async fn daily_breakdown(
    store: &dyn CommentStore,
    from: NaiveDate,
    to: NaiveDate,
    page: Option<i64>,
) -> Result<Page<CommentAnalytics>, AppError> {
    if from > to {
        return Err(AppError::BadRequest("Incorrect range was entered".to_string()));
    }

    let count = (to - from).num_days() + 1;
    let offset = PageParams { page }.offset(BREAKDOWN_PAGE_SIZE)?;
    if offset >= count {
        return Ok(Page { items: Vec::new(), count });
    }

    // offset < count, so both bounds stay inside [from, to].
    let page_from = from
        .checked_add_days(Days::new(offset as u64))
        .unwrap_or(to);
    let page_to = page_from
        .checked_add_days(Days::new(BREAKDOWN_PAGE_SIZE as u64 - 1))
        .map_or(to, |end| end.min(to));

    let counts = store.daily_counts(page_from, page_to).await?;
    Ok(Page {
        items: fill_days(page_from, page_to, counts),
        count,
    })
}

fn fill_days(from: NaiveDate, to: NaiveDate, counts: Vec<DailyCount>) -> Vec<CommentAnalytics> {
    let by_day: HashMap<NaiveDate, DailyCount> = counts.into_iter().map(|c| (c.day, c)).collect();

    from.iter_days()
        .take_while(|day| *day <= to)
        .map(|date| {
            let (created, blocked) = by_day
                .get(&date)
                .map_or((0, 0), |c| (c.created, c.blocked));
            CommentAnalytics {
                date,
                created_comments: created,
                blocked_comments: blocked,
            }
        })
        .collect()
}
