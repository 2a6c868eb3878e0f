use chrono::{NaiveDate, NaiveTime};
use tracing::debug;

use zapdash_db::{DailyMetrics, DbError, Message, ZapdashDb};

const DAY_SECONDS: i64 = 86_400;

/// Recompute the aggregate row for one calendar date from current store
/// contents. Lead counts are global; conversation and response-time numbers
/// are scoped to the date.
pub async fn recalculate_daily_metrics(
    db: &ZapdashDb,
    date: NaiveDate,
) -> Result<DailyMetrics, DbError> {
    let (start, end) = day_bounds(date);

    let total_leads = db.count_contacts().await?;
    let responded = db.count_responded_contacts().await?;
    let no_response_count = (total_leads - responded).max(0);
    let response_rate = if total_leads > 0 {
        responded as f64 / total_leads as f64 * 100.0
    } else {
        0.0
    };

    let total_conversations = db.count_conversations(None).await?;
    let conversations_today = db.count_conversations_created_between(start, end).await?;
    let avg_response_time = average_response_minutes(&db.messages_between(start, end).await?);

    let date_key = date.format("%Y-%m-%d").to_string();
    debug!("📊 Métricas de {date_key}: {total_leads} leads, {responded} responderam");

    db.upsert_daily_metrics(
        &date_key,
        total_leads,
        response_rate,
        no_response_count,
        total_conversations,
        conversations_today,
        avg_response_time,
    )
    .await
}

/// UTC second bounds of a calendar date, half-open.
pub fn day_bounds(date: NaiveDate) -> (i64, i64) {
    let start = date.and_time(NaiveTime::MIN).and_utc().timestamp();
    (start, start + DAY_SECONDS)
}

/// Mean minutes between an outbound message and the next inbound reply,
/// per conversation. Messages must arrive grouped by conversation and
/// ordered by time. No completed pair means zero.
fn average_response_minutes(messages: &[Message]) -> f64 {
    let mut gaps: Vec<f64> = Vec::new();
    let mut current_conversation: Option<&str> = None;
    let mut pending_outbound: Option<i64> = None;

    for message in messages {
        if current_conversation != Some(message.conversation_id.as_str()) {
            current_conversation = Some(message.conversation_id.as_str());
            pending_outbound = None;
        }

        if message.from_me {
            // measure from the first unanswered outbound
            if pending_outbound.is_none() {
                pending_outbound = Some(message.timestamp);
            }
        } else if let Some(sent_at) = pending_outbound.take() {
            gaps.push((message.timestamp - sent_at).max(0) as f64 / 60.0);
        }
    }

    if gaps.is_empty() {
        0.0
    } else {
        gaps.iter().sum::<f64>() / gaps.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zapdash_db::NewMessage;

    fn row(
        id: &str,
        conversation_id: &str,
        contact_id: &str,
        from_me: bool,
        timestamp: i64,
    ) -> NewMessage {
        NewMessage {
            id: id.to_string(),
            conversation_id: conversation_id.to_string(),
            contact_id: contact_id.to_string(),
            content: Some("x".to_string()),
            message_type: "text".to_string(),
            from_me,
            status: "received".to_string(),
            timestamp,
            media_url: None,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn computes_rates_and_response_time() {
        let db = ZapdashDb::open_in_memory().await.unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();
        let (start, _) = day_bounds(date);

        let ana = db.create_contact("5511999990001", Some("Ana"), None).await.unwrap();
        let bia = db.create_contact("5511999990002", Some("Bia"), None).await.unwrap();
        let conv_ana = db
            .create_conversation(&ana.id, "5511999990001@s.whatsapp.net", "active", None)
            .await
            .unwrap();
        let conv_bia = db
            .create_conversation(&bia.id, "5511999990002@s.whatsapp.net", "active", None)
            .await
            .unwrap();

        // we write Ana, she answers 5 minutes later
        db.upsert_message(&row("A1", &conv_ana.id, &ana.id, true, start + 60)).await.unwrap();
        db.upsert_message(&row("A2", &conv_ana.id, &ana.id, false, start + 360)).await.unwrap();
        // Bia never answers
        db.upsert_message(&row("B1", &conv_bia.id, &bia.id, true, start + 120)).await.unwrap();

        let metrics = recalculate_daily_metrics(&db, date).await.unwrap();

        assert_eq!(metrics.date, "2026-08-25");
        assert_eq!(metrics.total_leads, 2);
        assert_eq!(metrics.no_response_count, 1);
        assert_eq!(metrics.response_rate, 50.0);
        assert_eq!(metrics.avg_response_time, 5.0);
        assert_eq!(metrics.total_conversations, 2);
    }

    #[tokio::test]
    async fn empty_store_yields_zeroed_metrics() {
        let db = ZapdashDb::open_in_memory().await.unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();

        let metrics = recalculate_daily_metrics(&db, date).await.unwrap();
        assert_eq!(metrics.total_leads, 0);
        assert_eq!(metrics.response_rate, 0.0);
        assert_eq!(metrics.avg_response_time, 0.0);
        assert_eq!(metrics.conversations_today, 0);
    }

    #[tokio::test]
    async fn recompute_overwrites_the_same_date() {
        let db = ZapdashDb::open_in_memory().await.unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();

        recalculate_daily_metrics(&db, date).await.unwrap();
        db.create_contact("5511999990001", None, None).await.unwrap();
        let metrics = recalculate_daily_metrics(&db, date).await.unwrap();

        assert_eq!(metrics.total_leads, 1);
        assert_eq!(metrics.no_response_count, 1);
    }

    #[test]
    fn response_fold_resets_across_conversations() {
        let make = |conversation: &str, from_me: bool, timestamp: i64| Message {
            id: String::new(),
            conversation_id: conversation.to_string(),
            contact_id: String::new(),
            content: None,
            message_type: "text".to_string(),
            from_me,
            status: "received".to_string(),
            timestamp,
            media_url: None,
            metadata: None,
            created_at: 0,
        };

        // outbound in conversation a, inbound in conversation b: no pair
        let rows = vec![make("a", true, 100), make("b", false, 200)];
        assert_eq!(average_response_minutes(&rows), 0.0);

        // a completed pair plus noise measures only the pair
        let rows = vec![
            make("a", true, 100),
            make("a", true, 160),
            make("a", false, 700),
            make("b", false, 50),
        ];
        // 600 seconds from the first unanswered outbound
        assert_eq!(average_response_minutes(&rows), 10.0);
    }
}
