use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info};

use crate::{
    application::{
        handlers::delivery::{DeliveryExecutor, MessageOutcome},
        services::{
            gate::{GateDecision, GateEvaluator},
            pacing::PacingController,
            rotation::RotationEngine,
            sender::SenderGateway,
        },
    },
    domain::repositories::{
        ChannelRepository, MessageQueueRepository, OrderRepository, SettingsRepository,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchSource {
    Cron,
    Trigger,
    Manual,
}

impl DispatchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchSource::Cron => "cron",
            DispatchSource::Trigger => "trigger",
            DispatchSource::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub processed: u32,
    pub sent: u32,
    pub failed: u32,
    pub message: Option<String>,
}

pub struct DispatchCycleConfig {
    pub batch_size: u32,
    pub retry_backoff_secs: u64,
    pub same_recipient_delay_secs: u64,
}

/// One bounded dispatch cycle: gate, claim, rotate, send, pace, report.
/// Designed to be invoked repeatedly and safely from overlapping triggers;
/// the claim operation is the only cross-invocation mutual-exclusion point.
pub struct RunDispatchCycleUseCase {
    settings_repo: Arc<dyn SettingsRepository>,
    channel_repo: Arc<dyn ChannelRepository>,
    queue_repo: Arc<dyn MessageQueueRepository>,
    gate: GateEvaluator,
    executor: DeliveryExecutor,
    pacing: PacingController,
    batch_size: u32,
}

impl RunDispatchCycleUseCase {
    pub fn new(
        settings_repo: Arc<dyn SettingsRepository>,
        channel_repo: Arc<dyn ChannelRepository>,
        queue_repo: Arc<dyn MessageQueueRepository>,
        order_repo: Arc<dyn OrderRepository>,
        gateway: SenderGateway,
        config: DispatchCycleConfig,
    ) -> Self {
        let gate = GateEvaluator::new(queue_repo.clone(), channel_repo.clone());
        let executor = DeliveryExecutor::new(
            queue_repo.clone(),
            order_repo,
            gateway,
            config.retry_backoff_secs,
        );
        let pacing =
            PacingController::new(Duration::from_secs(config.same_recipient_delay_secs));

        Self {
            settings_repo,
            channel_repo,
            queue_repo,
            gate,
            executor,
            pacing,
            batch_size: config.batch_size,
        }
    }

    pub async fn execute(&self, source: DispatchSource) -> anyhow::Result<CycleReport> {
        let now = Utc::now();
        let settings = self.settings_repo.get().await?;

        match self.gate.evaluate(&settings, now).await? {
            GateDecision::Skip(reason) => {
                debug!(source = source.as_str(), reason, "dispatch cycle skipped");
                return Ok(CycleReport {
                    message: Some(reason.to_string()),
                    ..CycleReport::default()
                });
            }
            GateDecision::Proceed => {}
        }

        let mut batch = self.queue_repo.claim_batch(self.batch_size, now).await?;
        if batch.is_empty() {
            // another invocation drained the queue between gate and claim
            return Ok(CycleReport {
                message: Some("no pending messages".to_string()),
                ..CycleReport::default()
            });
        }

        // Group same-recipient messages together, preserving creation order,
        // so stickiness and short-delay pacing see contiguous runs.
        batch.sort_by(|a, b| {
            a.recipient
                .cmp(&b.recipient)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });

        let channels = self.channel_repo.list_active().await?;
        if channels.is_empty() {
            // gate already checked this; channels were deactivated since
            return Ok(CycleReport {
                message: Some("no active delivery channels".to_string()),
                ..CycleReport::default()
            });
        }

        let mut rotation = RotationEngine::new(self.settings_repo.clone(), channels, &settings);

        info!(
            source = source.as_str(),
            batch = batch.len(),
            "dispatch cycle started"
        );

        let mut report = CycleReport {
            processed: batch.len() as u32,
            ..CycleReport::default()
        };

        for (index, message) in batch.iter().enumerate() {
            match self.executor.process(message, &mut rotation).await {
                Ok(MessageOutcome::Sent) => report.sent += 1,
                Ok(MessageOutcome::Failed) => report.failed += 1,
                Ok(MessageOutcome::Retried) | Ok(MessageOutcome::Skipped) => {}
                Err(err) => {
                    // left in processing; the stale sweep will recover it
                    error!(message_id = %message.id, error = %err, "message processing failed");
                }
            }

            if let Some(next) = batch.get(index + 1) {
                let delay = self.pacing.delay_before_next(message, next, &settings);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        info!(
            source = source.as_str(),
            processed = report.processed,
            sent = report.sent,
            failed = report.failed,
            "dispatch cycle finished"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    use crate::application::services::sender::{ChannelSender, SendReceipt};
    use crate::domain::models::{
        ChannelApiType, ChannelCredentials, DeliveryChannel, DeliveryOutcome, DispatchSettings,
        MediaAttachment, MessageStatus, NewQueuedMessage, RotationCursor, RotationMode,
    };
    use crate::infrastructure::repositories::in_memory::{
        InMemoryChannelRepository, InMemoryMessageQueueRepository, InMemoryOrderRepository,
        InMemorySettingsRepository,
    };

    /// Sender that pops scripted outcomes and records every call; an empty
    /// script means every send succeeds.
    struct ScriptedSender {
        outcomes: Mutex<VecDeque<Result<(), String>>>,
        calls: Mutex<Vec<(Uuid, String)>>,
    }

    impl ScriptedSender {
        fn always_ok() -> Arc<Self> {
            Self::with_outcomes(vec![])
        }

        fn with_outcomes(outcomes: Vec<Result<(), &str>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(
                    outcomes
                        .into_iter()
                        .map(|o| o.map_err(str::to_string))
                        .collect(),
                ),
                calls: Mutex::new(Vec::new()),
            })
        }

        async fn calls(&self) -> Vec<(Uuid, String)> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait::async_trait]
    impl ChannelSender for ScriptedSender {
        fn api_type(&self) -> ChannelApiType {
            ChannelApiType::Evolution
        }

        async fn send(
            &self,
            channel: &DeliveryChannel,
            recipient: &str,
            _body: &str,
            _media: Option<&MediaAttachment>,
        ) -> anyhow::Result<SendReceipt> {
            self.calls
                .lock()
                .await
                .push((channel.id, recipient.to_string()));
            match self.outcomes.lock().await.pop_front() {
                Some(Ok(())) | None => Ok(SendReceipt::default()),
                Some(Err(reason)) => Err(anyhow::anyhow!(reason)),
            }
        }
    }

    fn channel(name: &str, priority: i32) -> DeliveryChannel {
        DeliveryChannel {
            id: Uuid::new_v4(),
            name: name.to_string(),
            active: true,
            priority,
            api_type: ChannelApiType::Evolution,
            credentials: ChannelCredentials {
                base_url: "http://localhost".to_string(),
                instance: name.to_string(),
                token: "secret".to_string(),
            },
        }
    }

    fn settings(rotation: RotationMode, cursor: RotationCursor) -> DispatchSettings {
        DispatchSettings {
            delay_min_secs: 0,
            delay_max_secs: 0,
            paused: false,
            rotation,
            cursor,
            window: None,
        }
    }

    struct Fixture {
        cycle: RunDispatchCycleUseCase,
        settings_repo: Arc<InMemorySettingsRepository>,
        queue: Arc<InMemoryMessageQueueRepository>,
        orders: Arc<InMemoryOrderRepository>,
        sender: Arc<ScriptedSender>,
    }

    fn fixture(
        channels: Vec<DeliveryChannel>,
        settings: DispatchSettings,
        sender: Arc<ScriptedSender>,
    ) -> Fixture {
        fixture_with_backoff(channels, settings, sender, 0)
    }

    fn fixture_with_backoff(
        channels: Vec<DeliveryChannel>,
        settings: DispatchSettings,
        sender: Arc<ScriptedSender>,
        retry_backoff_secs: u64,
    ) -> Fixture {
        let settings_repo = Arc::new(InMemorySettingsRepository::new(settings));
        let queue = Arc::new(InMemoryMessageQueueRepository::new());
        let orders = Arc::new(InMemoryOrderRepository::new());
        let cycle = RunDispatchCycleUseCase::new(
            settings_repo.clone(),
            Arc::new(InMemoryChannelRepository::new(channels)),
            queue.clone(),
            orders.clone(),
            SenderGateway::new(vec![sender.clone()]),
            DispatchCycleConfig {
                batch_size: 10,
                retry_backoff_secs,
                same_recipient_delay_secs: 0,
            },
        );
        Fixture {
            cycle,
            settings_repo,
            queue,
            orders,
            sender,
        }
    }

    async fn enqueue(fixture: &Fixture, recipient: &str) -> Uuid {
        enqueue_with(fixture, recipient, None, 3).await
    }

    async fn enqueue_with(
        fixture: &Fixture,
        recipient: &str,
        order_id: Option<Uuid>,
        max_attempts: u32,
    ) -> Uuid {
        fixture
            .queue
            .enqueue(NewQueuedMessage {
                recipient: recipient.to_string(),
                body: "hello".to_string(),
                media: None,
                order_id,
                scheduled_at: None,
                max_attempts,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn sticky_affinity_with_rotation_for_the_next_recipient() {
        let a = channel("a", 1);
        let b = channel("b", 2);
        let (a_id, b_id) = (a.id, b.id);
        let fixture = fixture(
            vec![a, b],
            settings(
                RotationMode::Enabled {
                    messages_per_channel: 1,
                },
                RotationCursor::default(),
            ),
            ScriptedSender::always_ok(),
        );

        for _ in 0..3 {
            enqueue(&fixture, "5546999990001").await;
        }
        enqueue(&fixture, "5546999990002").await;

        let report = fixture.cycle.execute(DispatchSource::Manual).await.unwrap();
        assert_eq!(report.processed, 4);
        assert_eq!(report.sent, 4);
        assert_eq!(report.failed, 0);

        // the whole run to the first number is sticky on a; the second
        // number is a new recipient past the threshold and rotates to b
        let calls = fixture.sender.calls().await;
        let channels: Vec<Uuid> = calls.iter().map(|(id, _)| *id).collect();
        assert_eq!(channels, vec![a_id, a_id, a_id, b_id]);

        let cursor = fixture.settings_repo.get().await.unwrap().cursor;
        assert_eq!(cursor.channel_id, Some(b_id));
        assert_eq!(cursor.message_count, 1);
    }

    #[tokio::test]
    async fn failure_moves_the_next_message_off_the_failing_channel() {
        let a = channel("a", 1);
        let b = channel("b", 2);
        let (a_id, b_id) = (a.id, b.id);
        let fixture = fixture(
            vec![a, b],
            settings(
                RotationMode::Enabled {
                    messages_per_channel: 10,
                },
                RotationCursor::default(),
            ),
            ScriptedSender::with_outcomes(vec![Err("connection reset"), Ok(())]),
        );

        let failing = enqueue(&fixture, "5546999990001").await;
        enqueue(&fixture, "5546999990002").await;

        let report = fixture.cycle.execute(DispatchSource::Manual).await.unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 0, "first failure is transient, not terminal");

        let calls = fixture.sender.calls().await;
        assert_eq!(calls[0].0, a_id);
        assert_eq!(calls[1].0, b_id);

        let stored = fixture.queue.get(failing).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Pending);
        assert_eq!(stored.attempts, 1);
        assert_eq!(stored.error_message.as_deref(), Some("connection reset"));

        let cursor = fixture.settings_repo.get().await.unwrap().cursor;
        assert_ne!(cursor.channel_id, Some(a_id));
    }

    #[tokio::test]
    async fn retry_backoff_pushes_the_schedule_forward() {
        let fixture = fixture_with_backoff(
            vec![channel("a", 1)],
            settings(RotationMode::Disabled, RotationCursor::default()),
            ScriptedSender::with_outcomes(vec![Err("timeout")]),
            60,
        );

        let id = enqueue(&fixture, "5546999990001").await;
        let before = Utc::now();
        fixture.cycle.execute(DispatchSource::Manual).await.unwrap();

        let stored = fixture.queue.get(id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Pending);
        assert!(stored.scheduled_at >= before + chrono::Duration::seconds(55));
    }

    #[tokio::test]
    async fn retries_are_bounded_by_max_attempts() {
        let fixture = fixture(
            vec![channel("a", 1)],
            settings(RotationMode::Disabled, RotationCursor::default()),
            ScriptedSender::with_outcomes(vec![Err("always down"), Err("always down")]),
        );

        let order_id = Uuid::new_v4();
        let id = enqueue_with(&fixture, "5546999990001", Some(order_id), 2).await;

        // first cycle: transient failure, back to pending immediately
        // (zero backoff keeps it eligible)
        fixture.cycle.execute(DispatchSource::Manual).await.unwrap();
        let stored = fixture.queue.get(id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Pending);
        assert_eq!(stored.attempts, 1);

        // second cycle exhausts the budget
        let report = fixture.cycle.execute(DispatchSource::Manual).await.unwrap();
        assert_eq!(report.failed, 1);
        let stored = fixture.queue.get(id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Failed);
        assert_eq!(stored.attempts, 2);
        assert_eq!(stored.error_message.as_deref(), Some("always down"));
        assert_eq!(
            fixture.orders.outcome(order_id).await,
            Some(DeliveryOutcome::DeliveryFailed)
        );

        // nothing left to do, and no further send attempts happen
        let report = fixture.cycle.execute(DispatchSource::Manual).await.unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(fixture.sender.calls().await.len(), 2);
    }

    #[tokio::test]
    async fn paused_queue_dispatches_nothing_until_resumed() {
        let mut paused = settings(RotationMode::Disabled, RotationCursor::default());
        paused.paused = true;
        let fixture = fixture(
            vec![channel("a", 1)],
            paused,
            ScriptedSender::always_ok(),
        );

        let id = enqueue(&fixture, "5546999990001").await;

        let report = fixture.cycle.execute(DispatchSource::Cron).await.unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(report.message.as_deref(), Some("dispatching is paused"));
        assert!(fixture.sender.calls().await.is_empty());

        fixture.settings_repo.set_paused(false).await.unwrap();
        let report = fixture.cycle.execute(DispatchSource::Cron).await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.sent, 1);

        let stored = fixture.queue.get(id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Sent);
        assert!(stored.sent_at.is_some());
    }

    #[tokio::test]
    async fn successful_send_records_channel_and_mirrors_the_order() {
        let a = channel("a", 1);
        let a_id = a.id;
        let fixture = fixture(
            vec![a],
            settings(RotationMode::Disabled, RotationCursor::default()),
            ScriptedSender::always_ok(),
        );

        let order_id = Uuid::new_v4();
        let id = enqueue_with(&fixture, "5546999990001", Some(order_id), 3).await;

        fixture.cycle.execute(DispatchSource::Trigger).await.unwrap();

        let stored = fixture.queue.get(id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Sent);
        assert_eq!(stored.channel_id, Some(a_id));
        assert_eq!(stored.attempts, 1);
        assert_eq!(
            fixture.orders.outcome(order_id).await,
            Some(DeliveryOutcome::Delivered)
        );
    }

    #[tokio::test]
    async fn batch_is_grouped_by_recipient_in_creation_order() {
        let fixture = fixture(
            vec![channel("a", 1)],
            settings(RotationMode::Disabled, RotationCursor::default()),
            ScriptedSender::always_ok(),
        );

        // interleaved creation order across two recipients
        enqueue(&fixture, "5546999990002").await;
        enqueue(&fixture, "5546999990001").await;
        enqueue(&fixture, "5546999990002").await;
        enqueue(&fixture, "5546999990001").await;

        fixture.cycle.execute(DispatchSource::Manual).await.unwrap();

        let recipients: Vec<String> = fixture
            .sender
            .calls()
            .await
            .into_iter()
            .map(|(_, recipient)| recipient)
            .collect();
        assert_eq!(
            recipients,
            vec![
                "5546999990001".to_string(),
                "5546999990001".to_string(),
                "5546999990002".to_string(),
                "5546999990002".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn cursor_continuity_spans_cycles() {
        let a = channel("a", 1);
        let b = channel("b", 2);
        let (a_id, b_id) = (a.id, b.id);
        let fixture = fixture(
            vec![a, b],
            settings(
                RotationMode::Enabled {
                    messages_per_channel: 2,
                },
                RotationCursor::default(),
            ),
            ScriptedSender::always_ok(),
        );

        enqueue(&fixture, "5546999990001").await;
        fixture.cycle.execute(DispatchSource::Manual).await.unwrap();
        enqueue(&fixture, "5546999990002").await;
        fixture.cycle.execute(DispatchSource::Manual).await.unwrap();
        enqueue(&fixture, "5546999990003").await;
        fixture.cycle.execute(DispatchSource::Manual).await.unwrap();

        // two distinct recipients on a, then the persisted counter trips the
        // rotation in a later, independent cycle
        let channels: Vec<Uuid> = fixture
            .sender
            .calls()
            .await
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(channels, vec![a_id, a_id, b_id]);
    }
}
