//! AMQP publisher for new-product announcements
//!
//! Declares the durable `findqc_tasks` topic exchange and the durable
//! `spider.products` queue bound on `product.new`, then publishes persistent
//! JSON messages. Publish failures are the caller's to log; they are never
//! retried against the already-committed database row.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lapin::options::{
    BasicPublishOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use tracing::{debug, info};

use crate::domain::events::{NewProductMessage, ROUTING_KEY_PRODUCT_NEW};
use crate::domain::services::EventPublisher;

const EXCHANGE_NAME: &str = "findqc_tasks";
const QUEUE_NAME: &str = "spider.products";
const DELIVERY_MODE_PERSISTENT: u8 = 2;

pub struct AmqpEventPublisher {
    channel: Channel,
}

impl AmqpEventPublisher {
    /// Connect and declare the exchange/queue topology.
    pub async fn connect(amqp_url: &str) -> Result<Self> {
        let connection = Connection::connect(amqp_url, ConnectionProperties::default())
            .await
            .context("Failed to connect to AMQP broker")?;
        let channel = connection
            .create_channel()
            .await
            .context("Failed to open AMQP channel")?;

        channel
            .exchange_declare(
                EXCHANGE_NAME,
                ExchangeKind::Topic,
                ExchangeDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await
            .context("Failed to declare exchange")?;

        channel
            .queue_declare(
                QUEUE_NAME,
                QueueDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await
            .context("Failed to declare queue")?;

        channel
            .queue_bind(
                QUEUE_NAME,
                EXCHANGE_NAME,
                ROUTING_KEY_PRODUCT_NEW,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .context("Failed to bind queue")?;

        info!(exchange = EXCHANGE_NAME, queue = QUEUE_NAME, "AMQP topology ready");
        Ok(Self { channel })
    }
}

#[async_trait]
impl EventPublisher for AmqpEventPublisher {
    async fn publish_new_product(&self, message: &NewProductMessage) -> Result<()> {
        let body = serde_json::to_vec(message).context("Failed to serialize message")?;

        self.channel
            .basic_publish(
                EXCHANGE_NAME,
                ROUTING_KEY_PRODUCT_NEW,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default()
                    .with_content_type("application/json".to_string().into())
                    .with_delivery_mode(DELIVERY_MODE_PERSISTENT),
            )
            .await
            .context("Failed to publish message")?;

        debug!(
            findqc_id = message.findqc_id,
            product_id = message.product_id,
            "published product.new"
        );
        Ok(())
    }
}

/// Stand-in used when the broker is unreachable at startup. The crawl still
/// runs; announcements are dropped with a log line.
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish_new_product(&self, message: &NewProductMessage) -> Result<()> {
        debug!(findqc_id = message.findqc_id, "broker unavailable, dropping product.new");
        Ok(())
    }
}
