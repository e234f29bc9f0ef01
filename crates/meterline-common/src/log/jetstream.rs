//! NATS JetStream backed durable logs
//!
//! Each topic maps to one stream whose only subject is the topic name.
//! Stream and consumer creation use the get-or-create calls, so repeated
//! startups against an existing deployment are no-ops.

use std::time::Duration;

use async_nats::jetstream::{self, consumer::pull, stream};
use async_nats::ServerAddr;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use tracing::{debug, info, instrument, warn};

use super::EventSink;
use crate::{MeterlineError, Result};

/// Records read from a durable consumer, in delivery order
pub type RecordStream = BoxStream<'static, Result<Bytes>>;

/// Connect to one or more NATS servers (comma-separated URLs)
pub async fn connect(urls: &str) -> Result<jetstream::Context> {
    let addrs = urls
        .split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(|url| url.parse::<ServerAddr>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| MeterlineError::Config(format!("Invalid NATS url '{}': {}", urls, e)))?;

    if addrs.is_empty() {
        return Err(MeterlineError::Config("No NATS servers configured".into()));
    }

    let client = async_nats::connect(addrs.as_slice())
        .await
        .map_err(|e| MeterlineError::Log(format!("Failed to connect to NATS: {}", e)))?;

    info!(servers = %urls, "Connected to NATS");
    Ok(jetstream::new(client))
}

/// Stream settings for `topic`. A zero `max_age` keeps records forever.
pub fn stream_config(topic: &str, max_age: Duration) -> stream::Config {
    stream::Config {
        name: topic.to_string(),
        subjects: vec![topic.to_string()],
        max_age,
        ..Default::default()
    }
}

async fn ensure_stream(
    context: &jetstream::Context,
    topic: &str,
    max_age: Duration,
) -> Result<stream::Stream> {
    context
        .get_or_create_stream(stream_config(topic, max_age))
        .await
        .map_err(|e| MeterlineError::Log(format!("Failed to create stream {}: {}", topic, e)))
}

/// Sink appending to a JetStream stream
pub struct JetStreamSink {
    context: jetstream::Context,
    topic: String,
}

impl JetStreamSink {
    /// Create the sink, creating the backing stream if it does not exist
    #[instrument(skip(context))]
    pub async fn create(context: jetstream::Context, topic: &str, max_age: Duration) -> Result<Self> {
        ensure_stream(&context, topic, max_age).await?;
        info!(topic, max_age_secs = max_age.as_secs(), "Stream ready");

        Ok(Self {
            context,
            topic: topic.to_string(),
        })
    }
}

#[async_trait]
impl EventSink for JetStreamSink {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn publish(&self, payload: Bytes) -> Result<()> {
        let bytes = payload.len();
        let ack = self
            .context
            .publish(self.topic.clone(), payload)
            .await
            .map_err(|e| MeterlineError::Log(format!("Publish to {} failed: {}", self.topic, e)))?;

        ack.await
            .map_err(|e| MeterlineError::Log(format!("Publish to {} not acked: {}", self.topic, e)))?;

        debug!(topic = %self.topic, bytes, "Record appended");
        Ok(())
    }
}

/// Open a durable consumer group on a topic.
///
/// Messages are acknowledged as soon as they are read; whatever the caller
/// does with a record afterwards, it will not be redelivered.
#[instrument(skip(context))]
pub async fn subscribe(
    context: &jetstream::Context,
    topic: &str,
    group: &str,
    max_age: Duration,
) -> Result<RecordStream> {
    let stream = ensure_stream(context, topic, max_age).await?;

    let consumer: jetstream::consumer::PullConsumer = stream
        .get_or_create_consumer(
            group,
            pull::Config {
                durable_name: Some(group.to_string()),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| MeterlineError::Log(format!("Failed to create consumer {}: {}", group, e)))?;

    let messages = consumer
        .messages()
        .await
        .map_err(|e| MeterlineError::Log(format!("Failed to open consumer {}: {}", group, e)))?;

    info!(topic, group, "Consumer ready");

    let records = messages.then(|message| async move {
        let message = message.map_err(|e| MeterlineError::Log(e.to_string()))?;
        if let Err(e) = message.ack().await {
            warn!("Failed to ack message: {}", e);
        }
        Ok(message.payload.clone())
    });

    Ok(records.boxed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_config_binds_topic_and_retention() {
        let config = stream_config("function_actions", Duration::from_secs(3600));
        assert_eq!(config.name, "function_actions");
        assert_eq!(config.subjects, vec!["function_actions".to_string()]);
        assert_eq!(config.max_age, Duration::from_secs(3600));

        assert!(stream_config("notify", Duration::ZERO).max_age.is_zero());
    }
}
