use crate::models::match_record::{MatchRecord, MatchStatus};
use crate::repositories::errors::match_repository_errors::MatchRepositoryError;
use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_dynamo::{from_item, to_attribute_value, to_item};
use tracing::debug;

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait MatchRepository: Send + Sync {
    async fn create_match(&self, record: &MatchRecord) -> Result<(), MatchRepositoryError>;

    async fn get_match(&self, match_id: &str) -> Result<MatchRecord, MatchRepositoryError>;

    /// Writes `record` unless the stored copy is already finished or further
    /// ahead. Returns whether the write happened.
    async fn save_match(&self, record: &MatchRecord) -> Result<bool, MatchRepositoryError>;
}

pub struct DynamoDbMatchRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbMatchRepository {
    pub fn new(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }
}

#[async_trait]
impl MatchRepository for DynamoDbMatchRepository {
    async fn create_match(&self, record: &MatchRecord) -> Result<(), MatchRepositoryError> {
        let item =
            to_item(record).map_err(|e| MatchRepositoryError::Serialization(e.to_string()))?;

        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(id)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                Err(MatchRepositoryError::AlreadyExists)
            }
            Err(e) => Err(MatchRepositoryError::DynamoDb(e.to_string())),
        }
    }

    async fn get_match(&self, match_id: &str) -> Result<MatchRecord, MatchRepositoryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(match_id.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| MatchRepositoryError::DynamoDb(e.to_string()))?;

        match output.item {
            Some(item) => {
                from_item(item).map_err(|e| MatchRepositoryError::Serialization(e.to_string()))
            }
            None => Err(MatchRepositoryError::NotFound),
        }
    }

    async fn save_match(&self, record: &MatchRecord) -> Result<bool, MatchRepositoryError> {
        let item =
            to_item(record).map_err(|e| MatchRepositoryError::Serialization(e.to_string()))?;
        let ply = to_attribute_value(record.current_ply)
            .map_err(|e| MatchRepositoryError::Serialization(e.to_string()))?;

        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression(
                "attribute_not_exists(id) OR (#status = :in_progress AND current_ply <= :ply)",
            )
            .expression_attribute_names("#status", "status")
            .expression_attribute_values(
                ":in_progress",
                AttributeValue::S(MatchStatus::InProgress.as_str().to_string()),
            )
            .expression_attribute_values(":ply", ply)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                debug!(
                    "Skipped stale write for match {} at ply {}",
                    record.id, record.current_ply
                );
                Ok(false)
            }
            Err(e) => Err(MatchRepositoryError::DynamoDb(e.to_string())),
        }
    }
}

/// Process-local match storage for development and tests.
#[derive(Default)]
pub struct InMemoryMatchRepository {
    records: DashMap<String, MatchRecord>,
}

impl InMemoryMatchRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MatchRepository for InMemoryMatchRepository {
    async fn create_match(&self, record: &MatchRecord) -> Result<(), MatchRepositoryError> {
        match self.records.entry(record.id.clone()) {
            Entry::Occupied(_) => Err(MatchRepositoryError::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn get_match(&self, match_id: &str) -> Result<MatchRecord, MatchRepositoryError> {
        self.records
            .get(match_id)
            .map(|entry| entry.value().clone())
            .ok_or(MatchRepositoryError::NotFound)
    }

    async fn save_match(&self, record: &MatchRecord) -> Result<bool, MatchRepositoryError> {
        match self.records.entry(record.id.clone()) {
            Entry::Occupied(mut stored) => {
                if !stored.get().accepts_update(record) {
                    debug!(
                        "Skipped stale write for match {} at ply {}",
                        record.id, record.current_ply
                    );
                    return Ok(false);
                }
                stored.insert(record.clone());
                Ok(true)
            }
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(true)
            }
        }
    }
}
