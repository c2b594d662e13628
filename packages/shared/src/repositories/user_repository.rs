use crate::models::user::User;
use crate::repositories::errors::user_repository_errors::UserRepositoryError;
use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_dynamo::{from_item, to_attribute_value, to_item};

#[cfg(test)]
use mockall::automock;

pub struct DynamoDbUserRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbUserRepository {
    pub fn new(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: &User) -> Result<(), UserRepositoryError>;
    async fn get_user_by_id(&self, user_id: &str) -> Result<User, UserRepositoryError>;
    async fn get_user_by_username(&self, username: &str) -> Result<User, UserRepositoryError>;
}

#[async_trait]
impl UserRepository for DynamoDbUserRepository {
    async fn create_user(&self, user: &User) -> Result<(), UserRepositoryError> {
        let item = to_item(user).map_err(|e| UserRepositoryError::Serialization(e.to_string()))?;
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
                Err(UserRepositoryError::AlreadyExists)
            }
            Err(e) => Err(UserRepositoryError::DynamoDb(e.to_string())),
        }
    }

    async fn get_user_by_id(&self, user_id: &str) -> Result<User, UserRepositoryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(
                "id",
                to_attribute_value(user_id)
                    .map_err(|e| UserRepositoryError::Serialization(e.to_string()))?,
            )
            .send()
            .await
            .map_err(|e| UserRepositoryError::DynamoDb(e.to_string()))?;
        if let Some(item) = output.item {
            let user: User =
                from_item(item).map_err(|e| UserRepositoryError::Serialization(e.to_string()))?;
            Ok(user)
        } else {
            Err(UserRepositoryError::NotFound)
        }
    }

    async fn get_user_by_username(&self, username: &str) -> Result<User, UserRepositoryError> {
        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name("GSI_UserByUsername")
            .key_condition_expression("username = :username")
            .expression_attribute_values(
                ":username",
                to_attribute_value(username)
                    .map_err(|e| UserRepositoryError::Serialization(e.to_string()))?,
            )
            .limit(1)
            .send()
            .await;
        match result {
            Ok(output) => {
                let item = output
                    .items
                    .and_then(|items| items.into_iter().next())
                    .ok_or(UserRepositoryError::NotFound)?;
                from_item(item).map_err(|e| UserRepositoryError::Serialization(e.to_string()))
            }
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("ResourceNotFoundException")
                    || error_str.contains("ValidationException")
                {
                    return Err(UserRepositoryError::DynamoDb("User username index not available. Please ensure the GSI 'GSI_UserByUsername' exists and is active.".to_string()));
                }
                Err(UserRepositoryError::DynamoDb(error_str))
            }
        }
    }
}

/// Process-local user directory for development and tests.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: DashMap<String, User>,
    ids_by_username: DashMap<String, String>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create_user(&self, user: &User) -> Result<(), UserRepositoryError> {
        match self.ids_by_username.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(UserRepositoryError::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(user.id.clone());
                self.users.insert(user.id.clone(), user.clone());
                Ok(())
            }
        }
    }

    async fn get_user_by_id(&self, user_id: &str) -> Result<User, UserRepositoryError> {
        self.users
            .get(user_id)
            .map(|entry| entry.value().clone())
            .ok_or(UserRepositoryError::NotFound)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<User, UserRepositoryError> {
        let user_id = self
            .ids_by_username
            .get(username)
            .map(|entry| entry.value().clone())
            .ok_or(UserRepositoryError::NotFound)?;
        self.get_user_by_id(&user_id).await
    }
}
