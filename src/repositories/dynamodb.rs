use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Error as DynamoDbError;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::error;

use crate::models::{RepositoryError, RepositoryResult};

pub type Item = HashMap<String, AttributeValue>;

/// Client span for one DynamoDB call, carrying the AWS and OpenTelemetry attributes
pub fn dynamodb_span(operation: &str, table_name: &str, region: &str) -> tracing::Span {
    tracing::info_span!(
        "DynamoDB",
        "aws.service" = "DynamoDB",
        "aws.operation" = operation,
        "aws.region" = %region,
        "aws.dynamodb.table_name" = %table_name,
        "aws.request_id" = tracing::field::Empty,
        "aws.remote.service" = "AWS::DynamoDB",
        "aws.remote.operation" = operation,
        "aws.remote.resource.type" = "AWS::DynamoDB::Table",
        "aws.remote.resource.identifier" = %table_name,
        "otel.kind" = "client",
        "otel.name" = format!("DynamoDB.{}", operation),
        "rpc.system" = "aws-api",
        "rpc.service" = "AmazonDynamoDBv2",
        "rpc.method" = operation,
        "db.system" = "dynamodb",
        "db.name" = %table_name,
        "db.operation" = operation,
    )
}

/// Convert a DynamoDB error to a RepositoryError.
///
/// A rejected condition expression is how DynamoDB reports a uniqueness
/// violation, so it becomes `Conflict`.
pub fn map_dynamodb_error(error: DynamoDbError, table_name: &str) -> RepositoryError {
    match error {
        DynamoDbError::ConditionalCheckFailedException(_) => RepositoryError::Conflict {
            message: format!("conditional write rejected by {}", table_name),
        },
        DynamoDbError::ResourceNotFoundException(_) => {
            error!("DynamoDB table {} not found", table_name);
            RepositoryError::TableNotFound {
                table_name: table_name.to_string(),
            }
        }
        other => {
            error!("DynamoDB error: {:?}", other);
            RepositoryError::AwsSdk {
                message: other.to_string(),
            }
        }
    }
}

pub fn get_string(item: &Item, key: &str) -> RepositoryResult<String> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| RepositoryError::InvalidData {
            message: format!("Missing {}", key),
        })
}

pub fn get_number<T: FromStr>(item: &Item, key: &str) -> RepositoryResult<T> {
    item.get(key)
        .and_then(|v| v.as_n().ok())
        .and_then(|n| n.parse::<T>().ok())
        .ok_or_else(|| RepositoryError::InvalidData {
            message: format!("Missing or invalid {}", key),
        })
}

#[cfg(test)]
pub fn test_client() -> std::sync::Arc<aws_sdk_dynamodb::Client> {
    let config = aws_sdk_dynamodb::Config::builder()
        .region(aws_sdk_dynamodb::config::Region::new("us-east-1"))
        .behavior_version(aws_sdk_dynamodb::config::BehaviorVersion::latest())
        .build();
    std::sync::Arc::new(aws_sdk_dynamodb::Client::from_conf(config))
}
